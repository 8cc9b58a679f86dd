//! Typed notification bus
//!
//! The core publishes what happened; audio, VFX and UI listeners react on
//! their own time. Publishing never waits for a listener.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::world::EntityId;

/// Everything the gameplay core announces
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The player picked an object up
    PlayerObjectGrabbed { entity: EntityId },
    /// The player is about to let go of an object
    PlayerObjectDropping { entity: EntityId },
    /// A held object was committed to a slot
    GrabbedObjectAttached { entity: EntityId },
    /// A touchable object ran its callback
    PlayerTouchedTouchableObject { entity: EntityId },
    /// The ground probe began contact with a body
    PlayerPickedObject { entity: EntityId },

    /// The opponent opened the match
    MatchStarted { match_id: Uuid },
    /// The turn counter advanced
    TurnChanged { turn: u32 },
    /// The opponent said something
    NarrativeChanged { line: String },
    /// The last slot is filled and the closing line delivered
    MatchEnded { match_id: Uuid },
}

/// Publishing handle given to each component
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<GameEvent>,
}

impl EventPublisher {
    pub fn publish(&self, event: GameEvent) {
        // no subscriber is a normal state, e.g. in headless runs
        let _ = self.tx.send(event);
    }
}

/// Host-owned bus
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.tx.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
