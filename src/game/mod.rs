//! Card-matching match: deck, rules, opponent and turn flow

pub mod card;
pub mod deck;
pub mod dialogue;
pub mod engine;
pub mod rules;
pub mod shrine;
pub mod summary;

pub use card::{Card, CardColor, CardInstance, Rank};
pub use deck::Deck;
pub use engine::{AttachOutcome, MatchEngine, MatchPhase, MatchSettings, Side, Slot, TurnState};
pub use shrine::ShrineChallenge;
pub use summary::{MatchSummary, MoveRecord};

use crate::world::EntityId;

/// Invariant violations that abort the session
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Entity {0} on a slot is not a card")]
    UnknownCardKind(EntityId),

    #[error("Opponent has no card to play on slot {slot}")]
    NoMatchingCard { slot: u32 },

    #[error("Slot {slot} has no card to match against")]
    EmptySlot { slot: u32 },

    #[error("Slot {0} does not exist")]
    UnknownSlot(u32),

    #[error("Scene layout is incomplete: {0}")]
    IncompleteLayout(String),

    #[error("Required scene node missing: {0}")]
    MissingEntity(&'static str),

    #[error("Could not spawn {0}")]
    SpawnFailed(String),

    #[error("Frame times did not stabilise; the device is too slow")]
    FrameRateUnstable,
}
