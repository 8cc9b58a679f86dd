//! Scripted player for headless sessions
//!
//! Plays the match through the same input surface a person would use: walk
//! keys, camera angles and a centre-screen click under pointer lock.

use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};
use tracing::{debug, info, warn};

use crate::game::{GameError, MatchPhase};
use crate::player::{PlayerController, TapEvent, Viewport};
use crate::scene::{Driver, GardenScene};
use crate::world::{EntityId, SceneGraph};

use super::{facing_angles, Sandbox};

/// Stop this far from a card, horizontally, before clicking it
const REACH: f32 = 1.8;
const ARRIVE_RADIUS: f32 = 0.15;
/// Ticks to spend on one card before trying another
const FETCH_PATIENCE: u32 = 600;
const CARRY_PATIENCE: u32 = 900;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    WalkToZone,
    AwaitTurn,
    Fetch { card: EntityId, aimed: u32, spent: u32 },
    Carry { card: EntityId, stand: Vec3, spent: u32 },
    Done,
}

#[derive(Debug)]
pub struct DemoScript {
    phase: Phase,
    /// Cards that could not be reached
    skipped: HashSet<EntityId>,
}

impl Default for DemoScript {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoScript {
    pub fn new() -> Self {
        Self {
            phase: Phase::WalkToZone,
            skipped: HashSet::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    fn next_phase(&mut self, scene: &mut GardenScene<Sandbox>) -> Result<Phase, GameError> {
        if scene.engine().is_ended() {
            stop(scene.player_mut());
            return Ok(Phase::Done);
        }

        Ok(match self.phase {
            Phase::WalkToZone => {
                if scene.engine().phase() != MatchPhase::Idle {
                    stop(scene.player_mut());
                    return Ok(Phase::AwaitTurn);
                }
                let Some(zone) = scene.layout().trigger_zone else {
                    warn!("No trigger zone to walk into");
                    return Ok(Phase::Done);
                };
                let target = scene.world().world_position(zone);
                walk_towards(scene, target, 0.0);
                Phase::WalkToZone
            }
            Phase::AwaitTurn => {
                stop(scene.player_mut());
                let engine = scene.engine();
                if engine.is_busy() || engine.turn() % 2 == 1 {
                    return Ok(Phase::AwaitTurn);
                }
                match self.choose_card(scene)? {
                    Some(card) => {
                        debug!(card = %card, turn = scene.engine().turn(), "Going for a card");
                        Phase::Fetch {
                            card,
                            aimed: 0,
                            spent: 0,
                        }
                    }
                    None => {
                        warn!(turn = scene.engine().turn(), "No playable card left, giving up");
                        Phase::Done
                    }
                }
            }
            Phase::Fetch { card, aimed, spent } => self.fetch(scene, card, aimed, spent + 1),
            Phase::Carry { card, stand, spent } => self.carry(scene, card, stand, spent + 1),
            Phase::Done => Phase::Done,
        })
    }

    /// Nearest playable card not given up on
    fn choose_card(&self, scene: &GardenScene<Sandbox>) -> Result<Option<EntityId>, GameError> {
        let playable = scene.engine().playable_cards(scene.world(), scene.registry())?;
        let here = scene.player().position(scene.world());
        Ok(playable
            .into_iter()
            .filter(|card| !self.skipped.contains(card))
            .min_by(|a, b| {
                let da = flat_distance(here, scene.world().world_position(*a));
                let db = flat_distance(here, scene.world().world_position(*b));
                da.total_cmp(&db)
            }))
    }

    fn fetch(
        &mut self,
        scene: &mut GardenScene<Sandbox>,
        card: EntityId,
        aimed: u32,
        spent: u32,
    ) -> Phase {
        let held = scene.player().grabbed_object();
        // a card in front of the intended one may be picked instead
        let card = match held {
            Some(other) if other != card && matches_current_slot(scene, other) => other,
            _ => card,
        };
        if held == Some(card) {
            let Some(slot) = scene.engine().slot(scene.engine().turn()).map(|s| s.entity) else {
                return Phase::AwaitTurn;
            };
            let here = scene.player().position(scene.world());
            let offset = scene.world().world_position(card) - here;
            let mut stand = scene.world().world_position(slot) - offset;
            stand.y = here.y;
            stop(scene.player_mut());
            return Phase::Carry {
                card,
                stand,
                spent: 0,
            };
        }
        if spent > FETCH_PATIENCE || !scene.registry().is_grabbable(card) {
            self.skipped.insert(card);
            stop(scene.player_mut());
            return Phase::AwaitTurn;
        }
        if held.is_some() {
            // holding the wrong thing; a click drops it
            click(scene);
            return Phase::Fetch {
                card,
                aimed: 0,
                spent,
            };
        }

        let target = scene.world().world_position(card);
        if !walk_towards(scene, target, REACH) {
            return Phase::Fetch {
                card,
                aimed: 0,
                spent,
            };
        }

        let head = scene.player().aim_ray().origin;
        let (yaw, pitch) = facing_angles(head, target);
        scene.player_mut().sync_camera(yaw, pitch);
        // the aim ray catches up on the next update
        if aimed >= 1 {
            click(scene);
        }
        Phase::Fetch {
            card,
            aimed: aimed + 1,
            spent,
        }
    }

    fn carry(
        &mut self,
        scene: &mut GardenScene<Sandbox>,
        card: EntityId,
        stand: Vec3,
        spent: u32,
    ) -> Phase {
        if scene.player().grabbed_object() != Some(card) {
            stop(scene.player_mut());
            return Phase::AwaitTurn;
        }
        if spent > CARRY_PATIENCE {
            warn!(card = %card, "Could not deliver the card, dropping it");
            click(scene);
            self.skipped.insert(card);
            return Phase::AwaitTurn;
        }
        walk_towards(scene, stand, ARRIVE_RADIUS);
        Phase::Carry { card, stand, spent }
    }
}

impl Driver<Sandbox> for DemoScript {
    fn drive(&mut self, scene: &mut GardenScene<Sandbox>) -> Result<bool, GameError> {
        if !scene.is_stable() {
            return Ok(true);
        }
        let next = self.next_phase(scene)?;
        if next == Phase::Done && self.phase != Phase::Done {
            info!(turn = scene.engine().turn(), "Demo script finished");
        }
        self.phase = next;
        Ok(!self.is_done())
    }
}

fn matches_current_slot(scene: &GardenScene<Sandbox>, card: EntityId) -> bool {
    let engine = scene.engine();
    let previous = engine
        .slot(engine.turn().saturating_sub(1))
        .and_then(|slot| slot.occupant);
    match previous {
        Some(previous) => engine
            .check_card_is_matching_previous_card(card, previous)
            .unwrap_or(false),
        None => false,
    }
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

fn stop(player: &mut PlayerController) {
    player.command.release_movement();
}

/// Face `target` and walk forward until within `radius` on the ground
/// plane. True once arrived.
fn walk_towards(scene: &mut GardenScene<Sandbox>, target: Vec3, radius: f32) -> bool {
    let here = scene.player().position(scene.world());
    let (dx, dz) = (target.x - here.x, target.z - here.z);
    let player = scene.player_mut();
    if (dx * dx + dz * dz).sqrt() <= radius.max(ARRIVE_RADIUS) {
        stop(player);
        return true;
    }
    let yaw = (-dz).atan2(-dx);
    player.sync_camera(yaw, FRAC_PI_2);
    player.command.move_forward = true;
    false
}

/// Left click at the screen centre under pointer lock
fn click(scene: &mut GardenScene<Sandbox>) {
    let (width, height) = scene.world().viewport_size();
    let event = TapEvent::Pointer {
        client: Vec2::ZERO,
        pointer_locked: true,
        viewport: Viewport::full(width, height),
    };
    if let Err(err) = scene.tap(&event) {
        warn!(%err, "Click rejected");
    }
}
