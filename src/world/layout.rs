//! Logical scene keys resolved once at setup

use glam::Vec3;
use tracing::warn;

use super::{EntityId, SceneGraph};

/// Node names the garden scene is authored with
#[derive(Debug, Clone)]
pub struct LayoutNames {
    pub player_body: String,
    pub player_spawn: String,
    pub card_template: String,
    pub spawn_prefix: String,
    pub secret_spawn_prefix: String,
    /// Slots are `<prefix>.1` .. `<prefix>.N`
    pub slot_prefix: String,
    pub trigger_zone: String,
    pub shrine: String,
    pub shrine_hint: String,
    pub gate: String,
}

impl Default for LayoutNames {
    fn default() -> Self {
        Self {
            player_body: "player_body".to_string(),
            player_spawn: "player_spawn_point".to_string(),
            card_template: "uno_card_base".to_string(),
            spawn_prefix: "card_spawn_point".to_string(),
            secret_spawn_prefix: "card_secret_spawn_point".to_string(),
            slot_prefix: "toro_gaming".to_string(),
            trigger_zone: "dragon_trigger_zone".to_string(),
            shrine: "toro_small".to_string(),
            shrine_hint: "toro_cards_double_plane".to_string(),
            gate: "gate_doors".to_string(),
        }
    }
}

/// Entity handles for everything gameplay refers to by role
#[derive(Debug, Clone, Default)]
pub struct SceneLayout {
    pub player_body: Option<EntityId>,
    pub player_spawn: Vec3,
    pub card_template: Option<EntityId>,
    pub spawn_points: Vec<EntityId>,
    pub secret_spawn_points: Vec<EntityId>,
    /// Ordered; index 0 is slot 1. Stops at the first missing slot.
    pub slots: Vec<EntityId>,
    pub trigger_zone: Option<EntityId>,
    pub shrine: Option<EntityId>,
    pub shrine_hint: Option<EntityId>,
    pub gate: Option<EntityId>,
}

impl SceneLayout {
    /// Look every role up once. Missing pieces are logged and left empty.
    pub fn resolve<S>(scene: &S, names: &LayoutNames, slot_count: u32) -> Self
    where
        S: SceneGraph + ?Sized,
    {
        let find = |name: &str| {
            let found = scene.find_by_name(name);
            if found.is_none() {
                warn!(node = name, "scene node not found, skipping");
            }
            found
        };

        let player_spawn = match find(&names.player_spawn) {
            Some(id) => scene.world_position(id),
            None => Vec3::new(0.0, 2.0, 0.0),
        };

        let mut slots = Vec::with_capacity(slot_count as usize);
        for n in 1..=slot_count {
            match find(&format!("{}.{}", names.slot_prefix, n)) {
                Some(id) => slots.push(id),
                None => break,
            }
        }

        let spawn_points = scene.find_by_prefix(&names.spawn_prefix);
        if spawn_points.is_empty() {
            warn!(prefix = %names.spawn_prefix, "no card spawn points in scene");
        }

        Self {
            player_body: find(&names.player_body),
            player_spawn,
            card_template: find(&names.card_template),
            spawn_points,
            secret_spawn_points: scene.find_by_prefix(&names.secret_spawn_prefix),
            slots,
            trigger_zone: find(&names.trigger_zone),
            shrine: find(&names.shrine),
            shrine_hint: find(&names.shrine_hint),
            gate: find(&names.gate),
        }
    }
}
