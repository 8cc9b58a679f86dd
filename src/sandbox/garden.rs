//! The garden scene, authored in code

use glam::Vec3;
use tracing::debug;

use crate::player::PlayerSettings;
use crate::world::LayoutNames;

use super::{NodeSpec, Sandbox};

/// Shape of the generated garden
#[derive(Debug, Clone, PartialEq)]
pub struct GardenSpec {
    pub slot_count: u32,
    /// Card spawn grid
    pub card_columns: u32,
    pub card_rows: u32,
    pub secret_cards: u32,
    pub with_trigger_zone: bool,
    pub with_shrine: bool,
    pub with_gate: bool,
}

impl Default for GardenSpec {
    fn default() -> Self {
        Self {
            slot_count: 6,
            card_columns: 5,
            card_rows: 8,
            secret_cards: 2,
            with_trigger_zone: true,
            with_shrine: true,
            with_gate: true,
        }
    }
}

pub const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, 1.0, 0.0);
pub const TRIGGER_ZONE_CENTRE: Vec3 = Vec3::new(-5.0, 1.0, 0.0);
pub const SHRINE_POSITION: Vec3 = Vec3::new(10.0, 0.75, 14.0);
const SLOT_ROW_X: f32 = -8.0;
const SLOT_SPACING: f32 = 2.0;
const SLOT_HALF: Vec3 = Vec3::new(0.4, 0.75, 0.4);
const CARD_HALF: Vec3 = Vec3::new(0.43, 0.7, 0.05);
const CARD_REST_HEIGHT: f32 = 0.7;

impl Sandbox {
    /// Build the garden with the default node names
    pub fn garden(spec: &GardenSpec) -> Self {
        let names = LayoutNames::default();
        let player = PlayerSettings::default();
        let mut sandbox = Sandbox::new();

        sandbox.spawn(
            "ground",
            NodeSpec::solid(Vec3::new(0.0, -0.5, 0.0), Vec3::new(40.0, 0.5, 40.0)).unpickable(),
        );

        sandbox.spawn(&names.player_spawn, NodeSpec::marker(PLAYER_SPAWN));
        let half_height = player.height / 2.0;
        let body = sandbox.spawn(
            &names.player_body,
            NodeSpec::prop(
                Vec3::new(PLAYER_SPAWN.x, half_height, PLAYER_SPAWN.z),
                Vec3::new(player.radius, half_height, player.radius),
            )
            .unpickable(),
        );
        sandbox.follow_with_camera(body, Vec3::Y * player.head_offset());

        sandbox.spawn(
            &names.card_template,
            NodeSpec::prop(Vec3::new(0.0, -5.0, 0.0), CARD_HALF).hidden(),
        );

        let mut n = 0;
        for row in 0..spec.card_rows {
            for column in 0..spec.card_columns {
                let position = Vec3::new(
                    3.0 + 2.0 * column as f32,
                    CARD_REST_HEIGHT,
                    -7.0 + 2.0 * row as f32,
                );
                sandbox.spawn(
                    &format!("{}.{:03}", names.spawn_prefix, n),
                    NodeSpec::marker(position),
                );
                n += 1;
            }
        }
        for i in 0..spec.secret_cards {
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            let position = Vec3::new(14.0 + 2.0 * (i / 2) as f32, CARD_REST_HEIGHT, 12.0 * side);
            sandbox.spawn(
                &format!("{}.{:03}", names.secret_spawn_prefix, i),
                NodeSpec::marker(position),
            );
        }

        let centre = (spec.slot_count as f32 + 1.0) / 2.0;
        for number in 1..=spec.slot_count {
            let z = (number as f32 - centre) * SLOT_SPACING;
            sandbox.spawn(
                &format!("{}.{}", names.slot_prefix, number),
                NodeSpec::solid(Vec3::new(SLOT_ROW_X, SLOT_HALF.y, z), SLOT_HALF),
            );
        }

        if spec.with_trigger_zone {
            sandbox.spawn(
                &names.trigger_zone,
                NodeSpec::zone(TRIGGER_ZONE_CENTRE, Vec3::new(1.5, 1.5, 3.0)),
            );
        }

        if spec.with_shrine {
            sandbox.spawn(&names.shrine, NodeSpec::solid(SHRINE_POSITION, SLOT_HALF));
            sandbox.spawn(
                &names.shrine_hint,
                NodeSpec::prop(SHRINE_POSITION + Vec3::Y * 1.75, Vec3::new(0.5, 0.5, 0.01))
                    .unpickable(),
            );
        }

        if spec.with_gate {
            sandbox.spawn(
                &names.gate,
                NodeSpec::solid(Vec3::new(-15.0, 2.0, 0.0), Vec3::new(0.3, 2.0, 3.0)),
            );
        }

        debug!(
            slots = spec.slot_count,
            spawn_points = n,
            secret = spec.secret_cards,
            "garden built"
        );
        sandbox
    }
}
