//! First-person player: input, movement and object interaction

pub mod controller;
pub mod input;
pub mod interaction;
pub mod physics;

pub use controller::{Cursor, Grab, GroundContact, PlayerController};
pub use input::{ControlSignal, InputCommand, KeyCode, StickSettings};
pub use interaction::{TapEvent, Viewport};
pub use physics::{MovementStats, MovementSystem};

use crate::config::{Config, Platform};

/// Player body and interaction tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    /// Max distance for aim picking and tap interaction
    pub pick_distance: f32,
    pub height: f32,
    pub radius: f32,
    pub mass: f32,
    /// How far ahead of the player a grabbed object is held
    pub grab_distance: f32,
    pub ground_probe_length: f32,
    pub look_sensitivity: f32,
    /// Touch look rotation per dragged pixel
    pub touch_rotation_factor: f32,
    pub stick: StickSettings,
    pub sprint_default: bool,
    pub platform: Platform,
}

impl PlayerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            look_sensitivity: config.look_sensitivity,
            sprint_default: config.sprint_default,
            platform: config.platform,
            ..Self::default()
        }
    }

    /// Head anchor above the body origin
    pub fn head_offset(&self) -> f32 {
        self.height / 2.0 - 0.05
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            pick_distance: 3.0,
            height: 1.75,
            radius: 0.35,
            mass: 70.0,
            grab_distance: 2.5,
            ground_probe_length: 1.0,
            look_sensitivity: 2.0,
            touch_rotation_factor: 0.2,
            stick: StickSettings::default(),
            sprint_default: false,
            platform: Platform::Desktop,
        }
    }
}

/// Malformed input events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("touch event carried no touch points")]
    EmptyTouch,

    #[error("viewport has no area ({width}x{height})")]
    DegenerateViewport { width: f32, height: f32 },
}
