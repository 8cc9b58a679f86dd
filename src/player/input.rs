//! Input events to movement command
//!
//! Every input source writes intents into one [`InputCommand`]; the
//! movement integrator reads it once per tick. Re-asserting an intent is a
//! no-op and releasing always restores the default.

use std::f32::consts::PI;

use glam::Vec2;

/// Camera pitch stays this far from straight up or down
const PITCH_MARGIN: f32 = 0.01;

/// Logical key codes the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    ArrowUp,
    ArrowLeft,
    ArrowDown,
    ArrowRight,
    ShiftLeft,
    ShiftRight,
    Space,
    Tab,
    Digit1,
    Digit2,
}

impl KeyCode {
    /// Map a DOM-style `code` string; unknown keys are ignored
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "KeyW" => Self::KeyW,
            "KeyA" => Self::KeyA,
            "KeyS" => Self::KeyS,
            "KeyD" => Self::KeyD,
            "ArrowUp" => Self::ArrowUp,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowDown" => Self::ArrowDown,
            "ArrowRight" => Self::ArrowRight,
            "ShiftLeft" => Self::ShiftLeft,
            "ShiftRight" => Self::ShiftRight,
            "Space" => Self::Space,
            "Tab" => Self::Tab,
            "Digit1" => Self::Digit1,
            "Digit2" => Self::Digit2,
            _ => return None,
        })
    }
}

/// Requests the controller cannot fulfil itself and hands to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    ShowMenu,
    FirstPersonView,
    ThirdPersonView,
}

/// Virtual stick tuning (pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickSettings {
    pub dead_zone: f32,
    pub max_radius: f32,
}

impl Default for StickSettings {
    fn default() -> Self {
        Self {
            dead_zone: 15.0,
            max_radius: 50.0,
        }
    }
}

/// Continuous movement command owned by the player controller
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputCommand {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub sprint: bool,
    /// Shift inverts `sprint` while held
    pub(crate) shift_held: bool,
    /// Pending look rotation from the touch look area
    pub look_delta_x: f32,
    pub look_delta_y: f32,
    /// Virtual stick offset from its centre
    pub stick_x: f32,
    pub stick_y: f32,
    /// Camera alpha mirror
    pub camera_yaw: f32,
    /// Camera beta mirror
    pub camera_pitch: f32,
}

impl InputCommand {
    pub fn new(sprint: bool) -> Self {
        Self {
            sprint,
            camera_pitch: std::f32::consts::FRAC_PI_2,
            ..Self::default()
        }
    }

    pub fn key_down(&mut self, key: KeyCode) -> Option<ControlSignal> {
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.move_forward = true,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.move_left = true,
            KeyCode::KeyS | KeyCode::ArrowDown => self.move_backward = true,
            KeyCode::KeyD | KeyCode::ArrowRight => self.move_right = true,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.set_shift(true),
            KeyCode::Space => self.jump = true,
            KeyCode::Tab => {
                // the menu steals focus, so key-ups for held keys never arrive
                self.release_movement();
                self.set_shift(false);
                return Some(ControlSignal::ShowMenu);
            }
            KeyCode::Digit1 if cfg!(debug_assertions) => {
                return Some(ControlSignal::FirstPersonView)
            }
            KeyCode::Digit2 if cfg!(debug_assertions) => {
                return Some(ControlSignal::ThirdPersonView)
            }
            KeyCode::Digit1 | KeyCode::Digit2 => {}
        }
        None
    }

    pub fn key_up(&mut self, key: KeyCode) {
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.move_forward = false,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.move_left = false,
            KeyCode::KeyS | KeyCode::ArrowDown => self.move_backward = false,
            KeyCode::KeyD | KeyCode::ArrowRight => self.move_right = false,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.set_shift(false),
            KeyCode::Space => self.jump = false,
            KeyCode::Tab | KeyCode::Digit1 | KeyCode::Digit2 => {}
        }
    }

    /// Clear all directional intents and the jump
    pub fn release_movement(&mut self) {
        self.move_forward = false;
        self.move_backward = false;
        self.move_left = false;
        self.move_right = false;
        self.jump = false;
    }

    /// Sprint button on touch devices
    pub fn toggle_sprint(&mut self) {
        self.sprint = !self.sprint;
    }

    fn set_shift(&mut self, held: bool) {
        // auto-repeat sends key-down again while held
        if self.shift_held != held {
            self.shift_held = held;
            self.sprint = !self.sprint;
        }
    }

    pub fn set_jump(&mut self, down: bool) {
        self.jump = down;
    }

    /// Virtual stick drag relative to where the thumb went down.
    /// Returns the clamped puck offset for the host to draw.
    pub fn stick_moved(&mut self, dx: f32, dy: f32, settings: &StickSettings) -> Vec2 {
        let mut offset = Vec2::new(dx, dy);
        let dist = offset.length();
        if dist > settings.max_radius {
            offset = offset / dist * settings.max_radius;
        }

        self.stick_x = offset.x;
        self.stick_y = offset.y;

        self.move_left = offset.x < -settings.dead_zone;
        self.move_right = offset.x > settings.dead_zone;
        self.move_forward = offset.y < -settings.dead_zone;
        self.move_backward = offset.y > settings.dead_zone;

        offset
    }

    pub fn stick_released(&mut self) {
        self.stick_x = 0.0;
        self.stick_y = 0.0;
        self.move_forward = false;
        self.move_backward = false;
        self.move_left = false;
        self.move_right = false;
    }

    /// Desktop mouse look from raw pointer movement
    pub fn pointer_look(&mut self, movement_x: f32, movement_y: f32, sensitivity: f32, dt: f32) {
        self.camera_yaw += (-movement_x * sensitivity / 1000.0) * dt;
        self.camera_pitch += (-movement_y * sensitivity / 1000.0) * dt;
        self.clamp_pitch();
    }

    /// Touch look area drag; the accumulated delta is applied and flushed
    /// so the camera only turns while the finger moves
    pub fn touch_look(&mut self, dx: f32, dy: f32, rot_factor: f32, sensitivity: f32, dt: f32) {
        self.look_delta_x += dx * rot_factor;
        self.look_delta_y += dy * rot_factor;

        self.camera_yaw += -self.look_delta_x * sensitivity * dt;
        self.camera_pitch += -self.look_delta_y * sensitivity * dt;
        self.clamp_pitch();

        self.look_delta_x = 0.0;
        self.look_delta_y = 0.0;
    }

    fn clamp_pitch(&mut self) {
        self.camera_pitch = self.camera_pitch.clamp(PITCH_MARGIN, PI - PITCH_MARGIN);
    }

    /// Mirror the real camera angles into the command
    pub fn sync_camera(&mut self, yaw: f32, pitch: f32) {
        self.camera_yaw = yaw;
        self.camera_pitch = pitch;
    }
}
