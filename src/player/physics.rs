//! Player movement constants and kinematics

use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use crate::config::Platform;

use super::input::InputCommand;

/// Movement constants per platform class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementStats {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    /// Touch devices move slightly slower than pointer-driven ones
    pub platform_factor: f32,
    /// Vertical velocity set by an authorised jump
    pub jump_impulse: f32,
    /// Vertical velocity forced while standing still on the ground
    pub ground_stick_velocity: f32,
    /// Below this a velocity component counts as zero
    pub epsilon: f32,
}

impl MovementStats {
    pub fn for_platform(platform: Platform) -> Self {
        let platform_factor = match platform {
            Platform::Desktop => 1.0,
            Platform::Mobile => 0.8,
        };
        Self {
            walk_speed: 6.0,
            sprint_speed: 9.0,
            platform_factor,
            jump_impulse: 5.0,
            ground_stick_velocity: -0.5,
            epsilon: 0.001,
        }
    }
}

/// Pure movement maths, applied by the controller each tick
pub struct MovementSystem;

impl MovementSystem {
    /// Camera-relative direction from the four intents. Forward is -X,
    /// right is +Z. Normalised only when non-zero.
    pub fn local_direction(cmd: &InputCommand) -> Vec3 {
        let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
        let dir = Vec3::new(
            -axis(cmd.move_forward, cmd.move_backward),
            0.0,
            axis(cmd.move_right, cmd.move_left),
        );
        if dir.length_squared() > 0.0 {
            dir.normalize()
        } else {
            dir
        }
    }

    /// Body heading around +Y for a camera alpha
    pub fn heading(camera_yaw: f32) -> f32 {
        TAU - camera_yaw
    }

    pub fn world_direction(cmd: &InputCommand) -> Vec3 {
        Quat::from_rotation_y(Self::heading(cmd.camera_yaw)) * Self::local_direction(cmd)
    }

    pub fn speed(sprint: bool, stats: &MovementStats) -> f32 {
        let base = if sprint {
            stats.sprint_speed
        } else {
            stats.walk_speed
        };
        base * stats.platform_factor
    }

    /// Horizontal velocity is fully player-authored, even in the air.
    /// Vertical velocity is carried over from the physics step.
    pub fn velocity(cmd: &InputCommand, current: Vec3, stats: &MovementStats) -> Vec3 {
        let horizontal = Self::world_direction(cmd) * Self::speed(cmd.sprint, stats);
        Vec3::new(horizontal.x, current.y, horizontal.z)
    }

    /// Jump needs the key, ground contact or a body at rest, and not
    /// being airborne already
    pub fn can_jump(
        jump: bool,
        grounded: bool,
        velocity: Vec3,
        airborne: bool,
        stats: &MovementStats,
    ) -> bool {
        jump && (grounded || velocity.length() < stats.epsilon) && !airborne
    }

    /// Residual bounce of a grounded body is clamped to a small downward
    /// velocity, never while jumping
    pub fn needs_ground_stick(
        jump: bool,
        airborne: bool,
        grounded: bool,
        vertical_velocity: f32,
        stats: &MovementStats,
    ) -> bool {
        !jump && !airborne && grounded && vertical_velocity.abs() > stats.epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn no_intent_no_direction() {
        let cmd = InputCommand::default();
        assert_eq!(MovementSystem::local_direction(&cmd), Vec3::ZERO);
    }

    #[test]
    fn opposing_keys_cancel() {
        let cmd = InputCommand {
            move_forward: true,
            move_backward: true,
            ..Default::default()
        };
        assert_eq!(MovementSystem::local_direction(&cmd), Vec3::ZERO);
    }

    #[test]
    fn diagonal_is_normalised() {
        let cmd = InputCommand {
            move_forward: true,
            move_right: true,
            ..Default::default()
        };
        let dir = MovementSystem::local_direction(&cmd);
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(dir.x < 0.0 && dir.z > 0.0);
    }

    #[test]
    fn forward_follows_camera_yaw() {
        let stats = MovementStats::for_platform(Platform::Desktop);
        for yaw in [0.0_f32, 0.7, 2.0, 4.5] {
            let cmd = InputCommand {
                move_forward: true,
                camera_yaw: yaw,
                ..Default::default()
            };
            let v = MovementSystem::velocity(&cmd, Vec3::ZERO, &stats);
            let expected = Vec3::new(-yaw.cos(), 0.0, -yaw.sin()) * 6.0;
            assert!(approx(v, expected), "yaw {yaw}: {v:?} vs {expected:?}");
        }
    }

    #[test]
    fn speeds_per_platform() {
        let desktop = MovementStats::for_platform(Platform::Desktop);
        let mobile = MovementStats::for_platform(Platform::Mobile);
        assert_eq!(MovementSystem::speed(false, &desktop), 6.0);
        assert_eq!(MovementSystem::speed(true, &desktop), 9.0);
        assert!((MovementSystem::speed(false, &mobile) - 4.8).abs() < 1e-6);
        assert!((MovementSystem::speed(true, &mobile) - 7.2).abs() < 1e-6);
    }

    #[test]
    fn vertical_velocity_preserved() {
        let stats = MovementStats::for_platform(Platform::Desktop);
        let cmd = InputCommand {
            move_left: true,
            ..Default::default()
        };
        let v = MovementSystem::velocity(&cmd, Vec3::new(3.0, -2.0, 1.0), &stats);
        assert_eq!(v.y, -2.0);
        assert!((Vec3::new(v.x, 0.0, v.z).length() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn jump_rules() {
        let s = MovementStats::for_platform(Platform::Desktop);
        let moving = Vec3::new(3.0, 0.0, 0.0);
        assert!(MovementSystem::can_jump(true, true, moving, false, &s));
        assert!(MovementSystem::can_jump(true, false, Vec3::ZERO, false, &s));
        assert!(!MovementSystem::can_jump(true, false, moving, false, &s));
        assert!(!MovementSystem::can_jump(true, true, moving, true, &s));
        assert!(!MovementSystem::can_jump(false, true, moving, false, &s));
    }

    #[test]
    fn ground_stick_never_while_jumping() {
        let s = MovementStats::for_platform(Platform::Desktop);
        assert!(MovementSystem::needs_ground_stick(false, false, true, 0.3, &s));
        assert!(!MovementSystem::needs_ground_stick(true, false, true, 0.3, &s));
        assert!(!MovementSystem::needs_ground_stick(false, false, true, 0.0005, &s));
        assert!(!MovementSystem::needs_ground_stick(false, true, true, 0.3, &s));
    }
}
