//! Host boundary: the physics, scene graph, animation and audio services the
//! gameplay core consumes. Implementations live outside this crate (or in
//! [`crate::sandbox`] for headless runs).

pub mod layout;
pub mod registry;

use std::fmt;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::task::Completion;

pub use layout::{LayoutNames, SceneLayout};
pub use registry::{Capability, EntityRegistry, TouchCallback};

/// Stable numeric id of a scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a physics body owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            length,
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Physics raycast result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Node of the body that was hit. Lookup handle only.
    pub entity: EntityId,
    pub distance: f32,
    pub position: Vec3,
}

/// Scene picking result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f32,
}

/// Physics body parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySpec {
    pub radius: f32,
    pub height: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Zero locks rotation so the capsule never tips over
    pub inertia: Vec3,
}

pub trait PhysicsWorld {
    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);
    fn create_capsule_body(&mut self, node: EntityId, spec: &BodySpec) -> BodyHandle;
    fn dispose_body(&mut self, body: BodyHandle);
    fn linear_velocity(&self, body: BodyHandle) -> Vec3;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    /// Closest body hit on the segment `from..to`
    fn raycast(&self, from: Vec3, to: Vec3) -> Option<RayHit>;
}

/// Materials the core switches between; the host maps them to real ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    CardOpaque,
    CardTranslucent,
    SlotNeutral,
    SlotHighlighted,
}

pub trait SceneGraph {
    fn find_by_name(&self, name: &str) -> Option<EntityId>;
    /// All nodes whose name starts with `prefix`, in scene order
    fn find_by_prefix(&self, prefix: &str) -> Vec<EntityId>;
    fn name_of(&self, id: EntityId) -> Option<String>;
    /// Clone a node under a new unique name
    fn clone_node(&mut self, source: EntityId, name: &str) -> Option<EntityId>;
    fn dispose(&mut self, id: EntityId);

    fn parent(&self, id: EntityId) -> Option<EntityId>;
    /// Reparent keeping the world transform. `None` reparents to the world.
    fn set_parent(&mut self, id: EntityId, parent: Option<EntityId>);
    fn world_position(&self, id: EntityId) -> Vec3;
    fn set_world_position(&mut self, id: EntityId, position: Vec3);
    fn set_local_position(&mut self, id: EntityId, position: Vec3);
    fn set_yaw(&mut self, id: EntityId, yaw: f32);
    /// Top of the node's local bounding box
    fn bounding_top(&self, id: EntityId) -> f32;
    /// True while the node carries animations (moving platforms)
    fn is_animated(&self, id: EntityId) -> bool;

    fn material(&self, id: EntityId) -> Option<Material>;
    fn set_material(&mut self, id: EntityId, material: Material);
    fn visibility(&self, id: EntityId) -> f32;
    fn set_visibility(&mut self, id: EntityId, visibility: f32);

    fn intersects(&self, a: EntityId, b: EntityId) -> bool;
    /// Closest node on the ray accepted by `filter`
    fn pick(&self, ray: &Ray, filter: &dyn Fn(EntityId) -> bool) -> Option<PickHit>;
    /// Picking ray through a canvas pixel
    fn screen_ray(&self, x: f32, y: f32) -> Ray;

    /// Push the camera's yaw (alpha) and pitch (beta)
    fn orient_camera(&mut self, yaw: f32, pitch: f32);
    fn camera_forward(&self) -> Vec3;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    SineInOut,
}

/// Animated property with its first and last keyframe. Positions are in
/// world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Track {
    Position { from: Vec3, to: Vec3 },
    Visibility { from: f32, to: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub name: &'static str,
    pub track: Track,
    pub frame_rate: u32,
    pub frames: u32,
    pub easing: Easing,
}

impl Clip {
    /// Wall length of the clip when played at `speed`
    pub fn duration(&self, speed: f32) -> Duration {
        let secs = self.frames as f32 / self.frame_rate.max(1) as f32 / speed.max(f32::EPSILON);
        Duration::from_secs_f32(secs)
    }
}

pub trait Animator {
    /// Start a clip; the completion fires when it has played out
    fn animate(&mut self, target: EntityId, clip: Clip, speed: f32) -> Completion;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    GardenIntro,
    CardGrab,
    CardDrop,
    CardAttached,
    TouchObject,
    MatchEnd,
    GateOpen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub volume: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

pub trait SoundBank {
    /// Start a sound; the completion is its "ended" signal
    fn play(&mut self, sound: Sound, options: PlayOptions) -> Completion;
    fn stop(&mut self, sound: Sound);
}

/// Everything the gameplay core needs from the host in one bound
pub trait HostWorld: PhysicsWorld + SceneGraph + Animator + SoundBank {}

impl<T> HostWorld for T where T: PhysicsWorld + SceneGraph + Animator + SoundBank {}
