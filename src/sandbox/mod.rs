//! Headless host world
//!
//! A small in-memory scene good enough to drive the gameplay core without a
//! renderer: translation-only transforms, axis-aligned boxes, a gravity-only
//! capsule integrator that lands on box tops, and clock-driven animations
//! and sounds.

pub mod garden;
pub mod script;

pub use garden::GardenSpec;
pub use script::DemoScript;

use std::collections::{BTreeMap, HashMap};
use std::f32::consts::PI;

use glam::Vec3;
use tracing::{debug, trace};

use crate::task::{completion, Completer, Completion};
use crate::world::{
    Animator, BodyHandle, BodySpec, Clip, Easing, EntityId, Material, PhysicsWorld, PickHit,
    PlayOptions, Ray, RayHit, SceneGraph, Sound, SoundBank, Track,
};

const GRAVITY: f32 = 9.81;
/// How far below a box top the feet may sink in one step and still land
const LANDING_TOLERANCE: f32 = 0.05;
const SCREEN_RAY_LENGTH: f32 = 1000.0;
const FIELD_OF_VIEW: f32 = 0.9;

/// Length of each sound in seconds
pub fn sound_length(sound: Sound) -> f32 {
    match sound {
        Sound::GardenIntro => 4.0,
        Sound::CardGrab | Sound::CardDrop => 0.3,
        Sound::CardAttached => 0.5,
        Sound::TouchObject => 0.4,
        Sound::MatchEnd => 2.5,
        Sound::GateOpen => 1.5,
    }
}

/// How a node is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSpec {
    pub position: Vec3,
    /// Zero extents make a pure transform node with no box
    pub half_extents: Vec3,
    /// Bodies land on solid boxes and raycasts hit them
    pub solid: bool,
    pub pickable: bool,
    /// Static animation flag, e.g. a platform driven by an external loop
    pub animated: bool,
    pub visibility: f32,
}

impl NodeSpec {
    pub fn marker(position: Vec3) -> Self {
        Self {
            position,
            half_extents: Vec3::ZERO,
            solid: false,
            pickable: false,
            animated: false,
            visibility: 0.0,
        }
    }

    pub fn solid(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            position,
            half_extents,
            solid: true,
            pickable: true,
            animated: false,
            visibility: 1.0,
        }
    }

    /// Visible, pickable, but bodies pass through it
    pub fn prop(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            solid: false,
            ..Self::solid(position, half_extents)
        }
    }

    /// Invisible volume used only for overlap checks
    pub fn zone(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            solid: false,
            pickable: false,
            visibility: 0.0,
            ..Self::solid(position, half_extents)
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = 0.0;
        self
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }

    pub fn unpickable(mut self) -> Self {
        self.pickable = false;
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<EntityId>,
    local: Vec3,
    yaw: f32,
    half_extents: Vec3,
    solid: bool,
    pickable: bool,
    animated: bool,
    material: Option<Material>,
    visibility: f32,
}

impl Node {
    fn has_box(&self) -> bool {
        self.half_extents != Vec3::ZERO
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    node: EntityId,
    half_height: f32,
    radius: f32,
    velocity: Vec3,
}

#[derive(Debug)]
struct RunningClip {
    target: EntityId,
    clip: Clip,
    speed: f32,
    elapsed: f32,
    done: Option<Completer>,
}

impl RunningClip {
    fn length(&self) -> f32 {
        self.clip.duration(self.speed).as_secs_f32()
    }
}

#[derive(Debug)]
struct PlayingSound {
    sound: Sound,
    remaining: f32,
    ended: Option<Completer>,
}

/// Orbit camera anchored on a node
#[derive(Debug, Clone, Copy)]
struct Camera {
    yaw: f32,
    pitch: f32,
    follow: Option<(EntityId, Vec3)>,
    width: f32,
    height: f32,
}

/// In-memory [`crate::world::HostWorld`]
#[derive(Debug)]
pub struct Sandbox {
    nodes: BTreeMap<EntityId, Node>,
    next_node: u64,
    bodies: HashMap<BodyHandle, Body>,
    next_body: u64,
    clips: Vec<RunningClip>,
    sounds: Vec<PlayingSound>,
    camera: Camera,
    played: Vec<(Sound, f32)>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_node: 1,
            bodies: HashMap::new(),
            next_body: 1,
            clips: Vec::new(),
            sounds: Vec::new(),
            camera: Camera {
                yaw: 0.0,
                pitch: PI / 2.0,
                follow: None,
                width: 1280.0,
                height: 720.0,
            },
            played: Vec::new(),
        }
    }

    /// Add a root node
    pub fn spawn(&mut self, name: &str, spec: NodeSpec) -> EntityId {
        let id = EntityId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                parent: None,
                local: spec.position,
                yaw: 0.0,
                half_extents: spec.half_extents,
                solid: spec.solid,
                pickable: spec.pickable,
                animated: spec.animated,
                material: None,
                visibility: spec.visibility,
            },
        );
        trace!(node = name, id = %id, "node spawned");
        id
    }

    /// Keep the camera on `node`, offset in world space
    pub fn follow_with_camera(&mut self, node: EntityId, offset: Vec3) {
        self.camera.follow = Some((node, offset));
    }

    pub fn viewport_size(&self) -> (f32, f32) {
        (self.camera.width, self.camera.height)
    }

    fn camera_position(&self) -> Vec3 {
        match self.camera.follow {
            Some((node, offset)) => self.world_position(node) + offset,
            None => Vec3::ZERO,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn yaw(&self, id: EntityId) -> Option<f32> {
        self.nodes.get(&id).map(|n| n.yaw)
    }

    /// Every sound started so far with its volume
    pub fn played_sounds(&self) -> &[(Sound, f32)] {
        &self.played
    }

    pub fn play_count(&self, sound: Sound) -> usize {
        self.played.iter().filter(|(s, _)| *s == sound).count()
    }

    fn aabb(&self, id: EntityId) -> Option<(Vec3, Vec3)> {
        let node = self.nodes.get(&id)?;
        if !node.has_box() {
            return None;
        }
        let centre = self.world_position(id);
        Some((centre - node.half_extents, centre + node.half_extents))
    }

    fn is_ancestor(&self, ancestor: EntityId, mut id: EntityId) -> bool {
        while let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Highest solid top the body's feet cross this step
    fn landing_height(&self, body: &Body, from: Vec3, to: Vec3) -> Option<f32> {
        let feet_before = from.y - body.half_height;
        let feet_after = to.y - body.half_height;
        self.nodes
            .iter()
            .filter(|(id, node)| {
                node.solid && node.has_box() && **id != body.node && !self.is_ancestor(body.node, **id)
            })
            .filter_map(|(&id, _)| self.aabb(id))
            .filter(|(min, max)| {
                to.x + body.radius > min.x
                    && to.x - body.radius < max.x
                    && to.z + body.radius > min.z
                    && to.z - body.radius < max.z
            })
            .map(|(_, max)| max.y)
            .filter(|&top| top <= feet_before + LANDING_TOLERANCE && top >= feet_after)
            .reduce(f32::max)
    }

    fn advance_bodies(&mut self, dt: f32) {
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        for handle in handles {
            let Some(mut body) = self.bodies.get(&handle).copied() else {
                continue;
            };
            if !self.nodes.contains_key(&body.node) {
                continue;
            }
            body.velocity.y -= GRAVITY * dt;
            let from = self.world_position(body.node);
            let mut to = from + body.velocity * dt;
            if body.velocity.y <= 0.0 {
                if let Some(top) = self.landing_height(&body, from, to) {
                    to.y = top + body.half_height;
                    body.velocity.y = 0.0;
                }
            }
            self.set_world_position(body.node, to);
            self.bodies.insert(handle, body);
        }
    }

    fn apply_track(&mut self, target: EntityId, track: Track, t: f32) {
        match track {
            Track::Position { from, to } => self.set_world_position(target, from.lerp(to, t)),
            Track::Visibility { from, to } => self.set_visibility(target, from + (to - from) * t),
        }
    }

    fn advance_clips(&mut self, dt: f32) {
        let mut clips = std::mem::take(&mut self.clips);
        clips.retain_mut(|running| {
            if !self.nodes.contains_key(&running.target) {
                if let Some(done) = running.done.take() {
                    done.complete();
                }
                return false;
            }
            running.elapsed += dt;
            let length = running.length();
            let t = if length > 0.0 {
                (running.elapsed / length).min(1.0)
            } else {
                1.0
            };
            self.apply_track(running.target, running.clip.track, ease(running.clip.easing, t));
            if t >= 1.0 {
                trace!(clip = running.clip.name, target = %running.target, "clip finished");
                if let Some(done) = running.done.take() {
                    done.complete();
                }
                false
            } else {
                true
            }
        });
        self.clips = clips;
    }

    fn advance_sounds(&mut self, dt: f32) {
        self.sounds.retain_mut(|playing| {
            playing.remaining -= dt;
            if playing.remaining > 0.0 {
                return true;
            }
            if let Some(ended) = playing.ended.take() {
                ended.complete();
            }
            false
        });
    }
}

fn ease(easing: Easing, t: f32) -> f32 {
    match easing {
        Easing::Linear => t,
        Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
    }
}

/// Entry distance of a ray into a box; `None` on a miss or when the origin
/// is already inside
fn ray_box(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - o) / d, (hi - o) / d);
        t_min = t_min.max(a.min(b));
        t_max = t_max.min(a.max(b));
    }
    (t_max >= t_min && t_min >= 0.0).then_some(t_min)
}

/// Camera yaw and pitch that look from `from` at `to`
pub fn facing_angles(from: Vec3, to: Vec3) -> (f32, f32) {
    let d = (to - from).normalize_or_zero();
    let pitch = (-d.y).clamp(-1.0, 1.0).acos();
    let yaw = (-d.z).atan2(-d.x);
    (yaw, pitch)
}

impl PhysicsWorld for Sandbox {
    fn step(&mut self, dt: f32) {
        self.advance_bodies(dt);
        self.advance_clips(dt);
        self.advance_sounds(dt);
    }

    fn create_capsule_body(&mut self, node: EntityId, spec: &BodySpec) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            Body {
                node,
                half_height: spec.height / 2.0,
                radius: spec.radius,
                velocity: Vec3::ZERO,
            },
        );
        debug!(node = %node, body = handle.0, "capsule body created");
        handle
    }

    fn dispose_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.bodies
            .get(&body)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.velocity = velocity;
        }
    }

    fn raycast(&self, from: Vec3, to: Vec3) -> Option<RayHit> {
        let segment = to - from;
        let length = segment.length();
        let direction = segment.normalize_or_zero();
        if length <= 0.0 {
            return None;
        }
        self.nodes
            .iter()
            .filter(|(_, node)| node.solid)
            .filter_map(|(&id, _)| {
                let (min, max) = self.aabb(id)?;
                let t = ray_box(from, direction, min, max)?;
                (t <= length).then_some((id, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, distance)| RayHit {
                entity,
                distance,
                position: from + direction * distance,
            })
    }
}

impl SceneGraph for Sandbox {
    fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(&id, _)| id)
    }

    fn find_by_prefix(&self, prefix: &str) -> Vec<EntityId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.name.starts_with(prefix))
            .map(|(&id, _)| id)
            .collect()
    }

    fn name_of(&self, id: EntityId) -> Option<String> {
        self.nodes.get(&id).map(|n| n.name.clone())
    }

    fn clone_node(&mut self, source: EntityId, name: &str) -> Option<EntityId> {
        if self.find_by_name(name).is_some() {
            return None;
        }
        let mut node = self.nodes.get(&source)?.clone();
        node.name = name.to_string();
        let id = EntityId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, node);
        Some(id)
    }

    fn dispose(&mut self, id: EntityId) {
        let children: Vec<EntityId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent == Some(id))
            .map(|(&child, _)| child)
            .collect();
        for child in children {
            self.dispose(child);
        }
        self.bodies.retain(|_, body| body.node != id);
        self.nodes.remove(&id);
    }

    fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    fn set_parent(&mut self, id: EntityId, parent: Option<EntityId>) {
        if let Some(p) = parent {
            if p == id || self.is_ancestor(id, p) || !self.nodes.contains_key(&p) {
                return;
            }
        }
        let world = self.world_position(id);
        let origin = parent.map(|p| self.world_position(p)).unwrap_or(Vec3::ZERO);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
            node.local = world - origin;
        }
    }

    fn world_position(&self, id: EntityId) -> Vec3 {
        match self.nodes.get(&id) {
            Some(node) => match node.parent {
                Some(parent) => self.world_position(parent) + node.local,
                None => node.local,
            },
            None => Vec3::ZERO,
        }
    }

    fn set_world_position(&mut self, id: EntityId, position: Vec3) {
        let origin = self
            .parent(id)
            .map(|p| self.world_position(p))
            .unwrap_or(Vec3::ZERO);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local = position - origin;
        }
    }

    fn set_local_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local = position;
        }
    }

    fn set_yaw(&mut self, id: EntityId, yaw: f32) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.yaw = yaw;
        }
    }

    fn bounding_top(&self, id: EntityId) -> f32 {
        self.nodes.get(&id).map(|n| n.half_extents.y).unwrap_or(0.0)
    }

    fn is_animated(&self, id: EntityId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.animated) || self.clips.iter().any(|c| c.target == id)
    }

    fn material(&self, id: EntityId) -> Option<Material> {
        self.nodes.get(&id).and_then(|n| n.material)
    }

    fn set_material(&mut self, id: EntityId, material: Material) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.material = Some(material);
        }
    }

    fn visibility(&self, id: EntityId) -> f32 {
        self.nodes.get(&id).map(|n| n.visibility).unwrap_or(0.0)
    }

    fn set_visibility(&mut self, id: EntityId, visibility: f32) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visibility = visibility.clamp(0.0, 1.0);
        }
    }

    fn intersects(&self, a: EntityId, b: EntityId) -> bool {
        let (Some((a_min, a_max)), Some((b_min, b_max))) = (self.aabb(a), self.aabb(b)) else {
            return false;
        };
        a_min.cmple(b_max).all() && b_min.cmple(a_max).all()
    }

    fn pick(&self, ray: &Ray, filter: &dyn Fn(EntityId) -> bool) -> Option<PickHit> {
        self.nodes
            .iter()
            .filter(|&(&id, node)| node.pickable && node.visibility > 0.0 && filter(id))
            .filter_map(|(&id, _)| {
                let (min, max) = self.aabb(id)?;
                let t = ray_box(ray.origin, ray.direction, min, max)?;
                (t <= ray.length).then_some(PickHit {
                    entity: id,
                    distance: t,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn screen_ray(&self, x: f32, y: f32) -> Ray {
        let forward = self.camera_forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();

        let aspect = self.camera.width / self.camera.height;
        let half_height = (FIELD_OF_VIEW / 2.0).tan();
        let ndc_x = (x / self.camera.width) * 2.0 - 1.0;
        let ndc_y = 1.0 - (y / self.camera.height) * 2.0;

        let direction =
            forward + right * (ndc_x * half_height * aspect) + up * (ndc_y * half_height);
        Ray::new(self.camera_position(), direction, SCREEN_RAY_LENGTH)
    }

    fn orient_camera(&mut self, yaw: f32, pitch: f32) {
        self.camera.yaw = yaw;
        self.camera.pitch = pitch.clamp(0.01, PI - 0.01);
    }

    fn camera_forward(&self) -> Vec3 {
        let (alpha, beta) = (self.camera.yaw, self.camera.pitch);
        -Vec3::new(alpha.cos() * beta.sin(), beta.cos(), alpha.sin() * beta.sin())
    }
}

impl Animator for Sandbox {
    fn animate(&mut self, target: EntityId, clip: Clip, speed: f32) -> Completion {
        let (done, waiter) = completion();
        trace!(clip = clip.name, target = %target, speed, "clip started");
        self.clips.push(RunningClip {
            target,
            clip,
            speed,
            elapsed: 0.0,
            done: Some(done),
        });
        waiter
    }
}

impl SoundBank for Sandbox {
    fn play(&mut self, sound: Sound, options: PlayOptions) -> Completion {
        let (ended, waiter) = completion();
        trace!(?sound, volume = options.volume, "sound started");
        self.played.push((sound, options.volume));
        self.sounds.push(PlayingSound {
            sound,
            remaining: sound_length(sound),
            ended: Some(ended),
        });
        waiter
    }

    fn stop(&mut self, sound: Sound) {
        self.sounds.retain_mut(|playing| {
            if playing.sound != sound {
                return true;
            }
            if let Some(ended) = playing.ended.take() {
                ended.complete();
            }
            false
        });
    }
}
