//! Authoritative per-tick player update

use std::time::Duration;

use glam::Vec3;
use tracing::{debug, trace};

use crate::events::{EventPublisher, GameEvent};
use crate::world::{
    BodyHandle, BodySpec, EntityId, EntityRegistry, PhysicsWorld, Ray, RayHit, SceneGraph,
};

use super::input::InputCommand;
use super::physics::{MovementStats, MovementSystem};
use super::PlayerSettings;

/// Affordance shown at the screen centre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Pointer,
    /// The aim ray rests on something the player can use
    Hand,
}

/// The object currently held
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grab {
    pub entity: EntityId,
    pub grabbed_at: Duration,
}

/// Bookkeeping for the body the ground probe stands on
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundContact {
    pub collided_with: Option<EntityId>,
    pub collided_at: Option<Duration>,
}

impl GroundContact {
    fn clear(&mut self) {
        self.collided_with = None;
        self.collided_at = None;
    }
}

pub struct PlayerController {
    node: EntityId,
    body: Option<BodyHandle>,
    settings: PlayerSettings,
    stats: MovementStats,
    pub command: InputCommand,
    grab: Option<Grab>,
    ground: Option<RayHit>,
    contact: GroundContact,
    airborne: bool,
    aim_ray: Ray,
    cursor: Cursor,
    last_update: Duration,
    publisher: EventPublisher,
}

impl PlayerController {
    pub fn new(node: EntityId, settings: PlayerSettings, publisher: EventPublisher) -> Self {
        let aim_ray = Ray::new(Vec3::ZERO, Vec3::NEG_X, settings.pick_distance);
        Self {
            node,
            body: None,
            stats: MovementStats::for_platform(settings.platform),
            command: InputCommand::new(settings.sprint_default),
            settings,
            grab: None,
            ground: None,
            contact: GroundContact::default(),
            airborne: true,
            aim_ray,
            cursor: Cursor::Pointer,
            last_update: Duration::ZERO,
            publisher,
        }
    }

    pub fn node(&self) -> EntityId {
        self.node
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn position<W>(&self, world: &W) -> Vec3
    where
        W: SceneGraph + ?Sized,
    {
        world.world_position(self.node)
    }

    /// Teleport, rebuilding the physics body so no velocity carries over
    pub fn set_position<W>(&mut self, world: &mut W, position: Vec3)
    where
        W: PhysicsWorld + SceneGraph + ?Sized,
    {
        if let Some(body) = self.body.take() {
            world.dispose_body(body);
        }
        world.set_parent(self.node, None);
        world.set_world_position(self.node, position);

        let spec = BodySpec {
            radius: self.settings.radius,
            height: self.settings.height,
            mass: self.settings.mass,
            friction: 1.0,
            restitution: 0.0,
            inertia: Vec3::ZERO,
        };
        self.body = Some(world.create_capsule_body(self.node, &spec));
        self.ground = None;
        self.contact.clear();
        debug!(x = position.x, y = position.y, z = position.z, "player placed");
    }

    pub fn grabbed_object(&self) -> Option<EntityId> {
        self.grab.map(|g| g.entity)
    }

    pub fn grab(&self) -> Option<Grab> {
        self.grab
    }

    /// Override the held object without any side effect
    pub fn set_grabbed_object(&mut self, object: Option<EntityId>) {
        self.grab = object.map(|entity| Grab {
            entity,
            grabbed_at: self.last_update,
        });
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn aim_ray(&self) -> Ray {
        self.aim_ray
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_some()
    }

    pub fn is_airborne(&self) -> bool {
        self.airborne
    }

    pub fn ground_contact(&self) -> GroundContact {
        self.contact
    }

    /// Mirror the camera angles into the command
    pub fn sync_camera(&mut self, yaw: f32, pitch: f32) {
        self.command.sync_camera(yaw, pitch);
    }

    /// One authoritative tick. The step order is fixed; each step reads the
    /// previous one's result.
    pub fn update<W>(&mut self, world: &mut W, registry: &EntityRegistry, now: Duration)
    where
        W: PhysicsWorld + SceneGraph + ?Sized,
    {
        self.last_update = now;
        let Some(body) = self.body else {
            return;
        };

        self.probe_ground(world, now);
        self.update_aim_ray(world);
        self.update_cursor(world, registry);
        self.apply_movement(world, body);
    }

    fn probe_ground<W>(&mut self, world: &W, now: Duration)
    where
        W: PhysicsWorld + SceneGraph + ?Sized,
    {
        let start = world.world_position(self.node);
        let end = start - Vec3::Y * self.settings.ground_probe_length;
        self.ground = world.raycast(start, end);

        match self.ground {
            Some(hit) => {
                self.airborne = false;
                if self.contact.collided_with.is_none() {
                    self.contact.collided_with = Some(hit.entity);
                    self.contact.collided_at = Some(now);
                    trace!(entity = %hit.entity, "landed");
                    self.publisher
                        .publish(GameEvent::PlayerPickedObject { entity: hit.entity });
                }
            }
            None => {
                self.airborne = true;
                self.contact.clear();
            }
        }
    }

    fn update_aim_ray<W>(&mut self, world: &mut W)
    where
        W: SceneGraph + ?Sized,
    {
        world.orient_camera(self.command.camera_yaw, self.command.camera_pitch);
        let head = world.world_position(self.node) + Vec3::Y * self.settings.head_offset();
        self.aim_ray = Ray::new(head, world.camera_forward(), self.settings.pick_distance);
    }

    fn update_cursor<W>(&mut self, world: &W, registry: &EntityRegistry)
    where
        W: SceneGraph + ?Sized,
    {
        let hit = world.pick(&self.aim_ray, &|id| registry.capability(id).is_interactive());
        self.cursor = if hit.is_some() {
            Cursor::Hand
        } else {
            Cursor::Pointer
        };
    }

    fn apply_movement<W>(&mut self, world: &mut W, body: BodyHandle)
    where
        W: PhysicsWorld + SceneGraph + ?Sized,
    {
        let cmd = self.command;
        world.set_yaw(self.node, MovementSystem::heading(cmd.camera_yaw));

        let old = world.linear_velocity(body);
        let mut velocity = MovementSystem::velocity(&cmd, old, &self.stats);

        let grounded = self.ground.is_some();
        if MovementSystem::can_jump(cmd.jump, grounded, old, self.airborne, &self.stats) {
            velocity.y = self.stats.jump_impulse;
            self.airborne = true;
            self.contact.clear();
            trace!("jump");
        }
        world.set_linear_velocity(body, velocity);

        let vy = world.linear_velocity(body).y;
        if MovementSystem::needs_ground_stick(cmd.jump, self.airborne, grounded, vy, &self.stats) {
            velocity.y = self.stats.ground_stick_velocity;
            world.set_linear_velocity(body, velocity);
        }

        let platform = self
            .ground
            .map(|hit| hit.entity)
            .filter(|&entity| world.is_animated(entity));
        if world.parent(self.node) != platform {
            world.set_parent(self.node, platform);
        }
    }

    /// Hold an object in front of the camera at chest height
    pub fn grab_object<W>(&mut self, world: &mut W, object: EntityId, now: Duration)
    where
        W: SceneGraph + ?Sized,
    {
        self.grab = Some(Grab {
            entity: object,
            grabbed_at: now,
        });

        let forward = world.camera_forward().normalize_or_zero();
        let player = world.world_position(self.node);
        let mut target = player + forward * self.settings.grab_distance;
        target.y = player.y + self.settings.height / 2.0;

        world.set_world_position(object, target);
        world.set_parent(object, Some(self.node));

        debug!(entity = %object, "object grabbed");
        self.publisher
            .publish(GameEvent::PlayerObjectGrabbed { entity: object });
    }

    /// Let go of the held object where it is
    pub fn drop_object<W>(&mut self, world: &mut W)
    where
        W: SceneGraph + ?Sized,
    {
        let Some(grab) = self.grab.take() else {
            return;
        };

        self.publisher
            .publish(GameEvent::PlayerObjectDropping { entity: grab.entity });
        world.set_visibility(grab.entity, 1.0);
        world.set_parent(grab.entity, None);
        debug!(entity = %grab.entity, "object dropped");
    }

    pub(crate) fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }
}
