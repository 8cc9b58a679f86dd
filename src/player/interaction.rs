//! Tap and click interaction: touch, grab and drop

use std::time::Duration;

use glam::Vec2;
use tracing::{debug, trace};

use crate::events::GameEvent;
use crate::world::{EntityId, EntityRegistry, SceneGraph};

use super::controller::PlayerController;
use super::InputError;

/// Canvas placement on the page, in client pixels, plus its backing size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl Viewport {
    /// A canvas filling the page one to one
    pub fn full(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
            canvas_width: width,
            canvas_height: height,
        }
    }

    fn check(&self) -> Result<(), InputError> {
        if self.width > 0.0 && self.height > 0.0 {
            Ok(())
        } else {
            Err(InputError::DegenerateViewport {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Client coordinates to canvas pixels
    pub fn to_canvas(&self, client: Vec2) -> Vec2 {
        Vec2::new(
            (client.x - self.left) * (self.canvas_width / self.width),
            (client.y - self.top) * (self.canvas_height / self.height),
        )
    }

    pub fn centre(&self) -> Vec2 {
        Vec2::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }
}

/// A primary tap or click
#[derive(Debug, Clone, PartialEq)]
pub enum TapEvent {
    Touch {
        /// Active touch points in client pixels; the first one counts
        touches: Vec<Vec2>,
        viewport: Viewport,
    },
    Pointer {
        client: Vec2,
        /// Under pointer lock the cursor is pinned to the canvas centre
        pointer_locked: bool,
        viewport: Viewport,
    },
}

impl TapEvent {
    fn canvas_point(&self) -> Result<Vec2, InputError> {
        match self {
            TapEvent::Touch { touches, viewport } => {
                viewport.check()?;
                let first = touches.first().ok_or(InputError::EmptyTouch)?;
                Ok(viewport.to_canvas(*first))
            }
            TapEvent::Pointer {
                client,
                pointer_locked,
                viewport,
            } => {
                viewport.check()?;
                if *pointer_locked {
                    Ok(viewport.centre())
                } else {
                    Ok(viewport.to_canvas(*client))
                }
            }
        }
    }
}

impl PlayerController {
    /// Interact with whatever both the tap ray and the aim ray land on.
    /// Anything short of full agreement is a silent no-op.
    pub fn on_touch_or_click_event<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        event: &TapEvent,
        now: Duration,
    ) -> Result<(), InputError>
    where
        W: SceneGraph + ?Sized,
    {
        let point = event.canvas_point()?;
        let tap_ray = world.screen_ray(point.x, point.y);

        let interactive = |id: EntityId| registry.capability(id).is_interactive();
        let tap = world.pick(&tap_ray, &interactive);
        let aim = world.pick(&self.aim_ray(), &interactive);

        let Some(aim) = aim else {
            trace!("tap: aim ray hit nothing");
            return Ok(());
        };
        let Some(tap) = tap else {
            trace!("tap: tap ray hit nothing");
            return Ok(());
        };
        if tap.entity != aim.entity {
            trace!(tap = %tap.entity, aim = %aim.entity, "tap: rays disagree");
            return Ok(());
        }
        if aim.distance > self.settings().pick_distance {
            trace!(distance = aim.distance, "tap: out of reach");
            return Ok(());
        }

        let target = aim.entity;
        let capability = registry.capability(target);

        if capability.is_touchable() && registry.touch(target) {
            debug!(entity = %target, "touched");
            self.publisher()
                .publish(GameEvent::PlayerTouchedTouchableObject { entity: target });
        }

        if capability.is_grabbable() {
            if self.grabbed_object().is_none() {
                self.grab_object(world, target, now);
            } else {
                self.drop_object(world);
            }
        }

        Ok(())
    }
}
