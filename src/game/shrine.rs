//! Shrine side challenge: give a card, get two back

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use tracing::info;

use crate::player::PlayerController;
use crate::task::Completion;
use crate::world::{
    Clip, Easing, EntityId, EntityRegistry, HostWorld, Material, SceneGraph, SceneLayout, Track,
};

use super::engine::MatchEngine;
use super::GameError;

/// Reward cards appear this far either side of the shrine, along z
const REWARD_SPREAD: f32 = 2.0;

pub struct ShrineChallenge {
    shrine: EntityId,
    hint: Option<EntityId>,
    hint_requested: Rc<Cell<bool>>,
    /// Reward cards still fading in
    fading: Vec<(EntityId, Completion)>,
    completed: bool,
}

impl ShrineChallenge {
    /// Make the shrine touchable. `None` when the scene has no shrine.
    pub fn setup<W>(world: &mut W, registry: &mut EntityRegistry, layout: &SceneLayout) -> Option<Self>
    where
        W: SceneGraph + ?Sized,
    {
        let shrine = layout.shrine?;
        if let Some(hint) = layout.shrine_hint {
            world.set_visibility(hint, 0.0);
        }

        let hint_requested = Rc::new(Cell::new(false));
        let flag = hint_requested.clone();
        registry.register_touchable(shrine, move |_| flag.set(true));

        Some(Self {
            shrine,
            hint: layout.shrine_hint,
            hint_requested,
            fading: Vec::new(),
            completed: false,
        })
    }

    pub fn shrine(&self) -> EntityId {
        self.shrine
    }

    /// True once a card rests on the shrine
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn update<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        engine: &mut MatchEngine,
        player: &mut PlayerController,
    ) -> Result<(), GameError>
    where
        W: HostWorld + ?Sized,
    {
        if self.hint_requested.replace(false) {
            if let Some(hint) = self.hint {
                world.set_visibility(hint, 1.0);
            }
        }

        self.fading.retain_mut(|(card, faded)| {
            if faded.is_done() {
                registry.set_grabbable(*card, true);
                false
            } else {
                true
            }
        });

        if self.completed {
            return Ok(());
        }
        let Some(held) = player.grabbed_object() else {
            return Ok(());
        };
        if engine.card(held).is_none() || !world.intersects(held, self.shrine) {
            return Ok(());
        }
        self.accept_offering(world, registry, engine, player, held)
    }

    fn accept_offering<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        engine: &mut MatchEngine,
        player: &mut PlayerController,
        offering: EntityId,
    ) -> Result<(), GameError>
    where
        W: HostWorld + ?Sized,
    {
        if let Some(hint) = self.hint.take() {
            registry.forget(hint);
            world.dispose(hint);
        }

        player.drop_object(world);
        world.set_material(offering, Material::CardOpaque);
        engine.attach_card_to_mesh(world, registry, offering, self.shrine);
        self.completed = true;

        let base = world.world_position(self.shrine);
        let rewards = engine.draw_regular(2);
        for (card, dz) in rewards.into_iter().zip([-REWARD_SPREAD, REWARD_SPREAD]) {
            let entity =
                engine.spawn_card(world, registry, card, base + Vec3::new(0.0, 0.0, dz), false)?;
            world.set_visibility(entity, 0.0);
            let clip = Clip {
                name: "card_fade_in",
                track: Track::Visibility { from: 0.0, to: 1.0 },
                frame_rate: 20,
                frames: 20,
                easing: Easing::Linear,
            };
            let faded = world.animate(entity, clip, 1.0);
            self.fading.push((entity, faded));
        }

        info!(offering = %offering, "Shrine challenge completed");
        Ok(())
    }
}
