//! Garden scene glue
//!
//! Owns the host world, the player, the match and the shrine, runs them in
//! a fixed order each tick and plays the audio/material reactions to the
//! events they publish.

pub mod runner;

pub use runner::{Driver, RunnerSettings, SceneRunner};

use std::time::Duration;

use glam::{Vec2, Vec3};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::config::{Config, Platform};
use crate::events::{EventBus, GameEvent};
use crate::game::{GameError, MatchEngine, MatchPhase, MatchSettings, MatchSummary, ShrineChallenge};
use crate::player::{ControlSignal, InputError, KeyCode, PlayerController, PlayerSettings, TapEvent};
use crate::util::frame::FrameStabilizer;
use crate::util::time::SimClock;
use crate::world::{
    Clip, Easing, EntityRegistry, HostWorld, LayoutNames, Material, PlayOptions, SceneLayout,
    Sound, Track,
};

const TOUCH_VOLUME: f32 = 0.75;
/// How far the gate slides up when the match is won
const GATE_LIFT: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct SceneSettings {
    pub names: LayoutNames,
    pub player: PlayerSettings,
    pub matching: MatchSettings,
    /// Falling below this height respawns the player
    pub respawn_floor: f32,
    /// Give up when frame times have not settled by then
    pub stabilise_timeout: Duration,
}

impl SceneSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            names: LayoutNames::default(),
            player: PlayerSettings::from_config(config),
            matching: MatchSettings::from_config(config),
            respawn_floor: -10.0,
            stabilise_timeout: Duration::from_secs(5),
        }
    }
}

pub struct GardenScene<W: HostWorld> {
    world: W,
    registry: EntityRegistry,
    layout: SceneLayout,
    settings: SceneSettings,
    player: PlayerController,
    engine: MatchEngine,
    shrine: Option<ShrineChallenge>,
    clock: SimClock,
    stabilizer: FrameStabilizer,
    stable: bool,
    gate_opened: bool,
    bus: EventBus,
    events: broadcast::Receiver<GameEvent>,
}

impl<W: HostWorld> GardenScene<W> {
    /// Resolve the layout, place the player, deal the cards
    pub fn new(mut world: W, settings: SceneSettings) -> Result<Self, GameError> {
        let layout = SceneLayout::resolve(&world, &settings.names, settings.matching.max_turns);
        let player_node = layout
            .player_body
            .ok_or(GameError::MissingEntity("player body"))?;

        let bus = EventBus::default();
        let events = bus.subscribe();
        let mut registry = EntityRegistry::new();

        let mut player = PlayerController::new(player_node, settings.player.clone(), bus.publisher());
        player.set_position(&mut world, layout.player_spawn);

        let engine = MatchEngine::setup(
            &mut world,
            &mut registry,
            &layout,
            &settings.matching,
            bus.publisher(),
        )?;
        let shrine = ShrineChallenge::setup(&mut world, &mut registry, &layout);

        info!(
            match_id = %engine.id(),
            platform = ?settings.player.platform,
            shrine = shrine.is_some(),
            "Garden scene ready"
        );

        Ok(Self {
            world,
            registry,
            layout,
            settings,
            player,
            engine,
            shrine,
            clock: SimClock::new(),
            stabilizer: FrameStabilizer::default(),
            stable: false,
            gate_opened: false,
            bus,
            events,
        })
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerController {
        &mut self.player
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn shrine(&self) -> Option<&ShrineChallenge> {
        self.shrine.as_ref()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Player control is live
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn is_gate_open(&self) -> bool {
        self.gate_opened
    }

    /// Teleport the player; whatever it holds comes along
    pub fn place_player(&mut self, position: Vec3) {
        self.player.set_position(&mut self.world, position);
    }

    /// Extra listener on the scene's event bus
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.bus.subscribe()
    }

    /// One simulation tick of `dt` seconds. Returns the events published
    /// during it.
    pub fn tick(&mut self, dt: f32) -> Result<Vec<GameEvent>, GameError> {
        self.world.step(dt);
        self.clock.advance(dt);
        let now = self.clock.now();

        if !self.stable {
            self.stabilizer.add_sample(dt);
            if self.stabilizer.is_stable() {
                self.stable = true;
                info!(
                    average_dt = self.stabilizer.average(),
                    "Frame times stable, player control enabled"
                );
            } else if now >= self.settings.stabilise_timeout {
                warn!(average_dt = self.stabilizer.average(), "Frame times never settled");
                return Err(GameError::FrameRateUnstable);
            } else {
                return Ok(self.dispatch_events());
            }
        }

        self.respawn_if_fallen();
        self.player.update(&mut self.world, &self.registry, now);
        self.check_trigger_zone(now)?;
        self.engine
            .check_player_attach(&mut self.world, &mut self.registry, &mut self.player)?;
        if let Some(shrine) = self.shrine.as_mut() {
            shrine.update(
                &mut self.world,
                &mut self.registry,
                &mut self.engine,
                &mut self.player,
            )?;
        }
        self.engine.poll(&mut self.world, &mut self.registry, now)?;

        Ok(self.dispatch_events())
    }

    fn respawn_if_fallen(&mut self) {
        let position = self.player.position(&self.world);
        if position.y < self.settings.respawn_floor {
            info!(y = position.y, "Player fell out of the world, respawning");
            self.player.set_position(&mut self.world, self.layout.player_spawn);
        }
    }

    fn check_trigger_zone(&mut self, now: Duration) -> Result<(), GameError> {
        let Some(zone) = self.layout.trigger_zone else {
            return Ok(());
        };
        if self.engine.phase() != MatchPhase::Idle || self.engine.turn() != 0 {
            return Ok(());
        }
        if self.world.intersects(self.player.node(), zone) {
            debug!("Player entered the trigger zone");
            self.engine.start_game(&mut self.world, &mut self.registry, now)?;
        }
        Ok(())
    }

    fn dispatch_events(&mut self) -> Vec<GameEvent> {
        let mut seen = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.react(&event);
                    seen.push(event);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Scene listener fell behind the event bus");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        seen
    }

    fn react(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::PlayerObjectGrabbed { entity } => {
                self.world.play(Sound::CardGrab, PlayOptions::default());
                self.world.set_material(entity, Material::CardTranslucent);
            }
            GameEvent::PlayerObjectDropping { entity } => {
                self.world.set_material(entity, Material::CardOpaque);
                self.world.play(Sound::CardDrop, PlayOptions::default());
            }
            GameEvent::GrabbedObjectAttached { entity } => {
                self.world.set_material(entity, Material::CardOpaque);
            }
            GameEvent::PlayerTouchedTouchableObject { .. } => {
                self.world.play(
                    Sound::TouchObject,
                    PlayOptions {
                        volume: TOUCH_VOLUME,
                    },
                );
            }
            GameEvent::MatchEnded { .. } => self.open_gate(),
            _ => {}
        }
    }

    fn open_gate(&mut self) {
        let Some(gate) = self.layout.gate else {
            return;
        };
        if self.gate_opened {
            return;
        }
        self.gate_opened = true;

        let from = self.world.world_position(gate);
        let clip = Clip {
            name: "gate_open",
            track: Track::Position {
                from,
                to: from + Vec3::Y * GATE_LIFT,
            },
            frame_rate: 10,
            frames: 10,
            easing: Easing::SineInOut,
        };
        self.world.animate(gate, clip, 0.5);
        self.world.play(Sound::GateOpen, PlayOptions::default());
        info!("Gate opened");
    }

    pub fn key_down(&mut self, code: &str) -> Option<ControlSignal> {
        KeyCode::from_code(code).and_then(|key| self.player.command.key_down(key))
    }

    pub fn key_up(&mut self, code: &str) {
        if let Some(key) = KeyCode::from_code(code) {
            self.player.command.key_up(key);
        }
    }

    /// Pointer-lock mouse movement; ignored on touch devices
    pub fn pointer_moved(&mut self, movement_x: f32, movement_y: f32, dt: f32) {
        if self.settings.player.platform != Platform::Desktop {
            return;
        }
        let sensitivity = self.settings.player.look_sensitivity;
        self.player
            .command
            .pointer_look(movement_x, movement_y, sensitivity, dt);
    }

    /// Touch drag on the look half of the screen
    pub fn look_dragged(&mut self, dx: f32, dy: f32, dt: f32) {
        let player = &self.settings.player;
        let (factor, sensitivity) = (player.touch_rotation_factor, player.look_sensitivity);
        self.player.command.touch_look(dx, dy, factor, sensitivity, dt);
    }

    /// Virtual stick drag; returns the knob offset to draw
    pub fn stick_moved(&mut self, dx: f32, dy: f32) -> Vec2 {
        let stick = self.settings.player.stick;
        self.player.command.stick_moved(dx, dy, &stick)
    }

    pub fn stick_released(&mut self) {
        self.player.command.stick_released();
    }

    pub fn jump_button(&mut self, down: bool) {
        self.player.command.set_jump(down);
    }

    pub fn toggle_sprint(&mut self) {
        self.player.command.toggle_sprint();
    }

    pub fn tap(&mut self, event: &TapEvent) -> Result<(), InputError> {
        let now = self.clock.now();
        self.player
            .on_touch_or_click_event(&mut self.world, &mut self.registry, event, now)
    }

    /// Session summary with the scene-level counters filled in
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            shrine_completed: self.shrine.as_ref().is_some_and(|s| s.is_completed()),
            ticks: self.clock.ticks(),
            sim_seconds: self.clock.now().as_secs_f32(),
            ..self.engine.summary()
        }
    }
}
