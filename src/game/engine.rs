//! Match state and turn flow

use std::collections::{HashMap, VecDeque};
use std::f32::consts::{FRAC_PI_2, PI};
use std::time::Duration;

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::events::{EventPublisher, GameEvent};
use crate::player::PlayerController;
use crate::task::{completion, Completer, Completion, Wait};
use crate::world::{
    Capability, Clip, Easing, EntityId, EntityRegistry, HostWorld, Material, PlayOptions,
    SceneGraph, SceneLayout, Sound, SoundBank, Track,
};

use super::card::{Card, CardInstance};
use super::deck::Deck;
use super::dialogue;
use super::rules;
use super::summary::{MatchSummary, MoveRecord};
use super::GameError;

const INTRO_VOLUME: f32 = 0.5;
const ATTACH_VOLUME: f32 = 1.5;
/// Gap between a slot's top and an attached card
const STACK_GAP: f32 = 0.5;
/// Pause between the end jingle finishing and the closing line
const END_DELAY: Duration = Duration::from_secs(3);
const FLIGHT_FRAME_RATE: u32 = 20;
const FLIGHT_FRAMES: u32 = 20;
const FLIGHT_SPEED: f32 = 0.5;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for the player to walk up
    Idle,
    /// Turns in progress
    Active,
    /// Closing line delivered
    Ended,
}

/// Who put a card on a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
}

/// Turn counter. `turn` is 0 before the match and never exceeds `max_turns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    pub turn: u32,
    pub max_turns: u32,
    pub ended: bool,
}

/// A numbered position cards are attached to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub entity: EntityId,
    /// 1-based
    pub number: u32,
    pub occupant: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub max_turns: u32,
    pub seed: u64,
}

impl MatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_turns: config.max_turns,
            seed: config.match_seed.unwrap_or_else(rand::random),
        }
    }
}

/// Result of one match check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// No match running, or a suspended chain is still in flight
    NotReady,
    NothingHeld,
    /// The held card does not touch the current slot
    NoContact,
    /// Touching, but the card does not match the previous one
    Rejected,
    Attached { slot: u32 },
}

/// One link of a suspended chain
#[derive(Debug)]
enum Step {
    OpponentMove { slot: u32 },
    Attach { card: EntityId, slot: u32 },
    Chatter,
    NextTurn { slot: u32 },
    EndSound,
    EndDelay,
    EndFinish,
    Resolve(Completer),
}

/// Authoritative match state, owned by the scene
pub struct MatchEngine {
    id: Uuid,
    seed: u64,
    phase: MatchPhase,
    turn: TurnState,
    rng: ChaCha8Rng,
    deck: Deck,
    template: EntityId,
    cards: HashMap<EntityId, CardInstance>,
    /// Spawn order; "first" card searches follow it
    card_order: Vec<EntityId>,
    slots: Vec<Slot>,
    moves: Vec<MoveRecord>,
    narrative: Option<String>,
    steps: VecDeque<Step>,
    wait: Option<Wait>,
    ending: bool,
    spawned: u64,
    publisher: EventPublisher,
}

impl MatchEngine {
    /// Spawn the dealt cards and bind the slots
    pub fn setup<W>(
        world: &mut W,
        registry: &mut EntityRegistry,
        layout: &SceneLayout,
        settings: &MatchSettings,
        publisher: EventPublisher,
    ) -> Result<Self, GameError>
    where
        W: SceneGraph + ?Sized,
    {
        let template = layout
            .card_template
            .ok_or(GameError::MissingEntity("card template"))?;

        let wanted = settings.max_turns as usize;
        if layout.slots.len() < wanted {
            return Err(GameError::IncompleteLayout(format!(
                "{} of {} slots found",
                layout.slots.len(),
                wanted
            )));
        }
        let slots = layout
            .slots
            .iter()
            .take(wanted)
            .enumerate()
            .map(|(i, &entity)| Slot {
                entity,
                number: i as u32 + 1,
                occupant: None,
            })
            .collect();

        let mut engine = Self {
            id: Uuid::new_v4(),
            seed: settings.seed,
            phase: MatchPhase::Idle,
            turn: TurnState {
                turn: 0,
                max_turns: settings.max_turns,
                ended: false,
            },
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            deck: Deck::regular(),
            template,
            cards: HashMap::new(),
            card_order: Vec::new(),
            slots,
            moves: Vec::new(),
            narrative: None,
            steps: VecDeque::new(),
            wait: None,
            ending: false,
            spawned: 0,
            publisher,
        };

        let dealt = engine.deck.deal(layout.spawn_points.len(), &mut engine.rng);
        for (&point, card) in layout.spawn_points.iter().zip(dealt) {
            let position = world.world_position(point);
            engine.spawn_card(world, registry, card, position, true)?;
        }
        for &point in &layout.secret_spawn_points {
            let position = world.world_position(point);
            engine.spawn_card(world, registry, Card::Wild, position, true)?;
        }

        info!(
            match_id = %engine.id,
            seed = engine.seed,
            cards = engine.cards.len(),
            slots = engine.slots.len(),
            "Match ready"
        );
        Ok(engine)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    pub fn turn(&self) -> u32 {
        self.turn.turn
    }

    pub fn is_ended(&self) -> bool {
        self.turn.ended
    }

    /// Latest opponent line
    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, number: u32) -> Option<&Slot> {
        number
            .checked_sub(1)
            .and_then(|i| self.slots.get(i as usize))
    }

    pub fn card(&self, entity: EntityId) -> Option<&CardInstance> {
        self.cards.get(&entity)
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardInstance> {
        self.card_order.iter().filter_map(|id| self.cards.get(id))
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// True while a suspended chain still has work
    pub fn is_busy(&self) -> bool {
        self.wait.is_some() || !self.steps.is_empty()
    }

    /// Clone the card template for `card` at `position`
    pub fn spawn_card<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        card: Card,
        position: Vec3,
        grabbable: bool,
    ) -> Result<EntityId, GameError>
    where
        W: SceneGraph + ?Sized,
    {
        let name = card.instance_name(self.spawned);
        self.spawned += 1;

        let entity = world
            .clone_node(self.template, &name)
            .ok_or_else(|| GameError::SpawnFailed(name.clone()))?;
        world.set_parent(entity, None);
        world.set_world_position(entity, position);
        world.set_yaw(entity, self.rng.gen_range(0.0..PI));
        world.set_visibility(entity, 1.0);
        world.set_material(entity, Material::CardOpaque);
        registry.set_capability(entity, Capability::from_flags(grabbable, false));

        self.cards.insert(
            entity,
            CardInstance {
                entity,
                card,
                attached: false,
            },
        );
        self.card_order.push(entity);
        debug!(card = %name, entity = %entity, "Card spawned");
        Ok(entity)
    }

    /// `n` cards off the top of a fresh shuffle of the regular deck
    pub fn draw_regular(&mut self, n: usize) -> Vec<Card> {
        self.deck.shuffled(&mut self.rng).into_iter().take(n).collect()
    }

    /// Lying in the world, visible, grabbable and not held by anyone
    fn is_free<W>(&self, world: &W, registry: &EntityRegistry, id: EntityId) -> bool
    where
        W: SceneGraph + ?Sized,
    {
        self.cards.get(&id).is_some_and(|c| !c.attached)
            && registry.is_grabbable(id)
            && world.parent(id).is_none()
            && world.visibility(id) > 0.0
    }

    fn free_cards<W>(&self, world: &W, registry: &EntityRegistry) -> Vec<(EntityId, Card)>
    where
        W: SceneGraph + ?Sized,
    {
        self.card_order
            .iter()
            .filter(|&&id| self.is_free(world, registry, id))
            .filter_map(|id| self.cards.get(id).map(|c| (*id, c.card)))
            .collect()
    }

    fn random_free_regular<W>(&mut self, world: &W, registry: &EntityRegistry) -> Option<EntityId>
    where
        W: SceneGraph + ?Sized,
    {
        let candidates: Vec<EntityId> = self
            .free_cards(world, registry)
            .into_iter()
            .filter(|(_, card)| !card.is_wild())
            .map(|(id, _)| id)
            .collect();
        candidates.choose(&mut self.rng).copied()
    }

    /// Card on the slot before `slot`
    fn previous_card(&self, slot: u32) -> Result<EntityId, GameError> {
        let previous = slot.saturating_sub(1);
        self.slot(previous)
            .ok_or(GameError::UnknownSlot(previous))?
            .occupant
            .ok_or(GameError::EmptySlot { slot: previous })
    }

    /// Whether `card` may follow `previous`. A previous entity that is not a
    /// card is an invariant violation.
    pub fn check_card_is_matching_previous_card(
        &self,
        card: EntityId,
        previous: EntityId,
    ) -> Result<bool, GameError> {
        let previous = self
            .cards
            .get(&previous)
            .ok_or(GameError::UnknownCardKind(previous))?;
        let Some(candidate) = self.cards.get(&card) else {
            return Ok(false);
        };
        Ok(rules::is_match(&candidate.card, &previous.card))
    }

    /// Free cards the player could put on the current slot
    pub fn playable_cards<W>(
        &self,
        world: &W,
        registry: &EntityRegistry,
    ) -> Result<Vec<EntityId>, GameError>
    where
        W: SceneGraph + ?Sized,
    {
        if self.phase != MatchPhase::Active || self.turn.turn < 2 {
            return Ok(Vec::new());
        }
        let previous = self.previous_card(self.turn.turn)?;
        let mut playable = Vec::new();
        for (id, _) in self.free_cards(world, registry) {
            if self.check_card_is_matching_previous_card(id, previous)? {
                playable.push(id);
            }
        }
        Ok(playable)
    }

    fn set_narrative(&mut self, line: &str) {
        self.narrative = Some(line.to_string());
        self.publisher.publish(GameEvent::NarrativeChanged {
            line: line.to_string(),
        });
    }

    fn record_move(&mut self, slot: u32, side: Side, card: EntityId) {
        let name = self
            .cards
            .get(&card)
            .map(|c| c.card.name())
            .unwrap_or_default();
        self.moves.push(MoveRecord {
            slot,
            side,
            card: name,
        });
    }

    /// Open the match: greeting, then the opponent plays slot 1 and the turn
    /// advances. The completion resolves when that opening chain is done.
    pub fn start_game<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        now: Duration,
    ) -> Result<Completion, GameError>
    where
        W: HostWorld + ?Sized,
    {
        if self.phase != MatchPhase::Idle {
            return Ok(Completion::ready());
        }

        self.phase = MatchPhase::Active;
        self.turn.turn = 1;
        info!(match_id = %self.id, "Match started");

        world.play(
            Sound::GardenIntro,
            PlayOptions {
                volume: INTRO_VOLUME,
            },
        );
        self.publisher
            .publish(GameEvent::MatchStarted { match_id: self.id });
        self.publisher.publish(GameEvent::TurnChanged { turn: 1 });
        self.set_narrative(dialogue::GREETING);

        let (done, waiter) = completion();
        self.steps.extend([
            Step::OpponentMove { slot: 1 },
            Step::NextTurn { slot: 1 },
            Step::Resolve(done),
        ]);
        self.poll(world, registry, now)?;
        Ok(waiter)
    }

    /// Advance the turn counter and move the highlight on
    pub fn next_turn<W>(&mut self, world: &mut W, filled: u32) -> Result<(), GameError>
    where
        W: SceneGraph + ?Sized,
    {
        let filled_entity = self.slot(filled).ok_or(GameError::UnknownSlot(filled))?.entity;
        let next = self.turn.turn + 1;
        if next > self.turn.max_turns {
            return Err(GameError::UnknownSlot(next));
        }
        self.turn.turn = next;

        world.set_material(filled_entity, Material::SlotNeutral);
        if let Some(slot) = self.slot(next) {
            world.set_material(slot.entity, Material::SlotHighlighted);
        }

        info!(match_id = %self.id, turn = next, "Turn changed");
        self.publisher.publish(GameEvent::TurnChanged { turn: next });
        Ok(())
    }

    /// Let the opponent play on `slot`
    pub fn opponent_move<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        slot: u32,
        now: Duration,
    ) -> Result<Completion, GameError>
    where
        W: HostWorld + ?Sized,
    {
        let waiter = self.queue_opponent_move(slot, false);
        self.poll(world, registry, now)?;
        Ok(waiter)
    }

    /// Queue an opponent move, optionally followed by a turn advance
    pub fn queue_opponent_move(&mut self, slot: u32, advance_after: bool) -> Completion {
        let (done, waiter) = completion();
        self.steps.push_back(Step::OpponentMove { slot });
        if advance_after {
            self.steps.push_back(Step::NextTurn { slot });
        }
        self.steps.push_back(Step::Resolve(done));
        waiter
    }

    /// Put a card on top of `target` for good
    pub fn attach_card_to_mesh<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        card: EntityId,
        target: EntityId,
    ) where
        W: SceneGraph + SoundBank + ?Sized,
    {
        world.set_parent(card, Some(target));
        let height = stack_height(world, card, target);
        world.set_local_position(card, Vec3::new(0.0, height, 0.0));
        world.set_yaw(card, -FRAC_PI_2);
        registry.set_grabbable(card, false);
        world.set_visibility(card, 1.0);
        world.play(
            Sound::CardAttached,
            PlayOptions {
                volume: ATTACH_VOLUME,
            },
        );

        if let Some(instance) = self.cards.get_mut(&card) {
            instance.attached = true;
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.entity == target) {
            slot.occupant = Some(card);
        }
        debug!(card = %card, target = %target, "Card attached");
    }

    /// Closing sequence. Runs once; later calls resolve immediately.
    pub fn end_game<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        now: Duration,
    ) -> Result<Completion, GameError>
    where
        W: HostWorld + ?Sized,
    {
        let waiter = self.queue_end_game();
        self.poll(world, registry, now)?;
        Ok(waiter)
    }

    fn queue_end_game(&mut self) -> Completion {
        if self.ending {
            return Completion::ready();
        }
        self.ending = true;
        let (done, waiter) = completion();
        self.steps.extend([
            Step::EndSound,
            Step::EndDelay,
            Step::EndFinish,
            Step::Resolve(done),
        ]);
        waiter
    }

    /// Match check for the held card against the current slot
    pub fn check_player_attach<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        player: &mut PlayerController,
    ) -> Result<AttachOutcome, GameError>
    where
        W: HostWorld + ?Sized,
    {
        if self.phase != MatchPhase::Active || self.ending || self.is_busy() {
            return Ok(AttachOutcome::NotReady);
        }
        let Some(held) = player.grabbed_object() else {
            return Ok(AttachOutcome::NothingHeld);
        };

        let number = self.turn.turn;
        let current = self.slot(number).ok_or(GameError::UnknownSlot(number))?.entity;
        if !world.intersects(held, current) {
            return Ok(AttachOutcome::NoContact);
        }

        let previous = self.previous_card(number)?;
        if !self.check_card_is_matching_previous_card(held, previous)? {
            debug!(card = %held, slot = number, "Held card does not match");
            return Ok(AttachOutcome::Rejected);
        }

        player.set_grabbed_object(None);
        self.attach_card_to_mesh(world, registry, held, current);
        self.record_move(number, Side::Player, held);
        self.publisher
            .publish(GameEvent::GrabbedObjectAttached { entity: held });
        info!(match_id = %self.id, slot = number, "Player card attached");

        if number == self.turn.max_turns {
            world.set_material(current, Material::SlotNeutral);
            self.queue_end_game();
        } else {
            self.next_turn(world, number)?;
            if self.turn.turn % 2 == 1 {
                self.queue_opponent_move(self.turn.turn, true);
            }
        }
        Ok(AttachOutcome::Attached { slot: number })
    }

    /// Drive suspended chains. Runs steps until one has to wait.
    pub fn poll<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        now: Duration,
    ) -> Result<(), GameError>
    where
        W: HostWorld + ?Sized,
    {
        loop {
            if let Some(wait) = self.wait.as_mut() {
                if !wait.is_over(now) {
                    return Ok(());
                }
                self.wait = None;
            }
            let Some(step) = self.steps.pop_front() else {
                return Ok(());
            };
            self.run_step(step, world, registry, now)?;
        }
    }

    fn run_step<W>(
        &mut self,
        step: Step,
        world: &mut W,
        registry: &mut EntityRegistry,
        now: Duration,
    ) -> Result<(), GameError>
    where
        W: HostWorld + ?Sized,
    {
        match step {
            Step::OpponentMove { slot } => self.begin_opponent_flight(world, registry, slot)?,
            Step::Attach { card, slot } => {
                let target = self.slot(slot).ok_or(GameError::UnknownSlot(slot))?.entity;
                self.attach_card_to_mesh(world, registry, card, target);
                self.record_move(slot, Side::Opponent, card);
            }
            Step::Chatter => {
                let turn = self.turn.turn;
                if turn != 1 && turn % 2 == 1 {
                    let line = dialogue::random_chatter(&mut self.rng);
                    self.set_narrative(line);
                }
            }
            Step::NextTurn { slot } => self.next_turn(world, slot)?,
            Step::EndSound => {
                let ended = world.play(Sound::MatchEnd, PlayOptions::default());
                self.set_narrative(dialogue::SEARCHING);
                self.wait = Some(Wait::Signal(ended));
            }
            Step::EndDelay => self.wait = Some(Wait::Until(now + END_DELAY)),
            Step::EndFinish => {
                self.set_narrative(dialogue::FAREWELL);
                self.turn.ended = true;
                self.phase = MatchPhase::Ended;
                info!(match_id = %self.id, moves = self.moves.len(), "Match ended");
                self.publisher
                    .publish(GameEvent::MatchEnded { match_id: self.id });
            }
            Step::Resolve(done) => done.complete(),
        }
        Ok(())
    }

    /// Pick the opponent's card and send it flying; attaching waits for the
    /// landing
    fn begin_opponent_flight<W>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        slot: u32,
    ) -> Result<(), GameError>
    where
        W: HostWorld + ?Sized,
    {
        let target = self.slot(slot).ok_or(GameError::UnknownSlot(slot))?.entity;

        let card = if slot == 1 {
            self.random_free_regular(world, registry)
        } else {
            let previous = self.previous_card(slot)?;
            let previous = self
                .cards
                .get(&previous)
                .ok_or(GameError::UnknownCardKind(previous))?
                .card;
            if previous.is_wild() {
                self.random_free_regular(world, registry)
            } else {
                let free = self.free_cards(world, registry);
                rules::opponent_reply(&previous, free.iter().map(|(id, c)| (*id, c)))
            }
        }
        .ok_or(GameError::NoMatchingCard { slot })?;

        // nobody else may take it mid-flight
        registry.set_grabbable(card, false);

        let from = world.world_position(card);
        let to = world.world_position(target) + Vec3::Y * stack_height(world, card, target);
        let clip = Clip {
            name: "card_fly",
            track: Track::Position { from, to },
            frame_rate: FLIGHT_FRAME_RATE,
            frames: FLIGHT_FRAMES,
            easing: Easing::SineInOut,
        };
        let landed = world.animate(card, clip, FLIGHT_SPEED);
        self.wait = Some(Wait::Signal(landed));
        self.steps.push_front(Step::Chatter);
        self.steps.push_front(Step::Attach { card, slot });

        let name = self.cards.get(&card).map(|c| c.card.name()).unwrap_or_default();
        debug!(match_id = %self.id, slot, card = %name, "Opponent card in flight");
        Ok(())
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.id,
            seed: self.seed,
            phase: self.phase,
            turn: self.turn.turn,
            max_turns: self.turn.max_turns,
            ended: self.turn.ended,
            moves: self.moves.clone(),
            cards_in_play: self.cards.len(),
            shrine_completed: false,
            ticks: 0,
            sim_seconds: 0.0,
        }
    }
}

/// Local height of a card resting on `target`
fn stack_height<W>(world: &W, card: EntityId, target: EntityId) -> f32
where
    W: SceneGraph + ?Sized,
{
    world.bounding_top(target) + world.bounding_top(card) + STACK_GAP
}
