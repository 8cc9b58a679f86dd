//! Match engine driven directly against a sandbox world

use std::time::Duration;

use glam::Vec3;
use tokio::sync::broadcast;

use garden_core::events::{EventBus, GameEvent};
use garden_core::game::{
    dialogue, AttachOutcome, Card, GameError, MatchEngine, MatchPhase, MatchSettings, Side,
};
use garden_core::player::{PlayerController, PlayerSettings};
use garden_core::sandbox::{GardenSpec, Sandbox};
use garden_core::world::{
    EntityId, EntityRegistry, LayoutNames, Material, PhysicsWorld, SceneGraph, SceneLayout, Sound,
};

const DT: f32 = 1.0 / 60.0;

struct Rig {
    world: Sandbox,
    registry: EntityRegistry,
    layout: SceneLayout,
    engine: MatchEngine,
    bus: EventBus,
    events: broadcast::Receiver<GameEvent>,
    now: Duration,
}

impl Rig {
    fn new(spec: GardenSpec, max_turns: u32) -> Result<Self, GameError> {
        let mut world = Sandbox::garden(&spec);
        let mut registry = EntityRegistry::new();
        let layout = SceneLayout::resolve(&world, &LayoutNames::default(), max_turns);
        let bus = EventBus::default();
        let events = bus.subscribe();
        let settings = MatchSettings { max_turns, seed: 7 };
        let engine =
            MatchEngine::setup(&mut world, &mut registry, &layout, &settings, bus.publisher())?;
        Ok(Self {
            world,
            registry,
            layout,
            engine,
            bus,
            events,
            now: Duration::ZERO,
        })
    }

    fn garden() -> Self {
        Self::new(GardenSpec::default(), 6).unwrap()
    }

    fn start(&mut self) {
        self.engine
            .start_game(&mut self.world, &mut self.registry, self.now)
            .unwrap();
    }

    fn step(&mut self) {
        self.world.step(DT);
        self.now += Duration::from_secs_f32(DT);
        self.engine
            .poll(&mut self.world, &mut self.registry, self.now)
            .unwrap();
    }

    fn run_until_idle(&mut self) {
        for _ in 0..1000 {
            if !self.engine.is_busy() {
                return;
            }
            self.step();
        }
        panic!("engine never settled");
    }

    fn drain(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn occupant(&self, slot: u32) -> EntityId {
        self.engine.slot(slot).unwrap().occupant.unwrap()
    }

    fn card_of(&self, entity: EntityId) -> Card {
        self.engine.card(entity).unwrap().card
    }

    /// A player standing on the ground, holding `card`
    fn player_holding(&mut self, card: EntityId) -> PlayerController {
        let node = self.layout.player_body.unwrap();
        let mut player = PlayerController::new(node, PlayerSettings::default(), self.bus.publisher());
        player.set_position(&mut self.world, Vec3::new(0.0, 0.875, 0.0));
        player.grab_object(&mut self.world, card, self.now);
        player
    }

    /// Move the held card onto the slot by moving the player
    fn carry_to(&mut self, player: &mut PlayerController, slot: u32) {
        let held = player.grabbed_object().unwrap();
        let offset = self.world.world_position(held) - player.position(&self.world);
        let target = self.world.world_position(self.engine.slot(slot).unwrap().entity);
        player.set_position(&mut self.world, Vec3::new(target.x - offset.x, 0.875, target.z - offset.z));
    }

    fn attach(&mut self, player: &mut PlayerController) -> AttachOutcome {
        self.engine
            .check_player_attach(&mut self.world, &mut self.registry, player)
            .unwrap()
    }
}

#[test]
fn setup_deals_every_spawn_point() {
    let rig = Rig::garden();
    assert_eq!(rig.engine.cards().count(), 42);
    assert_eq!(rig.engine.cards().filter(|c| c.card.is_wild()).count(), 2);
    assert_eq!(rig.engine.phase(), MatchPhase::Idle);
    assert_eq!(rig.engine.turn(), 0);
    for card in rig.engine.cards() {
        assert!(rig.registry.is_grabbable(card.entity));
        assert_eq!(rig.world.visibility(card.entity), 1.0);
        assert_eq!(rig.world.material(card.entity), Some(Material::CardOpaque));
        assert!(!card.attached);
    }
    let names: Vec<String> = rig
        .engine
        .cards()
        .filter_map(|c| rig.world.name_of(c.entity))
        .collect();
    assert!(names[0].ends_with("_clone_0"));
}

#[test]
fn setup_requires_the_template_and_enough_slots() {
    let short = GardenSpec {
        slot_count: 4,
        ..GardenSpec::default()
    };
    assert!(matches!(
        Rig::new(short, 6),
        Err(GameError::IncompleteLayout(_))
    ));

    let mut world = Sandbox::garden(&GardenSpec::default());
    let template = world.find_by_name("uno_card_base").unwrap();
    world.dispose(template);
    let layout = SceneLayout::resolve(&world, &LayoutNames::default(), 6);
    let settings = MatchSettings {
        max_turns: 6,
        seed: 1,
    };
    let result = MatchEngine::setup(
        &mut world,
        &mut EntityRegistry::new(),
        &layout,
        &settings,
        EventBus::default().publisher(),
    );
    assert!(matches!(result, Err(GameError::MissingEntity(_))));
}

#[test]
fn same_seed_deals_the_same_cards() {
    let a = Rig::garden();
    let b = Rig::garden();
    let deal = |rig: &Rig| -> Vec<String> { rig.engine.cards().map(|c| c.card.name()).collect() };
    assert_eq!(deal(&a), deal(&b));
}

#[test]
fn opening_chain_fills_slot_one() {
    let mut rig = Rig::garden();
    rig.start();
    assert_eq!(rig.engine.phase(), MatchPhase::Active);
    assert_eq!(rig.engine.turn(), 1);
    assert!(rig.engine.is_busy());
    assert_eq!(rig.engine.narrative(), Some(dialogue::GREETING));

    let events = rig.drain();
    assert!(matches!(events[0], GameEvent::MatchStarted { .. }));
    assert_eq!(events[1], GameEvent::TurnChanged { turn: 1 });

    rig.run_until_idle();
    assert_eq!(rig.engine.turn(), 2);
    let card = rig.occupant(1);
    assert!(!rig.card_of(card).is_wild());
    assert!(rig.engine.card(card).unwrap().attached);
    assert_eq!(rig.world.parent(card), Some(rig.engine.slot(1).unwrap().entity));
    assert!(!rig.registry.is_grabbable(card));
    assert_eq!(rig.world.yaw(card), Some(-std::f32::consts::FRAC_PI_2));
    assert_eq!(rig.world.material(rig.engine.slot(2).unwrap().entity), Some(Material::SlotHighlighted));
    assert_eq!(rig.world.play_count(Sound::CardAttached), 1);
    assert!(rig.drain().contains(&GameEvent::TurnChanged { turn: 2 }));

    // a second start is a no-op
    rig.start();
    assert_eq!(rig.engine.turn(), 2);
    assert_eq!(rig.world.play_count(Sound::GardenIntro), 1);
}

#[test]
fn player_card_must_match_the_previous_one() {
    let mut rig = Rig::garden();
    rig.start();
    rig.run_until_idle();
    let previous = rig.card_of(rig.occupant(1));

    let free: Vec<(EntityId, Card)> = rig
        .engine
        .cards()
        .filter(|c| !c.attached)
        .map(|c| (c.entity, c.card))
        .collect();
    let mismatch = free
        .iter()
        .find(|(_, c)| !c.is_wild() && c.color() != previous.color() && c.rank() != previous.rank())
        .map(|(id, _)| *id)
        .unwrap();
    let playable = rig.engine.playable_cards(&rig.world, &rig.registry).unwrap();
    assert!(!playable.contains(&mismatch));
    let matching = playable[0];

    let mut player = rig.player_holding(mismatch);
    assert_eq!(rig.attach(&mut player), AttachOutcome::NoContact);
    rig.carry_to(&mut player, 2);
    assert_eq!(rig.attach(&mut player), AttachOutcome::Rejected);
    assert_eq!(player.grabbed_object(), Some(mismatch));

    player.drop_object(&mut rig.world);
    player.grab_object(&mut rig.world, matching, rig.now);
    rig.carry_to(&mut player, 2);
    rig.drain();
    assert_eq!(rig.attach(&mut player), AttachOutcome::Attached { slot: 2 });
    assert_eq!(player.grabbed_object(), None);
    assert_eq!(rig.occupant(2), matching);
    assert_eq!(rig.engine.turn(), 3);

    // the grab is cleared silently, no drop
    let events = rig.drain();
    assert!(events.contains(&GameEvent::GrabbedObjectAttached { entity: matching }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::PlayerObjectDropping { .. })));

    // the opponent answers on slot 3 and hands the turn back
    assert_eq!(rig.attach(&mut player), AttachOutcome::NotReady);
    rig.run_until_idle();
    assert_eq!(rig.engine.turn(), 4);
    let reply = rig.card_of(rig.occupant(3));
    assert!(garden_core::game::rules::is_match(&reply, &rig.card_of(matching)));

    let sides: Vec<(u32, Side)> = rig.engine.moves().iter().map(|m| (m.slot, m.side)).collect();
    assert_eq!(
        sides,
        vec![(1, Side::Opponent), (2, Side::Player), (3, Side::Opponent)]
    );
}

#[test]
fn held_card_is_never_taken_by_the_opponent() {
    let mut rig = Rig::garden();
    rig.start();
    rig.run_until_idle();
    let held = rig.engine.playable_cards(&rig.world, &rig.registry).unwrap()[0];
    let _player = rig.player_holding(held);

    assert!(!rig
        .engine
        .playable_cards(&rig.world, &rig.registry)
        .unwrap()
        .contains(&held));
}

#[test]
fn opponent_without_cards_is_an_error() {
    let spec = GardenSpec {
        card_columns: 0,
        card_rows: 0,
        secret_cards: 0,
        ..GardenSpec::default()
    };
    let mut rig = Rig::new(spec, 6).unwrap();
    let result = rig.engine.start_game(&mut rig.world, &mut rig.registry, rig.now);
    assert!(matches!(result, Err(GameError::NoMatchingCard { slot: 1 })));
}

#[test]
fn comparing_against_a_non_card_is_an_error() {
    let rig = Rig::garden();
    let card = rig.engine.cards().next().unwrap().entity;
    let slot = rig.engine.slot(1).unwrap().entity;
    assert!(matches!(
        rig.engine.check_card_is_matching_previous_card(card, slot),
        Err(GameError::UnknownCardKind(id)) if id == slot
    ));
}

#[test]
fn turn_never_passes_the_last_slot() {
    let mut rig = Rig::new(GardenSpec::default(), 2).unwrap();
    rig.start();
    rig.run_until_idle();
    assert_eq!(rig.engine.turn(), 2);
    assert!(matches!(
        rig.engine.next_turn(&mut rig.world, 2),
        Err(GameError::UnknownSlot(3))
    ));
    assert_eq!(rig.engine.turn(), 2);
}

#[test]
fn end_game_waits_for_the_jingle_then_three_seconds() {
    let mut rig = Rig::garden();
    rig.start();
    rig.run_until_idle();
    rig.drain();

    let mut done = rig
        .engine
        .end_game(&mut rig.world, &mut rig.registry, rig.now)
        .unwrap();
    assert_eq!(rig.engine.narrative(), Some(dialogue::SEARCHING));
    // a second call while ending is a no-op
    let mut again = rig
        .engine
        .end_game(&mut rig.world, &mut rig.registry, rig.now)
        .unwrap();
    assert!(again.is_done());
    assert_eq!(rig.world.play_count(Sound::MatchEnd), 1);

    let start = rig.now;
    let mut ended_at = None;
    let mut ended_count = 0;
    while rig.now - start < Duration::from_secs(7) {
        rig.step();
        for event in rig.drain() {
            if matches!(event, GameEvent::MatchEnded { .. }) {
                ended_count += 1;
                ended_at.get_or_insert(rig.now - start);
            }
        }
    }

    let ended_at = ended_at.unwrap();
    assert_eq!(ended_count, 1);
    assert!(ended_at >= Duration::from_millis(5400), "ended after {ended_at:?}");
    assert!(ended_at <= Duration::from_millis(5700), "ended after {ended_at:?}");
    assert!(done.is_done());
    assert!(rig.engine.is_ended());
    assert_eq!(rig.engine.phase(), MatchPhase::Ended);
    assert_eq!(rig.engine.narrative(), Some(dialogue::FAREWELL));
}
