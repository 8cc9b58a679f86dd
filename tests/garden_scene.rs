//! Scene-level sessions against the sandbox garden

use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

use glam::{Vec2, Vec3};

use garden_core::events::GameEvent;
use garden_core::game::{dialogue, MatchPhase, MatchSettings, Side};
use garden_core::player::{Cursor, PlayerSettings, TapEvent, Viewport};
use garden_core::sandbox::{facing_angles, DemoScript, GardenSpec, NodeSpec, Sandbox};
use garden_core::scene::{GardenScene, RunnerSettings, SceneRunner, SceneSettings};
use garden_core::world::{EntityId, LayoutNames, Material, SceneGraph, Sound};

const DT: f32 = 1.0 / 60.0;

fn settings(max_turns: u32, seed: u64) -> SceneSettings {
    SceneSettings {
        names: LayoutNames::default(),
        player: PlayerSettings::default(),
        matching: MatchSettings { max_turns, seed },
        respawn_floor: -10.0,
        stabilise_timeout: Duration::from_secs(5),
    }
}

fn garden(seed: u64) -> GardenScene<Sandbox> {
    let world = Sandbox::garden(&GardenSpec::default());
    GardenScene::new(world, settings(6, seed)).unwrap()
}

/// Tick until player control is live; returns everything published
fn settle(scene: &mut GardenScene<Sandbox>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while !scene.is_stable() {
        events.extend(scene.tick(DT).unwrap());
    }
    events.extend(scene.tick(DT).unwrap());
    events
}

fn run(scene: &mut GardenScene<Sandbox>, ticks: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(scene.tick(DT).unwrap());
    }
    events
}

/// Turn the camera onto `target` and let one update pick it up
fn look_at(scene: &mut GardenScene<Sandbox>, target: Vec3) -> Vec<GameEvent> {
    let head = scene.player().aim_ray().origin;
    let (yaw, pitch) = facing_angles(head, target);
    scene.player_mut().sync_camera(yaw, pitch);
    scene.tick(DT).unwrap()
}

fn centre_click(scene: &GardenScene<Sandbox>) -> TapEvent {
    let (width, height) = scene.world().viewport_size();
    TapEvent::Pointer {
        client: Vec2::ZERO,
        pointer_locked: true,
        viewport: Viewport::full(width, height),
    }
}

/// Stand 1.5 m in front of the first dealt card and pick it up
fn grab_first_card(scene: &mut GardenScene<Sandbox>) -> EntityId {
    let card = scene.engine().cards().next().unwrap().entity;
    grab_card(scene, card);
    card
}

fn grab_card(scene: &mut GardenScene<Sandbox>, card: EntityId) {
    let at = scene.world().world_position(card);
    scene.place_player(at + Vec3::new(-1.5, 0.3, 0.0));
    run(scene, 30);

    look_at(scene, at);
    assert_eq!(scene.player().cursor(), Cursor::Hand);
    scene.tap(&centre_click(scene)).unwrap();
    assert_eq!(scene.player().grabbed_object(), Some(card));
}

/// Carry the held card into `target` by moving the player
fn carry_into(scene: &mut GardenScene<Sandbox>, target: EntityId) {
    let held = scene.player().grabbed_object().unwrap();
    let offset = scene.world().world_position(held) - scene.player().position(scene.world());
    let at = scene.world().world_position(target);
    scene.place_player(Vec3::new(at.x - offset.x, 1.0, at.z - offset.z));
}

#[test]
fn scripted_session_plays_the_match_through() {
    let scene = garden(42);
    let runner = SceneRunner::new(
        scene,
        DemoScript::new(),
        RunnerSettings {
            tick_rate: 60,
            max_ticks: 30_000,
            realtime: false,
        },
    );
    let summary = tokio_test::block_on(runner.run()).unwrap();

    assert!(summary.ended);
    assert_eq!(summary.phase, MatchPhase::Ended);
    assert_eq!(summary.turn, 6);
    assert_eq!(summary.player_moves(), 3);
    assert_eq!(summary.opponent_moves(), 3);

    let opponent_slots: Vec<u32> = summary
        .moves
        .iter()
        .filter(|m| m.side == Side::Opponent)
        .map(|m| m.slot)
        .collect();
    assert_eq!(opponent_slots, vec![1, 3, 5]);
    let player_slots: Vec<u32> = summary
        .moves
        .iter()
        .filter(|m| m.side == Side::Player)
        .map(|m| m.slot)
        .collect();
    assert_eq!(player_slots, vec![2, 4, 6]);
}

#[test]
fn player_lands_and_reports_ground_contact() {
    let mut scene = garden(1);
    let events = settle(&mut scene);
    let ground = scene.world().find_by_name("ground").unwrap();

    assert!(events.contains(&GameEvent::PlayerPickedObject { entity: ground }));
    assert!(scene.player().is_grounded());
    assert!(!scene.player().is_airborne());
    assert_eq!(scene.player().ground_contact().collided_with, Some(ground));

    // contact is reported once, not every tick
    let later = run(&mut scene, 10);
    assert!(!later
        .iter()
        .any(|e| matches!(e, GameEvent::PlayerPickedObject { .. })));
}

#[test]
fn jump_leaves_the_ground_and_comes_back() {
    let mut scene = garden(1);
    settle(&mut scene);
    let start = scene.player().position(scene.world()).y;

    scene.key_down("Space");
    run(&mut scene, 1);
    assert!(scene.player().is_airborne());
    assert_eq!(scene.player().ground_contact().collided_with, None);
    assert_eq!(scene.player().ground_contact().collided_at, None);

    // held until the probe loses the ground
    run(&mut scene, 9);
    scene.key_up("Space");
    assert!(scene.player().position(scene.world()).y > start + 0.3);
    assert!(scene.player().is_airborne());

    run(&mut scene, 120);
    assert!(scene.player().is_grounded());
    assert!((scene.player().position(scene.world()).y - start).abs() < 1e-3);
}

#[test]
fn standing_on_a_moving_platform_rides_along() {
    let mut scene = garden(1);
    settle(&mut scene);
    let lift = scene.world_mut().spawn(
        "lift",
        NodeSpec::solid(Vec3::new(20.0, 0.5, 20.0), Vec3::new(2.0, 0.5, 2.0)).animated(),
    );

    scene.place_player(Vec3::new(20.0, 2.5, 20.0));
    run(&mut scene, 90);
    assert!(scene.player().is_grounded());
    assert_eq!(scene.world().parent(scene.player().node()), Some(lift));

    // plain ground does not carry the player
    scene.place_player(Vec3::new(20.0, 1.5, 26.0));
    run(&mut scene, 90);
    assert!(scene.player().is_grounded());
    assert_eq!(scene.world().parent(scene.player().node()), None);
}

#[test]
fn walking_moves_along_the_camera_heading() {
    let mut scene = garden(1);
    settle(&mut scene);
    let start = scene.player().position(scene.world());

    // a quarter turn of yaw looks down -Z
    scene.player_mut().sync_camera(FRAC_PI_2, FRAC_PI_2);
    scene.key_down("KeyW");
    run(&mut scene, 60);
    scene.key_up("KeyW");
    let moved = scene.player().position(scene.world()) - start;

    assert!((moved.z + 6.0).abs() < 0.2, "moved {moved:?}");
    assert!(moved.x.abs() < 1e-3);
    assert!(moved.y.abs() < 1e-3);
}

#[test]
fn grab_then_drop_round_trip() {
    let mut scene = garden(3);
    settle(&mut scene);
    let card = grab_first_card(&mut scene);

    let events = scene.tick(DT).unwrap();
    assert!(events.contains(&GameEvent::PlayerObjectGrabbed { entity: card }));
    assert_eq!(scene.world().material(card), Some(Material::CardTranslucent));
    assert_eq!(scene.world().play_count(Sound::CardGrab), 1);
    assert_eq!(scene.world().parent(card), Some(scene.player().node()));

    // the card rides along at chest height
    let player = scene.player().position(scene.world());
    let held = scene.world().world_position(card);
    assert!((held.y - (player.y + 0.875)).abs() < 1e-3);

    look_at(&mut scene, held);
    scene.tap(&centre_click(&scene)).unwrap();
    assert_eq!(scene.player().grabbed_object(), None);

    let events = scene.tick(DT).unwrap();
    assert!(events.contains(&GameEvent::PlayerObjectDropping { entity: card }));
    assert_eq!(scene.world().material(card), Some(Material::CardOpaque));
    assert_eq!(scene.world().parent(card), None);
    assert_eq!(scene.world().visibility(card), 1.0);
    assert_eq!(scene.world().play_count(Sound::CardDrop), 1);
}

#[test]
fn tap_away_from_the_aim_point_does_nothing() {
    let mut scene = garden(3);
    settle(&mut scene);
    let card = scene.engine().cards().next().unwrap().entity;
    let at = scene.world().world_position(card);
    scene.place_player(at + Vec3::new(-1.5, 0.3, 0.0));
    run(&mut scene, 30);
    look_at(&mut scene, at);

    let (width, height) = scene.world().viewport_size();
    let corner = TapEvent::Pointer {
        client: Vec2::new(1.0, 1.0),
        pointer_locked: false,
        viewport: Viewport::full(width, height),
    };
    scene.tap(&corner).unwrap();
    assert_eq!(scene.player().grabbed_object(), None);
    assert!(scene.tick(DT).unwrap().is_empty());
}

#[test]
fn malformed_taps_are_errors() {
    let mut scene = garden(3);
    settle(&mut scene);
    let empty = TapEvent::Touch {
        touches: vec![],
        viewport: Viewport::full(800.0, 600.0),
    };
    assert!(scene.tap(&empty).is_err());
}

#[test]
fn trigger_zone_opens_the_match() {
    let mut scene = garden(5);
    settle(&mut scene);
    let zone = scene.layout().trigger_zone.unwrap();
    let centre = scene.world().world_position(zone);

    scene.place_player(Vec3::new(centre.x, 1.0, centre.z));
    let events = scene.tick(DT).unwrap();
    assert_eq!(scene.engine().phase(), MatchPhase::Active);
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::MatchStarted { .. })));
    assert!(events.contains(&GameEvent::TurnChanged { turn: 1 }));
    assert!(events.contains(&GameEvent::NarrativeChanged {
        line: dialogue::GREETING.to_string()
    }));
    assert!(scene
        .world()
        .played_sounds()
        .contains(&(Sound::GardenIntro, 0.5)));

    // the opening flight takes two seconds
    let events = run(&mut scene, 150);
    assert!(events.contains(&GameEvent::TurnChanged { turn: 2 }));
    assert_eq!(scene.engine().turn(), 2);
    assert!(!scene.engine().is_busy());

    let slot = *scene.engine().slot(1).unwrap();
    let card = slot.occupant.unwrap();
    assert_eq!(scene.world().parent(card), Some(slot.entity));
    assert!(!scene.registry().is_grabbable(card));
    assert_eq!(scene.engine().moves()[0].side, Side::Opponent);

    // standing in the zone does not restart anything
    run(&mut scene, 10);
    assert_eq!(scene.engine().turn(), 2);
    assert_eq!(scene.world().play_count(Sound::GardenIntro), 1);
}

#[test]
fn falling_out_of_the_world_respawns() {
    let mut scene = garden(1);
    settle(&mut scene);
    scene.place_player(Vec3::new(5.0, -11.0, 5.0));
    scene.tick(DT).unwrap();

    let position = scene.player().position(scene.world());
    assert!(position.y > -1.0);
    assert!(position.x.abs() < 0.1 && position.z.abs() < 0.1);
}

#[test]
fn touching_the_shrine_reveals_the_hint() {
    let mut scene = garden(9);
    settle(&mut scene);
    let shrine = scene.layout().shrine.unwrap();
    let hint = scene.layout().shrine_hint.unwrap();
    assert_eq!(scene.world().visibility(hint), 0.0);

    let at = scene.world().world_position(shrine);
    scene.place_player(at + Vec3::new(-1.8, 0.5, 0.0));
    run(&mut scene, 30);
    look_at(&mut scene, at);
    scene.tap(&centre_click(&scene)).unwrap();

    let events = scene.tick(DT).unwrap();
    assert!(events.contains(&GameEvent::PlayerTouchedTouchableObject { entity: shrine }));
    assert_eq!(scene.world().visibility(hint), 1.0);
    assert!(scene
        .world()
        .played_sounds()
        .contains(&(Sound::TouchObject, 0.75)));
}

#[test]
fn shrine_offering_pays_out_two_cards() {
    let mut scene = garden(11);
    settle(&mut scene);
    let cards_before = scene.engine().cards().count();
    let card = grab_first_card(&mut scene);
    scene.tick(DT).unwrap();

    let shrine = scene.layout().shrine.unwrap();
    let hint = scene.layout().shrine_hint.unwrap();
    carry_into(&mut scene, shrine);
    scene.tick(DT).unwrap();

    assert!(scene.shrine().unwrap().is_completed());
    assert_eq!(scene.player().grabbed_object(), None);
    assert_eq!(scene.world().parent(card), Some(shrine));
    assert!(!scene.world().contains(hint));
    assert_eq!(scene.engine().cards().count(), cards_before + 2);

    let rewards: Vec<EntityId> = scene
        .engine()
        .cards()
        .skip(cards_before)
        .map(|c| c.entity)
        .collect();
    for &reward in &rewards {
        assert!(!scene.registry().is_grabbable(reward));
        assert!(scene.world().visibility(reward) < 1.0);
    }

    run(&mut scene, 70);
    for &reward in &rewards {
        assert!(scene.registry().is_grabbable(reward));
        assert_eq!(scene.world().visibility(reward), 1.0);
    }
    assert!(scene.summary().shrine_completed);
}

#[test]
fn attaching_a_held_card_skips_the_drop() {
    let mut scene = garden(5);
    settle(&mut scene);
    let zone = scene.layout().trigger_zone.unwrap();
    let centre = scene.world().world_position(zone);
    scene.place_player(Vec3::new(centre.x, 1.0, centre.z));
    run(&mut scene, 150);
    assert_eq!(scene.engine().turn(), 2);

    let card = scene
        .engine()
        .playable_cards(scene.world(), scene.registry())
        .unwrap()[0];
    grab_card(&mut scene, card);
    scene.tick(DT).unwrap();

    let slot = scene.engine().slot(2).unwrap().entity;
    carry_into(&mut scene, slot);
    let events = scene.tick(DT).unwrap();

    assert!(events.contains(&GameEvent::GrabbedObjectAttached { entity: card }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::PlayerObjectDropping { .. })));
    assert_eq!(scene.world().play_count(Sound::CardDrop), 0);
    assert_eq!(scene.player().grabbed_object(), None);
    assert_eq!(scene.world().parent(card), Some(slot));
    assert_eq!(scene.world().material(card), Some(Material::CardOpaque));
}

#[test]
fn layout_without_a_player_body_is_rejected() {
    let mut world = Sandbox::new();
    world.spawn("ground", NodeSpec::marker(Vec3::ZERO));
    assert!(GardenScene::new(world, settings(6, 1)).is_err());
}
