//! GuardPlugin внутри headless Bevy App (ManualDuration = детерминированное время)

use std::time::Duration;

use bevy::input::keyboard::KeyCode;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use tsb_guard::bridge::emit_key_effects_main_thread;
use tsb_guard::host::{AttributeValue, CharacterId, PlayerId, ARCHETYPE_ATTRIBUTE, COMBO_ATTRIBUTE};
use tsb_guard::{create_headless_app, GuardPlugin, GuardStatus, HostBridge, HostEvent, KeyEffect, RigPartKind};

/// Все KeyEffect с номером кадра
#[derive(Resource, Default)]
struct Collected(Vec<(u32, KeyEffect)>);

#[derive(Resource, Default)]
struct Frame(u32);

fn collect_key_effects(mut effects: EventReader<KeyEffect>, mut collected: ResMut<Collected>, frame: Res<Frame>) {
    for effect in effects.read() {
        collected.0.push((frame.0, *effect));
    }
}

fn guard_app() -> App {
    let mut app = create_headless_app();
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(10)))
        .init_resource::<Collected>()
        .init_resource::<Frame>()
        .add_plugins(GuardPlugin)
        .add_systems(Update, collect_key_effects.after(emit_key_effects_main_thread));
    app
}

fn update(app: &mut App, events: Vec<HostEvent>) {
    for event in events {
        app.world_mut().send_event(event);
    }
    app.update();
    app.world_mut().resource_mut::<Frame>().0 += 1;
}

fn spawn(player: PlayerId, character: CharacterId, position: Vec3) -> Vec<HostEvent> {
    let mut events = vec![HostEvent::CharacterSpawned { player, character }];
    for part in [RigPartKind::Root, RigPartKind::Humanoid, RigPartKind::Animator] {
        events.push(HostEvent::PartAdded {
            character,
            part,
            position,
        });
    }
    events
}

fn join(player: PlayerId, name: &str, local: bool) -> HostEvent {
    HostEvent::PlayerAdded {
        player,
        name: name.into(),
        local,
    }
}

#[test]
fn test_hunter_attack_through_plugin() {
    let mut app = guard_app();
    let me = PlayerId(1);
    let rival = PlayerId(2);

    let mut setup = vec![join(me, "me", true)];
    setup.extend(spawn(me, CharacterId(10), Vec3::ZERO));
    setup.push(join(rival, "rival", false));
    setup.push(HostEvent::PlayerAttributeSet {
        player: rival,
        key: ARCHETYPE_ATTRIBUTE.into(),
        value: Some(AttributeValue::from("Hunter")),
    });
    setup.extend(spawn(rival, CharacterId(20), Vec3::new(0.0, 0.0, 10.0)));
    setup.push(HostEvent::CharacterAttributeSet {
        character: CharacterId(20),
        key: COMBO_ATTRIBUTE.into(),
        value: Some(AttributeValue::Number(3.0)),
    });
    setup.push(HostEvent::KeyInput {
        key: KeyCode::AltLeft,
        pressed: true,
    });
    update(&mut app, setup);

    {
        let status = app.world().resource::<GuardStatus>();
        assert!(status.running);
        assert!(status.block_enabled);
        assert_eq!(status.active_players, 1);
    }

    update(&mut app, vec![HostEvent::AttackFired {
        character: CharacterId(20),
    }]);
    assert!(app.world().resource::<GuardStatus>().blocking);

    for _ in 0..40 {
        update(&mut app, Vec::new());
    }

    let collected = &app.world().resource::<Collected>().0;
    assert_eq!(collected.len(), 2, "expected one press + one release, got {:?}", collected);

    let (pressed_at, press) = collected[0];
    let (released_at, release) = collected[1];
    assert_eq!(press, KeyEffect { key: KeyCode::KeyF, pressed: true });
    assert_eq!(release, KeyEffect { key: KeyCode::KeyF, pressed: false });
    assert_eq!(pressed_at, 1);
    // 0.24s при шаге 10ms → релиз через ~24 кадра
    assert!((23..=26).contains(&(released_at - pressed_at)), "released after {} frames", released_at - pressed_at);
    assert!(!app.world().resource::<GuardStatus>().blocking);
}

#[test]
fn test_leave_updates_status_and_bridge() {
    let mut app = guard_app();
    let me = PlayerId(1);

    let mut setup = vec![join(me, "me", true)];
    setup.extend(spawn(me, CharacterId(10), Vec3::ZERO));
    setup.push(join(PlayerId(2), "a", false));
    setup.push(join(PlayerId(3), "b", false));
    update(&mut app, setup);
    assert_eq!(app.world().resource::<GuardStatus>().active_players, 2);

    update(&mut app, vec![HostEvent::PlayerRemoving { player: PlayerId(2) }]);
    assert_eq!(app.world().resource::<GuardStatus>().active_players, 1);

    let bridge = app.world().non_send_resource::<HostBridge>();
    assert!(bridge.host().players.find(PlayerId(2)).is_none());
    assert!(bridge.host().players.find(PlayerId(3)).is_some());
}

#[test]
fn test_guard_idle_without_local_player() {
    let mut app = guard_app();
    update(&mut app, vec![join(PlayerId(2), "stranger", false)]);

    let status = app.world().resource::<GuardStatus>();
    assert!(!status.running);
    assert_eq!(status.active_players, 0);
    assert!(app.world().resource::<Collected>().0.is_empty());
}
