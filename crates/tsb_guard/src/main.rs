//! Headless guard: scripted duel через Bevy App, печатает key effects.
//!
//! Usage: `tsb_guard [config.ron]`

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use tsb_guard::bridge::emit_key_effects_main_thread;
use tsb_guard::components::WEAPON_DASH_ANIMATION;
use tsb_guard::host::{AttributeValue, CharacterId, PlayerId, ARCHETYPE_ATTRIBUTE, COMBO_ATTRIBUTE};
use tsb_guard::{create_headless_app, GuardConfig, GuardPlugin, GuardStatus, HostEvent, KeyBindings, KeyEffect, RigPartKind};

const ME: PlayerId = PlayerId(1);
const RIVAL: PlayerId = PlayerId(2);
const MY_CHARACTER: CharacterId = CharacterId(10);
const RIVAL_CHARACTER: CharacterId = CharacterId(20);
const FRAMES: u32 = 120;

fn print_key_effects(mut effects: EventReader<KeyEffect>, time: Res<Time>) {
    for effect in effects.read() {
        println!(
            "t={:.3}s {:?} {}",
            time.elapsed_secs(),
            effect.key,
            if effect.pressed { "down" } else { "up" }
        );
    }
}

fn spawn_character(player: PlayerId, character: CharacterId, position: Vec3) -> Vec<HostEvent> {
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

/// (frame, event): Hunter атакует с 10 units на combo stage 1, потом Blade-dash
fn duel_script(bindings: &KeyBindings) -> Vec<(u32, HostEvent)> {
    let mut script = vec![
        (
            0,
            HostEvent::PlayerAdded {
                player: ME,
                name: "me".into(),
                local: true,
            },
        ),
        (
            1,
            HostEvent::PlayerAdded {
                player: RIVAL,
                name: "rival".into(),
                local: false,
            },
        ),
        (
            1,
            HostEvent::PlayerAttributeSet {
                player: RIVAL,
                key: ARCHETYPE_ATTRIBUTE.into(),
                value: Some(AttributeValue::from("Hunter")),
            },
        ),
    ];

    script.extend(spawn_character(ME, MY_CHARACTER, Vec3::ZERO).into_iter().map(|event| (0, event)));
    script.extend(
        spawn_character(RIVAL, RIVAL_CHARACTER, Vec3::new(10.0, 0.0, 0.0))
            .into_iter()
            .map(|event| (3, event)),
    );

    script.extend([
        (
            4,
            HostEvent::CharacterAttributeSet {
                character: RIVAL_CHARACTER,
                key: COMBO_ATTRIBUTE.into(),
                value: Some(AttributeValue::Number(3.0)),
            },
        ),
        (
            5,
            HostEvent::KeyInput {
                key: bindings.toggle,
                pressed: true,
            },
        ),
        (10, HostEvent::AttackFired { character: RIVAL_CHARACTER }),
        (40, HostEvent::Counter),
        // Респавн соперника как Blade: dash издалека, подход, отход
        (
            50,
            HostEvent::PlayerAttributeSet {
                player: RIVAL,
                key: ARCHETYPE_ATTRIBUTE.into(),
                value: Some(AttributeValue::from("Blade")),
            },
        ),
        (51, HostEvent::HumanoidDied { character: RIVAL_CHARACTER }),
        (52, HostEvent::CharacterRemoving { player: RIVAL }),
    ]);

    let blade = CharacterId(21);
    script.extend(
        spawn_character(RIVAL, blade, Vec3::new(30.0, 0.0, 0.0))
            .into_iter()
            .map(|event| (55, event)),
    );
    script.extend([
        (
            60,
            HostEvent::AnimationPlayed {
                character: blade,
                animation_id: WEAPON_DASH_ANIMATION.into(),
            },
        ),
        (
            70,
            HostEvent::CharacterMoved {
                character: blade,
                position: Vec3::new(8.0, 0.0, 0.0),
            },
        ),
        (
            90,
            HostEvent::CharacterMoved {
                character: blade,
                position: Vec3::new(25.0, 0.0, 0.0),
            },
        ),
        (100, HostEvent::PlayerRemoving { player: RIVAL }),
        (
            110,
            HostEvent::KeyInput {
                key: bindings.toggle,
                pressed: false,
            },
        ),
    ]);

    script
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match GuardConfig::load(&path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("{}", error);
                std::process::exit(1);
            }
        },
        None => GuardConfig::default(),
    };
    let bindings = KeyBindings::default();
    println!("Starting TSB guard headless duel ({:.0} Hz)", config.fixed_hz);

    let mut app = create_headless_app();
    app.insert_resource(TimeUpdateStrategy::ManualDuration(config.frame_duration()))
        .insert_resource(config)
        .insert_resource(bindings)
        .add_plugins(GuardPlugin)
        .add_systems(Update, print_key_effects.after(emit_key_effects_main_thread));

    let script = duel_script(&bindings);
    for frame in 0..FRAMES {
        for (_, event) in script.iter().filter(|(at, _)| *at == frame) {
            app.world_mut().send_event(event.clone());
        }
        app.update();
    }

    let status = app.world().resource::<GuardStatus>();
    println!(
        "Duel complete! running={} blocking={} players={}",
        status.running, status.blocking, status.active_players
    );
}
