use std::rc::Rc;

use bevy::input::keyboard::KeyCode;
use bevy::math::Vec3;

use super::*;
use crate::config::{GuardConfig, KeyBindings};
use crate::controllers::GuardContext;
use crate::host::{Character, CharacterId, KeyQueue, COMBO_ATTRIBUTE};
use crate::lifecycle::Scheduler;

struct Arena {
    ctx: Rc<GuardContext>,
    keys: Rc<KeyQueue>,
    scheduler: Scheduler,
    _agent: Rc<Character>,
}

fn arena() -> Arena {
    let scheduler = Scheduler::new();
    let keys = KeyQueue::new();
    let ctx = GuardContext::new(GuardConfig::default(), KeyBindings::default(), scheduler.clone(), keys.clone());

    let agent = Character::assembled(CharacterId(100), "me", Vec3::ZERO);
    ctx.agent.on_character_added(agent.clone(), &scheduler, 4.0);
    ctx.counter.set_enabled(true);

    Arena {
        ctx,
        keys,
        scheduler,
        _agent: agent,
    }
}

fn enemy(arena: &Arena, archetype: Option<Archetype>, position: Vec3) -> (Rc<Character>, Rc<CombatantComponent>) {
    let character = Character::assembled(CharacterId(1), "enemy", position);
    let parts = RigParts {
        root: character.root.get().expect("root"),
        humanoid: character.humanoid.get().expect("humanoid"),
    };
    let rig = RigComponent::new(character.clone(), parts);
    let combatant = CombatantComponent::spawn(&arena.ctx, rig, archetype);
    (character, combatant)
}

fn play(character: &Character, animation_id: &str) {
    let animator = character
        .humanoid
        .get()
        .and_then(|humanoid| humanoid.animator.get())
        .expect("animator");
    animator.play(animation_id);
}

fn move_to(character: &Character, position: Vec3) {
    character.root.get().expect("root").set_position(position);
}

#[test]
fn test_combo_stage_tracks_attribute() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Bald), Vec3::new(30.0, 0.0, 0.0));
    assert_eq!(combatant.combo_stage(), 0);

    character.attributes.set(COMBO_ATTRIBUTE, 3.0);
    assert_eq!(combatant.combo_stage(), 1);

    // Пропавший атрибут не сбрасывает stage
    character.attributes.clear(COMBO_ATTRIBUTE);
    assert_eq!(combatant.combo_stage(), 1);

    character.attributes.set(COMBO_ATTRIBUTE, 5.0);
    assert_eq!(combatant.combo_stage(), 3);
}

#[test]
fn test_initial_combo_is_read_on_spawn() {
    let arena = arena();
    let character = Character::assembled(CharacterId(2), "mid-combo", Vec3::ZERO);
    character.attributes.set(COMBO_ATTRIBUTE, 4.0);
    let parts = RigParts {
        root: character.root.get().expect("root"),
        humanoid: character.humanoid.get().expect("humanoid"),
    };
    let combatant = CombatantComponent::spawn(&arena.ctx, RigComponent::new(character, parts), None);
    assert_eq!(combatant.combo_stage(), 2);
}

#[test]
fn test_hunter_stage_one_blocks_for_table_entry() {
    let arena = arena();
    let (character, _combatant) = enemy(&arena, Some(Archetype::Hunter), Vec3::new(10.0, 3.0, 0.0));
    character.attributes.set(COMBO_ATTRIBUTE, 3.0);

    character.attack_fired.fire(&());
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, true)]);

    arena.scheduler.step(0.23);
    assert!(arena.ctx.counter.is_blocking());
    assert!(arena.keys.is_empty());

    arena.scheduler.step(0.02);
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, false)]);
    assert!(!arena.ctx.counter.is_blocking());
}

#[test]
fn test_attack_out_of_range_is_ignored() {
    let arena = arena();
    let (character, _combatant) = enemy(&arena, Some(Archetype::Ninja), Vec3::new(12.0, 0.0, 0.0));

    character.attack_fired.fire(&());
    assert!(arena.keys.is_empty());
    assert_eq!(arena.ctx.counter.blockable_count(), 0);
}

#[test]
fn test_base_variant_never_blocks() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, None, Vec3::new(2.0, 0.0, 0.0));
    assert!(combatant.profile().is_none());

    character.attributes.set(COMBO_ATTRIBUTE, 4.0);
    character.attack_fired.fire(&());
    play(&character, FISTS_DASH_ANIMATION);
    arena.scheduler.step(0.1);

    assert_eq!(combatant.combo_stage(), 2);
    assert!(arena.keys.is_empty());
    assert!(!combatant.is_dash_tracking());
}

#[test]
fn test_repeat_attack_restarts_the_timer() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Bald), Vec3::new(5.0, 0.0, 0.0));
    character.attributes.set(COMBO_ATTRIBUTE, 2.0);

    character.attack_fired.fire(&());
    arena.scheduler.step(0.15);
    character.attack_fired.fire(&());
    arena.scheduler.step(0.1);

    // Первый таймер (0.20) отменён, держим до 0.15 + 0.20
    assert!(arena.ctx.counter.is_requested(combatant.id()));
    arena.scheduler.step(0.11);
    assert!(!arena.ctx.counter.is_requested(combatant.id()));
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, true), (KeyCode::KeyF, false)]);
}

#[test]
fn test_dash_block_is_edge_triggered() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Blade), Vec3::new(20.0, 0.0, 0.0));

    play(&character, FISTS_DASH_ANIMATION);
    assert!(!combatant.is_dash_tracking());

    play(&character, WEAPON_DASH_ANIMATION);
    play(&character, WEAPON_DASH_ANIMATION);
    assert!(combatant.is_dash_tracking());
    assert_eq!(arena.scheduler.heartbeat().connection_count(), 1);

    arena.scheduler.step(0.016);
    assert!(arena.keys.is_empty());

    move_to(&character, Vec3::new(0.0, 0.0, 13.0));
    arena.scheduler.step(0.016);
    arena.scheduler.step(0.016);
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, true)]);
    assert!(combatant.is_in_dash_range());

    move_to(&character, Vec3::new(0.0, 0.0, 14.0));
    arena.scheduler.step(0.016);
    arena.scheduler.step(0.016);
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, false)]);
}

#[test]
fn test_death_mid_dash_releases_block() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Cyborg), Vec3::new(3.0, 0.0, 3.0));

    play(&character, FISTS_DASH_ANIMATION);
    arena.scheduler.step(0.016);
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, true)]);

    character.humanoid.get().expect("humanoid").kill();
    assert!(combatant.is_destroyed());
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, false)]);
    assert_eq!(arena.scheduler.heartbeat().connection_count(), 0);
}

#[test]
fn test_destroy_cancels_pending_block_timer() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Batter), Vec3::new(1.0, 0.0, 0.0));

    character.attack_fired.fire(&());
    assert_eq!(arena.scheduler.pending_timers(), 1);

    combatant.destroy();
    combatant.destroy();
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, true), (KeyCode::KeyF, false)]);
    assert_eq!(arena.scheduler.pending_timers(), 0);

    character.attack_fired.fire(&());
    assert!(arena.keys.is_empty());
}

#[test]
fn test_no_agent_rig_means_no_block() {
    let arena = arena();
    arena.ctx.agent.clear();
    let (character, _combatant) = enemy(&arena, Some(Archetype::Hunter), Vec3::new(1.0, 0.0, 0.0));

    character.attack_fired.fire(&());
    assert!(arena.keys.is_empty());
}

#[test]
fn test_extreme_combo_saturates_stage() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Ninja), Vec3::new(4.0, 0.0, 0.0));

    character.attributes.set(COMBO_ATTRIBUTE, -1.0e12);
    assert_eq!(combatant.combo_stage(), i32::MIN);

    character.attack_fired.fire(&());
    assert_eq!(arena.keys.drain(), vec![(KeyCode::KeyF, true)]);

    character.attributes.set(COMBO_ATTRIBUTE, 1.0e12);
    assert_eq!(combatant.combo_stage(), i32::MAX - 2);

    character.attributes.set(COMBO_ATTRIBUTE, f64::NAN);
    assert_eq!(combatant.combo_stage(), -2);
}

#[test]
fn test_repeated_attacks_keep_bag_bounded() {
    let arena = arena();
    let (character, combatant) = enemy(&arena, Some(Archetype::Hunter), Vec3::new(6.0, 0.0, 0.0));
    let baseline = combatant.bag().len();

    for _ in 0..1000 {
        character.attack_fired.fire(&());
        arena.scheduler.step(1.0);
    }

    assert_eq!(combatant.bag().len(), baseline);
    assert!(!arena.ctx.counter.is_blocking());

    character.attack_fired.fire(&());
    assert_eq!(arena.scheduler.pending_timers(), 1);
    combatant.destroy();
    assert_eq!(arena.scheduler.pending_timers(), 0);
}
