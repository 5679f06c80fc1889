//! Bevy bridge: HostEvent → host model → GuardRuntime → KeyEffect.
//!
//! Architecture: host model и runtime на Rc/RefCell (`!Send`), поэтому живут
//! в NonSend resource [`HostBridge`] и трогаются только main-thread системами.
//!
//! NAMING: `_main_thread` суффикс = системы с NonSend доступом.
//!
//! Порядок в кадре (chain):
//! 1. apply_host_events_main_thread: события хоста применяются к модели
//! 2. step_scheduler_main_thread: timers + heartbeat на `Time::delta`
//! 3. emit_key_effects_main_thread: накопленные key effects → `KeyEffect`

use std::collections::HashMap;
use std::rc::Rc;

use bevy::input::keyboard::KeyCode;
use bevy::prelude::*;

use crate::config::{GuardConfig, KeyBindings};
use crate::controllers::{GuardRuntime, RUNNING_SENTINEL};
use crate::error::StartupError;
use crate::host::{Animator, AttributeValue, Character, CharacterId, HostWorld, Humanoid, KeyQueue, Part, PlayerId, ROOT_PART_NAME};
use crate::logger;

/// Rig part announced by the host after the character model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigPartKind {
    Root,
    Humanoid,
    Animator,
}

/// Host-side happenings, fed in by whatever embeds the guard.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// `local = true` marks the player running this process (starts the guard)
    PlayerAdded { player: PlayerId, name: String, local: bool },
    PlayerRemoving { player: PlayerId },
    CharacterSpawned { player: PlayerId, character: CharacterId },
    PartAdded { character: CharacterId, part: RigPartKind, position: Vec3 },
    CharacterRemoving { player: PlayerId },
    HumanoidDied { character: CharacterId },
    CharacterMoved { character: CharacterId, position: Vec3 },
    /// `value = None` clears the attribute
    PlayerAttributeSet { player: PlayerId, key: String, value: Option<AttributeValue> },
    CharacterAttributeSet { character: CharacterId, key: String, value: Option<AttributeValue> },
    AttackFired { character: CharacterId },
    AnimationPlayed { character: CharacterId, animation_id: String },
    KeyInput { key: KeyCode, pressed: bool },
    /// Counter tap request (gated by the toggle)
    Counter,
}

/// Simulated key press/release produced by the guard.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEffect {
    pub key: KeyCode,
    pub pressed: bool,
}

/// Observer-facing snapshot, refreshed every frame.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct GuardStatus {
    pub running: bool,
    pub blocking: bool,
    pub block_enabled: bool,
    pub active_players: usize,
    pub last_error: Option<String>,
}

/// Host model + runtime. NonSend resource: main thread only.
pub struct HostBridge {
    // runtime объявлен первым: drop → stop() пока host ещё жив
    runtime: Option<GuardRuntime>,
    host: HostWorld,
    characters: HashMap<CharacterId, Rc<Character>>,
    keys: Rc<KeyQueue>,
    last_error: Option<String>,
}

impl Default for HostBridge {
    fn default() -> Self {
        Self {
            runtime: None,
            host: HostWorld::new(),
            characters: HashMap::new(),
            keys: KeyQueue::new(),
            last_error: None,
        }
    }
}

impl HostBridge {
    pub fn host(&self) -> &HostWorld {
        &self.host
    }

    pub fn runtime(&self) -> Option<&GuardRuntime> {
        self.runtime.as_ref()
    }

    pub fn character(&self, id: CharacterId) -> Option<Rc<Character>> {
        self.characters.get(&id).cloned()
    }

    pub fn apply(&mut self, event: &HostEvent, config: &GuardConfig, bindings: &KeyBindings) {
        match event {
            HostEvent::PlayerAdded { player, name, local } => {
                if *local {
                    // Отказ до любых изменений roster
                    if self.host.globals.contains(RUNNING_SENTINEL) {
                        self.reject_start(StartupError::AlreadyRunning);
                        return;
                    }
                    self.host.players.set_local_player(*player, name.clone());
                    self.start(config, bindings);
                } else {
                    self.host.players.add_player(*player, name.clone());
                }
            }
            HostEvent::PlayerRemoving { player } => {
                self.host.players.remove_player(*player);
            }
            HostEvent::CharacterSpawned { player, character } => {
                let Some(owner) = self.host.players.find(*player) else {
                    logger::log_warning(&format!("⚠️ CharacterSpawned for unknown player {:?}", player));
                    return;
                };
                let model = Character::new(*character, owner.name());
                self.characters.insert(*character, model.clone());
                owner.load_character(model);
            }
            HostEvent::PartAdded { character, part, position } => {
                let Some(model) = self.characters.get(character) else {
                    return;
                };
                match part {
                    RigPartKind::Root => model.root.set(Part::new(ROOT_PART_NAME, *position)),
                    RigPartKind::Humanoid => model.humanoid.set(Humanoid::new()),
                    RigPartKind::Animator => match model.humanoid.get() {
                        Some(humanoid) => humanoid.animator.set(Animator::new()),
                        None => logger::log_warning(&format!(
                            "⚠️ Animator before Humanoid on {:?}, ignored",
                            character
                        )),
                    },
                }
            }
            HostEvent::CharacterRemoving { player } => {
                if let Some(owner) = self.host.players.find(*player) {
                    owner.remove_character();
                }
            }
            HostEvent::HumanoidDied { character } => {
                if let Some(humanoid) = self.characters.get(character).and_then(|model| model.humanoid.get()) {
                    humanoid.kill();
                }
            }
            HostEvent::CharacterMoved { character, position } => {
                if let Some(root) = self.characters.get(character).and_then(|model| model.root.get()) {
                    root.set_position(*position);
                }
            }
            HostEvent::PlayerAttributeSet { player, key, value } => {
                if let Some(owner) = self.host.players.find(*player) {
                    match value {
                        Some(value) => owner.attributes.set(key, value.clone()),
                        None => owner.attributes.clear(key),
                    }
                }
            }
            HostEvent::CharacterAttributeSet { character, key, value } => {
                if let Some(model) = self.characters.get(character) {
                    match value {
                        Some(value) => model.attributes.set(key, value.clone()),
                        None => model.attributes.clear(key),
                    }
                }
            }
            HostEvent::AttackFired { character } => {
                if let Some(model) = self.characters.get(character) {
                    model.attack_fired.fire(&());
                }
            }
            HostEvent::AnimationPlayed { character, animation_id } => {
                if let Some(animator) = self
                    .characters
                    .get(character)
                    .and_then(|model| model.humanoid.get())
                    .and_then(|humanoid| humanoid.animator.get())
                {
                    animator.play(animation_id.clone());
                }
            }
            HostEvent::KeyInput { key, pressed } => {
                if *pressed {
                    self.host.input.press(*key);
                } else {
                    self.host.input.release(*key);
                }
            }
            HostEvent::Counter => {
                if let Some(runtime) = &self.runtime {
                    runtime.counter();
                }
            }
        }

        self.characters.retain(|_, model| !model.is_destroyed());
    }

    fn start(&mut self, config: &GuardConfig, bindings: &KeyBindings) {
        match GuardRuntime::start(&self.host, config.clone(), *bindings, self.keys.clone()) {
            Ok(runtime) => {
                self.runtime = Some(runtime);
                self.last_error = None;
            }
            Err(error) => self.reject_start(error),
        }
    }

    fn reject_start(&mut self, error: StartupError) {
        logger::log_error(&format!("❌ Guard start failed: {}", error));
        self.last_error = Some(error.to_string());
    }

    fn status(&self) -> GuardStatus {
        let running = self.runtime.as_ref().filter(|runtime| runtime.is_running());
        GuardStatus {
            running: running.is_some(),
            blocking: running.is_some_and(|runtime| runtime.context().counter.is_blocking()),
            block_enabled: running.is_some_and(|runtime| runtime.context().counter.is_block_enabled()),
            active_players: running.map_or(0, |runtime| runtime.context().active_count()),
            last_error: self.last_error.clone(),
        }
    }
}

/// Applies queued host events to the host model (main thread only)
pub fn apply_host_events_main_thread(
    mut bridge: NonSendMut<HostBridge>,
    mut events: EventReader<HostEvent>,
    config: Res<GuardConfig>,
    bindings: Res<KeyBindings>,
) {
    for event in events.read() {
        bridge.apply(event, &config, &bindings);
    }
}

/// Advances guard timers and heartbeat by the frame delta
pub fn step_scheduler_main_thread(bridge: NonSend<HostBridge>, time: Res<Time>) {
    bridge.host.scheduler.step(time.delta_secs());
}

pub fn emit_key_effects_main_thread(
    bridge: NonSend<HostBridge>,
    mut effects: EventWriter<KeyEffect>,
    mut status: ResMut<GuardStatus>,
) {
    for (key, pressed) in bridge.keys.drain() {
        effects.write(KeyEffect { key, pressed });
    }

    let current = bridge.status();
    if *status != current {
        *status = current;
    }
}

/// Guard plugin: events, resources, NonSend bridge, per-frame systems.
pub struct GuardPlugin;

impl Plugin for GuardPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GuardConfig>()
            .init_resource::<KeyBindings>()
            .init_resource::<GuardStatus>()
            .add_event::<HostEvent>()
            .add_event::<KeyEffect>()
            .insert_non_send_resource(HostBridge::default())
            .add_systems(
                Update,
                (
                    apply_host_events_main_thread,
                    step_scheduler_main_thread,
                    emit_key_effects_main_thread,
                )
                    .chain(),
            );
    }
}
