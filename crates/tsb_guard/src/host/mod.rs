//! In-memory host model: roster, players, characters, rig parts, input.
//!
//! Это "tactical layer" со стороны хоста. Guard runtime видит хост только
//! через эти типы: lifecycle signals, позиции частей, атрибуты, анимации,
//! ввод и абстрактный [`VirtualInput`] эффект. Bevy bridge наполняет модель
//! из `HostEvent`.

pub mod attributes;
pub mod slot;

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use bevy::input::keyboard::KeyCode;
use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{Scheduler, Signal};

pub use attributes::{AttributeChange, AttributeStore, AttributeValue, ARCHETYPE_ATTRIBUTE, COMBO_ATTRIBUTE};
pub use slot::ChildSlot;

pub const ROOT_PART_NAME: &str = "HumanoidRootPart";
pub const HUMANOID_NAME: &str = "Humanoid";
pub const ANIMATOR_NAME: &str = "Animator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u64);

/// Horizontal-plane distance (vertical component masked out).
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    ((a - b) * Vec3::new(1.0, 0.0, 1.0)).length()
}

// ============================================================================
// Rig parts
// ============================================================================

#[derive(Debug)]
pub struct Part {
    name: String,
    position: Cell<Vec3>,
}

impl Part {
    pub fn new(name: impl Into<String>, position: Vec3) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            position: Cell::new(position),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position.get()
    }

    pub fn set_position(&self, position: Vec3) {
        self.position.set(position);
    }
}

/// Track reported by [`Animator::played`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationTrack {
    pub animation_id: String,
}

#[derive(Debug, Default)]
pub struct Animator {
    pub played: Signal<AnimationTrack>,
}

impl Animator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn play(&self, animation_id: impl Into<String>) {
        self.played.fire(&AnimationTrack {
            animation_id: animation_id.into(),
        });
    }
}

/// Animation-capable controller of a character.
#[derive(Debug)]
pub struct Humanoid {
    pub died: Signal<()>,
    pub animator: ChildSlot<Rc<Animator>>,
    dead: Cell<bool>,
}

impl Humanoid {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            died: Signal::new(),
            animator: ChildSlot::new(ANIMATOR_NAME),
            dead: Cell::new(false),
        })
    }

    /// Fires `died` once.
    pub fn kill(&self) {
        if !self.dead.replace(true) {
            self.died.fire(&());
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead.get()
    }
}

// ============================================================================
// Character
// ============================================================================

pub struct Character {
    id: CharacterId,
    name: String,
    pub root: ChildSlot<Rc<Part>>,
    pub humanoid: ChildSlot<Rc<Humanoid>>,
    pub attributes: AttributeStore,
    /// Normal (M1) attack fired by this character
    pub attack_fired: Signal<()>,
    pub destroying: Signal<()>,
    destroyed: Cell<bool>,
}

impl fmt::Debug for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Character")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl Character {
    /// Empty model; parts arrive later through the slots.
    pub fn new(id: CharacterId, name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id,
            name: name.into(),
            root: ChildSlot::new(ROOT_PART_NAME),
            humanoid: ChildSlot::new(HUMANOID_NAME),
            attributes: AttributeStore::new(),
            attack_fired: Signal::new(),
            destroying: Signal::new(),
            destroyed: Cell::new(false),
        })
    }

    /// Model with root part, humanoid and animator already in place.
    pub fn assembled(id: CharacterId, name: impl Into<String>, position: Vec3) -> Rc<Self> {
        let character = Self::new(id, name);
        character.root.set(Part::new(ROOT_PART_NAME, position));
        let humanoid = Humanoid::new();
        humanoid.animator.set(Animator::new());
        character.humanoid.set(humanoid);
        character
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_position(&self) -> Option<Vec3> {
        self.root.get().map(|part| part.position())
    }

    /// Fires `destroying` once.
    pub fn destroy(&self) {
        if !self.destroyed.replace(true) {
            self.destroying.fire(&());
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

// ============================================================================
// Player + roster
// ============================================================================

pub struct Player {
    id: PlayerId,
    name: String,
    pub attributes: AttributeStore,
    character: RefCell<Option<Rc<Character>>>,
    pub character_added: Signal<Rc<Character>>,
    pub character_removing: Signal<Rc<Character>>,
    in_game: Cell<bool>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("in_game", &self.in_game.get())
            .finish()
    }
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id,
            name: name.into(),
            attributes: AttributeStore::new(),
            character: RefCell::new(None),
            character_added: Signal::new(),
            character_removing: Signal::new(),
            in_game: Cell::new(true),
        })
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn character(&self) -> Option<Rc<Character>> {
        self.character.borrow().clone()
    }

    /// False once the player has left the roster.
    pub fn is_in_game(&self) -> bool {
        self.in_game.get()
    }

    /// Replaces the current character (removing the old one first).
    pub fn load_character(&self, character: Rc<Character>) {
        self.remove_character();
        *self.character.borrow_mut() = Some(character.clone());
        self.character_added.fire(&character);
    }

    /// CharacterRemoving → unset → Destroying.
    pub fn remove_character(&self) {
        let current = self.character.borrow().clone();
        let Some(character) = current else {
            return;
        };
        self.character_removing.fire(&character);
        self.character.borrow_mut().take();
        character.destroy();
    }
}

#[derive(Default)]
pub struct PlayerService {
    roster: RefCell<Vec<Rc<Player>>>,
    local: RefCell<Option<Rc<Player>>>,
    pub player_added: Signal<Rc<Player>>,
    pub player_removing: Signal<Rc<Player>>,
}

impl fmt::Debug for PlayerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerService")
            .field("players", &self.roster.borrow().len())
            .field("local", &self.local.borrow().as_ref().map(|p| p.id()))
            .finish()
    }
}

impl PlayerService {
    pub fn players(&self) -> Vec<Rc<Player>> {
        self.roster.borrow().clone()
    }

    pub fn local_player(&self) -> Option<Rc<Player>> {
        self.local.borrow().clone()
    }

    pub fn find(&self, id: PlayerId) -> Option<Rc<Player>> {
        self.roster.borrow().iter().find(|p| p.id() == id).cloned()
    }

    /// The player running this process; joins silently (no `player_added`).
    pub fn set_local_player(&self, id: PlayerId, name: impl Into<String>) -> Rc<Player> {
        let player = Player::new(id, name);
        self.roster.borrow_mut().push(player.clone());
        *self.local.borrow_mut() = Some(player.clone());
        player
    }

    pub fn add_player(&self, id: PlayerId, name: impl Into<String>) -> Rc<Player> {
        let player = Player::new(id, name);
        self.roster.borrow_mut().push(player.clone());
        self.player_added.fire(&player);
        player
    }

    /// PlayerRemoving → character removed → dropped from roster.
    pub fn remove_player(&self, id: PlayerId) -> Option<Rc<Player>> {
        let player = self.find(id)?;
        self.player_removing.fire(&player);
        player.remove_character();
        player.in_game.set(false);
        self.roster.borrow_mut().retain(|p| p.id() != id);
        Some(player)
    }
}

// ============================================================================
// Input
// ============================================================================

/// Host keyboard events.
#[derive(Debug, Default)]
pub struct InputService {
    pub key_down: Signal<KeyCode>,
    pub key_up: Signal<KeyCode>,
}

impl InputService {
    pub fn press(&self, key: KeyCode) {
        self.key_down.fire(&key);
    }

    pub fn release(&self, key: KeyCode) {
        self.key_up.fire(&key);
    }
}

/// Simulated key effect (the defensive-action trigger).
pub trait VirtualInput {
    fn send_key(&self, key: KeyCode, pressed: bool);
}

/// [`VirtualInput`] that records effects until someone drains them.
#[derive(Debug, Default)]
pub struct KeyQueue {
    effects: RefCell<Vec<(KeyCode, bool)>>,
}

impl KeyQueue {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn drain(&self) -> Vec<(KeyCode, bool)> {
        std::mem::take(&mut *self.effects.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.effects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.borrow().is_empty()
    }
}

impl VirtualInput for KeyQueue {
    fn send_key(&self, key: KeyCode, pressed: bool) {
        self.effects.borrow_mut().push((key, pressed));
    }
}

// ============================================================================
// Host world
// ============================================================================

/// Host-global table (`_G`-style sentinels shared by every script).
#[derive(Debug, Clone, Default)]
pub struct HostGlobals {
    keys: Rc<RefCell<HashSet<String>>>,
}

impl HostGlobals {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.borrow().contains(key)
    }

    /// Returns false if the key was already set.
    pub fn claim(&self, key: &str) -> bool {
        self.keys.borrow_mut().insert(key.to_string())
    }

    pub fn release(&self, key: &str) {
        self.keys.borrow_mut().remove(key);
    }
}

#[derive(Debug, Default)]
pub struct HostWorld {
    pub players: PlayerService,
    pub input: InputService,
    pub scheduler: Scheduler,
    pub globals: HostGlobals,
}

impl HostWorld {
    pub fn new() -> Self {
        Self::default()
    }
}
