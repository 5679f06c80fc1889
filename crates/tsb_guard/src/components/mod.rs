//! Guard components: per-entity behaviour with owned disposal bags.
//!
//! Иерархия через композицию:
//! - BaseComponent<T>: entity + bag
//! - RigComponent: + root part / humanoid, self-destroy на Died/Destroying
//! - CombatantComponent: + combo stage, block timing (ArchetypeProfile)
//! - PlayerComponent: + archetype tag, один живой CombatantComponent

pub mod archetype;
pub mod base;
pub mod combatant;
pub mod player;
pub mod rig;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod combatant_tests;

pub use archetype::{Archetype, ArchetypeProfile, DashKind, FISTS_DASH_ANIMATION, WEAPON_DASH_ANIMATION};
pub use base::BaseComponent;
pub use combatant::{CombatantComponent, CombatantId};
pub use player::{read_archetype, PlayerComponent};
pub use rig::{resolve_rig, RigComponent, RigParts};
