//! Character archetypes: block timing tables + dash animation tags.
//!
//! Все архетипы ведут себя одинаково: отличаются только данными
//! ([`ArchetypeProfile`]).

use serde::{Deserialize, Serialize};

/// Dash animation played with bare fists.
pub const FISTS_DASH_ANIMATION: &str = "anim:fists-dash";
/// Dash animation played with a weapon (bat, sword, ninja blade).
pub const WEAPON_DASH_ANIMATION: &str = "anim:weapon-dash";

// Block durations (seconds), indexed by combo stage
pub const BALD_COMBO_TIMINGS: [f32; 4] = [0.20, 0.22, 0.25, 0.30];
pub const HUNTER_COMBO_TIMINGS: [f32; 4] = [0.20, 0.24, 0.26, 0.32];
pub const CYBORG_COMBO_TIMINGS: [f32; 4] = [0.18, 0.22, 0.24, 0.30];
pub const NINJA_COMBO_TIMINGS: [f32; 4] = [0.16, 0.18, 0.22, 0.28];
pub const BATTER_COMBO_TIMINGS: [f32; 4] = [0.22, 0.26, 0.28, 0.34];
pub const BLADE_COMBO_TIMINGS: [f32; 4] = [0.20, 0.22, 0.26, 0.30];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Bald,
    Hunter,
    Cyborg,
    Ninja,
    Batter,
    Blade,
}

impl Archetype {
    pub const ALL: [Archetype; 6] = [
        Archetype::Bald,
        Archetype::Hunter,
        Archetype::Cyborg,
        Archetype::Ninja,
        Archetype::Batter,
        Archetype::Blade,
    ];

    /// Parses the host attribute tag. Unknown tags → `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|archetype| archetype.tag() == tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Archetype::Bald => "Bald",
            Archetype::Hunter => "Hunter",
            Archetype::Cyborg => "Cyborg",
            Archetype::Ninja => "Ninja",
            Archetype::Batter => "Batter",
            Archetype::Blade => "Blade",
        }
    }

    pub fn profile(&self) -> ArchetypeProfile {
        let (timings, dash) = match self {
            Archetype::Bald => (BALD_COMBO_TIMINGS, DashKind::Fists),
            Archetype::Hunter => (HUNTER_COMBO_TIMINGS, DashKind::Fists),
            Archetype::Cyborg => (CYBORG_COMBO_TIMINGS, DashKind::Fists),
            Archetype::Ninja => (NINJA_COMBO_TIMINGS, DashKind::Weapon),
            Archetype::Batter => (BATTER_COMBO_TIMINGS, DashKind::Weapon),
            Archetype::Blade => (BLADE_COMBO_TIMINGS, DashKind::Weapon),
        };
        ArchetypeProfile { timings, dash }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashKind {
    Fists,
    Weapon,
}

impl DashKind {
    pub fn animation_id(&self) -> &'static str {
        match self {
            DashKind::Fists => FISTS_DASH_ANIMATION,
            DashKind::Weapon => WEAPON_DASH_ANIMATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub timings: [f32; 4],
    pub dash: DashKind,
}

impl ArchetypeProfile {
    /// Block duration for a combo stage. Stage wraps modulo the table length,
    /// so stage -1 (combo 1) picks the last entry.
    pub fn block_duration(&self, combo_stage: i32) -> f32 {
        let index = combo_stage.rem_euclid(self.timings.len() as i32) as usize;
        self.timings[index]
    }

    pub fn is_dash(&self, animation_id: &str) -> bool {
        self.dash.animation_id() == animation_id
    }
}
