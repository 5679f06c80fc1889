//! Runtime configuration (thresholds, timeouts, key bindings).

use std::path::Path;
use std::time::Duration;

use bevy::input::keyboard::KeyCode;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::components::Archetype;
use crate::error::ConfigError;

/// Guard tuning. Every field has a default, so a RON file may list only the
/// values it overrides.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Stage = observed combo attribute - offset
    pub combo_offset: i32,
    /// Planar distance under which a normal attack triggers a timed block
    pub normal_block_range: f32,
    /// Planar distance under which a tracked dash holds the block
    pub dash_block_range: f32,
    /// Bounded wait for HumanoidRootPart / Humanoid (seconds)
    pub rig_part_timeout: f32,
    /// Bounded wait for the optional Animator (seconds)
    pub animator_timeout: f32,
    /// How long the counter key stays down (seconds)
    pub counter_hold: f32,
    /// Archetype assumed until the player attribute says otherwise
    pub default_archetype: Option<Archetype>,
    /// Frame rate of the headless driver (scheduler step = 1 / fixed_hz)
    pub fixed_hz: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            combo_offset: 2,
            normal_block_range: 12.0,
            dash_block_range: 14.0,
            rig_part_timeout: 4.0,
            animator_timeout: 10.0,
            counter_hold: 0.1,
            default_archetype: Some(Archetype::Bald),
            fixed_hz: 60.0,
        }
    }
}

impl GuardConfig {
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fixed_hz.max(1.0))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron(&source)
    }
}

/// Keys used by the block/counter controller.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    /// Held while blocking
    pub block: KeyCode,
    /// Tapped for a counter
    pub counter: KeyCode,
    /// Hold to enable auto block + counter
    pub toggle: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            block: KeyCode::KeyF,
            counter: KeyCode::KeyG,
            toggle: KeyCode::AltLeft,
        }
    }
}
