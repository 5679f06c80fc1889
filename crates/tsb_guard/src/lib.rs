//! TSB Guard: auto block/counter for a combat host.
//!
//! Слои:
//! - `lifecycle`: DisposalBag, Signal, Scheduler (однопоточное ядро)
//! - `host`: in-memory модель хоста (roster, персонажи, атрибуты, ввод)
//! - `components`: per-entity поведение (Rig → Combatant, Player)
//! - `controllers`: agent / counter / roster + GuardRuntime
//! - `bridge`: Bevy plugin: HostEvent in, KeyEffect out

use bevy::prelude::*;

pub mod bridge;
pub mod components;
pub mod config;
pub mod controllers;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logger;

pub use bridge::{GuardPlugin, GuardStatus, HostBridge, HostEvent, KeyEffect, RigPartKind};
pub use components::{Archetype, ArchetypeProfile, CombatantComponent, CombatantId, PlayerComponent, RigComponent};
pub use config::{GuardConfig, KeyBindings};
pub use controllers::{GuardContext, GuardRuntime, RUNNING_SENTINEL};
pub use error::{ConfigError, RigError, StartupError};
pub use lifecycle::{Connection, Disposable, DisposalBag, Scheduler, Signal, TaskHandle};
pub use logger::{init_logger, log, log_error, log_info, log_level, log_warning, set_log_level, set_logger, LogLevel, LogPrinter};

/// Создаёт minimal Bevy App для headless guard (без GuardPlugin)
pub fn create_headless_app() -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins);
    app
}
