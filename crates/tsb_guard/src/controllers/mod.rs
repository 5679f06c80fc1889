//! Process-level controllers + the context object that owns them.
//!
//! # Архитектура
//!
//! ```text
//! GuardRuntime (bag)
//!  ├─ AgentController     локальный rig (от него меряем дистанции)
//!  ├─ CounterController   block/counter keys + toggle
//!  └─ ComponentController roster → PlayerComponent registry
//! ```
//!
//! Никаких глобальных singletons: всё shared state живёт в [`GuardContext`],
//! компоненты держат на него `Weak`.

pub mod agent;
pub mod component;
pub mod counter;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::components::{CombatantId, PlayerComponent};
use crate::config::{GuardConfig, KeyBindings};
use crate::error::StartupError;
use crate::host::{HostWorld, PlayerId, VirtualInput};
use crate::lifecycle::{DisposalBag, Scheduler, TaskHandle};
use crate::logger;

pub use agent::AgentController;
pub use component::ComponentController;
pub use counter::CounterController;

/// Host-global key marking a running guard (one per host process).
pub const RUNNING_SENTINEL: &str = "tsb-script";

/// Shared state of one running guard.
#[derive(Debug)]
pub struct GuardContext {
    pub config: GuardConfig,
    pub bindings: KeyBindings,
    pub scheduler: Scheduler,
    pub agent: Rc<AgentController>,
    pub counter: Rc<CounterController>,
    players: RefCell<BTreeMap<PlayerId, Rc<PlayerComponent>>>,
    next_combatant: Cell<u64>,
}

impl GuardContext {
    pub fn new(
        config: GuardConfig,
        bindings: KeyBindings,
        scheduler: Scheduler,
        output: Rc<dyn VirtualInput>,
    ) -> Rc<Self> {
        let counter = CounterController::new(output, bindings, scheduler.clone(), config.counter_hold);
        Rc::new(Self {
            config,
            bindings,
            scheduler,
            agent: Rc::new(AgentController::new()),
            counter,
            players: RefCell::new(BTreeMap::new()),
            next_combatant: Cell::new(1),
        })
    }

    pub fn next_combatant_id(&self) -> CombatantId {
        let id = self.next_combatant.get();
        self.next_combatant.set(id + 1);
        CombatantId(id)
    }

    pub fn player_component(&self, id: PlayerId) -> Option<Rc<PlayerComponent>> {
        self.players.borrow().get(&id).cloned()
    }

    /// Registered components ordered by player id.
    pub fn active_players(&self) -> Vec<Rc<PlayerComponent>> {
        self.players.borrow().values().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.players.borrow().len()
    }

    /// Registers `component`; a different component under the same id is destroyed.
    pub fn register_player(&self, id: PlayerId, component: Rc<PlayerComponent>) {
        let replaced = self.players.borrow_mut().insert(id, component.clone());
        if let Some(previous) = replaced {
            if !Rc::ptr_eq(&previous, &component) {
                previous.destroy();
            }
        }
    }

    /// Removes the entry for `id` only if it still points at `component`.
    pub fn unregister_player(&self, id: PlayerId, component: *const PlayerComponent) {
        let mut players = self.players.borrow_mut();
        let matches = players
            .get(&id)
            .is_some_and(|current| std::ptr::eq(Rc::as_ptr(current), component));
        if matches {
            players.remove(&id);
        }
    }

    /// Destroys every registered component (each one unregisters itself).
    pub fn destroy_players(&self) {
        for component in self.active_players() {
            component.destroy();
        }
    }
}

/// Top-level lifecycle: owns the context and every controller subscription.
#[derive(Debug)]
pub struct GuardRuntime {
    ctx: Rc<GuardContext>,
    bag: DisposalBag,
}

impl GuardRuntime {
    /// Starts the guard on `host`. Fails before touching any state when a
    /// guard is already running on this host or there is no local player.
    pub fn start(
        host: &HostWorld,
        config: GuardConfig,
        bindings: KeyBindings,
        output: Rc<dyn VirtualInput>,
    ) -> Result<Self, StartupError> {
        if host.globals.contains(RUNNING_SENTINEL) {
            return Err(StartupError::AlreadyRunning);
        }
        let local = host.players.local_player().ok_or(StartupError::NoLocalPlayer)?;
        host.globals.claim(RUNNING_SENTINEL);

        let ctx = GuardContext::new(config, bindings, host.scheduler.clone(), output);
        let bag = DisposalBag::new();

        bag.batch([
            ctx.agent.init(&local, &ctx.scheduler, ctx.config.rig_part_timeout),
            ctx.counter.init(&host.input),
            ComponentController::init(&ctx, &host.players),
        ]);
        bag.add_fn({
            let globals = host.globals.clone();
            move || globals.release(RUNNING_SENTINEL)
        });

        logger::log_info("Initialized Successfully");
        Ok(Self { ctx, bag })
    }

    pub fn context(&self) -> &Rc<GuardContext> {
        &self.ctx
    }

    pub fn counter(&self) -> Option<TaskHandle> {
        self.ctx.counter.counter()
    }

    pub fn is_running(&self) -> bool {
        !self.bag.is_destroyed()
    }

    /// Tears down controllers and components, releases held keys and the sentinel.
    pub fn stop(&self) {
        if self.bag.is_destroyed() {
            return;
        }
        self.bag.destroy();
        logger::log_info("Stopped");
    }
}

impl Drop for GuardRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
