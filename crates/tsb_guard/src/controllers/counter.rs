//! CounterController: block/counter key state machine.
//!
//! Block key зажат, пока `blockables` не пуст И toggle удерживается.
//! Переходы only-on-edge: повторный add/remove ключ не трогает.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::components::CombatantId;
use crate::config::KeyBindings;
use crate::host::{InputService, VirtualInput};
use crate::lifecycle::{DisposalBag, Scheduler, TaskHandle};
use crate::logger;

pub struct CounterController {
    output: Rc<dyn VirtualInput>,
    bindings: KeyBindings,
    scheduler: Scheduler,
    counter_hold: f32,
    block_enabled: Cell<bool>,
    counter_enabled: Cell<bool>,
    blocking: Cell<bool>,
    blockables: RefCell<BTreeSet<CombatantId>>,
}

impl fmt::Debug for CounterController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterController")
            .field("block_enabled", &self.block_enabled.get())
            .field("counter_enabled", &self.counter_enabled.get())
            .field("blocking", &self.blocking.get())
            .field("blockables", &self.blockables.borrow().len())
            .finish()
    }
}

impl CounterController {
    pub fn new(
        output: Rc<dyn VirtualInput>,
        bindings: KeyBindings,
        scheduler: Scheduler,
        counter_hold: f32,
    ) -> Rc<Self> {
        Rc::new(Self {
            output,
            bindings,
            scheduler,
            counter_hold,
            block_enabled: Cell::new(false),
            counter_enabled: Cell::new(false),
            blocking: Cell::new(false),
            blockables: RefCell::new(BTreeSet::new()),
        })
    }

    /// Subscribes to the toggle key. Destroying the returned bag releases a
    /// held block key and forgets every pending request.
    pub fn init(self: &Rc<Self>, input: &InputService) -> DisposalBag {
        let bag = DisposalBag::new();
        let toggle = self.bindings.toggle;

        bag.batch([
            input.key_down.connect({
                let weak = Rc::downgrade(self);
                move |key| {
                    if *key != toggle {
                        return;
                    }
                    if let Some(this) = weak.upgrade() {
                        this.set_enabled(true);
                    }
                }
            }),
            input.key_up.connect({
                let weak = Rc::downgrade(self);
                move |key| {
                    if *key != toggle {
                        return;
                    }
                    if let Some(this) = weak.upgrade() {
                        this.set_enabled(false);
                    }
                }
            }),
        ]);

        bag.add_fn({
            let weak = Rc::downgrade(self);
            move || {
                if let Some(this) = weak.upgrade() {
                    this.reset();
                }
            }
        });

        bag
    }

    pub fn add_block(&self, id: CombatantId) {
        self.blockables.borrow_mut().insert(id);
        if self.block_enabled.get() && !self.blocking.get() {
            self.press_block();
        }
    }

    pub fn remove_block(&self, id: CombatantId) {
        let now_empty = {
            let mut blockables = self.blockables.borrow_mut();
            blockables.remove(&id);
            blockables.is_empty()
        };
        if now_empty && self.blocking.get() {
            self.release_block();
        }
    }

    /// Requests a block now and schedules its removal after `duration`.
    pub fn block(self: &Rc<Self>, id: CombatantId, duration: f32) -> TaskHandle {
        self.add_block(id);
        let weak = Rc::downgrade(self);
        self.scheduler.delay(duration, move || {
            if let Some(this) = weak.upgrade() {
                this.remove_block(id);
            }
        })
    }

    /// Taps the counter key (gated by the toggle).
    pub fn counter(&self) -> Option<TaskHandle> {
        if !self.counter_enabled.get() {
            return None;
        }
        let key = self.bindings.counter;
        self.output.send_key(key, true);

        let output = self.output.clone();
        Some(self.scheduler.delay(self.counter_hold, move || {
            output.send_key(key, false);
        }))
    }

    /// Toggle edge. Включение при непустом наборе сразу жмёт block,
    /// выключение отпускает зажатую клавишу.
    pub fn set_enabled(&self, enabled: bool) {
        self.block_enabled.set(enabled);
        self.counter_enabled.set(enabled);
        logger::log(&format!("🎛️ Auto block/counter: {}", if enabled { "on" } else { "off" }));

        if enabled {
            if !self.blocking.get() && !self.blockables.borrow().is_empty() {
                self.press_block();
            }
        } else if self.blocking.get() {
            self.release_block();
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking.get()
    }

    pub fn is_block_enabled(&self) -> bool {
        self.block_enabled.get()
    }

    pub fn is_counter_enabled(&self) -> bool {
        self.counter_enabled.get()
    }

    pub fn is_requested(&self, id: CombatantId) -> bool {
        self.blockables.borrow().contains(&id)
    }

    pub fn blockable_count(&self) -> usize {
        self.blockables.borrow().len()
    }

    fn press_block(&self) {
        self.blocking.set(true);
        self.output.send_key(self.bindings.block, true);
    }

    fn release_block(&self) {
        self.blocking.set(false);
        self.output.send_key(self.bindings.block, false);
    }

    fn reset(&self) {
        self.blockables.borrow_mut().clear();
        if self.blocking.get() {
            self.release_block();
        }
        self.block_enabled.set(false);
        self.counter_enabled.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::KeyQueue;
    use bevy::input::keyboard::KeyCode;

    fn setup() -> (Rc<CounterController>, Rc<KeyQueue>, InputService, Scheduler, DisposalBag) {
        let keys = KeyQueue::new();
        let scheduler = Scheduler::new();
        let input = InputService::default();
        let counter = CounterController::new(keys.clone(), KeyBindings::default(), scheduler.clone(), 0.1);
        let bag = counter.init(&input);
        (counter, keys, input, scheduler, bag)
    }

    #[test]
    fn test_block_key_follows_set_edges() {
        let (counter, keys, input, _scheduler, _bag) = setup();
        input.press(KeyCode::AltLeft);

        counter.add_block(CombatantId(1));
        counter.add_block(CombatantId(2));
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, true)]);

        counter.remove_block(CombatantId(1));
        assert!(keys.is_empty());
        assert!(counter.is_blocking());

        counter.remove_block(CombatantId(2));
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, false)]);
        assert!(!counter.is_blocking());
    }

    #[test]
    fn test_disabled_toggle_records_but_never_presses() {
        let (counter, keys, input, _scheduler, _bag) = setup();

        counter.add_block(CombatantId(7));
        assert!(keys.is_empty());
        assert!(counter.is_requested(CombatantId(7)));

        // Toggle с уже ожидающим запросом → сразу block
        input.press(KeyCode::AltLeft);
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, true)]);

        input.release(KeyCode::AltLeft);
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, false)]);
        assert!(counter.is_requested(CombatantId(7)));
    }

    #[test]
    fn test_timed_block_releases_after_duration() {
        let (counter, keys, input, scheduler, _bag) = setup();
        input.press(KeyCode::AltLeft);

        counter.block(CombatantId(3), 0.24);
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, true)]);

        scheduler.step(0.2);
        assert!(counter.is_blocking());
        scheduler.step(0.05);
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, false)]);
        assert_eq!(counter.blockable_count(), 0);
    }

    #[test]
    fn test_counter_is_gated_and_released() {
        let (counter, keys, input, scheduler, _bag) = setup();

        assert!(counter.counter().is_none());
        assert!(keys.is_empty());

        input.press(KeyCode::AltLeft);
        assert!(counter.counter().is_some());
        assert_eq!(keys.drain(), vec![(KeyCode::KeyG, true)]);
        scheduler.step(0.1);
        assert_eq!(keys.drain(), vec![(KeyCode::KeyG, false)]);
    }

    #[test]
    fn test_other_keys_do_not_toggle() {
        let (counter, _keys, input, _scheduler, _bag) = setup();
        input.press(KeyCode::KeyW);
        assert!(!counter.is_block_enabled());
        input.press(KeyCode::AltLeft);
        input.release(KeyCode::KeyW);
        assert!(counter.is_counter_enabled());
    }

    #[test]
    fn test_teardown_releases_held_key_and_unsubscribes() {
        let (counter, keys, input, _scheduler, bag) = setup();
        input.press(KeyCode::AltLeft);
        counter.add_block(CombatantId(1));
        keys.drain();

        bag.destroy();
        assert_eq!(keys.drain(), vec![(KeyCode::KeyF, false)]);
        assert_eq!(counter.blockable_count(), 0);

        input.press(KeyCode::AltLeft);
        assert!(!counter.is_block_enabled());
    }
}
