//! Named child slot with bounded wait (WaitForChild-style resolution).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::lifecycle::{DisposalBag, Scheduler, Signal};

/// A child that may appear after its parent (root part, humanoid, animator).
pub struct ChildSlot<T: Clone + 'static> {
    name: &'static str,
    value: RefCell<Option<T>>,
    added: Signal<T>,
}

impl<T: Clone + 'static> fmt::Debug for ChildSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSlot")
            .field("name", &self.name)
            .field("present", &self.value.borrow().is_some())
            .finish()
    }
}

impl<T: Clone + 'static> ChildSlot<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value: RefCell::new(None),
            added: Signal::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> Option<T> {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = Some(value.clone());
        self.added.fire(&value);
    }

    pub fn clear(&self) {
        self.value.borrow_mut().take();
    }

    /// Resolves the child, waiting up to `timeout` seconds (`None` = forever).
    ///
    /// `on_done` receives `Some(child)` or `None` on timeout, exactly once.
    /// If the child is already present `on_done` runs before this returns.
    /// Destroying the returned bag cancels the wait; `on_done` is then dropped
    /// without being called.
    pub fn wait(
        &self,
        scheduler: &Scheduler,
        timeout: Option<f32>,
        on_done: impl FnOnce(Option<T>) + 'static,
    ) -> DisposalBag {
        let pending = DisposalBag::new();

        if let Some(value) = self.get() {
            pending.destroy();
            on_done(Some(value));
            return pending;
        }

        let callback: Rc<RefCell<Option<Box<dyn FnOnce(Option<T>)>>>> =
            Rc::new(RefCell::new(Some(Box::new(on_done))));

        let finish = {
            let callback = callback.clone();
            let pending = pending.downgrade();
            Rc::new(move |result: Option<T>| {
                let callback = callback.borrow_mut().take();
                pending.destroy();
                if let Some(callback) = callback {
                    callback(result);
                }
            })
        };

        pending.add(self.added.connect({
            let finish = finish.clone();
            move |value| finish(Some(value.clone()))
        }));
        if let Some(timeout) = timeout {
            pending.add(scheduler.delay(timeout, move || finish(None)));
        }
        pending.add_fn(move || {
            callback.borrow_mut().take();
        });

        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn capture() -> (Rc<RefCell<Option<Option<u32>>>>, impl FnOnce(Option<u32>)) {
        let out: Rc<RefCell<Option<Option<u32>>>> = Rc::new(RefCell::new(None));
        let sink = {
            let out = out.clone();
            move |value: Option<u32>| *out.borrow_mut() = Some(value)
        };
        (out, sink)
    }

    #[test]
    fn test_wait_resolves_immediately_when_present() {
        let scheduler = Scheduler::new();
        let slot = ChildSlot::new("Humanoid");
        slot.set(7u32);

        let (out, sink) = capture();
        let pending = slot.wait(&scheduler, Some(4.0), sink);

        assert_eq!(*out.borrow(), Some(Some(7)));
        assert!(pending.is_destroyed());
    }

    #[test]
    fn test_wait_resolves_when_child_appears() {
        let scheduler = Scheduler::new();
        let slot = ChildSlot::new("HumanoidRootPart");

        let (out, sink) = capture();
        let _pending = slot.wait(&scheduler, Some(4.0), sink);
        scheduler.step(1.0);
        assert_eq!(*out.borrow(), None);

        slot.set(3u32);
        assert_eq!(*out.borrow(), Some(Some(3)));

        // Таймер отменён: второго вызова нет
        scheduler.step(10.0);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_wait_times_out() {
        let scheduler = Scheduler::new();
        let slot = ChildSlot::<u32>::new("Animator");

        let (out, sink) = capture();
        let _pending = slot.wait(&scheduler, Some(10.0), sink);
        scheduler.step(9.0);
        assert_eq!(*out.borrow(), None);
        scheduler.step(1.5);
        assert_eq!(*out.borrow(), Some(None));

        // Появился после таймаута: уже никому не нужен
        slot.set(1);
        assert_eq!(*out.borrow(), Some(None));
    }

    #[test]
    fn test_cancelled_wait_never_calls_back() {
        let scheduler = Scheduler::new();
        let slot = ChildSlot::<u32>::new("Humanoid");
        let called = Rc::new(Cell::new(false));

        let pending = slot.wait(&scheduler, Some(4.0), {
            let called = called.clone();
            move |_| called.set(true)
        });
        pending.destroy();

        slot.set(1);
        scheduler.step(5.0);
        assert!(!called.get());
    }
}
