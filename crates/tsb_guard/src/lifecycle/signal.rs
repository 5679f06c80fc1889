//! Single-threaded signals (subscribe → `Connection`, fire → handlers).
//!
//! Handlers run in connect order. A handler disconnected while the signal is
//! firing is skipped for the rest of that fire.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Handler<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    alive: Rc<Cell<bool>>,
    handler: Handler<T>,
}

struct SignalInner<T> {
    slots: RefCell<Vec<Slot<T>>>,
}

/// Host event source (CharacterAdded, Died, AnimationPlayed, heartbeat...).
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                slots: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn connect(&self, handler: impl Fn(&T) + 'static) -> Connection {
        let alive = Rc::new(Cell::new(true));
        let mut slots = self.inner.slots.borrow_mut();
        slots.retain(|slot| slot.alive.get());
        slots.push(Slot {
            alive: alive.clone(),
            handler: Rc::new(handler),
        });
        Connection { alive }
    }

    /// Connects a handler that disconnects itself after the first fire.
    pub fn once(&self, handler: impl FnOnce(&T) + 'static) -> Connection {
        let handler = RefCell::new(Some(handler));
        let own = Rc::new(RefCell::new(None::<Connection>));
        let connection = self.connect({
            let own = own.clone();
            move |value| {
                if let Some(connection) = own.borrow_mut().take() {
                    connection.disconnect();
                }
                let handler = handler.borrow_mut().take();
                if let Some(handler) = handler {
                    handler(value);
                }
            }
        });
        *own.borrow_mut() = Some(connection.clone());
        connection
    }

    pub fn fire(&self, value: &T) {
        // Snapshot: handlers могут connect/disconnect во время fire
        let snapshot: Vec<(Rc<Cell<bool>>, Handler<T>)> = {
            let mut slots = self.inner.slots.borrow_mut();
            slots.retain(|slot| slot.alive.get());
            slots
                .iter()
                .map(|slot| (slot.alive.clone(), slot.handler.clone()))
                .collect()
        };

        for (alive, handler) in snapshot {
            if alive.get() {
                handler(value);
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner
            .slots
            .borrow()
            .iter()
            .filter(|slot| slot.alive.get())
            .count()
    }
}

/// Cancel token returned by [`Signal::connect`]. Cheap to clone; every clone
/// controls the same subscription.
#[derive(Clone)]
pub struct Connection {
    alive: Rc<Cell<bool>>,
}

impl Connection {
    pub fn disconnect(&self) {
        self.alive.set(false);
    }

    pub fn is_connected(&self) -> bool {
        self.alive.get()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish()
    }
}
