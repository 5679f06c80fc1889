//! DisposalBag: ordered set of disposables with single-shot teardown.
//!
//! Insertion order = destruction order. После `destroy()` bag навсегда пуст:
//! всё, что добавляется позже, уничтожается сразу (ничто не переживает owner).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::scheduler::TaskHandle;
use super::signal::Connection;
use crate::logger;

/// Object with an explicit teardown operation.
pub trait Destroy {
    fn destroy(&self);
}

/// One entry of a [`DisposalBag`].
pub enum Disposable {
    /// Called once on teardown
    Callback(Box<dyn FnOnce()>),
    /// Disconnected on teardown
    Connection(Connection),
    /// Cancelled on teardown (no-op if it already ran)
    Task(TaskHandle),
    /// `destroy()`-ed on teardown
    Object(Rc<dyn Destroy>),
    /// Nested bag, destroyed on teardown
    Bag(DisposalBag),
}

impl Disposable {
    pub fn callback(run: impl FnOnce() + 'static) -> Self {
        Disposable::Callback(Box::new(run))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Disposable::Callback(_) => "callback",
            Disposable::Connection(_) => "connection",
            Disposable::Task(_) => "task",
            Disposable::Object(_) => "object",
            Disposable::Bag(_) => "bag",
        }
    }

    fn dispose(self) {
        match self {
            Disposable::Callback(run) => run(),
            Disposable::Connection(connection) => connection.disconnect(),
            Disposable::Task(task) => task.cancel(),
            Disposable::Object(object) => object.destroy(),
            Disposable::Bag(bag) => bag.destroy(),
        }
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Disposable").field(&self.kind()).finish()
    }
}

impl From<Connection> for Disposable {
    fn from(connection: Connection) -> Self {
        Disposable::Connection(connection)
    }
}

impl From<TaskHandle> for Disposable {
    fn from(task: TaskHandle) -> Self {
        Disposable::Task(task)
    }
}

impl From<DisposalBag> for Disposable {
    fn from(bag: DisposalBag) -> Self {
        Disposable::Bag(bag)
    }
}

impl<D: Destroy + 'static> From<Rc<D>> for Disposable {
    fn from(object: Rc<D>) -> Self {
        Disposable::Object(object)
    }
}

/// Disposes one entry; a panic is logged and swallowed so the walk goes on.
fn dispose_isolated(disposable: Disposable) {
    let kind = disposable.kind();
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| disposable.dispose())) {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        logger::log_error(&format!("❌ Disposal of {} panicked: {}", kind, reason));
    }
}

struct BagInner {
    entries: RefCell<VecDeque<Disposable>>,
    destroyed: Cell<bool>,
}

/// Shared handle; clones refer to the same bag.
#[derive(Clone)]
pub struct DisposalBag {
    inner: Rc<BagInner>,
}

impl Default for DisposalBag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DisposalBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposalBag")
            .field("len", &self.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl DisposalBag {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BagInner {
                entries: RefCell::new(VecDeque::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// Appends a handle and hands it back for inline use.
    pub fn add<T>(&self, item: T) -> T
    where
        T: Clone + Into<Disposable>,
    {
        self.push(item.clone().into());
        item
    }

    /// Appends a teardown callback.
    pub fn add_fn(&self, run: impl FnOnce() + 'static) {
        self.push(Disposable::callback(run));
    }

    /// Appends handles in call order and hands them back.
    pub fn batch<T, const N: usize>(&self, items: [T; N]) -> [T; N]
    where
        T: Clone + Into<Disposable>,
    {
        for item in &items {
            self.push(item.clone().into());
        }
        items
    }

    pub fn push(&self, disposable: Disposable) {
        if self.inner.destroyed.get() {
            dispose_isolated(disposable);
            return;
        }
        self.inner.entries.borrow_mut().push_back(disposable);
    }

    /// Disposes every entry head → tail. Second and later calls are no-ops.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }

        loop {
            // borrow отпускается до dispose: entry может трогать этот же bag
            let next = self.inner.entries.borrow_mut().pop_front();
            let Some(disposable) = next else {
                break;
            };
            dispose_isolated(disposable);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    pub fn downgrade(&self) -> WeakBag {
        WeakBag {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Destroy for DisposalBag {
    fn destroy(&self) {
        DisposalBag::destroy(self);
    }
}

/// Non-owning handle for self-destruct triggers (avoids bag ↔ signal cycles).
#[derive(Clone)]
pub struct WeakBag {
    inner: Weak<BagInner>,
}

impl WeakBag {
    pub fn upgrade(&self) -> Option<DisposalBag> {
        self.inner.upgrade().map(|inner| DisposalBag { inner })
    }

    pub fn destroy(&self) {
        if let Some(bag) = self.upgrade() {
            bag.destroy();
        }
    }

    /// Adds to the bag if it is still alive; otherwise disposes right away.
    pub fn add(&self, item: impl Into<Disposable>) {
        match self.upgrade() {
            Some(bag) => bag.push(item.into()),
            None => dispose_isolated(item.into()),
        }
    }
}

impl fmt::Debug for WeakBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBag")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
