//! Cooperative task queue: deferred tasks, delayed tasks, per-frame heartbeat.
//!
//! Время виртуальное: двигается только через [`Scheduler::step`].
//! Порядок внутри step:
//! 1. deferred tasks (включая поставленные во время выполнения)
//! 2. timers с due <= now (по due, затем по порядку постановки)
//! 3. heartbeat(dt)
//! 4. deferred tasks, поставленные таймерами/heartbeat

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Cancelled,
    Finished,
}

/// Handle to a deferred or delayed task.
#[derive(Clone)]
pub struct TaskHandle {
    state: Rc<Cell<TaskState>>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            state: Rc::new(Cell::new(TaskState::Pending)),
        }
    }

    /// Cancels the task if it has not run yet. No-op otherwise.
    pub fn cancel(&self) {
        if self.state.get() == TaskState::Pending {
            self.state.set(TaskState::Cancelled);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state.get() == TaskState::Pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.get() == TaskState::Cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.state.get() == TaskState::Finished
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskHandle").field(&self.state.get()).finish()
    }
}

struct Task {
    handle: TaskHandle,
    run: Box<dyn FnOnce()>,
}

impl Task {
    fn run(self) {
        if self.handle.is_pending() {
            self.handle.state.set(TaskState::Finished);
            (self.run)();
        }
    }
}

struct Timer {
    due: f64,
    seq: u64,
    task: Task,
}

struct SchedulerInner {
    now: Cell<f64>,
    next_seq: Cell<u64>,
    deferred: RefCell<VecDeque<Task>>,
    timers: RefCell<Vec<Timer>>,
    heartbeat: Signal<f32>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("deferred", &self.inner.deferred.borrow().len())
            .field("timers", &self.inner.timers.borrow().len())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                now: Cell::new(0.0),
                next_seq: Cell::new(0),
                deferred: RefCell::new(VecDeque::new()),
                timers: RefCell::new(Vec::new()),
                heartbeat: Signal::new(),
            }),
        }
    }

    /// Current virtual time (seconds).
    pub fn now(&self) -> f64 {
        self.inner.now.get()
    }

    /// Per-frame signal, payload = frame delta (seconds).
    pub fn heartbeat(&self) -> &Signal<f32> {
        &self.inner.heartbeat
    }

    /// Runs `run` on the next flush (fire-and-continue).
    pub fn defer(&self, run: impl FnOnce() + 'static) -> TaskHandle {
        let handle = TaskHandle::new();
        self.inner.deferred.borrow_mut().push_back(Task {
            handle: handle.clone(),
            run: Box::new(run),
        });
        handle
    }

    /// Runs `run` once `seconds` of virtual time have passed.
    pub fn delay(&self, seconds: f32, run: impl FnOnce() + 'static) -> TaskHandle {
        let handle = TaskHandle::new();
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);

        self.inner.timers.borrow_mut().push(Timer {
            due: self.now() + f64::from(seconds.max(0.0)),
            seq,
            task: Task {
                handle: handle.clone(),
                run: Box::new(run),
            },
        });
        handle
    }

    pub fn flush_deferred(&self) {
        loop {
            let next = self.inner.deferred.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task.run();
        }
    }

    /// Advances virtual time by `dt` and runs everything that became due.
    pub fn step(&self, dt: f32) {
        self.flush_deferred();

        let now = self.now() + f64::from(dt.max(0.0));
        self.inner.now.set(now);

        while let Some(timer) = self.pop_due_timer(now) {
            timer.task.run();
        }

        self.inner.heartbeat.fire(&dt);
        self.flush_deferred();
    }

    /// Timers still waiting to fire (cancelled ones excluded).
    pub fn pending_timers(&self) -> usize {
        self.inner
            .timers
            .borrow()
            .iter()
            .filter(|timer| timer.task.handle.is_pending())
            .count()
    }

    fn pop_due_timer(&self, now: f64) -> Option<Timer> {
        let mut timers = self.inner.timers.borrow_mut();
        timers.retain(|timer| !timer.task.handle.is_cancelled());

        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(index, _)| index)?;

        Some(timers.swap_remove(index))
    }
}
