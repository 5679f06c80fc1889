//! Lifecycle primitives: disposal bags, signals, cooperative scheduler.
//!
//! Всё однопоточное (Rc/RefCell, `!Send`). В Bevy живёт внутри NonSend
//! ресурса, см. `bridge`.

pub mod bag;
pub mod scheduler;
pub mod signal;


pub use bag::{Destroy, Disposable, DisposalBag, WeakBag};
pub use scheduler::{Scheduler, TaskHandle};
pub use signal::{Connection, Signal};
