//! BaseComponent: entity reference + owned DisposalBag.

use crate::lifecycle::DisposalBag;

/// Behaviour attached to an external entity it does not own.
///
/// Всё, что компонент подписывает, кладётся в его bag; `destroy()` снимает
/// всё разом. После destroy компонент не переиспользуется.
#[derive(Debug)]
pub struct BaseComponent<T> {
    instance: T,
    bag: DisposalBag,
}

impl<T> BaseComponent<T> {
    pub fn new(instance: T) -> Self {
        Self {
            instance,
            bag: DisposalBag::new(),
        }
    }

    pub fn instance(&self) -> &T {
        &self.instance
    }

    pub fn bag(&self) -> &DisposalBag {
        &self.bag
    }

    /// Terminates the component and all its functionality. Idempotent.
    pub fn destroy(&self) {
        self.bag.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.bag.is_destroyed()
    }
}
