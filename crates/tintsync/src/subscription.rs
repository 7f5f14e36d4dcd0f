//! Cancellation handles for push-based seams.

use std::fmt;

/// A live registration with a store or signal.
///
/// Dropping the handle cancels it, as does calling [`cancel`](Self::cancel).
/// After cancellation the owner must not invoke the callback again; the
/// synchronizer additionally ignores any callback that still arrives.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_drop_cancels_once() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = Subscription::new(move || c.set(c.get() + 1));
        assert!(sub.is_active());
        drop(sub);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_explicit_cancel() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        Subscription::new(move || c.set(c.get() + 1)).cancel();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_noop() {
        let sub = Subscription::noop();
        assert!(!sub.is_active());
        sub.cancel();
    }
}
