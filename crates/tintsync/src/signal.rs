//! The System Signal seam: the OS-level dark/light preference.
//!
//! The signal is read at apply time (never cached by the synchronizer) and
//! watched continuously so a `System` theme follows OS changes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::subscription::Subscription;

/// Callback invoked with the new `prefers_dark` value.
pub type SignalCallback = Box<dyn FnMut(bool)>;

/// A read-only boolean signal plus change notification.
pub trait SystemSignal {
    /// Whether the OS currently prefers a dark color scheme.
    fn prefers_dark(&self) -> bool;

    /// Registers `callback` for changes. The callback fires only when the
    /// value actually changes.
    fn watch(&self, callback: SignalCallback) -> Subscription;
}

type SharedCallback = Rc<RefCell<SignalCallback>>;

#[derive(Default)]
struct SignalState {
    dark: bool,
    next_id: u64,
    watchers: BTreeMap<u64, SharedCallback>,
}

/// A signal driven by the host.
///
/// Tests flip it with [`set_dark`](Self::set_dark); hosts with their own event
/// source forward changes the same way. Clones share state.
#[derive(Clone, Default)]
pub struct ManualSignal {
    state: Rc<RefCell<SignalState>>,
}

impl ManualSignal {
    pub fn new(prefers_dark: bool) -> Self {
        let signal = Self::default();
        signal.state.borrow_mut().dark = prefers_dark;
        signal
    }

    /// Updates the value and notifies watchers. Returns whether it changed.
    pub fn set_dark(&self, prefers_dark: bool) -> bool {
        let watchers: Vec<SharedCallback> = {
            let mut state = self.state.borrow_mut();
            if state.dark == prefers_dark {
                return false;
            }
            state.dark = prefers_dark;
            state.watchers.values().cloned().collect()
        };
        // The borrow is released so callbacks may read the signal or unwatch.
        for watcher in watchers {
            if let Ok(mut callback) = watcher.try_borrow_mut() {
                callback(prefers_dark);
            }
        }
        true
    }

    pub fn watcher_count(&self) -> usize {
        self.state.borrow().watchers.len()
    }
}

impl SystemSignal for ManualSignal {
    fn prefers_dark(&self) -> bool {
        self.state.borrow().dark
    }

    fn watch(&self, callback: SignalCallback) -> Subscription {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.watchers.insert(id, Rc::new(RefCell::new(callback)));
            id
        };
        let weak: Weak<RefCell<SignalState>> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().watchers.remove(&id);
            }
        })
    }
}

impl fmt::Debug for ManualSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ManualSignal")
            .field("dark", &state.dark)
            .field("watchers", &state.watchers.len())
            .finish()
    }
}

/// Detects whether the OS prefers dark mode.
pub type Detector = fn() -> bool;

/// The OS color scheme, via `dark-light`.
///
/// Desktop platforms have no portable change event, so the host calls
/// [`poll`](Self::poll) from its event loop (on focus, on a timer) and
/// watchers fire when the detected value differs from the last one.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct OsSignal {
    detector: Detector,
    current: ManualSignal,
}

#[cfg(not(target_arch = "wasm32"))]
impl OsSignal {
    pub fn new() -> Self {
        Self::with_detector(os_prefers_dark)
    }

    /// Uses `detector` instead of querying the OS.
    pub fn with_detector(detector: Detector) -> Self {
        Self {
            detector,
            current: ManualSignal::new(detector()),
        }
    }

    /// Re-detects the OS mode. Returns whether it changed.
    pub fn poll(&self) -> bool {
        let dark = (self.detector)();
        let changed = self.current.set_dark(dark);
        if changed {
            debug!(prefers_dark = dark, "OS color scheme changed");
        }
        changed
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for OsSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemSignal for OsSignal {
    fn prefers_dark(&self) -> bool {
        self.current.prefers_dark()
    }

    fn watch(&self, callback: SignalCallback) -> Subscription {
        self.current.watch(callback)
    }
}

/// Queries the OS. Anything but an explicit dark answer counts as light.
#[cfg(not(target_arch = "wasm32"))]
pub fn os_prefers_dark() -> bool {
    match dark_light::detect() {
        Ok(dark_light::Mode::Dark) => true,
        Ok(_) => false,
        Err(err) => {
            debug!(error = %err, "OS color scheme detection failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, SignalCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |dark| sink.borrow_mut().push(dark)))
    }

    #[test]
    fn test_manual_signal_notifies_on_change() {
        let signal = ManualSignal::new(false);
        let (seen, callback) = recorder();
        let _sub = signal.watch(callback);

        assert!(signal.set_dark(true));
        assert!(!signal.set_dark(true));
        assert!(signal.set_dark(false));

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert!(!signal.prefers_dark());
    }

    #[test]
    fn test_dropped_watch_stops_notifications() {
        let signal = ManualSignal::new(false);
        let (seen, callback) = recorder();
        let sub = signal.watch(callback);
        assert_eq!(signal.watcher_count(), 1);

        drop(sub);
        signal.set_dark(true);

        assert_eq!(signal.watcher_count(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_callback_may_read_signal() {
        let signal = ManualSignal::new(false);
        let observed = Rc::new(Cell::new(false));
        let (probe, sink) = (signal.clone(), observed.clone());
        let _sub = signal.watch(Box::new(move |_| sink.set(probe.prefers_dark())));

        signal.set_dark(true);
        assert!(observed.get());
    }

    #[test]
    fn test_os_signal_poll_with_detector() {
        thread_local! {
            static DARK: Cell<bool> = const { Cell::new(false) };
        }
        fn detect() -> bool {
            DARK.with(|d| d.get())
        }

        let signal = OsSignal::with_detector(detect);
        let (seen, callback) = recorder();
        let _sub = signal.watch(callback);

        assert!(!signal.poll());
        DARK.with(|d| d.set(true));
        assert!(signal.poll());
        assert!(signal.prefers_dark());
        assert_eq!(*seen.borrow(), vec![true]);
    }
}
