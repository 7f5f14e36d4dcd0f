use tintsync::{SignalCallback, Subscription, SystemSignal};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{MediaQueryList, MediaQueryListEvent};

/// The media query behind the OS dark-mode preference.
pub const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

/// A `matchMedia` query as a [`SystemSignal`].
///
/// Each watch registers its own `change` listener; dropping the returned
/// subscription removes it.
#[derive(Debug, Clone)]
pub struct MediaQuerySignal {
    query: MediaQueryList,
}

impl MediaQuerySignal {
    pub fn new(query: MediaQueryList) -> Self {
        Self { query }
    }

    /// `matchMedia("(prefers-color-scheme: dark)")`, if the browser supports it.
    pub fn dark_scheme() -> Option<Self> {
        let window = web_sys::window()?;
        match window.match_media(DARK_SCHEME_QUERY) {
            Ok(query) => query.map(Self::new),
            Err(err) => {
                warn!(error = ?err, "matchMedia failed");
                None
            }
        }
    }
}

impl SystemSignal for MediaQuerySignal {
    fn prefers_dark(&self) -> bool {
        self.query.matches()
    }

    fn watch(&self, mut callback: SignalCallback) -> Subscription {
        let listener = Closure::<dyn FnMut(MediaQueryListEvent)>::new(
            move |event: MediaQueryListEvent| callback(event.matches()),
        );
        if let Err(err) = self
            .query
            .add_event_listener_with_callback("change", listener.as_ref().unchecked_ref())
        {
            warn!(error = ?err, "failed to listen for color scheme changes");
            return Subscription::noop();
        }

        let query = self.query.clone();
        Subscription::new(move || {
            let _ = query
                .remove_event_listener_with_callback("change", listener.as_ref().unchecked_ref());
        })
    }
}
