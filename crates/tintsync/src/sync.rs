//! The Preference Synchronizer.
//!
//! [`PreferenceSync`] reconciles four writers of the same visual state: the
//! Local Cache (first paint), the remote snapshot stream, the system dark-mode
//! signal, and in-page edits. Every reconciliation recomputes the whole
//! [`ResolvedPresentation`] from one preference snapshot and hands it to the
//! [`StyleInjector`]; nothing is patched incrementally.
//!
//! # Lifecycle
//!
//! ```text
//!                 start(user)                    stop() / Deleted / error
//! Uninitialized ─────────────▶ Subscribed{user} ──────────────────────────▶ Unsubscribed
//!       │                          ▲   │ start(other)                          │
//!       │                          │   └──────────┘                            │
//!       └──────────── stop() ──────┼───────────────────────────────────────────▶│
//!                                  └─────────────────── start(user) ───────────┘
//! ```
//!
//! - On construction the Local Cache is read synchronously and, if it holds
//!   anything, a provisional presentation with default colors is applied.
//! - While subscribed, each snapshot is decoded, resolved, applied, and its
//!   theme and font size are written to the Local Cache, in delivery order.
//! - Every subscription gets a generation number. Callbacks from an older
//!   generation are ignored, so a late snapshot from a cancelled subscription
//!   has no effect.
//!
//! # Edits
//!
//! [`preview`](PreferenceSync::preview) applies a candidate immediately and
//! persists nothing. [`commit`](PreferenceSync::commit) writes the candidate
//! to the store and applies nothing: the snapshot the store pushes back is
//! what updates the document and the cache.
//!
//! # Notices
//!
//! Non-fatal problems (cache unavailable, malformed snapshot, lost
//! subscription) never reach the caller as errors. They are always logged.
//! When a handler is registered with [`on_notice`](PreferenceSync::on_notice)
//! they go to it; otherwise they are queued for
//! [`take_notices`](PreferenceSync::take_notices), keeping only the latest
//! [`MAX_QUEUED_NOTICES`].

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::cache::{CachedPreferences, LocalCache, MemoryCache};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::inject::{DocumentHost, StyleInjector};
use crate::model::{ResolvedPresentation, ThemeMode, UserPreferences};
use crate::resolve::{provisional, resolve};
use crate::signal::{ManualSignal, SystemSignal};
use crate::store::{decode_preferences, PreferenceStore, Snapshot, UserId};
use crate::subscription::Subscription;

/// Where the synchronizer is in its per-session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    /// No user yet. At most a cached, provisional presentation is applied.
    Uninitialized,
    /// Snapshots for `user` are being applied.
    Subscribed { user: UserId },
    /// Torn down (logout, deleted user, lost subscription). Nothing is
    /// reconciled until the next `start`.
    Unsubscribed,
}

impl SyncPhase {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            SyncPhase::Subscribed { user } => Some(user),
            _ => None,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self, SyncPhase::Subscribed { .. })
    }
}

/// Receives every notice as it is raised.
pub type NoticeHandler = Box<dyn FnMut(&SyncError)>;

/// Notices kept for [`PreferenceSync::take_notices`] when no handler is set.
pub const MAX_QUEUED_NOTICES: usize = 32;

/// What triggered an apply. Logged with every apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Cache,
    Snapshot,
    Preview,
    Revert,
    Signal,
}

impl Origin {
    fn as_str(self) -> &'static str {
        match self {
            Origin::Cache => "cache",
            Origin::Snapshot => "snapshot",
            Origin::Preview => "preview",
            Origin::Revert => "revert",
            Origin::Signal => "signal",
        }
    }
}

struct SyncState<D: DocumentHost> {
    injector: StyleInjector<D>,
    cache: Box<dyn LocalCache>,
    signal: Rc<dyn SystemSignal>,
    phase: SyncPhase,
    generation: u64,
    subscription: Option<Subscription>,
    /// Last good snapshot from the store.
    snapshot: Option<UserPreferences>,
    /// Preferences behind the active presentation (snapshot, preview or cache).
    active: Option<UserPreferences>,
    notices: VecDeque<SyncError>,
    undelivered: Vec<SyncError>,
    on_notice: Option<NoticeHandler>,
}

impl<D: DocumentHost> SyncState<D> {
    fn apply(&mut self, prefs: UserPreferences, prefers_dark: bool, origin: Origin) {
        let presentation = resolve(&prefs, prefers_dark, &self.injector.config().palettes);
        debug!(
            origin = origin.as_str(),
            generation = self.generation,
            theme = %prefs.theme,
            "reconciling presentation"
        );
        self.injector.apply(&presentation);
        self.active = Some(prefs);
    }

    fn apply_snapshot(&mut self, prefs: UserPreferences) {
        let prefers_dark = self.signal.prefers_dark();
        self.apply(prefs.clone(), prefers_dark, Origin::Snapshot);
        let keys = &self.injector.config().cache_keys;
        if let Err(err) = CachedPreferences::write(self.cache.as_ref(), keys, &prefs) {
            self.notify(err.into());
        }
        self.snapshot = Some(prefs);
    }

    /// Leaves `Subscribed` without touching the document.
    fn end_session(&mut self, reason: String) -> Option<Subscription> {
        self.generation += 1;
        self.phase = SyncPhase::Unsubscribed;
        info!(generation = self.generation, %reason, "preference session ended");
        self.notify(SyncError::SubscriptionLost(reason));
        self.subscription.take()
    }

    fn notify(&mut self, notice: SyncError) {
        warn!(kind = notice.kind(), error = %notice, "preference sync notice");
        if self.on_notice.is_some() {
            self.undelivered.push(notice);
            return;
        }
        if self.notices.len() == MAX_QUEUED_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }
}

/// Keeps the document in step with a user's stored preferences.
///
/// Single-threaded: store and signal callbacks run on the same event loop as
/// the caller. Construct it with [`PreferenceSync::builder`].
pub struct PreferenceSync<S: PreferenceStore, D: DocumentHost + 'static> {
    inner: Rc<RefCell<SyncState<D>>>,
    store: S,
    _signal_watch: Subscription,
}

impl<S: PreferenceStore, D: DocumentHost + 'static> PreferenceSync<S, D> {
    pub fn builder(store: S, document: D) -> SyncBuilder<S, D> {
        SyncBuilder {
            store,
            document,
            cache: None,
            signal: None,
            config: SyncConfig::default(),
        }
    }

    /// Subscribes to `user`'s record.
    ///
    /// Valid from every phase. An existing subscription is cancelled first,
    /// and after a lost subscription this is how the session resumes.
    pub fn start(&self, user: impl Into<UserId>) {
        let user = user.into();
        let (generation, previous) = {
            let mut state = self.inner.borrow_mut();
            state.generation += 1;
            state.phase = SyncPhase::Subscribed { user: user.clone() };
            info!(user = %user, generation = state.generation, "subscribing to preferences");
            (state.generation, state.subscription.take())
        };
        drop(previous);

        let weak = Rc::downgrade(&self.inner);
        let subscription = self.store.subscribe(
            &user,
            Box::new(move |snapshot| {
                if let Some(inner) = weak.upgrade() {
                    handle_snapshot(&inner, generation, snapshot);
                    deliver_notices(&inner);
                }
            }),
        );

        let stale = {
            let mut state = self.inner.borrow_mut();
            if state.generation == generation {
                state.subscription = Some(subscription);
                None
            } else {
                // The first snapshot already ended the session.
                Some(subscription)
            }
        };
        drop(stale);
        deliver_notices(&self.inner);
    }

    /// Tears the session down (logout, unmount).
    ///
    /// Snapshot callbacks stop taking effect before this returns. The Local
    /// Cache is left alone unless `clear_cache_on_stop` is configured.
    pub fn stop(&self) {
        let subscription = {
            let mut state = self.inner.borrow_mut();
            state.generation += 1;
            state.phase = SyncPhase::Unsubscribed;
            info!(generation = state.generation, "preference sync stopped");
            if state.injector.config().clear_cache_on_stop {
                let keys = state.injector.config().cache_keys.clone();
                if let Err(err) = CachedPreferences::clear(state.cache.as_ref(), &keys) {
                    state.notify(err.into());
                }
            }
            state.subscription.take()
        };
        drop(subscription);
        deliver_notices(&self.inner);
    }

    /// Ends the session because the store reported a subscription failure.
    ///
    /// The last presentation stays applied and a
    /// [`SyncError::SubscriptionLost`] notice is raised. Ignored when not
    /// subscribed.
    pub fn report_subscription_error(&self, message: impl Into<String>) {
        let subscription = {
            let mut state = self.inner.borrow_mut();
            if !state.phase.is_subscribed() {
                debug!("subscription error reported while not subscribed");
                return;
            }
            state.end_session(message.into())
        };
        drop(subscription);
        deliver_notices(&self.inner);
    }

    /// Applies `candidate` immediately. Nothing is persisted or cached.
    ///
    /// Each call fully replaces the visual effect of the previous one.
    pub fn preview(&self, candidate: &UserPreferences) {
        let mut state = self.inner.borrow_mut();
        let prefers_dark = state.signal.prefers_dark();
        state.apply(candidate.clone(), prefers_dark, Origin::Preview);
    }

    /// Re-applies the last snapshot, undoing any preview.
    ///
    /// Returns `false` when no snapshot has arrived yet.
    pub fn revert_preview(&self) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(snapshot) = state.snapshot.clone() else {
            return false;
        };
        let prefers_dark = state.signal.prefers_dark();
        state.apply(snapshot, prefers_dark, Origin::Revert);
        true
    }

    /// Persists `candidate` as the user's whole preference record.
    ///
    /// The document is not touched here; the store's next snapshot applies
    /// the change. On failure the current presentation is left as is and the
    /// caller keeps its candidate.
    ///
    /// # Errors
    ///
    /// [`SyncError::PersistFailed`] when not subscribed or when the store
    /// rejects the write.
    pub async fn commit(&self, candidate: &UserPreferences) -> Result<(), SyncError> {
        let user = self.inner.borrow().phase.user().cloned();
        let Some(user) = user else {
            let err = SyncError::PersistFailed("no active user session".into());
            warn!(kind = err.kind(), error = %err, "commit rejected");
            return Err(err);
        };

        match self.store.update(&user, candidate).await {
            Ok(()) => {
                info!(user = %user, "preferences saved");
                Ok(())
            }
            Err(err) => {
                let err = SyncError::PersistFailed(err.to_string());
                warn!(user = %user, kind = err.kind(), error = %err, "commit failed");
                Err(err)
            }
        }
    }

    /// Registers the notice handler, replacing any previous one.
    ///
    /// While a handler is registered, notices go only to it and the queue
    /// stays empty. The handler runs outside the synchronizer's internal
    /// borrow, so it may call back into the synchronizer.
    pub fn on_notice(&self, handler: impl FnMut(&SyncError) + 'static) {
        let mut state = self.inner.borrow_mut();
        state.on_notice = Some(Box::new(handler));
        state.undelivered.clear();
    }

    /// Drains the queued notices, oldest first.
    pub fn take_notices(&self) -> Vec<SyncError> {
        self.inner.borrow_mut().notices.drain(..).collect()
    }

    /// The presentation currently applied, if any.
    pub fn presentation(&self) -> Option<ResolvedPresentation> {
        self.inner.borrow().injector.applied().cloned()
    }

    /// The last snapshot received from the store.
    pub fn preferences(&self) -> Option<UserPreferences> {
        self.inner.borrow().snapshot.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.borrow().phase.clone()
    }

    /// Read-only view of the document.
    ///
    /// Release the guard before the next call that reconciles.
    pub fn document(&self) -> Ref<'_, D> {
        Ref::map(self.inner.borrow(), |state| state.injector.document())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: PreferenceStore, D: DocumentHost + 'static> fmt::Debug for PreferenceSync<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("PreferenceSync")
            .field("phase", &state.phase)
            .field("generation", &state.generation)
            .field("presentation", &state.injector.applied())
            .finish_non_exhaustive()
    }
}

fn handle_snapshot<D: DocumentHost>(
    inner: &RefCell<SyncState<D>>,
    generation: u64,
    snapshot: Snapshot,
) {
    let ended = {
        let mut state = inner.borrow_mut();
        if state.generation != generation || !state.phase.is_subscribed() {
            debug!(
                generation,
                current = state.generation,
                "ignoring snapshot from cancelled subscription"
            );
            return;
        }
        match snapshot {
            Snapshot::Record(record) => {
                match decode_preferences(&record) {
                    Ok(prefs) => state.apply_snapshot(prefs),
                    Err(err) => state.notify(err),
                }
                None
            }
            Snapshot::Deleted => state.end_session("user record deleted".into()),
        }
    };
    drop(ended);
}

fn handle_signal<D: DocumentHost>(inner: &RefCell<SyncState<D>>, prefers_dark: bool) {
    let mut state = inner.borrow_mut();
    if state.phase == SyncPhase::Unsubscribed {
        return;
    }
    let Some(active) = state.active.clone() else {
        return;
    };
    if active.theme != ThemeMode::System {
        return;
    }
    state.apply(active, prefers_dark, Origin::Signal);
}

fn deliver_notices<D: DocumentHost>(inner: &RefCell<SyncState<D>>) {
    loop {
        let (mut handler, batch) = {
            let mut state = inner.borrow_mut();
            if state.undelivered.is_empty() {
                return;
            }
            let Some(handler) = state.on_notice.take() else {
                state.undelivered.clear();
                return;
            };
            (handler, std::mem::take(&mut state.undelivered))
        };
        for notice in &batch {
            handler(notice);
        }
        let mut state = inner.borrow_mut();
        if state.on_notice.is_none() {
            state.on_notice = Some(handler);
        }
    }
}

/// Builder for [`PreferenceSync`].
///
/// The cache defaults to an empty [`MemoryCache`] and the signal to a light
/// [`ManualSignal`].
pub struct SyncBuilder<S: PreferenceStore, D: DocumentHost + 'static> {
    store: S,
    document: D,
    cache: Option<Box<dyn LocalCache>>,
    signal: Option<Rc<dyn SystemSignal>>,
    config: SyncConfig,
}

impl<S: PreferenceStore, D: DocumentHost + 'static> SyncBuilder<S, D> {
    pub fn cache(mut self, cache: impl LocalCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn signal(mut self, signal: impl SystemSignal + 'static) -> Self {
        self.signal = Some(Rc::new(signal));
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the synchronizer in the `Uninitialized` phase.
    ///
    /// Reads the Local Cache and, when it holds a theme or font size, applies
    /// the provisional presentation before returning.
    pub fn build(self) -> PreferenceSync<S, D> {
        let cache = self.cache.unwrap_or_else(|| Box::new(MemoryCache::new()));
        let signal = self.signal.unwrap_or_else(|| Rc::new(ManualSignal::new(false)));

        let mut state = SyncState {
            injector: StyleInjector::new(self.document, self.config),
            cache,
            signal: signal.clone(),
            phase: SyncPhase::Uninitialized,
            generation: 0,
            subscription: None,
            snapshot: None,
            active: None,
            notices: VecDeque::new(),
            undelivered: Vec::new(),
            on_notice: None,
        };

        let keys = state.injector.config().cache_keys.clone();
        match CachedPreferences::read(state.cache.as_ref(), &keys) {
            Ok(cached) if cached.is_empty() => {
                debug!("local cache empty, waiting for first snapshot");
            }
            Ok(cached) => {
                let presentation =
                    provisional(&cached, signal.prefers_dark(), &state.injector.config().palettes);
                debug!(
                    origin = Origin::Cache.as_str(),
                    mode = %presentation.mode,
                    "first paint from cache"
                );
                state.injector.apply(&presentation);
                state.active = Some(cached.to_preferences());
            }
            Err(err) => state.notify(err.into()),
        }

        let inner = Rc::new(RefCell::new(state));
        let weak: Weak<RefCell<SyncState<D>>> = Rc::downgrade(&inner);
        let signal_watch = signal.watch(Box::new(move |prefers_dark| {
            if let Some(inner) = weak.upgrade() {
                handle_signal(&inner, prefers_dark);
                deliver_notices(&inner);
            }
        }));

        PreferenceSync {
            inner,
            store: self.store,
            _signal_watch: signal_watch,
        }
    }
}
