//! End-to-end behavior of the preference synchronizer against in-process seams.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use tintsync::{
    resolve, ColorMode, ColorSlot, FontSizeLevel, ManualSignal, MemoryCache, MemoryDocument,
    MemoryStore, Palettes, PartialColorTheme, PreferenceDraft, PreferenceStore, PreferenceSync,
    Snapshot, SnapshotCallback, StoreError, Subscription, SyncError, SyncPhase, ThemeMode, UserId,
    UserPreferences, MAX_QUEUED_NOTICES,
};

// ============================================================================
// Test fixtures
// ============================================================================

struct Fixture {
    store: MemoryStore,
    cache: MemoryCache,
    signal: ManualSignal,
    user: UserId,
    sync: PreferenceSync<MemoryStore, MemoryDocument>,
}

impl Fixture {
    fn new(system_dark: bool) -> Self {
        let store = MemoryStore::new();
        let user = store.create_user("dana");
        let cache = MemoryCache::new();
        let signal = ManualSignal::new(system_dark);
        let sync = PreferenceSync::builder(store.clone(), MemoryDocument::new())
            .cache(cache.clone())
            .signal(signal.clone())
            .build();
        Self {
            store,
            cache,
            signal,
            user,
            sync,
        }
    }

    fn started(system_dark: bool) -> Self {
        let fixture = Self::new(system_dark);
        fixture.sync.start(fixture.user.clone());
        fixture
    }

    fn push(&self, prefs: &UserPreferences) {
        self.store.put_record(self.user.clone(), record(prefs));
    }

    fn mode(&self) -> ColorMode {
        self.sync.presentation().expect("presentation applied").mode
    }
}

fn record(prefs: &UserPreferences) -> Value {
    json!({ "id": "dana", "name": "Dana", "preferences": prefs })
}

fn prefs(theme: ThemeMode, font_size: FontSizeLevel) -> UserPreferences {
    UserPreferences::new(theme, font_size)
}

/// A store adapter that never stops calling back, so tests can fire a
/// snapshot after the synchronizer cancelled its subscription.
#[derive(Clone, Default)]
struct CapturingStore {
    captured: Rc<RefCell<Option<SnapshotCallback>>>,
}

impl CapturingStore {
    fn fire(&self, snapshot: Snapshot) {
        let mut captured = self.captured.borrow_mut();
        let callback = captured.as_mut().expect("subscribe was called");
        callback(snapshot);
    }
}

impl PreferenceStore for CapturingStore {
    type Error = StoreError;

    fn get(&self, _user: &UserId) -> Result<Option<Value>, StoreError> {
        Ok(None)
    }

    fn subscribe(&self, _user: &UserId, on_snapshot: SnapshotCallback) -> Subscription {
        *self.captured.borrow_mut() = Some(on_snapshot);
        Subscription::noop()
    }

    async fn update(
        &self,
        _user: &UserId,
        _preferences: &UserPreferences,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// First paint
// ============================================================================

#[test]
fn cached_values_paint_before_first_snapshot() {
    let store = MemoryStore::new();
    let user = store.create_user("dana");
    let mut customized = prefs(ThemeMode::Dark, FontSizeLevel::Large);
    customized.custom_dark_theme = PartialColorTheme::new().with(ColorSlot::Background, "0 0% 0%");
    store.put_record(user.clone(), record(&customized));
    store.hold_snapshots();

    let cache = MemoryCache::new()
        .with_item("theme", "dark")
        .with_item("fontSize", "large");
    let sync = PreferenceSync::builder(store.clone(), MemoryDocument::new())
        .cache(cache)
        .build();
    sync.start(user);

    // Provisional: cached mode and size, default colors.
    let first = sync.presentation().unwrap();
    assert_eq!(first.mode, ColorMode::Dark);
    assert_eq!(first.font_size, FontSizeLevel::Large);
    assert_eq!(first.palettes, Palettes::default());
    assert!(sync.document().has_root_class("font-size-large"));

    store.flush();

    let settled = sync.presentation().unwrap();
    assert_eq!(settled.colors().background, "0 0% 0%");
    assert_eq!(sync.document().style_elements().len(), 1);
}

#[test]
fn partial_cache_defaults_missing_key() {
    let cache = MemoryCache::new().with_item("fontSize", "small");
    let sync = PreferenceSync::builder(MemoryStore::new(), MemoryDocument::new())
        .cache(cache)
        .signal(ManualSignal::new(true))
        .build();

    let presentation = sync.presentation().unwrap();
    assert_eq!(presentation.font_size, FontSizeLevel::Small);
    // Missing theme means System, which follows the signal.
    assert_eq!(presentation.mode, ColorMode::Dark);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn snapshots_apply_in_delivery_order() {
    let fx = Fixture::started(false);
    fx.store.hold_snapshots();

    fx.push(&prefs(ThemeMode::Dark, FontSizeLevel::Small));
    fx.push(&prefs(ThemeMode::Light, FontSizeLevel::Large));
    fx.push(&prefs(ThemeMode::Dark, FontSizeLevel::Base));
    fx.store.flush();

    assert_eq!(fx.mode(), ColorMode::Dark);
    assert_eq!(fx.sync.presentation().unwrap().font_size, FontSizeLevel::Base);
    assert_eq!(fx.cache.item("theme").as_deref(), Some("dark"));
    assert_eq!(fx.cache.item("fontSize").as_deref(), Some("base"));
    // One write pair per snapshot, including the initial one.
    assert_eq!(fx.cache.write_count(), 8);
}

#[test]
fn custom_light_primary_example() {
    let fx = Fixture::started(false);
    let mut p = prefs(ThemeMode::Light, FontSizeLevel::Base);
    p.custom_light_theme = PartialColorTheme::new().with(ColorSlot::Primary, "200 50% 40%");

    fx.push(&p);

    let defaults = Palettes::default();
    let colors = fx.sync.presentation().unwrap().colors().clone();
    assert_eq!(colors.background, defaults.light.background);
    assert_eq!(colors.foreground, defaults.light.foreground);
    assert_eq!(colors.card, defaults.light.card);
    assert_eq!(colors.primary, "200 50% 40%");
    assert_eq!(colors.accent, defaults.light.accent);

    let css = fx.sync.document().style_text("tintsync-theme").unwrap().to_string();
    assert!(css.contains("--primary: 200 50% 40%;"));
}

#[test]
fn colors_are_never_cached() {
    let fx = Fixture::started(false);
    let mut p = prefs(ThemeMode::Light, FontSizeLevel::Base);
    p.custom_light_theme = PartialColorTheme::new().with(ColorSlot::Accent, "1 2% 3%");

    fx.push(&p);

    assert_eq!(fx.cache.item("theme").as_deref(), Some("light"));
    assert_eq!(fx.cache.item("fontSize").as_deref(), Some("base"));
    assert_eq!(fx.cache.item("customLightTheme"), None);
}

#[test]
fn custom_value_cannot_add_stylesheet_rules() {
    let fx = Fixture::started(false);
    let mut p = prefs(ThemeMode::Dark, FontSizeLevel::Base);
    p.custom_light_theme = PartialColorTheme::new().with(
        ColorSlot::Accent,
        "0 0% 0%; } :root.dark { --background: 0 100% 50%; } x {",
    );

    fx.push(&p);

    let defaults = Palettes::default();
    let presentation = fx.sync.presentation().unwrap();
    assert_eq!(presentation.colors().background, defaults.dark.background);
    assert_eq!(presentation.palettes.light.accent, defaults.light.accent);

    let css = fx.sync.document().style_text("tintsync-theme").unwrap().to_string();
    assert_eq!(css.matches(":root.dark").count(), 1);
    assert!(!css.contains("0 100% 50%"));
}

#[test]
fn held_snapshots_resume_through_store_handle() {
    let fx = Fixture::started(false);
    fx.store.hold_snapshots();
    fx.push(&prefs(ThemeMode::Dark, FontSizeLevel::Large));
    assert_eq!(fx.mode(), ColorMode::Light);

    assert_eq!(fx.sync.store().resume(), 1);
    assert!(fx.mode().is_dark());
    assert_eq!(fx.sync.store().pending_count(), 0);

    // Holding is off: later records arrive immediately.
    fx.push(&prefs(ThemeMode::Light, FontSizeLevel::Base));
    assert!(!fx.mode().is_dark());
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn cancelled_subscription_is_inert() {
    let store = CapturingStore::default();
    let sync = PreferenceSync::builder(store.clone(), MemoryDocument::new()).build();
    sync.start("dana");
    store.fire(Snapshot::Record(record(&prefs(ThemeMode::Light, FontSizeLevel::Base))));
    let before = sync.document().clone();

    sync.stop();
    store.fire(Snapshot::Record(record(&prefs(ThemeMode::Dark, FontSizeLevel::Large))));

    assert_eq!(*sync.document(), before);
    assert_eq!(sync.presentation().unwrap().mode, ColorMode::Light);
}

#[test]
fn superseded_subscription_is_inert() {
    let first = CapturingStore::default();
    let sync = PreferenceSync::builder(first.clone(), MemoryDocument::new()).build();
    sync.start("dana");
    let stale = first.captured.borrow_mut().take().unwrap();

    sync.start("dana");
    first.fire(Snapshot::Record(record(&prefs(ThemeMode::Light, FontSizeLevel::Base))));

    *first.captured.borrow_mut() = Some(stale);
    first.fire(Snapshot::Record(record(&prefs(ThemeMode::Dark, FontSizeLevel::Base))));

    assert_eq!(sync.presentation().unwrap().mode, ColorMode::Light);
}

// ============================================================================
// System signal
// ============================================================================

#[test]
fn system_theme_follows_signal() {
    let fx = Fixture::started(false);
    fx.push(&prefs(ThemeMode::System, FontSizeLevel::Base));
    assert_eq!(fx.mode(), ColorMode::Light);

    fx.signal.set_dark(true);
    assert_eq!(fx.mode(), ColorMode::Dark);
    assert!(fx.sync.document().has_root_class("dark"));

    fx.signal.set_dark(false);
    assert_eq!(fx.mode(), ColorMode::Light);
    assert!(!fx.sync.document().has_root_class("dark"));
}

#[test]
fn explicit_theme_ignores_signal() {
    let fx = Fixture::started(false);
    fx.push(&prefs(ThemeMode::Light, FontSizeLevel::Base));
    let before = fx.sync.document().clone();

    fx.signal.set_dark(true);

    assert_eq!(*fx.sync.document(), before);
    assert_eq!(fx.mode(), ColorMode::Light);
}

#[test]
fn signal_applies_to_preview_candidate() {
    let fx = Fixture::started(false);
    fx.push(&prefs(ThemeMode::Light, FontSizeLevel::Base));
    fx.sync.preview(&prefs(ThemeMode::System, FontSizeLevel::Large));

    fx.signal.set_dark(true);

    let presentation = fx.sync.presentation().unwrap();
    assert_eq!(presentation.mode, ColorMode::Dark);
    assert_eq!(presentation.font_size, FontSizeLevel::Large);
}

// ============================================================================
// Preview and commit
// ============================================================================

#[test]
fn preview_does_not_persist() {
    let fx = Fixture::started(false);
    let writes = fx.cache.write_count();

    fx.sync.preview(&prefs(ThemeMode::Dark, FontSizeLevel::Large));

    assert_eq!(fx.mode(), ColorMode::Dark);
    assert_eq!(fx.cache.write_count(), writes);
    assert_eq!(fx.store.update_count(), 0);
    assert_eq!(fx.sync.preferences(), Some(UserPreferences::default()));
}

#[test]
fn commit_does_not_self_apply() {
    let fx = Fixture::started(false);
    fx.store.hold_snapshots();
    let before = fx.sync.presentation();
    let writes = fx.cache.write_count();

    let candidate = prefs(ThemeMode::Dark, FontSizeLevel::Small);
    pollster::block_on(fx.sync.commit(&candidate)).unwrap();

    assert_eq!(fx.sync.presentation(), before);
    assert_eq!(fx.cache.write_count(), writes);
    assert_eq!(fx.store.update_count(), 1);

    // The echoed snapshot is what applies it.
    fx.store.flush();
    let expected = resolve(&candidate, false, &Palettes::default());
    assert_eq!(fx.sync.presentation(), Some(expected));
    assert_eq!(fx.cache.item("fontSize").as_deref(), Some("small"));
}

#[test]
fn failed_commit_preserves_draft_for_retry() {
    let fx = Fixture::started(false);
    let mut draft = PreferenceDraft::new(fx.sync.preferences().unwrap());
    draft.set_theme(ThemeMode::Dark);
    draft
        .set_color(ColorMode::Dark, ColorSlot::Primary, "263 70% 50%")
        .unwrap();
    fx.sync.preview(draft.candidate());

    fx.store.fail_next_update("network unreachable");
    let err = pollster::block_on(fx.sync.commit(draft.candidate())).unwrap_err();

    assert!(
        matches!(err, SyncError::PersistFailed(ref msg) if msg.contains("network unreachable"))
    );
    assert!(draft.is_dirty());
    assert_eq!(fx.mode(), ColorMode::Dark);

    pollster::block_on(fx.sync.commit(draft.candidate())).unwrap();
    draft.mark_committed();

    assert!(!draft.is_dirty());
    assert_eq!(fx.sync.preferences().as_ref(), Some(draft.committed()));
    assert_eq!(
        fx.sync.presentation().unwrap().colors().primary,
        "263 70% 50%"
    );
}

#[test]
fn commit_replaces_whole_preferences_field() {
    let fx = Fixture::started(false);
    let mut p = prefs(ThemeMode::Light, FontSizeLevel::Base);
    p.custom_light_theme = PartialColorTheme::new()
        .with(ColorSlot::Primary, "1 1% 1%")
        .with(ColorSlot::Card, "2 2% 2%");
    pollster::block_on(fx.sync.commit(&p)).unwrap();

    let mut next = p.clone();
    next.custom_light_theme = PartialColorTheme::new().with(ColorSlot::Primary, "3 3% 3%");
    pollster::block_on(fx.sync.commit(&next)).unwrap();

    let stored = fx.store.record(&fx.user).unwrap();
    assert_eq!(stored["name"], "Dana");
    assert_eq!(
        stored["preferences"]["customLightTheme"],
        json!({ "primary": "3 3% 3%" })
    );
    assert_eq!(fx.sync.presentation().unwrap().colors().card, Palettes::default().light.card);
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[test]
fn logout_then_login_as_other_user() {
    let fx = Fixture::started(false);
    fx.push(&prefs(ThemeMode::Dark, FontSizeLevel::Large));

    fx.sync.stop();
    assert_eq!(fx.sync.phase(), SyncPhase::Unsubscribed);
    assert_eq!(fx.cache.item("theme").as_deref(), Some("dark"));

    let other = fx.store.create_user("sam");
    fx.sync.start(other.clone());

    assert_eq!(fx.sync.phase(), SyncPhase::Subscribed { user: other });
    assert_eq!(fx.mode(), ColorMode::Light);
    assert_eq!(fx.cache.item("theme").as_deref(), Some("system"));
}

#[test]
fn notices_reach_handler_instead_of_queue() {
    let fx = Fixture::started(false);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    fx.sync.on_notice(move |notice| sink.borrow_mut().push(notice.kind()));

    fx.store.put_record(fx.user.clone(), json!({ "preferences": true }));
    fx.store.delete_user(&fx.user);

    assert_eq!(*seen.borrow(), vec!["malformed_snapshot", "subscription_lost"]);
    assert!(fx.sync.take_notices().is_empty());
}

#[test]
fn notices_queue_without_handler() {
    let fx = Fixture::started(false);

    fx.store.put_record(fx.user.clone(), json!({ "preferences": true }));
    fx.store.delete_user(&fx.user);

    let kinds: Vec<_> = fx.sync.take_notices().iter().map(|n| n.kind()).collect();
    assert_eq!(kinds, vec!["malformed_snapshot", "subscription_lost"]);
    assert!(fx.sync.take_notices().is_empty());
}

#[test]
fn disabled_storage_does_not_grow_notices() {
    let store = MemoryStore::new();
    let user = store.create_user("dana");
    let sync = PreferenceSync::builder(store.clone(), MemoryDocument::new())
        .cache(MemoryCache::disabled())
        .build();
    // The startup read failed before any handler existed.
    assert_eq!(sync.take_notices().len(), 1);
    let handled = Rc::new(RefCell::new(0));
    let counter = handled.clone();
    sync.on_notice(move |_| *counter.borrow_mut() += 1);
    sync.start(user.clone());

    for _ in 0..100 {
        store.put_record(user.clone(), record(&prefs(ThemeMode::Dark, FontSizeLevel::Base)));
    }
    assert!(*handled.borrow() >= 100);
    assert!(sync.take_notices().is_empty());
}

#[test]
fn unhandled_notice_queue_keeps_latest() {
    let store = MemoryStore::new();
    let user = store.create_user("dana");
    let sync = PreferenceSync::builder(store.clone(), MemoryDocument::new())
        .cache(MemoryCache::disabled())
        .build();
    sync.start(user.clone());

    for _ in 0..(MAX_QUEUED_NOTICES * 2) {
        store.put_record(user.clone(), record(&prefs(ThemeMode::Light, FontSizeLevel::Base)));
    }
    store.delete_user(&user);

    let notices = sync.take_notices();
    assert_eq!(notices.len(), MAX_QUEUED_NOTICES);
    assert_eq!(notices.last().map(SyncError::kind), Some("subscription_lost"));
}
