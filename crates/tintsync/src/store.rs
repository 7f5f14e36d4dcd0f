//! The Preference Store seam.
//!
//! The store is a remote, push-capable document store keyed by user id. The
//! preferences live in the `preferences` field of the user document; the rest
//! of the document is opaque to this crate.
//!
//! Snapshots carry the raw document. [`decode_preferences`] turns one into
//! [`UserPreferences`], treating absent fields as defaults and rejecting only
//! shapes that cannot be a preference record.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SyncError;
use crate::model::{ColorSlot, PartialColorTheme, UserPreferences};
use crate::subscription::Subscription;

/// Field of the user document holding the preferences.
pub const PREFERENCES_FIELD: &str = "preferences";

/// Identifies a user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One delivered state of a user document.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// The full user document.
    Record(Value),
    /// The user document no longer exists.
    Deleted,
}

/// Callback receiving snapshots in delivery order.
pub type SnapshotCallback = Box<dyn FnMut(Snapshot)>;

/// A remote store of user documents.
///
/// Implementations deliver snapshots for one subscription in server order and
/// stop invoking the callback once the returned [`Subscription`] is dropped.
/// When a subscription fails, the adapter reports it through
/// [`PreferenceSync::report_subscription_error`](crate::PreferenceSync::report_subscription_error).
#[allow(async_fn_in_trait)]
pub trait PreferenceStore {
    type Error: std::error::Error + 'static;

    /// Reads the current user document, `None` when it does not exist.
    fn get(&self, user: &UserId) -> Result<Option<Value>, Self::Error>;

    /// Subscribes to the user document. The current state, if any, is
    /// delivered first.
    fn subscribe(&self, user: &UserId, on_snapshot: SnapshotCallback) -> Subscription;

    /// Replaces the whole `preferences` field of the user document.
    async fn update(&self, user: &UserId, preferences: &UserPreferences)
        -> Result<(), Self::Error>;
}

/// Extracts the preferences from a user document.
///
/// Missing or `null` fields take their defaults, unknown enum strings take
/// their defaults, and non-string color values are dropped. A document that
/// is not an object, or a `preferences` / custom theme field that is present
/// but not an object, is a [`SyncError::MalformedSnapshot`].
///
/// ```rust
/// use serde_json::json;
/// use tintsync::{decode_preferences, FontSizeLevel, ThemeMode};
///
/// let prefs = decode_preferences(&json!({
///     "name": "Dana",
///     "preferences": { "theme": "dark" }
/// }))
/// .unwrap();
/// assert_eq!(prefs.theme, ThemeMode::Dark);
/// assert_eq!(prefs.font_size, FontSizeLevel::Base);
///
/// assert!(decode_preferences(&json!({ "preferences": "dark" })).is_err());
/// ```
pub fn decode_preferences(record: &Value) -> Result<UserPreferences, SyncError> {
    let Some(record) = record.as_object() else {
        return Err(malformed("user record", record));
    };
    let prefs = match record.get(PREFERENCES_FIELD) {
        None | Some(Value::Null) => return Ok(UserPreferences::default()),
        Some(Value::Object(prefs)) => prefs,
        Some(other) => return Err(malformed(PREFERENCES_FIELD, other)),
    };

    let mut decoded = UserPreferences::default();
    if let Some(theme) = enum_field(prefs, "theme") {
        decoded.theme = theme;
    }
    if let Some(font_size) = enum_field(prefs, "fontSize") {
        decoded.font_size = font_size;
    }
    decoded.custom_light_theme = custom_theme(prefs, "customLightTheme")?;
    decoded.custom_dark_theme = custom_theme(prefs, "customDarkTheme")?;
    Ok(decoded)
}

fn enum_field<T: std::str::FromStr>(prefs: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = prefs.get(key)?;
    let parsed = raw.as_str().and_then(|s| s.parse().ok());
    if parsed.is_none() && !raw.is_null() {
        debug!(field = key, value = %raw, "unrecognized preference value, using default");
    }
    parsed
}

fn custom_theme(
    prefs: &Map<String, Value>,
    key: &'static str,
) -> Result<PartialColorTheme, SyncError> {
    let slots = match prefs.get(key) {
        None | Some(Value::Null) => return Ok(PartialColorTheme::default()),
        Some(Value::Object(slots)) => slots,
        Some(other) => return Err(malformed(key, other)),
    };
    let mut theme = PartialColorTheme::default();
    for slot in ColorSlot::ALL {
        match slots.get(slot.key()) {
            Some(Value::String(value)) => theme.set(slot, Some(value.clone())),
            Some(Value::Null) | None => {}
            Some(other) => {
                debug!(field = key, slot = slot.key(), value = %other, "ignoring non-string color");
            }
        }
    }
    Ok(theme)
}

fn malformed(field: &str, value: &Value) -> SyncError {
    SyncError::MalformedSnapshot(format!("{field} must be an object, got {}", type_name(value)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Errors from [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("user '{0}' not found")]
    NotFound(UserId),

    #[error("update rejected: {0}")]
    Rejected(String),
}

type SharedCallback = Rc<RefCell<SnapshotCallback>>;

struct Subscriber {
    user: UserId,
    callback: SharedCallback,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<UserId, Value>,
    subscribers: BTreeMap<u64, Subscriber>,
    next_id: u64,
    holding: bool,
    pending: VecDeque<(UserId, Snapshot)>,
    fail_next: Option<String>,
    updates: usize,
}

/// An in-process document store.
///
/// Snapshots are delivered synchronously unless [`hold_snapshots`] is on, in
/// which case they queue until [`flush`]. Clones share the same store.
///
/// [`hold_snapshots`]: MemoryStore::hold_snapshots
/// [`flush`]: MemoryStore::flush
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user document with default preferences.
    pub fn create_user(&self, user: impl Into<UserId>) -> UserId {
        let user = user.into();
        let mut record = Map::new();
        record.insert("id".into(), Value::String(user.to_string()));
        record.insert(PREFERENCES_FIELD.into(), preferences_value(&UserPreferences::default()));
        self.put_record(user.clone(), Value::Object(record));
        user
    }

    /// Stores `record` as the whole user document and notifies subscribers.
    pub fn put_record(&self, user: impl Into<UserId>, record: Value) {
        let user = user.into();
        self.state
            .borrow_mut()
            .records
            .insert(user.clone(), record.clone());
        self.emit(&user, Snapshot::Record(record));
    }

    /// Removes the user document and notifies subscribers.
    pub fn delete_user(&self, user: &UserId) {
        let removed = self.state.borrow_mut().records.remove(user).is_some();
        if removed {
            self.emit(user, Snapshot::Deleted);
        }
    }

    pub fn record(&self, user: &UserId) -> Option<Value> {
        self.state.borrow().records.get(user).cloned()
    }

    /// Queues snapshots instead of delivering them.
    pub fn hold_snapshots(&self) {
        self.state.borrow_mut().holding = true;
    }

    /// Delivers every queued snapshot in order. Holding stays on.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.state.borrow_mut().pending.pop_front();
            let Some((user, snapshot)) = next else {
                return delivered;
            };
            self.deliver(&user, snapshot);
            delivered += 1;
        }
    }

    /// Turns holding off and delivers the queue.
    pub fn resume(&self) -> usize {
        self.state.borrow_mut().holding = false;
        self.flush()
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Makes the next `update` fail with `message`.
    pub fn fail_next_update(&self, message: impl Into<String>) {
        self.state.borrow_mut().fail_next = Some(message.into());
    }

    /// Number of successful updates.
    pub fn update_count(&self) -> usize {
        self.state.borrow().updates
    }

    pub fn subscriber_count(&self, user: &UserId) -> usize {
        self.state
            .borrow()
            .subscribers
            .values()
            .filter(|s| &s.user == user)
            .count()
    }

    fn emit(&self, user: &UserId, snapshot: Snapshot) {
        let holding = {
            let mut state = self.state.borrow_mut();
            if state.holding {
                state.pending.push_back((user.clone(), snapshot.clone()));
            }
            state.holding
        };
        if !holding {
            self.deliver(user, snapshot);
        }
    }

    fn deliver(&self, user: &UserId, snapshot: Snapshot) {
        let callbacks: Vec<(u64, SharedCallback)> = self
            .state
            .borrow()
            .subscribers
            .iter()
            .filter(|(_, s)| &s.user == user)
            .map(|(id, s)| (*id, s.callback.clone()))
            .collect();
        for (id, callback) in callbacks {
            // An earlier callback may have cancelled this subscription.
            if !self.state.borrow().subscribers.contains_key(&id) {
                continue;
            }
            if let Ok(mut callback) = callback.try_borrow_mut() {
                callback(snapshot.clone());
            }
        }
    }
}

fn preferences_value(prefs: &UserPreferences) -> Value {
    serde_json::to_value(prefs).unwrap_or(Value::Null)
}

impl PreferenceStore for MemoryStore {
    type Error = StoreError;

    fn get(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        Ok(self.record(user))
    }

    fn subscribe(&self, user: &UserId, on_snapshot: SnapshotCallback) -> Subscription {
        let (id, current) = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(
                id,
                Subscriber {
                    user: user.clone(),
                    callback: Rc::new(RefCell::new(on_snapshot)),
                },
            );
            (id, state.records.get(user).cloned())
        };

        if let Some(record) = current {
            let holding = self.state.borrow().holding;
            if holding {
                self.state
                    .borrow_mut()
                    .pending
                    .push_back((user.clone(), Snapshot::Record(record)));
            } else {
                self.deliver_to(id, Snapshot::Record(record));
            }
        }

        let weak: Weak<RefCell<StoreState>> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().subscribers.remove(&id);
            }
        })
    }

    async fn update(&self, user: &UserId, preferences: &UserPreferences) -> Result<(), StoreError> {
        let record = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if let Some(message) = state.fail_next.take() {
                return Err(StoreError::Rejected(message));
            }
            let record = state
                .records
                .get_mut(user)
                .ok_or_else(|| StoreError::NotFound(user.clone()))?;
            let Some(fields) = record.as_object_mut() else {
                return Err(StoreError::Rejected("user record is not an object".into()));
            };
            let value = serde_json::to_value(preferences)
                .map_err(|err| StoreError::Rejected(err.to_string()))?;
            fields.insert(PREFERENCES_FIELD.into(), value);
            state.updates += 1;
            record.clone()
        };
        self.emit(user, Snapshot::Record(record));
        Ok(())
    }
}

impl MemoryStore {
    fn deliver_to(&self, id: u64, snapshot: Snapshot) {
        let callback = self
            .state
            .borrow()
            .subscribers
            .get(&id)
            .map(|s| s.callback.clone());
        if let Some(callback) = callback {
            if let Ok(mut callback) = callback.try_borrow_mut() {
                callback(snapshot);
            }
        }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryStore")
            .field("records", &state.records.len())
            .field("subscribers", &state.subscribers.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}
