//! Theme and font preference synchronization.
//!
//! `tintsync` keeps a document's visual theme in step with a user's stored
//! preferences: light/dark/system mode, a font-size level, and per-mode custom
//! colors. It paints from a local cache before the remote record arrives,
//! follows live snapshots from a document store, reacts to the OS dark-mode
//! signal, and supports preview-then-commit editing.
//!
//! # Quick Start
//!
//! ```rust
//! use tintsync::{
//!     ColorMode, ManualSignal, MemoryCache, MemoryDocument, MemoryStore, PreferenceSync,
//!     ThemeMode, UserPreferences,
//! };
//!
//! let store = MemoryStore::new();
//! let user = store.create_user("dana");
//! let signal = ManualSignal::new(true);
//!
//! let sync = PreferenceSync::builder(store.clone(), MemoryDocument::new())
//!     .cache(MemoryCache::new())
//!     .signal(signal.clone())
//!     .build();
//! sync.start(user);
//!
//! // Default preferences follow the system signal.
//! assert_eq!(sync.presentation().unwrap().mode, ColorMode::Dark);
//! assert!(sync.document().has_root_class("dark"));
//!
//! // Live editing feedback, nothing persisted.
//! let mut light = UserPreferences::default();
//! light.theme = ThemeMode::Light;
//! sync.preview(&light);
//! assert!(sync.document().has_root_class("light"));
//! ```
//!
//! # Architecture
//!
//! ```text
//! LocalCache ──(first paint)──┐
//! PreferenceStore ─(snapshot)─┼─▶ PreferenceSync ─▶ resolve() ─▶ StyleInjector ─▶ DocumentHost
//! SystemSignal ──(change)─────┤
//! preview / commit ───────────┘
//! ```
//!
//! The seams are traits so hosts plug in their own platform:
//!
//! - [`DocumentHost`]: where styles and root classes go.
//! - [`LocalCache`]: synchronous storage surviving reloads.
//! - [`SystemSignal`]: the OS color-scheme preference.
//! - [`PreferenceStore`]: the remote user record.
//!
//! In-process implementations ([`MemoryDocument`], [`MemoryCache`],
//! [`ManualSignal`], [`MemoryStore`]) back the tests and headless use. Native
//! hosts get [`FileCache`] and [`OsSignal`]; browser bindings live in
//! `tintsync-web`.
//!
//! # Logging
//!
//! Events are emitted with `tracing`. No subscriber is installed here.

mod cache;
mod config;
mod css;
mod draft;
mod error;
mod hsl;
mod inject;
mod model;
mod palette;
mod resolve;
mod signal;
mod store;
mod subscription;
mod sync;

pub use cache::{CachedPreferences, FileCache, LocalCache, MemoryCache};
pub use config::{CacheKeys, ClassNames, SyncConfig};
pub use css::{render_stylesheet, root_classes};
pub use draft::PreferenceDraft;
pub use error::{CacheError, ColorValueError, ConfigError, SyncError};
pub use hsl::{validate_hsl, HslTriple};
pub use inject::{DocumentHost, MemoryDocument, StyleElement, StyleInjector};
pub use model::{
    ColorMode, ColorSlot, ColorTheme, FontSizeLevel, Palettes, PartialColorTheme,
    ResolvedPresentation, ThemeMode, UnknownVariant, UserPreferences,
};
pub use resolve::{provisional, resolve, resolve_colors, resolve_mode};
pub use signal::{Detector, ManualSignal, SignalCallback, SystemSignal};
pub use store::{
    decode_preferences, MemoryStore, PreferenceStore, Snapshot, SnapshotCallback, StoreError,
    UserId, PREFERENCES_FIELD,
};
pub use subscription::Subscription;
pub use sync::{NoticeHandler, PreferenceSync, SyncBuilder, SyncPhase, MAX_QUEUED_NOTICES};

#[cfg(not(target_arch = "wasm32"))]
pub use signal::{os_prefers_dark, OsSignal};
