//! Error types.
//!
//! [`SyncError`] is the public error of the synchronizer: it is what `commit`
//! returns and what the notice channel carries. The other types are local to
//! one seam and get mapped into [`SyncError`] at the synchronizer boundary.

use std::io;
use std::path::PathBuf;

/// Errors surfaced by the preference synchronizer.
///
/// None of these are fatal to the page: they are either returned from
/// `commit` or queued as notices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The Local Cache could not be read or written. Synchronization carries
    /// on as if the cache were empty.
    #[error("local preference cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The remote subscription ended. No further snapshots are applied until
    /// the synchronizer is started again.
    #[error("preference subscription lost: {0}")]
    SubscriptionLost(String),

    /// `commit` could not write the preferences to the store. The caller keeps
    /// its candidate for a retry.
    #[error("failed to save preferences: {0}")]
    PersistFailed(String),

    /// A snapshot had a structurally impossible shape and was ignored.
    #[error("malformed preference snapshot: {0}")]
    MalformedSnapshot(String),
}

impl SyncError {
    /// True when the synchronizer stopped applying changes because of this error.
    pub fn ends_session(&self) -> bool {
        matches!(self, SyncError::SubscriptionLost(_))
    }

    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::CacheUnavailable(_) => "cache_unavailable",
            SyncError::SubscriptionLost(_) => "subscription_lost",
            SyncError::PersistFailed(_) => "persist_failed",
            SyncError::MalformedSnapshot(_) => "malformed_snapshot",
        }
    }
}

/// Errors returned by [`LocalCache`](crate::LocalCache) implementations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Storage is disabled or not present (private browsing, no `localStorage`).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("cache contents unreadable: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<CacheError> for SyncError {
    fn from(err: CacheError) -> Self {
        SyncError::CacheUnavailable(err.to_string())
    }
}

/// Errors from validating an HSL triple.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorValueError {
    /// Nothing but whitespace.
    #[error("color value is empty")]
    Empty,

    /// Not a `<hue> <sat>% <light>%` triple.
    #[error("invalid color '{value}': {message}")]
    Syntax { value: String, message: String },

    /// Saturation or lightness outside 0..=100.
    #[error("invalid color '{value}': {component} must be between 0% and 100%")]
    OutOfRange {
        value: String,
        component: &'static str,
    },
}

impl ColorValueError {
    pub(crate) fn syntax(value: &str, message: impl Into<String>) -> Self {
        Self::Syntax {
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Errors from loading a [`SyncConfig`](crate::SyncConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("failed to parse config{}: {message}", display_path(.path))]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    /// The config file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A palette entry is not a valid HSL triple.
    #[error("palette '{mode}.{slot}': {source}")]
    InvalidColor {
        mode: &'static str,
        slot: &'static str,
        #[source]
        source: ColorValueError,
    },

    /// Two font-size classes (or the two mode classes) share a name.
    #[error("class names must be distinct: '{0}' is used twice")]
    DuplicateClass(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse {
            path: None,
            message: err.to_string(),
        }
    }
}
