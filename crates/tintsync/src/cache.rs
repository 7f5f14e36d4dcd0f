//! The Local Cache seam.
//!
//! The cache remembers the last applied theme and font size so the first
//! paint can be styled before the remote record arrives. It holds exactly two
//! string keys and never any colors.
//!
//! Implementations:
//! - [`MemoryCache`]: in-process, with a disabled mode for tests.
//! - [`FileCache`]: a JSON file under the user's config directory (native hosts).
//! - `tintsync-web` provides one over `window.localStorage`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::config::CacheKeys;
use crate::error::CacheError;
use crate::model::{FontSizeLevel, ThemeMode, UserPreferences};

/// Synchronous key/value storage that survives reloads.
pub trait LocalCache {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove_item(&self, key: &str) -> Result<(), CacheError>;
}

/// The coarse, fast-path values kept in the Local Cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachedPreferences {
    pub theme: Option<ThemeMode>,
    pub font_size: Option<FontSizeLevel>,
}

impl CachedPreferences {
    pub fn from_preferences(prefs: &UserPreferences) -> Self {
        Self {
            theme: Some(prefs.theme),
            font_size: Some(prefs.font_size),
        }
    }

    /// True when neither key held a usable value.
    pub fn is_empty(&self) -> bool {
        self.theme.is_none() && self.font_size.is_none()
    }

    /// Preferences with the cached values and no custom colors.
    pub fn to_preferences(&self) -> UserPreferences {
        UserPreferences::new(
            self.theme.unwrap_or_default(),
            self.font_size.unwrap_or_default(),
        )
    }

    /// Reads both keys. Values that do not parse count as absent.
    pub fn read(cache: &dyn LocalCache, keys: &CacheKeys) -> Result<Self, CacheError> {
        let theme = cache
            .get_item(&keys.theme)?
            .and_then(|raw| parse_cached(&keys.theme, &raw));
        let font_size = cache
            .get_item(&keys.font_size)?
            .and_then(|raw| parse_cached(&keys.font_size, &raw));
        Ok(Self { theme, font_size })
    }

    /// Writes both keys from a full preference snapshot.
    pub fn write(
        cache: &dyn LocalCache,
        keys: &CacheKeys,
        prefs: &UserPreferences,
    ) -> Result<(), CacheError> {
        cache.set_item(&keys.theme, prefs.theme.as_str())?;
        cache.set_item(&keys.font_size, prefs.font_size.as_str())
    }

    /// Removes both keys.
    pub fn clear(cache: &dyn LocalCache, keys: &CacheKeys) -> Result<(), CacheError> {
        cache.remove_item(&keys.theme)?;
        cache.remove_item(&keys.font_size)
    }
}

fn parse_cached<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(key, value = raw, "ignoring unrecognized cached value");
            None
        }
    }
}

#[derive(Debug, Default)]
struct MemoryCacheState {
    items: HashMap<String, String>,
    disabled: bool,
    writes: usize,
}

/// In-process cache. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    state: Rc<RefCell<MemoryCacheState>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose every operation fails, like storage disabled by the browser.
    pub fn disabled() -> Self {
        let cache = Self::default();
        cache.state.borrow_mut().disabled = true;
        cache
    }

    /// Pre-populates a key.
    pub fn with_item(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.state
            .borrow_mut()
            .items
            .insert(key.into(), value.into());
        self
    }

    /// Peeks at a key without going through the trait.
    pub fn item(&self, key: &str) -> Option<String> {
        self.state.borrow().items.get(key).cloned()
    }

    /// Number of successful `set_item` calls so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    fn check_enabled(&self) -> Result<(), CacheError> {
        if self.state.borrow().disabled {
            Err(CacheError::Unavailable("storage is disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl LocalCache for MemoryCache {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_enabled()?;
        Ok(self.item(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.check_enabled()?;
        let mut state = self.state.borrow_mut();
        state.items.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.check_enabled()?;
        self.state.borrow_mut().items.remove(key);
        Ok(())
    }
}

/// A cache persisted as a JSON object of strings.
///
/// Every write rewrites the whole file; the cache is two short keys.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/tintsync/local-cache.json`, or `None` when the platform
    /// has no config directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tintsync").join("local-cache.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, CacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, items: &BTreeMap<String, String>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl LocalCache for FileCache {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.store(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.store(&items)?;
        }
        Ok(())
    }
}
