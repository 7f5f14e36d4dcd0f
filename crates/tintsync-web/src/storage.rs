use tintsync::{CacheError, LocalCache};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// `window.localStorage` as a [`LocalCache`].
///
/// Browsers throw from storage calls when storage is disabled or the quota is
/// exhausted; those surface as [`CacheError::Unavailable`].
#[derive(Debug, Clone)]
pub struct BrowserStorage {
    storage: Storage,
}

impl BrowserStorage {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// The origin's `localStorage`.
    pub fn local() -> Result<Self, CacheError> {
        let window =
            web_sys::window().ok_or_else(|| CacheError::Unavailable("no global window".into()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(Self::new(storage)),
            Ok(None) => Err(CacheError::Unavailable("localStorage is not available".into())),
            Err(err) => Err(unavailable(err)),
        }
    }
}

impl LocalCache for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.storage.get_item(key).map_err(unavailable)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.storage.set_item(key, value).map_err(unavailable)
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove_item(key).map_err(unavailable)
    }
}

fn unavailable(err: JsValue) -> CacheError {
    let message = err
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| "storage access denied".to_string());
    CacheError::Unavailable(message)
}
