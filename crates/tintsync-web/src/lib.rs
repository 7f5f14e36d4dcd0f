//! Browser bindings for `tintsync`.
//!
//! Implements the `tintsync` seams over `web-sys`:
//!
//! - [`BrowserDocument`]: the `<style>` element in `<head>` and classes on `<html>`.
//! - [`BrowserStorage`]: `window.localStorage`.
//! - [`MediaQuerySignal`]: `matchMedia("(prefers-color-scheme: dark)")`.
//!
//! [`connect`] wires all three into a [`PreferenceSync`](tintsync::PreferenceSync)
//! for a given store adapter. Call it as early as possible in page startup so
//! the cached theme is applied before first paint.
//!
//! Everything but [`WebError`] only exists on `wasm32`.

#![forbid(unsafe_code)]

/// Failures setting up the browser bindings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebError {
    #[error("no global window")]
    NoWindow,

    #[error("window has no document")]
    NoDocument,
}

#[cfg(target_arch = "wasm32")]
mod document;
#[cfg(target_arch = "wasm32")]
mod signal;
#[cfg(target_arch = "wasm32")]
mod storage;

#[cfg(target_arch = "wasm32")]
pub use document::BrowserDocument;
#[cfg(target_arch = "wasm32")]
pub use signal::{MediaQuerySignal, DARK_SCHEME_QUERY};
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStorage;

/// Builds a synchronizer over the current page.
///
/// A missing `localStorage` is not an error: the synchronizer starts with a
/// disabled cache and reports it as a notice. Without `matchMedia` the system
/// signal reads as light.
#[cfg(target_arch = "wasm32")]
pub fn connect<S: tintsync::PreferenceStore>(
    store: S,
    config: tintsync::SyncConfig,
) -> Result<tintsync::PreferenceSync<S, BrowserDocument>, WebError> {
    let document = BrowserDocument::current()?;
    let builder = tintsync::PreferenceSync::builder(store, document).config(config);

    let builder = match BrowserStorage::local() {
        Ok(storage) => builder.cache(storage),
        Err(err) => {
            tracing::debug!(error = %err, "localStorage unavailable");
            builder.cache(tintsync::MemoryCache::disabled())
        }
    };

    let builder = match MediaQuerySignal::dark_scheme() {
        Some(signal) => builder.signal(signal),
        None => builder.signal(tintsync::ManualSignal::new(false)),
    };

    Ok(builder.build())
}
