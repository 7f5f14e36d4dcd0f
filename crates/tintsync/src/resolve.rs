//! Resolution: preferences + system signal -> presentation.
//!
//! Every reconciliation goes through [`resolve`], which recomputes the whole
//! [`ResolvedPresentation`] from one snapshot. Nothing here is cached; the
//! mode of a [`ThemeMode::System`] preference is read from the signal value
//! passed in at apply time.

use crate::cache::CachedPreferences;
use crate::model::{
    ColorMode, ColorSlot, ColorTheme, Palettes, PartialColorTheme, ResolvedPresentation,
    ThemeMode, UserPreferences,
};

/// Maps a requested theme to a concrete mode.
///
/// ```rust
/// use tintsync::{resolve_mode, ColorMode, ThemeMode};
///
/// assert_eq!(resolve_mode(ThemeMode::Light, true), ColorMode::Light);
/// assert_eq!(resolve_mode(ThemeMode::System, true), ColorMode::Dark);
/// assert_eq!(resolve_mode(ThemeMode::System, false), ColorMode::Light);
/// ```
pub fn resolve_mode(theme: ThemeMode, system_prefers_dark: bool) -> ColorMode {
    match theme {
        ThemeMode::Light => ColorMode::Light,
        ThemeMode::Dark => ColorMode::Dark,
        ThemeMode::System if system_prefers_dark => ColorMode::Dark,
        ThemeMode::System => ColorMode::Light,
    }
}

/// Fills every slot: the custom value when present and not blank, the
/// default otherwise.
pub fn resolve_colors(custom: &PartialColorTheme, defaults: &ColorTheme) -> ColorTheme {
    let mut resolved = defaults.clone();
    for slot in ColorSlot::ALL {
        if let Some(value) = custom.effective(slot) {
            resolved.set(slot, value);
        }
    }
    resolved
}

/// Computes the full presentation for a preference snapshot.
pub fn resolve(
    prefs: &UserPreferences,
    system_prefers_dark: bool,
    defaults: &Palettes,
) -> ResolvedPresentation {
    ResolvedPresentation {
        mode: resolve_mode(prefs.theme, system_prefers_dark),
        font_size: prefs.font_size,
        palettes: Palettes {
            light: resolve_colors(&prefs.custom_light_theme, &defaults.light),
            dark: resolve_colors(&prefs.custom_dark_theme, &defaults.dark),
        },
    }
}

/// The first-paint presentation built from the Local Cache alone.
///
/// Custom colors are never cached, so both palettes are the defaults until the
/// first remote snapshot arrives.
pub fn provisional(
    cached: &CachedPreferences,
    system_prefers_dark: bool,
    defaults: &Palettes,
) -> ResolvedPresentation {
    resolve(&cached.to_preferences(), system_prefers_dark, defaults)
}
