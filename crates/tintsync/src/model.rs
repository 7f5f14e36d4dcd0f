//! Preference data model.
//!
//! [`UserPreferences`] is the persisted record embedded in a user document.
//! [`ResolvedPresentation`] is what actually gets applied to a document: the
//! mode is concrete (never [`ThemeMode::System`]) and both palettes have all
//! five slots filled in.
//!
//! # Persisted Shape
//!
//! ```json
//! {
//!   "theme": "system",
//!   "fontSize": "base",
//!   "customLightTheme": { "primary": "200 50% 40%" },
//!   "customDarkTheme": {}
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The theme a user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Always light.
    Light,
    /// Always dark.
    Dark,
    /// Follow the operating system preference.
    #[default]
    System,
}

impl ThemeMode {
    /// The string stored in the Local Cache and the remote record.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A concrete color mode. This is what [`ThemeMode`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Light background, dark text.
    Light,
    /// Dark background, light text.
    Dark,
}

impl ColorMode {
    pub fn is_dark(&self) -> bool {
        matches!(self, ColorMode::Dark)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text scale. Each level maps to exactly one CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSizeLevel {
    Small,
    #[default]
    Base,
    Large,
}

impl FontSizeLevel {
    pub const ALL: [FontSizeLevel; 3] = [
        FontSizeLevel::Small,
        FontSizeLevel::Base,
        FontSizeLevel::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontSizeLevel::Small => "small",
            FontSizeLevel::Base => "base",
            FontSizeLevel::Large => "large",
        }
    }
}

impl fmt::Display for FontSizeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontSizeLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "small" => Ok(FontSizeLevel::Small),
            "base" => Ok(FontSizeLevel::Base),
            "large" => Ok(FontSizeLevel::Large),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when parsing a [`ThemeMode`] or [`FontSizeLevel`] from an unknown string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// One of the five semantic color slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorSlot {
    Background,
    Foreground,
    Card,
    Primary,
    Accent,
}

impl ColorSlot {
    /// All slots, in stylesheet order.
    pub const ALL: [ColorSlot; 5] = [
        ColorSlot::Background,
        ColorSlot::Foreground,
        ColorSlot::Card,
        ColorSlot::Primary,
        ColorSlot::Accent,
    ];

    /// Key used in the persisted record.
    pub fn key(&self) -> &'static str {
        match self {
            ColorSlot::Background => "background",
            ColorSlot::Foreground => "foreground",
            ColorSlot::Card => "card",
            ColorSlot::Primary => "primary",
            ColorSlot::Accent => "accent",
        }
    }

    /// CSS custom property written by the Style Injector.
    pub fn css_var(&self) -> &'static str {
        match self {
            ColorSlot::Background => "--background",
            ColorSlot::Foreground => "--foreground",
            ColorSlot::Card => "--card",
            ColorSlot::Primary => "--primary",
            ColorSlot::Accent => "--accent",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ColorSlot::ALL.into_iter().find(|slot| slot.key() == key)
    }
}

impl fmt::Display for ColorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A fully populated palette. Values are HSL triples such as `"222.2 84% 4.9%"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorTheme {
    pub background: String,
    pub foreground: String,
    pub card: String,
    pub primary: String,
    pub accent: String,
}

impl ColorTheme {
    pub fn get(&self, slot: ColorSlot) -> &str {
        match slot {
            ColorSlot::Background => &self.background,
            ColorSlot::Foreground => &self.foreground,
            ColorSlot::Card => &self.card,
            ColorSlot::Primary => &self.primary,
            ColorSlot::Accent => &self.accent,
        }
    }

    pub fn set(&mut self, slot: ColorSlot, value: impl Into<String>) {
        let value = value.into();
        match slot {
            ColorSlot::Background => self.background = value,
            ColorSlot::Foreground => self.foreground = value,
            ColorSlot::Card => self.card = value,
            ColorSlot::Primary => self.primary = value,
            ColorSlot::Accent => self.accent = value,
        }
    }

    /// Iterates `(slot, value)` pairs in stylesheet order.
    pub fn iter(&self) -> impl Iterator<Item = (ColorSlot, &str)> + '_ {
        ColorSlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}

/// A user's customizations for one mode. Any slot may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialColorTheme {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

/// Rejects values that could end a declaration or block, open a comment or
/// string, or close the surrounding `<style>` element.
fn is_declaration_safe(value: &str) -> bool {
    !value.contains("/*")
        && !value.contains("*/")
        && !value.chars().any(|c| {
            matches!(c, ';' | '{' | '}' | '<' | '>' | '\\' | '"' | '\'') || c.is_control()
        })
}

impl PartialColorTheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a slot, returning `self` for chaining.
    pub fn with(mut self, slot: ColorSlot, value: impl Into<String>) -> Self {
        self.set(slot, Some(value.into()));
        self
    }

    pub fn get(&self, slot: ColorSlot) -> Option<&str> {
        self.slot_ref(slot).as_deref()
    }

    /// Returns the slot value only when it is present, not blank, and safe to
    /// write as a stylesheet declaration value.
    pub fn effective(&self, slot: ColorSlot) -> Option<&str> {
        self.get(slot)
            .filter(|value| !value.trim().is_empty() && is_declaration_safe(value))
    }

    pub fn set(&mut self, slot: ColorSlot, value: Option<String>) {
        *self.slot_mut(slot) = value;
    }

    /// True when no slot carries an effective value.
    pub fn is_empty(&self) -> bool {
        ColorSlot::ALL
            .into_iter()
            .all(|slot| self.effective(slot).is_none())
    }

    fn slot_ref(&self, slot: ColorSlot) -> &Option<String> {
        match slot {
            ColorSlot::Background => &self.background,
            ColorSlot::Foreground => &self.foreground,
            ColorSlot::Card => &self.card,
            ColorSlot::Primary => &self.primary,
            ColorSlot::Accent => &self.accent,
        }
    }

    fn slot_mut(&mut self, slot: ColorSlot) -> &mut Option<String> {
        match slot {
            ColorSlot::Background => &mut self.background,
            ColorSlot::Foreground => &mut self.foreground,
            ColorSlot::Card => &mut self.card,
            ColorSlot::Primary => &mut self.primary,
            ColorSlot::Accent => &mut self.accent,
        }
    }
}

/// The persisted preference record. One per user, stored as the `preferences`
/// field of the user document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: ThemeMode,
    pub font_size: FontSizeLevel,
    pub custom_light_theme: PartialColorTheme,
    pub custom_dark_theme: PartialColorTheme,
}

impl UserPreferences {
    pub fn new(theme: ThemeMode, font_size: FontSizeLevel) -> Self {
        Self {
            theme,
            font_size,
            ..Self::default()
        }
    }

    pub fn custom_theme(&self, mode: ColorMode) -> &PartialColorTheme {
        match mode {
            ColorMode::Light => &self.custom_light_theme,
            ColorMode::Dark => &self.custom_dark_theme,
        }
    }

    pub fn custom_theme_mut(&mut self, mode: ColorMode) -> &mut PartialColorTheme {
        match mode {
            ColorMode::Light => &mut self.custom_light_theme,
            ColorMode::Dark => &mut self.custom_dark_theme,
        }
    }
}

/// Compiled-in (or configured) default palettes, one per mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palettes {
    pub light: ColorTheme,
    pub dark: ColorTheme,
}

impl Palettes {
    pub fn for_mode(&self, mode: ColorMode) -> &ColorTheme {
        match mode {
            ColorMode::Light => &self.light,
            ColorMode::Dark => &self.dark,
        }
    }

    pub fn for_mode_mut(&mut self, mode: ColorMode) -> &mut ColorTheme {
        match mode {
            ColorMode::Light => &mut self.light,
            ColorMode::Dark => &mut self.dark,
        }
    }
}

impl Default for Palettes {
    fn default() -> Self {
        crate::palette::DEFAULT_PALETTES.clone()
    }
}

/// The presentation applied to a document at one point in time.
///
/// Always computed in full from a preference snapshot and the current
/// system signal. Never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPresentation {
    pub mode: ColorMode,
    pub font_size: FontSizeLevel,
    /// Both fully defaulted palettes. The Style Injector writes both on every
    /// apply so a mode switch is only a class toggle.
    pub palettes: Palettes,
}

impl ResolvedPresentation {
    /// The palette of the active mode.
    pub fn colors(&self) -> &ColorTheme {
        self.palettes.for_mode(self.mode)
    }
}
