//! Synchronizer configuration.
//!
//! [`SyncConfig::default`] is the compiled-in configuration. Hosts whose CSS
//! uses other class names, or who ship other default palettes, load overrides
//! from YAML. Every key is optional:
//!
//! ```yaml
//! style_element_id: app-theme
//! classes:
//!   dark: theme-dark
//!   font_large: text-lg
//! cache_keys:
//!   theme: app.theme
//! palettes:
//!   light:
//!     primary: "262 83% 58%"
//!   dark:
//!     primary: "263 70% 50%"
//! clear_cache_on_stop: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hsl::HslTriple;
use crate::model::{ColorMode, ColorSlot, FontSizeLevel, Palettes, PartialColorTheme};

/// Class names the Style Injector toggles on the document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNames {
    pub light: String,
    pub dark: String,
    pub font_small: String,
    pub font_base: String,
    pub font_large: String,
}

impl ClassNames {
    pub fn mode(&self, mode: ColorMode) -> &str {
        match mode {
            ColorMode::Light => &self.light,
            ColorMode::Dark => &self.dark,
        }
    }

    pub fn font(&self, level: FontSizeLevel) -> &str {
        match level {
            FontSizeLevel::Small => &self.font_small,
            FontSizeLevel::Base => &self.font_base,
            FontSizeLevel::Large => &self.font_large,
        }
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            light: "light".into(),
            dark: "dark".into(),
            font_small: "font-size-small".into(),
            font_base: "font-size-base".into(),
            font_large: "font-size-large".into(),
        }
    }
}

/// The two Local Cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeys {
    pub theme: String,
    pub font_size: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            theme: "theme".into(),
            font_size: "fontSize".into(),
        }
    }
}

/// Everything the synchronizer and Style Injector need besides their seams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfig {
    /// Id of the single `<style>` element the injector owns.
    pub style_element_id: String,
    pub classes: ClassNames,
    pub cache_keys: CacheKeys,
    /// Defaults for every slot a user leaves empty.
    pub palettes: Palettes,
    /// Remove the cached theme and font size on `stop` (logout).
    pub clear_cache_on_stop: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            style_element_id: "tintsync-theme".into(),
            classes: ClassNames::default(),
            cache_keys: CacheKeys::default(),
            palettes: Palettes::default(),
            clear_cache_on_stop: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    style_element_id: Option<String>,
    classes: RawClassNames,
    cache_keys: RawCacheKeys,
    palettes: RawPalettes,
    clear_cache_on_stop: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawClassNames {
    light: Option<String>,
    dark: Option<String>,
    font_small: Option<String>,
    font_base: Option<String>,
    font_large: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCacheKeys {
    theme: Option<String>,
    font_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPalettes {
    light: PartialColorTheme,
    dark: PartialColorTheme,
}

impl SyncConfig {
    /// Loads a configuration from YAML, filling every missing key with the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid YAML or unknown keys,
    /// [`ConfigError::InvalidColor`] for a palette entry that is not an HSL
    /// triple, and [`ConfigError::DuplicateClass`] when two classes collide.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tintsync::SyncConfig;
    ///
    /// let config = SyncConfig::from_yaml("classes: { dark: night }").unwrap();
    /// assert_eq!(config.classes.dark, "night");
    /// assert_eq!(config.classes.light, "light");
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let raw: RawConfig = if yaml.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        Self::from_raw(raw)
    }

    /// Loads a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut config = SyncConfig::default();

        if let Some(id) = raw.style_element_id {
            config.style_element_id = id;
        }
        if let Some(flag) = raw.clear_cache_on_stop {
            config.clear_cache_on_stop = flag;
        }

        let classes = &mut config.classes;
        override_with(&mut classes.light, raw.classes.light);
        override_with(&mut classes.dark, raw.classes.dark);
        override_with(&mut classes.font_small, raw.classes.font_small);
        override_with(&mut classes.font_base, raw.classes.font_base);
        override_with(&mut classes.font_large, raw.classes.font_large);

        override_with(&mut config.cache_keys.theme, raw.cache_keys.theme);
        override_with(&mut config.cache_keys.font_size, raw.cache_keys.font_size);

        for (mode, overrides) in [
            (ColorMode::Light, raw.palettes.light),
            (ColorMode::Dark, raw.palettes.dark),
        ] {
            for slot in ColorSlot::ALL {
                let Some(value) = overrides.get(slot).filter(|v| !v.trim().is_empty()) else {
                    continue;
                };
                let triple =
                    HslTriple::parse(value).map_err(|source| ConfigError::InvalidColor {
                        mode: mode.as_str(),
                        slot: slot.key(),
                        source,
                    })?;
                config
                    .palettes
                    .for_mode_mut(mode)
                    .set(slot, triple.to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that every root class is distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let classes = &self.classes;
        for class in [
            &classes.light,
            &classes.dark,
            &classes.font_small,
            &classes.font_base,
            &classes.font_large,
        ] {
            if !seen.insert(class.as_str()) {
                return Err(ConfigError::DuplicateClass(class.clone()));
            }
        }
        Ok(())
    }
}

fn override_with(target: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = value;
    }
}
