//! Subcommand implementations. Each returns its output instead of printing it.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde_json::{json, Value};
use tintsync::{
    decode_preferences, render_stylesheet, resolve as resolve_presentation, root_classes,
    validate_hsl, ColorMode, ColorSlot, ResolvedPresentation, SyncConfig, UserPreferences,
    PREFERENCES_FIELD,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::from_file(path).context("loading config"),
        None => Ok(SyncConfig::default()),
    }
}

/// `true` for dark: the flag when given, the OS otherwise.
pub fn system_mode(flag: Option<SystemMode>) -> bool {
    match flag {
        Some(mode) => mode == SystemMode::Dark,
        None => {
            let dark = tintsync::os_prefers_dark();
            debug!(prefers_dark = dark, "system color scheme from OS");
            dark
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Accepts a bare preferences object or a whole user record.
fn load_preferences(path: &Path) -> Result<UserPreferences> {
    let value = read_json(path)?;
    let is_record = value
        .as_object()
        .is_some_and(|fields| fields.contains_key(PREFERENCES_FIELD));
    let record = if is_record {
        value
    } else {
        json!({ PREFERENCES_FIELD: value })
    };
    decode_preferences(&record).with_context(|| format!("decoding {}", path.display()))
}

fn presentation_for(
    path: &Path,
    system_dark: bool,
    config: &SyncConfig,
) -> Result<ResolvedPresentation> {
    let prefs = load_preferences(path)?;
    Ok(resolve_presentation(&prefs, system_dark, &config.palettes))
}

pub fn css(path: &Path, system_dark: bool, config: &SyncConfig) -> Result<String> {
    let presentation = presentation_for(path, system_dark, config)?;
    let classes = root_classes(&presentation, &config.classes).join(" ");
    Ok(format!(
        "/* root classes: {classes} */\n{}",
        render_stylesheet(&presentation, config)
    ))
}

pub fn resolve(
    path: &Path,
    system_dark: bool,
    config: &SyncConfig,
    format: OutputFormat,
) -> Result<String> {
    let presentation = presentation_for(path, system_dark, config)?;
    let mut output = serde_json::to_value(&presentation)?;
    if let Value::Object(ref mut fields) = output {
        fields.insert("colors".into(), serde_json::to_value(presentation.colors())?);
        fields.insert(
            "rootClasses".into(),
            json!(root_classes(&presentation, &config.classes)),
        );
    }
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&output)?,
        OutputFormat::Yaml => serde_yaml::to_string(&output)?,
    })
}

/// Outcome of checking one stored user record.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub preferences: Option<UserPreferences>,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn render(&self, color: bool) -> String {
        let mark = |ok: bool| {
            let (symbol, styled) = if ok {
                ("ok", style("ok").green())
            } else {
                ("FAIL", style("FAIL").red().bold())
            };
            if color {
                styled.to_string()
            } else {
                symbol.to_string()
            }
        };

        let mut out = String::new();
        if let Some(prefs) = &self.preferences {
            let _ = writeln!(out, "theme: {}", prefs.theme);
            let _ = writeln!(out, "fontSize: {}", prefs.font_size);
        }
        for problem in &self.problems {
            let _ = writeln!(out, "{} {}", mark(false), problem);
        }
        if self.is_ok() {
            let _ = writeln!(out, "{} record is valid", mark(true));
        }
        out
    }
}

pub fn check(path: &Path) -> Result<CheckReport> {
    let record = read_json(path)?;
    let mut report = CheckReport::default();

    let prefs = match decode_preferences(&record) {
        Ok(prefs) => prefs,
        Err(err) => {
            report.problems.push(err.to_string());
            return Ok(report);
        }
    };
    if record.get(PREFERENCES_FIELD).is_none() {
        report
            .problems
            .push(format!("record has no '{PREFERENCES_FIELD}' field"));
    }

    for mode in [ColorMode::Light, ColorMode::Dark] {
        let field = match mode {
            ColorMode::Light => "customLightTheme",
            ColorMode::Dark => "customDarkTheme",
        };
        for slot in ColorSlot::ALL {
            let value = prefs.custom_theme(mode).get(slot);
            if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
                if let Err(err) = validate_hsl(value) {
                    report.problems.push(format!("{field}.{slot}: {err}"));
                }
            }
        }
    }

    report.preferences = Some(prefs);
    Ok(report)
}
