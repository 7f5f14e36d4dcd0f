//! Headless model of the preference editor form.
//!
//! A [`PreferenceDraft`] stages edits against the last committed snapshot.
//! The UI feeds [`candidate`](PreferenceDraft::candidate) to `preview` on
//! every change and to `commit` on save. A failed commit leaves the draft
//! untouched so the user can retry.
//!
//! ```rust
//! use tintsync::{ColorMode, ColorSlot, PreferenceDraft, ThemeMode, UserPreferences};
//!
//! let mut draft = PreferenceDraft::new(UserPreferences::default());
//! draft.set_theme(ThemeMode::Dark);
//! draft.set_color(ColorMode::Dark, ColorSlot::Primary, "200deg 50% 40%").unwrap();
//!
//! assert!(draft.is_dirty());
//! assert_eq!(
//!     draft.candidate().custom_dark_theme.primary.as_deref(),
//!     Some("200 50% 40%")
//! );
//! ```

use crate::error::ColorValueError;
use crate::hsl::HslTriple;
use crate::model::{
    ColorMode, ColorSlot, FontSizeLevel, PartialColorTheme, ThemeMode, UserPreferences,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceDraft {
    committed: UserPreferences,
    candidate: UserPreferences,
}

impl PreferenceDraft {
    /// Starts a clean draft from the last committed preferences.
    pub fn new(committed: UserPreferences) -> Self {
        Self {
            candidate: committed.clone(),
            committed,
        }
    }

    pub fn candidate(&self) -> &UserPreferences {
        &self.candidate
    }

    pub fn committed(&self) -> &UserPreferences {
        &self.committed
    }

    pub fn is_dirty(&self) -> bool {
        self.candidate != self.committed
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.candidate.theme = theme;
    }

    pub fn set_font_size(&mut self, font_size: FontSizeLevel) {
        self.candidate.font_size = font_size;
    }

    /// Sets one color slot from user input.
    ///
    /// Blank input clears the slot so it falls back to the default. Anything
    /// else must be an HSL triple and is stored in canonical form.
    ///
    /// # Errors
    ///
    /// The candidate is unchanged when `value` is not a valid triple.
    pub fn set_color(
        &mut self,
        mode: ColorMode,
        slot: ColorSlot,
        value: &str,
    ) -> Result<(), ColorValueError> {
        let value = match HslTriple::parse(value) {
            Ok(triple) => Some(triple.to_string()),
            Err(ColorValueError::Empty) => None,
            Err(err) => return Err(err),
        };
        self.candidate.custom_theme_mut(mode).set(slot, value);
        Ok(())
    }

    pub fn clear_color(&mut self, mode: ColorMode, slot: ColorSlot) {
        self.candidate.custom_theme_mut(mode).set(slot, None);
    }

    /// Drops every custom color of one mode.
    pub fn reset_mode_colors(&mut self, mode: ColorMode) {
        *self.candidate.custom_theme_mut(mode) = PartialColorTheme::default();
    }

    /// Resets the candidate to factory defaults. Still needs a commit.
    pub fn reset_all(&mut self) {
        self.candidate = UserPreferences::default();
    }

    /// Throws away unsaved edits.
    pub fn discard(&mut self) {
        self.candidate = self.committed.clone();
    }

    /// Records a successful commit of the current candidate.
    pub fn mark_committed(&mut self) {
        self.committed = self.candidate.clone();
    }

    /// Adopts a newer snapshot from the store.
    ///
    /// A clean draft follows the snapshot. A dirty one keeps its edits and
    /// only moves its base, so `is_dirty` compares against the new snapshot.
    pub fn rebase(&mut self, snapshot: UserPreferences) {
        if !self.is_dirty() {
            self.candidate = snapshot.clone();
        }
        self.committed = snapshot;
    }
}
