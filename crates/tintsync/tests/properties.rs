//! Property-based tests for resolution and style injection.

use proptest::prelude::*;
use tintsync::{
    resolve, ColorMode, ColorSlot, FontSizeLevel, ManualSignal, MemoryDocument, MemoryStore,
    Palettes, PartialColorTheme, PreferenceSync, ResolvedPresentation, StyleInjector, SyncConfig,
    ThemeMode, UserPreferences,
};

// ============================================================================
// Strategies
// ============================================================================

fn theme_strategy() -> impl Strategy<Value = ThemeMode> {
    prop_oneof![
        Just(ThemeMode::Light),
        Just(ThemeMode::Dark),
        Just(ThemeMode::System),
    ]
}

fn mode_strategy() -> impl Strategy<Value = ColorMode> {
    prop_oneof![Just(ColorMode::Light), Just(ColorMode::Dark)]
}

fn font_strategy() -> impl Strategy<Value = FontSizeLevel> {
    prop_oneof![
        Just(FontSizeLevel::Small),
        Just(FontSizeLevel::Base),
        Just(FontSizeLevel::Large),
    ]
}

fn hsl_strategy() -> impl Strategy<Value = String> {
    (0u16..360, 0u8..=100, 0u8..=100).prop_map(|(h, s, l)| format!("{h} {s}% {l}%"))
}

fn slot_value_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        3 => Just(None),
        1 => Just(Some(String::new())),
        1 => Just(Some("   ".to_string())),
        3 => hsl_strategy().prop_map(Some),
    ]
}

fn partial_theme_strategy() -> impl Strategy<Value = PartialColorTheme> {
    prop::collection::vec(slot_value_strategy(), 5).prop_map(|values| {
        let mut theme = PartialColorTheme::new();
        for (slot, value) in ColorSlot::ALL.into_iter().zip(values) {
            theme.set(slot, value);
        }
        theme
    })
}

fn prefs_strategy() -> impl Strategy<Value = UserPreferences> {
    (
        theme_strategy(),
        font_strategy(),
        partial_theme_strategy(),
        partial_theme_strategy(),
    )
        .prop_map(|(theme, font_size, light, dark)| UserPreferences {
            theme,
            font_size,
            custom_light_theme: light,
            custom_dark_theme: dark,
        })
}

fn presentation_strategy() -> impl Strategy<Value = ResolvedPresentation> {
    (prefs_strategy(), any::<bool>())
        .prop_map(|(prefs, dark)| resolve(&prefs, dark, &Palettes::default()))
}

// ============================================================================
// Helpers
// ============================================================================

fn applied(presentations: &[ResolvedPresentation]) -> MemoryDocument {
    let mut injector = StyleInjector::new(MemoryDocument::new(), SyncConfig::default());
    for p in presentations {
        injector.apply(p);
    }
    injector.document().clone()
}

fn mode_class_count(doc: &MemoryDocument) -> usize {
    ["light", "dark"]
        .into_iter()
        .filter(|c| doc.has_root_class(c))
        .count()
}

fn font_class_count(doc: &MemoryDocument) -> usize {
    ["font-size-small", "font-size-base", "font-size-large"]
        .into_iter()
        .filter(|c| doc.has_root_class(c))
        .count()
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Applying a presentation twice leaves the same document as applying it once.
    #[test]
    fn apply_is_idempotent(p in presentation_strategy()) {
        let once = applied(std::slice::from_ref(&p));
        let twice = applied(&[p.clone(), p]);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(twice.style_elements().len(), 1);
    }

    /// Whatever the sequence of applies, the document matches the last one only.
    #[test]
    fn last_apply_supersedes_everything(
        sequence in prop::collection::vec(presentation_strategy(), 1..12),
    ) {
        let doc = applied(&sequence);
        let last = sequence.last().unwrap();

        prop_assert_eq!(&doc, &applied(std::slice::from_ref(last)));
        prop_assert_eq!(mode_class_count(&doc), 1);
        prop_assert_eq!(font_class_count(&doc), 1);
        prop_assert_eq!(doc.style_elements().len(), 1);
    }

    /// Empty custom themes resolve to exactly the defaults for the active mode.
    #[test]
    fn empty_customs_resolve_to_defaults(
        theme in theme_strategy(),
        font_size in font_strategy(),
        system_dark in any::<bool>(),
    ) {
        let defaults = Palettes::default();
        let prefs = UserPreferences::new(theme, font_size);
        let resolved = resolve(&prefs, system_dark, &defaults);
        prop_assert_eq!(resolved.colors(), defaults.for_mode(resolved.mode));
    }

    /// Every slot is filled: the custom value when effective, the default otherwise.
    #[test]
    fn every_slot_is_populated(prefs in prefs_strategy(), system_dark in any::<bool>()) {
        let defaults = Palettes::default();
        let resolved = resolve(&prefs, system_dark, &defaults);

        for mode in [ColorMode::Light, ColorMode::Dark] {
            let custom = prefs.custom_theme(mode);
            let palette = resolved.palettes.for_mode(mode);
            for slot in ColorSlot::ALL {
                let value = palette.get(slot);
                prop_assert!(!value.trim().is_empty());
                match custom.effective(slot) {
                    Some(custom) => prop_assert_eq!(value, custom),
                    None => prop_assert_eq!(value, defaults.for_mode(mode).get(slot)),
                }
            }
        }
    }

    /// The resolved mode is never System and only follows the signal for System.
    #[test]
    fn mode_resolution(theme in theme_strategy(), system_dark in any::<bool>()) {
        let prefs = UserPreferences::new(theme, FontSizeLevel::Base);
        let resolved = resolve(&prefs, system_dark, &Palettes::default());
        let expected = match theme {
            ThemeMode::Light => ColorMode::Light,
            ThemeMode::Dark => ColorMode::Dark,
            ThemeMode::System if system_dark => ColorMode::Dark,
            ThemeMode::System => ColorMode::Light,
        };
        prop_assert_eq!(resolved.mode, expected);
    }

    /// Rapid previews leave exactly the last candidate's effect.
    #[test]
    fn last_preview_wins(
        candidates in prop::collection::vec(prefs_strategy(), 1..10),
        system_dark in any::<bool>(),
    ) {
        let store = MemoryStore::new();
        let sync = PreferenceSync::builder(store, MemoryDocument::new())
            .signal(ManualSignal::new(system_dark))
            .build();

        for candidate in &candidates {
            sync.preview(candidate);
        }

        let last = candidates.last().unwrap();
        let expected = resolve(last, system_dark, &Palettes::default());
        prop_assert_eq!(sync.presentation(), Some(expected.clone()));
        prop_assert_eq!(&*sync.document(), &applied(&[expected]));
    }

    /// A single mode class survives any mix of mode switches.
    #[test]
    fn mode_switches_leave_one_class(modes in prop::collection::vec(mode_strategy(), 1..20)) {
        let sequence: Vec<_> = modes
            .iter()
            .map(|mode| ResolvedPresentation {
                mode: *mode,
                font_size: FontSizeLevel::Base,
                palettes: Palettes::default(),
            })
            .collect();
        let doc = applied(&sequence);
        let last = modes.last().unwrap();
        prop_assert!(doc.has_root_class(last.as_str()));
        prop_assert_eq!(mode_class_count(&doc), 1);
    }
}
