//! Compiled-in default palettes.
//!
//! Every slot a user leaves empty falls back to these values for the active
//! mode. A [`SyncConfig`](crate::SyncConfig) can replace them wholesale.

use once_cell::sync::Lazy;

use crate::model::{ColorTheme, Palettes};

pub(crate) static DEFAULT_PALETTES: Lazy<Palettes> = Lazy::new(|| Palettes {
    light: ColorTheme {
        background: "0 0% 100%".into(),
        foreground: "222.2 84% 4.9%".into(),
        card: "0 0% 100%".into(),
        primary: "222.2 47.4% 11.2%".into(),
        accent: "210 40% 96.1%".into(),
    },
    dark: ColorTheme {
        background: "222.2 84% 4.9%".into(),
        foreground: "210 40% 98%".into(),
        card: "222.2 84% 4.9%".into(),
        primary: "210 40% 98%".into(),
        accent: "217.2 32.6% 17.5%".into(),
    },
});
