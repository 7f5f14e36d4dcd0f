//! Stylesheet rendering.
//!
//! A presentation renders to two rule blocks: the root scope carries the light
//! palette, and the root scope qualified with the dark class carries the dark
//! palette. Both are always present, so switching modes only flips a class.
//!
//! ```css
//! :root {
//!   --background: 0 0% 100%;
//!   --primary: 200 50% 40%;
//! }
//! :root.dark {
//!   --background: 222.2 84% 4.9%;
//!   --primary: 210 40% 98%;
//! }
//! ```

use std::fmt::Write;

use crate::config::{ClassNames, SyncConfig};
use crate::model::{ColorTheme, ResolvedPresentation};

/// Renders the full stylesheet for `presentation`.
///
/// Output depends only on the two palettes and the dark class name; the
/// active mode and font size are carried by root classes instead.
pub fn render_stylesheet(presentation: &ResolvedPresentation, config: &SyncConfig) -> String {
    let mut css = String::with_capacity(512);
    render_block(&mut css, ":root", &presentation.palettes.light);
    render_block(
        &mut css,
        &format!(":root.{}", config.classes.dark),
        &presentation.palettes.dark,
    );
    css
}

/// The two classes the document root carries for `presentation`:
/// the mode class, then the font-size class.
pub fn root_classes<'a>(
    presentation: &ResolvedPresentation,
    classes: &'a ClassNames,
) -> [&'a str; 2] {
    [
        classes.mode(presentation.mode),
        classes.font(presentation.font_size),
    ]
}

fn render_block(css: &mut String, selector: &str, palette: &ColorTheme) {
    // Writing to a String cannot fail.
    let _ = writeln!(css, "{} {{", selector);
    for (slot, value) in palette.iter() {
        let _ = writeln!(css, "  {}: {};", slot.css_var(), value.trim());
    }
    css.push_str("}\n");
}
