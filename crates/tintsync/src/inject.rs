//! The Style Injector.
//!
//! [`StyleInjector`] is the only writer of the dedicated style element and of
//! the mode and font-size classes on the document root. It owns its
//! [`DocumentHost`] and exposes [`apply`](StyleInjector::apply) as the single
//! mutation entry point; callers only get the document back read-only.
//!
//! An apply:
//! 1. creates the style element on first use and reuses it afterwards,
//! 2. rewrites both palette blocks (see [`crate::css`]),
//! 3. leaves exactly one mode class on the root,
//! 4. leaves exactly one font-size class on the root.
//!
//! The result depends only on the latest call, so applying the same
//! presentation twice is the same as applying it once.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::SyncConfig;
use crate::css::render_stylesheet;
use crate::model::{ColorMode, FontSizeLevel, ResolvedPresentation};

/// The document surface the injector needs.
///
/// Implementations are thin: the browser binding forwards to the DOM, and
/// [`MemoryDocument`] records state for tests and server-side rendering.
pub trait DocumentHost {
    /// Whether a style element with `id` exists in the head.
    fn has_style_element(&self, id: &str) -> bool;

    /// Appends a new, empty style element with `id` to the head.
    fn create_style_element(&mut self, id: &str);

    /// Replaces the text content of the style element with `id`.
    fn set_style_text(&mut self, id: &str, css: &str);

    /// Adds a class to the root element. Adding a present class is a no-op.
    fn add_root_class(&mut self, class: &str);

    /// Removes a class from the root element. Removing an absent class is a no-op.
    fn remove_root_class(&mut self, class: &str);
}

/// Applies resolved presentations to a document.
#[derive(Debug)]
pub struct StyleInjector<D: DocumentHost> {
    document: D,
    config: SyncConfig,
    applied: Option<ResolvedPresentation>,
}

impl<D: DocumentHost> StyleInjector<D> {
    pub fn new(document: D, config: SyncConfig) -> Self {
        Self {
            document,
            config,
            applied: None,
        }
    }

    /// Makes the document reflect `presentation` and nothing else.
    pub fn apply(&mut self, presentation: &ResolvedPresentation) {
        let id = self.config.style_element_id.as_str();
        if !self.document.has_style_element(id) {
            self.document.create_style_element(id);
        }
        let css = render_stylesheet(presentation, &self.config);
        self.document.set_style_text(id, &css);

        let classes = &self.config.classes;
        for mode in [ColorMode::Light, ColorMode::Dark] {
            if mode != presentation.mode {
                self.document.remove_root_class(classes.mode(mode));
            }
        }
        self.document
            .add_root_class(classes.mode(presentation.mode));

        for level in FontSizeLevel::ALL {
            if level != presentation.font_size {
                self.document.remove_root_class(classes.font(level));
            }
        }
        self.document
            .add_root_class(classes.font(presentation.font_size));

        debug!(
            mode = %presentation.mode,
            font_size = %presentation.font_size,
            "applied presentation"
        );
        self.applied = Some(presentation.clone());
    }

    /// The presentation of the latest [`apply`](Self::apply), if any.
    pub fn applied(&self) -> Option<&ResolvedPresentation> {
        self.applied.as_ref()
    }

    /// Read-only access to the document.
    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}

/// A style element in a [`MemoryDocument`] head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleElement {
    pub id: String,
    pub text: String,
}

/// A headless document: head style elements and root classes.
///
/// It does not deduplicate style elements on its own, which is what lets tests
/// observe that the injector never creates a second one. Root classes are a
/// set, so two documents compare equal regardless of toggle order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDocument {
    head: Vec<StyleElement>,
    root_classes: BTreeSet<String>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an unrelated class on the root, as real pages do.
    pub fn with_root_class(mut self, class: impl Into<String>) -> Self {
        self.add_root_class(&class.into());
        self
    }

    pub fn style_elements(&self) -> &[StyleElement] {
        &self.head
    }

    pub fn style_text(&self, id: &str) -> Option<&str> {
        self.head
            .iter()
            .find(|el| el.id == id)
            .map(|el| el.text.as_str())
    }

    pub fn root_classes(&self) -> &BTreeSet<String> {
        &self.root_classes
    }

    pub fn has_root_class(&self, class: &str) -> bool {
        self.root_classes.contains(class)
    }
}

impl DocumentHost for MemoryDocument {
    fn has_style_element(&self, id: &str) -> bool {
        self.head.iter().any(|el| el.id == id)
    }

    fn create_style_element(&mut self, id: &str) {
        self.head.push(StyleElement {
            id: id.to_string(),
            text: String::new(),
        });
    }

    fn set_style_text(&mut self, id: &str, css: &str) {
        if let Some(el) = self.head.iter_mut().find(|el| el.id == id) {
            el.text = css.to_string();
        }
    }

    fn add_root_class(&mut self, class: &str) {
        self.root_classes.insert(class.to_string());
    }

    fn remove_root_class(&mut self, class: &str) {
        self.root_classes.remove(class);
    }
}
