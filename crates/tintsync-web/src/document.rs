use tintsync::DocumentHost;
use tracing::warn;
use web_sys::{Document, Element};

use crate::WebError;

/// The live DOM.
///
/// The style element goes into `<head>` and classes go on the document
/// element (`<html>`). DOM calls that fail are logged and skipped; the
/// injector has no error path.
#[derive(Debug, Clone)]
pub struct BrowserDocument {
    document: Document,
}

impl BrowserDocument {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The document of the global window.
    pub fn current() -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::NoWindow)?;
        let document = window.document().ok_or(WebError::NoDocument)?;
        Ok(Self::new(document))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The `<style id=...>` that is a direct child of `<head>`.
    ///
    /// Elements elsewhere in the page that share the id are never matched.
    pub fn head_style(&self, id: &str) -> Option<Element> {
        let children = self.document.head()?.children();
        (0..children.length())
            .filter_map(|index| children.item(index))
            .find(|el| el.id() == id && el.tag_name().eq_ignore_ascii_case("style"))
    }
}

impl DocumentHost for BrowserDocument {
    fn has_style_element(&self, id: &str) -> bool {
        self.head_style(id).is_some()
    }

    fn create_style_element(&mut self, id: &str) {
        let Some(head) = self.document.head() else {
            warn!("document has no <head>, style element not created");
            return;
        };
        let style = match self.document.create_element("style") {
            Ok(style) => style,
            Err(err) => {
                warn!(error = ?err, "failed to create style element");
                return;
            }
        };
        style.set_id(id);
        if let Err(err) = head.append_child(&style) {
            warn!(error = ?err, "failed to append style element");
        }
    }

    fn set_style_text(&mut self, id: &str, css: &str) {
        match self.head_style(id) {
            Some(style) => style.set_text_content(Some(css)),
            None => warn!(id, "no style element in <head>, stylesheet not written"),
        }
    }

    fn add_root_class(&mut self, class: &str) {
        if let Some(root) = self.document.document_element() {
            if let Err(err) = root.class_list().add_1(class) {
                warn!(class, error = ?err, "failed to add root class");
            }
        }
    }

    fn remove_root_class(&mut self, class: &str) {
        if let Some(root) = self.document.document_element() {
            if let Err(err) = root.class_list().remove_1(class) {
                warn!(class, error = ?err, "failed to remove root class");
            }
        }
    }
}
