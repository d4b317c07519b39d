// Headless host page: named elements, stylesheets and copy handling

pub mod styles;

use std::collections::HashMap;

/// A named element of the host page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    id: String,
    content: String,
}

impl Element {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub id: String,
    pub css: String,
}

/// A copy in progress, as seen by copy listeners
#[derive(Debug)]
pub struct CopyEvent {
    selection: String,
    clipboard_data: Option<String>,
    default_prevented: bool,
}

impl CopyEvent {
    pub fn selection(&self) -> &str {
        &self.selection
    }

    /// Replace what ends up on the clipboard (only honored with `prevent_default`)
    pub fn set_clipboard_data(&mut self, text: impl Into<String>) {
        self.clipboard_data = Some(text.into());
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

type CopyHandler = Box<dyn Fn(&mut CopyEvent) + Send + Sync>;

struct CopyListener {
    name: &'static str,
    handler: CopyHandler,
}

/// The page the dashboard mounts into
#[derive(Default)]
pub struct Document {
    elements: HashMap<String, Element>,
    stylesheets: Vec<Stylesheet>,
    copy_listeners: Vec<CopyListener>,
    clipboard: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page containing a single empty element `id`
    pub fn with_root(id: &str) -> Self {
        let mut document = Self::new();
        document.create_element(id);
        document
    }

    pub fn create_element(&mut self, id: &str) -> &mut Element {
        self.elements
            .entry(id.to_string())
            .or_insert_with(|| Element {
                id: id.to_string(),
                content: String::new(),
            })
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Add a stylesheet unless one with the same id is already present
    pub fn add_stylesheet(&mut self, id: &str, css: impl Into<String>) -> bool {
        if self.stylesheets.iter().any(|sheet| sheet.id == id) {
            return false;
        }
        self.stylesheets.push(Stylesheet {
            id: id.to_string(),
            css: css.into(),
        });
        true
    }

    pub fn stylesheets(&self) -> &[Stylesheet] {
        &self.stylesheets
    }

    pub fn has_copy_listener(&self, name: &str) -> bool {
        self.copy_listeners.iter().any(|listener| listener.name == name)
    }

    /// Register a named copy listener. Returns false if the name is taken.
    pub fn add_copy_listener<F>(&mut self, name: &'static str, handler: F) -> bool
    where
        F: Fn(&mut CopyEvent) + Send + Sync + 'static,
    {
        if self.has_copy_listener(name) {
            return false;
        }
        self.copy_listeners.push(CopyListener {
            name,
            handler: Box::new(handler),
        });
        true
    }

    /// Copy `selection` to the clipboard, running every copy listener first.
    ///
    /// Without `prevent_default` the selection is copied as is. With it, the
    /// listener-provided data is copied, or nothing if none was set.
    pub fn copy(&mut self, selection: &str) -> Option<&str> {
        let mut event = CopyEvent {
            selection: selection.to_string(),
            clipboard_data: None,
            default_prevented: false,
        };

        for listener in &self.copy_listeners {
            (listener.handler)(&mut event);
        }

        if !event.default_prevented {
            self.clipboard = Some(event.selection);
        } else if let Some(data) = event.clipboard_data {
            self.clipboard = Some(data);
        }

        self.clipboard.as_deref()
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_without_listeners_copies_selection() {
        let mut document = Document::new();
        assert_eq!(document.copy("pipeline"), Some("pipeline"));
        assert_eq!(document.clipboard(), Some("pipeline"));
    }

    #[test]
    fn test_prevented_copy_without_data_keeps_previous_clipboard() {
        let mut document = Document::new();
        document.copy("first");
        assert!(document.add_copy_listener("block", |event| event.prevent_default()));

        assert_eq!(document.copy("second"), Some("first"));
    }

    #[test]
    fn test_listener_names_are_unique() {
        let mut document = Document::new();
        assert!(document.add_copy_listener("upper", |event| {
            let upper = event.selection().to_uppercase();
            event.prevent_default();
            event.set_clipboard_data(upper);
        }));
        assert!(!document.add_copy_listener("upper", |_| {}));

        assert_eq!(document.copy("solid"), Some("SOLID"));
    }

    #[test]
    fn test_stylesheets_are_not_duplicated() {
        let mut document = Document::new();
        assert!(document.add_stylesheet("reset", "* { margin: 0; }"));
        assert!(!document.add_stylesheet("reset", "* { padding: 0; }"));
        assert_eq!(document.stylesheets().len(), 1);
        assert_eq!(document.stylesheets()[0].css, "* { margin: 0; }");
    }

    #[test]
    fn test_with_root_creates_empty_element() {
        let document = Document::with_root("root");
        let root = document.element("root").unwrap();
        assert_eq!(root.id(), "root");
        assert_eq!(root.content(), "");
        assert!(document.element("missing").is_none());
    }
}
