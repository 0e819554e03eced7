//! Element specs - host-representable containers and leaves.

use std::fmt;

use crate::error::{ReconcileError, Result};

use super::Child;
use super::props::{PropValue, Props};

/// Widget kind of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Vertical container.
    VBox,
    /// Horizontal container.
    HBox,
    Button,
    Label,
    Input,
}

impl ElementKind {
    /// Parse a tag name (`"vbox"`, `"label"`, ...).
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "vbox" => Ok(ElementKind::VBox),
            "hbox" => Ok(ElementKind::HBox),
            "button" => Ok(ElementKind::Button),
            "label" => Ok(ElementKind::Label),
            "input" => Ok(ElementKind::Input),
            other => Err(ReconcileError::UnknownElementKind(other.to_string())),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::VBox => "vbox",
            ElementKind::HBox => "hbox",
            ElementKind::Button => "button",
            ElementKind::Label => "label",
            ElementKind::Input => "input",
        }
    }

    /// Containers may hold children; leaves may not.
    pub fn is_container(self) -> bool {
        matches!(self, ElementKind::VBox | ElementKind::HBox)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Description of one host widget and its declared children.
#[derive(Debug)]
pub struct ElementSpec {
    pub kind: ElementKind,
    pub key: Option<String>,
    pub props: Props,
    pub children: Vec<Child>,
}

impl ElementSpec {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            key: None,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Build from a tag name, failing on unknown tags.
    pub fn from_tag(tag: &str) -> Result<Self> {
        ElementKind::from_tag(tag).map(Self::new)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Attach an `on_click` callback.
    pub fn on_click(self, f: impl Fn() + 'static) -> Self {
        self.prop("on_click", PropValue::callback(f))
    }

    /// Attach an `on_change` callback receiving the new text.
    pub fn on_change(self, f: impl Fn(&str) + 'static) -> Self {
        self.prop("on_change", PropValue::text_callback(f))
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Vertical container.
pub fn vbox<I, C>(children: I) -> ElementSpec
where
    I: IntoIterator<Item = C>,
    C: Into<Child>,
{
    ElementSpec::new(ElementKind::VBox).children(children)
}

/// Horizontal container.
pub fn hbox<I, C>(children: I) -> ElementSpec
where
    I: IntoIterator<Item = C>,
    C: Into<Child>,
{
    ElementSpec::new(ElementKind::HBox).children(children)
}

pub fn label(text: impl Into<PropValue>) -> ElementSpec {
    ElementSpec::new(ElementKind::Label).prop("text", text)
}

pub fn button(text: impl Into<PropValue>) -> ElementSpec {
    ElementSpec::new(ElementKind::Button).prop("text", text)
}

pub fn input() -> ElementSpec {
    ElementSpec::new(ElementKind::Input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_known_kinds() {
        for tag in ["vbox", "hbox", "button", "label", "input"] {
            let kind = ElementKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
    }

    #[test]
    fn test_from_tag_unknown_kind() {
        let err = ElementSpec::from_tag("slider").unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownElementKind(ref tag) if tag == "slider"));
    }

    #[test]
    fn test_container_kinds() {
        assert!(ElementKind::VBox.is_container());
        assert!(ElementKind::HBox.is_container());
        assert!(!ElementKind::Label.is_container());
        assert!(!ElementKind::Button.is_container());
    }

    #[test]
    fn test_builder_keeps_prop_order() {
        let spec = button("ok").key("ok-button").prop("size", (80u32, 20u32)).on_click(|| {});
        let names: Vec<&str> = spec.props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["text", "size", "on_click"]);
        assert_eq!(spec.key.as_deref(), Some("ok-button"));
    }
}
