//! Node types stored in the document arena

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside its owning [`crate::Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Layout box in CSS pixels, as reported by `getBoundingClientRect`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Zero-area boxes are never visible.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag_name: String,

    /// Attributes in source order; names are lowercase
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag_name: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attrs,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            parent,
            children: Vec::new(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.left(), 10.0);
        assert_eq!(rect.right(), 40.0);
        assert_eq!(rect.top(), 20.0);
        assert_eq!(rect.bottom(), 60.0);
        assert!(!rect.is_empty());
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_empty());
    }

    #[test]
    fn test_attr_lookup_is_case_insensitive() {
        let element = ElementData::new(
            "BUTTON",
            vec![("data-testid".to_string(), "go".to_string())],
        );
        assert_eq!(element.tag_name, "button");
        assert_eq!(element.attr("DATA-TESTID"), Some("go"));
        assert!(!element.has_attr("id"));
    }
}
