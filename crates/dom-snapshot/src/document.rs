//! Arena-backed document tree

use std::collections::HashMap;

use crate::errors::DomError;
use crate::node::{ElementData, Node, NodeId, NodeKind, Rect};

/// Immutable-after-capture DOM snapshot.
///
/// Node ids are indices into the arena and are only meaningful for the
/// document that produced them. Lookups with a foreign id return `None`
/// or an empty result instead of panicking.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    rects: HashMap<NodeId, Rect>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(None, NodeKind::Document)],
            rects: HashMap::new(),
        }
    }

    /// The document node itself.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: impl Into<String>,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.push(parent, NodeKind::Element(ElementData::new(tag_name, attrs)))
    }

    pub fn create_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push(parent, NodeKind::Text(text.into()))
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.contains_node(parent).then_some(parent);
        self.nodes.push(Node::new(parent, kind));
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<(), DomError> {
        if !self.is_element(id) {
            return Err(DomError::UnknownNode(id.0));
        }
        self.rects.insert(id, rect);
        Ok(())
    }

    /// Set or replace an attribute on an element.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        let Some(NodeKind::Element(element)) = self.nodes.get_mut(id.0).map(|n| &mut n.kind)
        else {
            return Err(DomError::UnknownNode(id.0));
        };
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => element.attrs.push((name, value)),
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let Some(NodeKind::Element(element)) = self.nodes.get_mut(id.0).map(|n| &mut n.kind)
        else {
            return Err(DomError::UnknownNode(id.0));
        };
        element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        Ok(())
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Document))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag_name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id)
            .map(|element| element.attrs.as_slice())
            .unwrap_or(&[])
    }

    /// Value of the `id` attribute when non-empty.
    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id").filter(|value| !value.is_empty())
    }

    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|classes| classes.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// Parent when it is an element; `None` for children of the document node.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.is_element(*child))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|child| *child == id)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|child| *child == id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    /// Proper ancestors, nearest first, ending at the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Inclusive containment: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|candidate| candidate == ancestor)
    }

    /// Element descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            match self.kind(current) {
                Some(NodeKind::Text(text)) => out.push_str(text),
                Some(NodeKind::Element(_)) => {
                    stack.extend(self.children(current).iter().rev().copied())
                }
                _ => {}
            }
        }
        out
    }

    /// The root `<html>` element, or the first element child of the document.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|child| self.tag_name(*child) == Some("head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|child| self.tag_name(*child) == Some("body"))
    }

    pub fn rect(&self, id: NodeId) -> Option<&Rect> {
        self.rects.get(&id)
    }

    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|node| self.attr(*node, "id") == Some(value))
    }

    /// 0-based position among the parent's element children.
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent).position(|child| child == id)
    }
}
