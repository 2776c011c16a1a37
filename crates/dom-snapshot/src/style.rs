//! Inline style reads and the visibility rule

use crate::document::Document;
use crate::node::NodeId;

/// Tags that never produce a box.
const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link", "base",
];

/// Parse the `style` attribute into lowercase `(property, value)` pairs.
pub fn inline_style(doc: &Document, id: NodeId) -> Vec<(String, String)> {
    let Some(style) = doc.attr(id, "style") else {
        return Vec::new();
    };
    style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase();
            (!property.is_empty()).then_some((property, value))
        })
        .collect()
}

/// Last declared value of a property in the inline style.
pub fn style_value(doc: &Document, id: NodeId, property: &str) -> Option<String> {
    inline_style(doc, id)
        .into_iter()
        .rev()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value)
}

fn is_display_none(doc: &Document, id: NodeId) -> bool {
    if doc.has_attr(id, "hidden") {
        return true;
    }
    if let Some(tag) = doc.tag_name(id) {
        if NON_RENDERED_TAGS.contains(&tag) {
            return true;
        }
        if tag == "input"
            && doc
                .attr(id, "type")
                .is_some_and(|kind| kind.eq_ignore_ascii_case("hidden"))
        {
            return true;
        }
    }
    style_value(doc, id, "display").as_deref() == Some("none")
}

/// Whether an element would be rendered with a non-empty box.
///
/// `display:none` (and its equivalents) applies to the whole subtree,
/// `visibility` inherits from the nearest ancestor that declares it, and an
/// explicit layout box must have a positive area. Elements without layout
/// information are assumed to have a box.
pub fn is_visible(doc: &Document, id: NodeId) -> bool {
    if !doc.is_element(id) {
        return false;
    }

    let mut visibility = None;
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        if !doc.is_element(current) {
            break;
        }
        if is_display_none(doc, current) {
            return false;
        }
        if visibility.is_none() {
            visibility = style_value(doc, current, "visibility");
        }
        cursor = doc.parent(current);
    }

    if matches!(visibility.as_deref(), Some("hidden") | Some("collapse")) {
        return false;
    }

    match doc.rect(id) {
        Some(rect) => !rect.is_empty(),
        None => true,
    }
}
