//! ARIA role and accessible-name reads

use crate::document::Document;
use crate::node::NodeId;
use crate::style::is_visible;

/// Tri-state for `checked`/`pressed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AriaTriState {
    True,
    False,
    Mixed,
}

impl AriaTriState {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// Roles whose accessible name is computed from descendant text.
const NAME_FROM_CONTENT: &[&str] = &[
    "button",
    "cell",
    "checkbox",
    "columnheader",
    "gridcell",
    "heading",
    "link",
    "listitem",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "radio",
    "row",
    "rowheader",
    "switch",
    "tab",
    "tooltip",
    "treeitem",
];

/// Role implied by the element's tag and attributes.
pub fn implicit_role(doc: &Document, id: NodeId) -> Option<&'static str> {
    let tag = doc.tag_name(id)?;
    let role = match tag {
        "a" | "area" => {
            if doc.has_attr(id, "href") {
                "link"
            } else {
                return None;
            }
        }
        "article" => "article",
        "aside" => "complementary",
        "button" => "button",
        "datalist" => "listbox",
        "details" => "group",
        "dialog" => "dialog",
        "fieldset" => "group",
        "footer" => "contentinfo",
        "form" => "form",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "header" => "banner",
        "hr" => "separator",
        "img" => {
            if doc.attr(id, "alt") == Some("") {
                "presentation"
            } else {
                "img"
            }
        }
        "input" => input_role(doc, id),
        "li" => "listitem",
        "main" => "main",
        "menu" | "ol" | "ul" => "list",
        "nav" => "navigation",
        "optgroup" => "group",
        "option" => "option",
        "output" => "status",
        "progress" => "progressbar",
        "section" => {
            if doc.has_attr(id, "aria-label") || doc.has_attr(id, "aria-labelledby") {
                "region"
            } else {
                return None;
            }
        }
        "select" => {
            if doc.has_attr(id, "multiple")
                || doc
                    .attr(id, "size")
                    .and_then(|size| size.parse::<u32>().ok())
                    .is_some_and(|size| size > 1)
            {
                "listbox"
            } else {
                "combobox"
            }
        }
        "summary" => "button",
        "table" => "table",
        "tbody" | "tfoot" | "thead" => "rowgroup",
        "td" => "cell",
        "textarea" => "textbox",
        "th" => "columnheader",
        "tr" => "row",
        _ => return None,
    };
    Some(role)
}

fn input_role(doc: &Document, id: NodeId) -> &'static str {
    let kind = doc
        .attr(id, "type")
        .map(|kind| kind.to_ascii_lowercase())
        .unwrap_or_default();
    match kind.as_str() {
        "button" | "image" | "reset" | "submit" => "button",
        "checkbox" => "checkbox",
        "radio" => "radio",
        "range" => "slider",
        "number" => "spinbutton",
        "search" => {
            if doc.has_attr(id, "list") {
                "combobox"
            } else {
                "searchbox"
            }
        }
        _ => {
            if doc.has_attr(id, "list") {
                "combobox"
            } else {
                "textbox"
            }
        }
    }
}

/// Explicit `role` attribute (first token) or the implicit role.
pub fn role(doc: &Document, id: NodeId) -> Option<String> {
    if let Some(explicit) = doc.attr(id, "role") {
        if let Some(first) = explicit.split_ascii_whitespace().next() {
            return Some(first.to_ascii_lowercase());
        }
    }
    implicit_role(doc, id).map(str::to_string)
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn labelled_by(doc: &Document, id: NodeId) -> Option<String> {
    let ids = doc.attr(id, "aria-labelledby")?;
    let parts: Vec<String> = ids
        .split_ascii_whitespace()
        .filter_map(|label_id| doc.get_element_by_id(label_id))
        .map(|label| normalize(&doc.text_content(label)))
        .filter(|text| !text.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn label_for_control(doc: &Document, id: NodeId) -> Option<String> {
    if let Some(control_id) = doc.id_attr(id) {
        let label = doc
            .descendants(doc.root())
            .into_iter()
            .find(|node| doc.tag_name(*node) == Some("label") && doc.attr(*node, "for") == Some(control_id));
        if let Some(label) = label {
            return Some(normalize(&doc.text_content(label)));
        }
    }
    doc.ancestors(id)
        .find(|ancestor| doc.tag_name(*ancestor) == Some("label"))
        .map(|label| normalize(&doc.text_content(label)))
}

/// Simplified accessible name computation.
pub fn accessible_name(doc: &Document, id: NodeId) -> String {
    if let Some(name) = labelled_by(doc, id) {
        return name;
    }
    if let Some(label) = doc.attr(id, "aria-label").map(normalize) {
        if !label.is_empty() {
            return label;
        }
    }

    let tag = doc.tag_name(id).unwrap_or_default();
    if matches!(tag, "input" | "textarea" | "select") {
        let kind = doc.attr(id, "type").unwrap_or_default().to_ascii_lowercase();
        if matches!(kind.as_str(), "submit" | "button" | "reset") {
            if let Some(value) = doc.attr(id, "value") {
                return normalize(value);
            }
        }
        if let Some(label) = label_for_control(doc, id).filter(|label| !label.is_empty()) {
            return label;
        }
        if let Some(placeholder) = doc.attr(id, "placeholder") {
            return normalize(placeholder);
        }
    }
    if matches!(tag, "img" | "area") {
        if let Some(alt) = doc.attr(id, "alt") {
            return normalize(alt);
        }
    }

    let from_content = role(doc, id)
        .map(|role| NAME_FROM_CONTENT.contains(&role.as_str()))
        .unwrap_or(false);
    if from_content {
        let text = normalize(&doc.text_content(id));
        if !text.is_empty() {
            return text;
        }
    }

    doc.attr(id, "title").map(normalize).unwrap_or_default()
}

/// Hidden from the accessibility tree.
pub fn is_aria_hidden(doc: &Document, id: NodeId) -> bool {
    let hidden_attr = std::iter::once(id)
        .chain(doc.ancestors(id))
        .any(|node| doc.attr(node, "aria-hidden") == Some("true"));
    hidden_attr || !is_visible(doc, id)
}

pub fn is_disabled(doc: &Document, id: NodeId) -> bool {
    if doc.attr(id, "aria-disabled") == Some("true") {
        return true;
    }
    let tag = doc.tag_name(id).unwrap_or_default();
    let native = matches!(
        tag,
        "button" | "input" | "select" | "textarea" | "option" | "optgroup" | "fieldset"
    );
    if native && doc.has_attr(id, "disabled") {
        return true;
    }
    native
        && doc
            .ancestors(id)
            .any(|ancestor| doc.tag_name(ancestor) == Some("fieldset") && doc.has_attr(ancestor, "disabled"))
}

pub fn checked_state(doc: &Document, id: NodeId) -> Option<AriaTriState> {
    if let Some(state) = doc.attr(id, "aria-checked").and_then(AriaTriState::parse) {
        return Some(state);
    }
    let is_toggle = doc.tag_name(id) == Some("input")
        && doc
            .attr(id, "type")
            .is_some_and(|kind| matches!(kind.to_ascii_lowercase().as_str(), "checkbox" | "radio"));
    if is_toggle {
        return Some(if doc.has_attr(id, "checked") {
            AriaTriState::True
        } else {
            AriaTriState::False
        });
    }
    None
}

pub fn pressed_state(doc: &Document, id: NodeId) -> Option<AriaTriState> {
    doc.attr(id, "aria-pressed").and_then(AriaTriState::parse)
}

pub fn expanded_state(doc: &Document, id: NodeId) -> Option<bool> {
    match doc.attr(id, "aria-expanded")? {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn selected_state(doc: &Document, id: NodeId) -> Option<bool> {
    if let Some(value) = doc.attr(id, "aria-selected") {
        return Some(value == "true");
    }
    (doc.tag_name(id) == Some("option")).then(|| doc.has_attr(id, "selected"))
}

pub fn heading_level(doc: &Document, id: NodeId) -> Option<u32> {
    if let Some(level) = doc.attr(id, "aria-level").and_then(|v| v.trim().parse().ok()) {
        return Some(level);
    }
    match doc.tag_name(id)? {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}
