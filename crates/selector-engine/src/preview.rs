//! Element previews and per-match selectors for strict-mode errors

use dom_snapshot::{css_escape_identifier, Document, NodeId, NodeKind};

use crate::errors::{MatchPreview, QueryError};
use crate::evaluator::SelectorEngine;

const BOOLEAN_ATTRIBUTES: &[&str] = &["checked", "selected", "disabled", "readonly", "multiple"];

const AUTO_CLOSING_TAGS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "menuitem", "meta", "param", "source", "track", "wbr",
];

const PREVIEW_WIDTH: usize = 50;

/// Attributes tried, in order, before falling back to a structural path.
const UNIQUE_ATTRIBUTE_ENGINES: &[&str] = &["id", "data-testid", "data-test-id", "data-test"];

fn one_line(text: &str) -> String {
    text.replace('\n', "↵").replace('\t', "⇆")
}

fn truncate(text: String) -> String {
    if text.chars().count() > PREVIEW_WIDTH {
        let mut cut: String = text.chars().take(PREVIEW_WIDTH - 1).collect();
        cut.push('…');
        cut
    } else {
        text
    }
}

/// Short HTML-like rendering: `<button type="submit">Go</button>`.
pub fn preview_node(doc: &Document, node: NodeId) -> String {
    let element = match doc.kind(node) {
        Some(NodeKind::Text(text)) => return one_line(&format!("#text={text}")),
        Some(NodeKind::Element(element)) => element,
        Some(NodeKind::Document) => return "<#document />".to_string(),
        None => return String::new(),
    };

    let mut attrs: Vec<String> = element
        .attrs
        .iter()
        .filter(|(name, _)| name != "style")
        .map(|(name, value)| {
            if value.is_empty() && BOOLEAN_ATTRIBUTES.contains(&name.as_str()) {
                format!(" {name}")
            } else {
                format!(" {name}=\"{value}\"")
            }
        })
        .collect();
    attrs.sort_by_key(|attr| attr.chars().count());
    let attr_text = truncate(attrs.concat());

    let tag = element.tag_name.as_str();
    if AUTO_CLOSING_TAGS.contains(&tag) {
        return one_line(&format!("<{tag}{attr_text}/>"));
    }

    let children = doc.children(node);
    let only_text = children.len() <= 5 && children.iter().all(|child| doc.text(*child).is_some());
    let text = if only_text {
        doc.text_content(node)
    } else if children.is_empty() {
        String::new()
    } else {
        "…".to_string()
    };
    one_line(&format!("<{tag}{attr_text}>{}</{tag}>", truncate(text)))
}

/// Structural path from the nearest uniquely-identified ancestor.
fn css_path(engine: &SelectorEngine, doc: &Document, node: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if !doc.is_element(current) {
            break;
        }
        if let Some(id) = doc.id_attr(current) {
            let anchor = format!("#{}", css_escape_identifier(id));
            if engine.count(doc, &anchor, doc.root()) == 1 {
                segments.push(anchor);
                break;
            }
        }
        let tag = doc.tag_name(current).unwrap_or("*");
        let index = doc.element_index(current).unwrap_or(0) + 1;
        segments.push(format!("{tag}:nth-child({index})"));
        cursor = doc.parent_element(current);
    }
    segments.reverse();
    segments.join(" > ")
}

/// A selector that resolves to `node` alone from the document root.
pub fn unique_selector(engine: &SelectorEngine, doc: &Document, node: NodeId) -> String {
    for attribute in UNIQUE_ATTRIBUTE_ENGINES {
        let Some(value) = doc.attr(node, attribute).filter(|value| !value.is_empty()) else {
            continue;
        };
        let candidate = format!("{attribute}={value}");
        if resolves_to(engine, doc, &candidate, node) {
            return candidate;
        }
    }
    let path = css_path(engine, doc, node);
    if resolves_to(engine, doc, &path, node) {
        return path;
    }

    // An unanchored path can also match deeper look-alikes; index into the tag's matches.
    let tag = doc.tag_name(node).unwrap_or("*");
    let position = engine
        .query_all(doc, tag, doc.root())
        .ok()
        .and_then(|found| found.iter().position(|candidate| *candidate == node))
        .unwrap_or(0);
    format!("{tag} >> nth={position}")
}

fn resolves_to(engine: &SelectorEngine, doc: &Document, selector: &str, node: NodeId) -> bool {
    engine
        .query_all(doc, selector, doc.root())
        .is_ok_and(|found| found == [node])
}

/// Build the strict-mode error for `matches` (more than one element).
pub(crate) fn strict_mode_violation(
    engine: &SelectorEngine,
    doc: &Document,
    selector: &str,
    matches: &[NodeId],
    limit: usize,
) -> QueryError {
    let previews: Vec<MatchPreview> = matches
        .iter()
        .take(limit)
        .map(|node| MatchPreview {
            preview: preview_node(doc, *node),
            selector: unique_selector(engine, doc, *node),
        })
        .collect();

    let mut message = format!(
        "strict mode violation: \"{selector}\" resolved to {} elements:",
        matches.len()
    );
    for (index, info) in previews.iter().enumerate() {
        message.push_str(&format!(
            "\n    {}) {} aka selector(\"{}\")",
            index + 1,
            info.preview,
            info.selector
        ));
    }
    if previews.len() < matches.len() {
        message.push_str("\n    ...");
    }

    QueryError::StrictModeViolation {
        selector: selector.to_string(),
        count: matches.len(),
        matches: previews,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::parse_html;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preview_element() {
        let doc = parse_html(r#"<button type="submit" disabled style="color:red">Go</button>"#).unwrap();
        let button = doc.descendants(doc.root())[0];
        assert_eq!(preview_node(&doc, button), r#"<button disabled type="submit">Go</button>"#);
    }

    #[test]
    fn test_preview_void_and_nested() {
        let doc = parse_html(r#"<div><input name="q"><p>a<b>b</b></p></div>"#).unwrap();
        let input = doc.descendants(doc.root())[1];
        let p = doc.descendants(doc.root())[2];
        let div = doc.descendants(doc.root())[0];
        assert_eq!(preview_node(&doc, input), r#"<input name="q"/>"#);
        assert_eq!(preview_node(&doc, p), "<p>…</p>");
        assert_eq!(preview_node(&doc, div), "<div>…</div>");
    }

    #[test]
    fn test_preview_truncates_and_flattens() {
        let long = "x".repeat(80);
        let doc = parse_html(&format!("<p title=\"{long}\">line\nnext\tcol</p>")).unwrap();
        let p = doc.descendants(doc.root())[0];
        let preview = preview_node(&doc, p);
        assert!(preview.contains('…'));
        assert!(preview.ends_with(">line↵next⇆col</p>"));
    }

    #[test]
    fn test_unique_selector_prefers_attributes() {
        let engine = SelectorEngine::new();
        let doc = parse_html(
            r#"<div id="app"><ul><li data-testid="a">A</li><li>B</li><li>C</li></ul></div>"#,
        )
        .unwrap();
        let items: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|node| doc.tag_name(*node) == Some("li"))
            .collect();

        assert_eq!(unique_selector(&engine, &doc, items[0]), "data-testid=a");
        let path = unique_selector(&engine, &doc, items[2]);
        assert_eq!(path, "#app > ul:nth-child(1) > li:nth-child(3)");
        assert_eq!(engine.query_all(&doc, &path, doc.root()).unwrap(), vec![items[2]]);
    }

    #[test]
    fn test_unique_selector_for_top_level_siblings() {
        let engine = SelectorEngine::new();
        let doc = parse_html(r#"<div class="shared">a</div><div class="shared">b</div>"#).unwrap();
        let divs = doc.descendants(doc.root());

        for div in &divs {
            let selector = unique_selector(&engine, &doc, *div);
            assert_eq!(engine.query_all(&doc, &selector, doc.root()).unwrap(), vec![*div]);
        }
        assert_eq!(unique_selector(&engine, &doc, divs[1]), "div:nth-child(2)");

        match engine.query_strict(&doc, ".shared", doc.root()) {
            Err(QueryError::StrictModeViolation { matches, .. }) => {
                assert_eq!(matches.len(), 2);
                for (info, div) in matches.iter().zip(&divs) {
                    assert_eq!(
                        engine.query_all(&doc, &info.selector, doc.root()).unwrap(),
                        vec![*div]
                    );
                }
            }
            other => panic!("expected a strict mode violation, got {other:?}"),
        }
    }

    #[test]
    fn test_unique_selector_falls_back_to_nth() {
        let engine = SelectorEngine::new();
        let doc = parse_html("<div><div>inner</div></div>").unwrap();
        let divs = doc.descendants(doc.root());

        // `div:nth-child(1)` also matches the nested div.
        assert_eq!(unique_selector(&engine, &doc, divs[0]), "div >> nth=0");
        assert_eq!(
            unique_selector(&engine, &doc, divs[1]),
            "div:nth-child(1) > div:nth-child(1)"
        );
        for div in &divs {
            let selector = unique_selector(&engine, &doc, *div);
            assert_eq!(engine.query_all(&doc, &selector, doc.root()).unwrap(), vec![*div]);
        }
    }
}
