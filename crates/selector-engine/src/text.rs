//! Text engine: regex, strict and lax matching over element text

use std::collections::HashMap;

use dom_snapshot::{unescape_backslashes, Document, NodeId, NodeKind};
use regex::Regex;

use crate::errors::EngineFailure;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMatchKind {
    Regex,
    Strict,
    Lax,
}

#[derive(Clone, Debug)]
enum Matcher {
    Regex(Regex),
    /// Whitespace-normalized, case-sensitive
    Strict(String),
    /// Whitespace-normalized, lowercase
    Lax(String),
}

#[derive(Clone, Debug)]
pub struct TextQuery {
    matcher: Matcher,
}

impl PartialEq for TextQuery {
    fn eq(&self, other: &Self) -> bool {
        match (&self.matcher, &other.matcher) {
            (Matcher::Regex(a), Matcher::Regex(b)) => a.as_str() == b.as_str(),
            (Matcher::Strict(a), Matcher::Strict(b)) | (Matcher::Lax(a), Matcher::Lax(b)) => a == b,
            _ => false,
        }
    }
}

/// Text gathered for one element: all descendant text and the element's own
/// text runs (text nodes between child elements).
#[derive(Clone, Debug, Default)]
struct ElementText {
    full: String,
    immediate: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementMatch {
    None,
    SelfOnly,
    SelfAndChildren,
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compile a JS-style `/source/flags` regex.
pub(crate) fn compile_js_regex(source: &str, flags: &str) -> Result<Regex, EngineFailure> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' => inline.push(flag),
            'g' | 'u' | 'y' | 'd' => {}
            other => {
                return Err(EngineFailure::InvalidRegex {
                    pattern: source.to_string(),
                    reason: format!("unsupported flag '{other}'"),
                })
            }
        }
    }
    let pattern = if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{inline}){source}")
    };
    Regex::new(&pattern).map_err(|err| EngineFailure::InvalidRegex {
        pattern: source.to_string(),
        reason: err.to_string(),
    })
}

/// Split `/source/flags`; `None` when the body is not a regex literal.
pub(crate) fn split_regex_literal(body: &str) -> Option<(&str, &str)> {
    let rest = body.strip_prefix('/')?;
    let last = rest.rfind('/')?;
    if last == 0 && rest.len() == 1 {
        return None;
    }
    Some((&rest[..last], &rest[last + 1..]))
}

/// Strip matching `"` or `'` quotes and backslash escapes.
pub(crate) fn unquote(body: &str) -> Option<String> {
    let first = body.chars().next()?;
    if body.len() > 1 && (first == '"' || first == '\'') && body.ends_with(first) {
        Some(unescape_backslashes(&body[1..body.len() - 1]))
    } else {
        None
    }
}

impl TextQuery {
    pub(crate) fn compile(body: &str) -> Result<Self, EngineFailure> {
        if let Some((source, flags)) = split_regex_literal(body) {
            return Ok(Self {
                matcher: Matcher::Regex(compile_js_regex(source, flags)?),
            });
        }
        let matcher = match unquote(body) {
            Some(text) => Matcher::Strict(normalize_whitespace(&text)),
            None => Matcher::Lax(normalize_whitespace(body).to_lowercase()),
        };
        Ok(Self { matcher })
    }

    pub fn kind(&self) -> TextMatchKind {
        match self.matcher {
            Matcher::Regex(_) => TextMatchKind::Regex,
            Matcher::Strict(_) => TextMatchKind::Strict,
            Matcher::Lax(_) => TextMatchKind::Lax,
        }
    }

    fn matches(&self, text: &ElementText) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(&text.full),
            Matcher::Strict(expected) => {
                if expected.is_empty() && text.immediate.is_empty() {
                    return true;
                }
                text.immediate
                    .iter()
                    .any(|run| normalize_whitespace(run) == *expected)
            }
            Matcher::Lax(needle) => normalize_whitespace(&text.full)
                .to_lowercase()
                .contains(needle.as_str()),
        }
    }
}

struct TextCollector<'a> {
    doc: &'a Document,
    head: Option<NodeId>,
    cache: HashMap<NodeId, ElementText>,
}

impl<'a> TextCollector<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            head: doc.head(),
            cache: HashMap::new(),
        }
    }

    fn should_skip(&self, node: NodeId) -> bool {
        matches!(self.doc.tag_name(node), Some("script") | Some("style"))
            || self.head.is_some_and(|head| self.doc.contains(head, node))
    }

    fn element_text(&mut self, node: NodeId) -> ElementText {
        if let Some(cached) = self.cache.get(&node) {
            return cached.clone();
        }
        let mut value = ElementText::default();
        if !self.should_skip(node) {
            let doc = self.doc;
            let is_button_input = doc.tag_name(node) == Some("input")
                && doc
                    .attr(node, "type")
                    .is_some_and(|kind| matches!(kind.to_ascii_lowercase().as_str(), "submit" | "button"));
            if is_button_input {
                let text = doc.attr(node, "value").unwrap_or_default().to_string();
                value.full = text.clone();
                value.immediate.push(text);
            } else {
                let mut current = String::new();
                for child in doc.children(node).to_vec() {
                    match doc.kind(child) {
                        Some(NodeKind::Text(text)) => {
                            value.full.push_str(text);
                            current.push_str(text);
                        }
                        Some(NodeKind::Element(_)) => {
                            if !current.is_empty() {
                                value.immediate.push(std::mem::take(&mut current));
                            }
                            let child_text = self.element_text(child);
                            value.full.push_str(&child_text.full);
                        }
                        _ => {}
                    }
                }
                if !current.is_empty() {
                    value.immediate.push(current);
                }
            }
        }
        self.cache.insert(node, value.clone());
        value
    }

    fn element_matches(&mut self, node: NodeId, query: &TextQuery) -> ElementMatch {
        if self.should_skip(node) {
            return ElementMatch::None;
        }
        let own = self.element_text(node);
        if !query.matches(&own) {
            return ElementMatch::None;
        }
        let children: Vec<NodeId> = self.doc.element_children(node).collect();
        for child in children {
            let text = self.element_text(child);
            if query.matches(&text) {
                return ElementMatch::SelfAndChildren;
            }
        }
        ElementMatch::SelfOnly
    }
}

/// Elements under `root` (and `root` itself) whose text matches.
///
/// Lax queries keep only the most specific match: an element is dropped when
/// one of its children also matches. Strict queries keep both, since the
/// comparison is against the element's own text runs.
pub fn query_all(doc: &Document, root: NodeId, query: &TextQuery) -> Vec<NodeId> {
    let kind = query.kind();
    let mut collector = TextCollector::new(doc);
    let mut result = Vec::new();
    let mut last_did_not_match: Option<NodeId> = None;

    let candidates = doc
        .is_element(root)
        .then_some(root)
        .into_iter()
        .chain(doc.descendants(root));

    for element in candidates {
        if kind == TextMatchKind::Lax
            && last_did_not_match.is_some_and(|failed| doc.contains(failed, element))
        {
            continue;
        }
        let matched = collector.element_matches(element, query);
        if matched == ElementMatch::None {
            last_did_not_match = Some(element);
        }
        if matched == ElementMatch::SelfOnly
            || (matched == ElementMatch::SelfAndChildren && kind == TextMatchKind::Strict)
        {
            result.push(element);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::parse_html;

    fn run(html: &str, body: &str) -> Vec<String> {
        let doc = parse_html(html).unwrap();
        let query = TextQuery::compile(body).unwrap();
        query_all(&doc, doc.root(), &query)
            .into_iter()
            .map(|node| doc.tag_name(node).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_kinds() {
        assert_eq!(TextQuery::compile("/go/i").unwrap().kind(), TextMatchKind::Regex);
        assert_eq!(TextQuery::compile("\"Go\"").unwrap().kind(), TextMatchKind::Strict);
        assert_eq!(TextQuery::compile("'Go'").unwrap().kind(), TextMatchKind::Strict);
        assert_eq!(TextQuery::compile("go").unwrap().kind(), TextMatchKind::Lax);
    }

    #[test]
    fn test_lax_returns_most_specific() {
        let html = "<div><p>Hello <b>World</b></p></div>";
        assert_eq!(run(html, "world"), vec!["b"]);
        assert_eq!(run(html, "hello world"), vec!["p"]);
    }

    #[test]
    fn test_strict_matches_immediate_runs() {
        let html = "<div><button>  Sign\n in </button><span>Sign in now</span></div>";
        assert_eq!(run(html, "\"Sign in\""), vec!["button"]);
    }

    #[test]
    fn test_strict_keeps_parent_and_child() {
        let html = "<div>Go<span>Go</span></div>";
        assert_eq!(run(html, "\"Go\""), vec!["div", "span"]);
    }

    #[test]
    fn test_regex_with_flags() {
        let html = "<p>Order #123</p><p>order #9</p>";
        assert_eq!(run(html, r"/order #\d{3}/i"), vec!["p"]);
    }

    #[test]
    fn test_skips_script_and_head() {
        let html = "<html><head><title>Go</title></head><body><script>go()</script><i>go</i></body></html>";
        assert_eq!(run(html, "go"), vec!["i"]);
    }

    #[test]
    fn test_button_input_uses_value() {
        let html = r#"<form><input type="submit" value="Send"></form>"#;
        assert_eq!(run(html, "\"Send\""), vec!["input"]);
    }

    #[test]
    fn test_invalid_regex_flag() {
        assert!(matches!(
            TextQuery::compile("/a/z"),
            Err(EngineFailure::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_split_regex_literal() {
        assert_eq!(split_regex_literal("/a/b/gi"), Some(("a/b", "gi")));
        assert_eq!(split_regex_literal("/"), None);
        assert_eq!(split_regex_literal("abc"), None);
    }
}
