//! Selector evaluation against a document snapshot

use std::collections::HashSet;

use dom_snapshot::{is_visible, Document, NodeId};
use tracing::trace;

use crate::css::CssMatcher;
use crate::errors::{EngineFailure, QueryError};
use crate::layout;
use crate::parser::{parse_selector, EngineQuery, ParsedSelector, ParsedSelectorPart};
use crate::preview::strict_mode_violation;
use crate::{role, text, xpath};

/// Number of matches listed in a strict-mode violation.
pub const DEFAULT_PREVIEW_LIMIT: usize = 10;

/// Query engine entry point
///
/// Stateless apart from its settings; safe to share between threads.
#[derive(Debug, Clone)]
pub struct SelectorEngine {
    preview_limit: usize,
}

impl Default for SelectorEngine {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl SelectorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn parse(&self, selector: &str) -> Result<ParsedSelector, QueryError> {
        parse_selector(selector)
    }

    /// All elements matched by `selector` under `root`.
    pub fn query_all(
        &self,
        doc: &Document,
        selector: &str,
        root: NodeId,
    ) -> Result<Vec<NodeId>, QueryError> {
        let parsed = parse_selector(selector)?;
        self.evaluate(doc, &parsed, root, selector)
    }

    pub fn query_all_parsed(
        &self,
        doc: &Document,
        parsed: &ParsedSelector,
        root: NodeId,
    ) -> Result<Vec<NodeId>, QueryError> {
        self.evaluate(doc, parsed, root, &parsed.to_string())
    }

    /// First match, or a [`QueryError::StrictModeViolation`] when more than
    /// one element matches.
    pub fn query_strict(
        &self,
        doc: &Document,
        selector: &str,
        root: NodeId,
    ) -> Result<Option<NodeId>, QueryError> {
        let parsed = parse_selector(selector)?;
        let matches = self.evaluate(doc, &parsed, root, selector)?;
        if matches.len() > 1 {
            return Err(strict_mode_violation(
                self,
                doc,
                &parsed.to_string(),
                &matches,
                self.preview_limit,
            ));
        }
        Ok(matches.first().copied())
    }

    /// Match count; evaluation errors count as zero.
    pub fn count(&self, doc: &Document, selector: &str, root: NodeId) -> usize {
        match self.query_all(doc, selector, root) {
            Ok(found) => found.len(),
            Err(err) => {
                trace!(selector, error = %err, "selector evaluation failed");
                0
            }
        }
    }

    fn evaluate(
        &self,
        doc: &Document,
        parsed: &ParsedSelector,
        root: NodeId,
        top: &str,
    ) -> Result<Vec<NodeId>, QueryError> {
        if let Some(capture) = parsed.capture {
            return self.evaluate(doc, &rewrite_capture(parsed, capture, top)?, root, top);
        }

        if !doc.is_element(root) && !doc.is_document(root) {
            return Err(QueryError::NotQueryable {
                selector: top.to_string(),
            });
        }

        let mut roots = vec![root];
        for part in &parsed.parts {
            roots = match &part.query {
                EngineQuery::Nth(index) => {
                    let index = if *index < 0 {
                        roots.len() as i64 + index
                    } else {
                        *index
                    };
                    usize::try_from(index)
                        .ok()
                        .and_then(|index| roots.get(index).copied())
                        .into_iter()
                        .collect()
                }
                EngineQuery::Layout {
                    kind,
                    inner,
                    distance,
                } => {
                    let anchors = self.evaluate(doc, inner, root, top)?;
                    layout::filter_and_sort(doc, *kind, &roots, &anchors, *distance)
                }
                query => {
                    let mut seen = HashSet::new();
                    let mut next = Vec::new();
                    for scope in &roots {
                        for found in self.query_engine(doc, query, *scope, top)? {
                            if seen.insert(found) {
                                next.push(found);
                            }
                        }
                    }
                    next
                }
            };
            trace!(engine = %part.name, matches = roots.len(), "selector part evaluated");
        }
        Ok(roots)
    }

    fn query_engine(
        &self,
        doc: &Document,
        query: &EngineQuery,
        scope: NodeId,
        top: &str,
    ) -> Result<Vec<NodeId>, QueryError> {
        let found = match query {
            EngineQuery::Css(list) => CssMatcher::new(doc, Some(scope)).query_all(scope, list),
            EngineQuery::XPath(expr) => xpath::query_all(doc, scope, expr),
            EngineQuery::Text(text_query) => text::query_all(doc, scope, text_query),
            EngineQuery::Attribute { attribute, value } => doc
                .descendants(scope)
                .into_iter()
                .filter(|node| doc.attr(*node, attribute) == Some(value.as_str()))
                .collect(),
            EngineQuery::Role(role_query) => role::query_all(doc, scope, role_query),
            EngineQuery::Visible(expected) => {
                if !doc.is_element(scope) {
                    return Err(not_an_element("visible", top));
                }
                if is_visible(doc, scope) == *expected {
                    vec![scope]
                } else {
                    Vec::new()
                }
            }
            EngineQuery::Control(body) => match body.as_str() {
                "enter-frame" | "return-empty" => Vec::new(),
                other => return Err(EngineFailure::UnknownControl(other.to_string()).with_selector(top)),
            },
            EngineQuery::Has(inner) => {
                if !doc.is_element(scope) {
                    return Err(not_an_element("has", top));
                }
                if self.evaluate(doc, inner, scope, top)?.is_empty() {
                    Vec::new()
                } else {
                    vec![scope]
                }
            }
            // Applied to the whole working set in `evaluate`.
            EngineQuery::Nth(_) | EngineQuery::Layout { .. } => Vec::new(),
        };
        Ok(found)
    }
}

fn not_an_element(engine: &'static str, top: &str) -> QueryError {
    EngineFailure::NotAnElement(engine).with_selector(top)
}

/// `a >> *b >> c >> d` becomes `a >> b >> has="c >> d"`.
fn rewrite_capture(
    parsed: &ParsedSelector,
    capture: usize,
    top: &str,
) -> Result<ParsedSelector, QueryError> {
    if parsed.has_nth() {
        return Err(QueryError::Malformed {
            selector: top.to_string(),
            reason: "Can't query n-th element in a request with the capture".to_string(),
        });
    }
    let mut parts = parsed.parts[..=capture].to_vec();
    if capture + 1 < parsed.parts.len() {
        let rest = ParsedSelector {
            parts: parsed.parts[capture + 1..].to_vec(),
            capture: None,
        };
        let source = serde_json::to_string(&rest.to_string()).map_err(|err| QueryError::Malformed {
            selector: top.to_string(),
            reason: err.to_string(),
        })?;
        parts.push(ParsedSelectorPart {
            name: "has".to_string(),
            source,
            query: EngineQuery::Has(Box::new(rest)),
        });
    }
    Ok(ParsedSelector {
        parts,
        capture: None,
    })
}
