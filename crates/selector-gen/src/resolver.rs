//! Backtracking search over a level map for globally unique selectors

use std::collections::HashSet;

use dom_snapshot::{Document, NodeId};
use selector_engine::SelectorEngine;
use tracing::{debug, trace};

use crate::level_map::LevelSelectorMap;

/// Appended to every fragment before combination.
pub const VISIBLE_SUFFIX: &str = " >> visible = true";

/// What a combined selector must resolve to before it is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetCheck {
    /// Exactly this element (record time).
    Element(NodeId),
    /// Any single element (replay-time regeneration, target unknown).
    AnyUnique,
}

impl TargetCheck {
    fn accepts(self, found: NodeId) -> bool {
        match self {
            TargetCheck::Element(target) => found == target,
            TargetCheck::AnyUnique => true,
        }
    }
}

enum Verdict {
    Accept,
    Defer,
    Discard,
}

struct Deferred {
    cur: String,
    union: String,
}

struct Search<'a> {
    doc: &'a Document,
    engine: &'a SelectorEngine,
    map: &'a LevelSelectorMap,
    check: TargetCheck,
    max_depth: u32,
    max_results: usize,
    results: Vec<String>,
    /// Level-0 fragments that already produced a result.
    healthy: HashSet<String>,
}

pub struct RecursiveResolver<'a> {
    doc: &'a Document,
    engine: &'a SelectorEngine,
    max_depth: usize,
    max_results: usize,
}

impl<'a> RecursiveResolver<'a> {
    pub fn new(
        doc: &'a Document,
        engine: &'a SelectorEngine,
        max_depth: usize,
        max_results: usize,
    ) -> Self {
        Self {
            doc,
            engine,
            max_depth,
            max_results,
        }
    }

    /// Up to `max_results` distinct selectors resolving from the document
    /// root per `check`, at most one per level-0 fragment. May be empty.
    pub fn resolve(&self, map: &LevelSelectorMap, check: TargetCheck) -> Vec<String> {
        let mut search = Search {
            doc: self.doc,
            engine: self.engine,
            map,
            check,
            max_depth: u32::try_from(self.max_depth).unwrap_or(u32::MAX),
            max_results: self.max_results,
            results: Vec::new(),
            healthy: HashSet::new(),
        };
        search.level(0, "", None);
        search.results
    }
}

impl Search<'_> {
    fn done(&self) -> bool {
        self.results.len() >= self.max_results
    }

    fn level(&mut self, level: u32, selector: &str, marker: Option<&str>) {
        if self.done() || level > self.max_depth {
            return;
        }
        let Some(table) = self.map.get(&level) else {
            return;
        };

        let mut deferred = Vec::new();
        for fragment in table.fragments() {
            if self.done() {
                return;
            }
            let cur = format!("{fragment}{VISIBLE_SUFFIX}");
            let union = if selector.is_empty() {
                cur.clone()
            } else {
                format!("{cur} >> {selector}")
            };

            if cur.contains("nth=") || self.engine.count(self.doc, &cur, self.doc.root()) > 1 {
                trace!(level, selector = %cur, "deferred: fragment not unique alone");
                deferred.push(Deferred { cur, union });
                continue;
            }

            match self.judge(&union) {
                Verdict::Accept => {
                    let key = marker.unwrap_or(&cur).to_string();
                    if self.healthy.contains(&key) || self.results.contains(&union) {
                        trace!(level, selector = %union, "discarded: level-0 fragment already used");
                        continue;
                    }
                    debug!(level, selector = %union, "selector accepted");
                    self.healthy.insert(key);
                    self.results.push(union);
                }
                Verdict::Defer => {
                    trace!(level, selector = %union, "deferred: several matches");
                    deferred.push(Deferred { cur, union });
                }
                Verdict::Discard => {
                    trace!(level, selector = %union, "discarded");
                }
            }
        }

        for Deferred { cur, union } in deferred {
            if self.done() {
                return;
            }
            let next_marker = marker.unwrap_or(&cur);
            if self.healthy.contains(next_marker) {
                continue;
            }
            self.level(level + 1, &union, Some(next_marker));
        }
    }

    fn judge(&self, union: &str) -> Verdict {
        match self.engine.query_all(self.doc, union, self.doc.root()) {
            Ok(found) => match found.as_slice() {
                [] => Verdict::Discard,
                [single] if self.check.accepts(*single) => Verdict::Accept,
                [_] => Verdict::Discard,
                _ => Verdict::Defer,
            },
            Err(err) => {
                trace!(selector = union, error = %err, "evaluation failed");
                Verdict::Discard
            }
        }
    }
}
