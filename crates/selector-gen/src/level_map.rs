//! Ancestor walk collecting candidate tables per level

use std::collections::BTreeMap;

use dom_snapshot::{Document, NodeId};
use selector_engine::SelectorEngine;
use tracing::{debug, trace};

use crate::candidates::CandidateBuilder;
use crate::config::SelectorRules;
use crate::table::CandidateTable;

/// Level (0 = target) to that level's candidate table.
pub type LevelSelectorMap = BTreeMap<u32, CandidateTable>;

pub struct LevelMapBuilder<'a> {
    doc: &'a Document,
    candidates: CandidateBuilder<'a>,
    max_depth: usize,
}

impl<'a> LevelMapBuilder<'a> {
    pub fn new(doc: &'a Document, engine: &'a SelectorEngine, rules: &'a SelectorRules) -> Self {
        Self {
            doc,
            candidates: CandidateBuilder::new(doc, engine, rules),
            max_depth: rules.max_depth,
        }
    }

    /// Walk from `target` towards the root, stopping below `html`, at a
    /// detached element, or past `max_depth`.
    pub fn build(&self, target: NodeId) -> LevelSelectorMap {
        let mut map = LevelSelectorMap::new();
        let mut current = Some(target);
        let mut level = 0usize;

        while let Some(element) = current {
            if level > self.max_depth || self.doc.tag_name(element).map_or(true, |tag| tag == "html")
            {
                break;
            }

            let mut table = CandidateTable::new();
            for candidate in self.candidates.build(element, level == 0) {
                if table.append(candidate.category, candidate.fragment.as_str()).is_none() {
                    trace!(level, fragment = %candidate.fragment, "category block full");
                }
            }
            map.insert(level as u32, table);

            current = self.doc.parent_element(element);
            level += 1;
        }

        debug!(%target, levels = map.len(), "level map built");
        map
    }
}
