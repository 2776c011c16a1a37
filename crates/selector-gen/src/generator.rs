//! Record-time entry point

use dom_snapshot::{Document, NodeId};
use selector_engine::SelectorEngine;
use tracing::{debug, info};

use crate::config::{SelectorConfig, SelectorRules};
use crate::errors::GenerateError;
use crate::info::SelectorInfo;
use crate::level_map::{LevelMapBuilder, LevelSelectorMap};
use crate::resolver::{RecursiveResolver, TargetCheck};

/// Produces [`SelectorInfo`] for recorded elements.
///
/// Configuration is validated once at construction; generation itself never
/// fails for an element of the given document.
#[derive(Debug, Clone)]
pub struct SelectorGenerator {
    config: SelectorConfig,
    rules: SelectorRules,
    engine: SelectorEngine,
}

impl SelectorGenerator {
    pub fn new(config: SelectorConfig) -> Result<Self, GenerateError> {
        let rules = config.compile()?;
        Ok(Self {
            config,
            rules,
            engine: SelectorEngine::new(),
        })
    }

    pub fn with_engine(mut self, engine: SelectorEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn engine(&self) -> &SelectorEngine {
        &self.engine
    }

    pub fn generate(&self, doc: &Document, target: NodeId) -> Result<SelectorInfo, GenerateError> {
        if !doc.is_element(target) {
            return Err(GenerateError::NotAnElement(target));
        }

        let level_selector_map = self.build_level_map(doc, target);
        let first_selector = self
            .resolver(doc)
            .resolve(&level_selector_map, TargetCheck::Element(target));

        info!(
            %target,
            levels = level_selector_map.len(),
            selectors = first_selector.len(),
            "selectors generated"
        );
        Ok(SelectorInfo::new(level_selector_map, first_selector))
    }

    pub fn build_level_map(&self, doc: &Document, target: NodeId) -> LevelSelectorMap {
        LevelMapBuilder::new(doc, &self.engine, &self.rules).build(target)
    }

    /// Rerun the search over a persisted level map against the current page,
    /// accepting any selector that resolves to exactly one element.
    pub fn regenerate(&self, doc: &Document, map: &LevelSelectorMap) -> Vec<String> {
        let found = self.resolver(doc).resolve(map, TargetCheck::AnyUnique);
        debug!(selectors = found.len(), "selectors regenerated");
        found
    }

    fn resolver<'a>(&'a self, doc: &'a Document) -> RecursiveResolver<'a> {
        RecursiveResolver::new(doc, &self.engine, self.rules.max_depth, self.rules.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::parse_html;

    #[test]
    fn test_rejects_non_elements() {
        let doc = parse_html("<p>text</p>").unwrap();
        let generator = SelectorGenerator::new(SelectorConfig::default()).unwrap();
        assert_eq!(
            generator.generate(&doc, doc.root()),
            Err(GenerateError::NotAnElement(doc.root()))
        );
        let text = doc.children(doc.descendants(doc.root())[0])[0];
        assert!(generator.generate(&doc, text).is_err());
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let config = SelectorConfig {
            exclude_class_modify: "[".to_string(),
            ..SelectorConfig::default()
        };
        assert!(SelectorGenerator::new(config).unwrap_err().is_config_error());
    }
}
