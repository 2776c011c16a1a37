//! Replay-time selector regeneration

use std::sync::Arc;

use async_trait::async_trait;
use dom_snapshot::Document;
use selector_gen::{LevelSelectorMap, SelectorGenerator};
use tracing::info;

use crate::errors::LocatorError;

/// Captures the current page as a snapshot.
#[async_trait]
pub trait PageSnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<Document, LocatorError>;
}

/// Produces fresh selectors from a persisted level map.
#[async_trait]
pub trait SelectorRegenerator: Send + Sync {
    async fn regenerate(&self, map: &LevelSelectorMap) -> Result<Vec<String>, LocatorError>;
}

/// Default regenerator: snapshot the live page and rerun the recursive
/// search over the level map, accepting any uniquely resolving selector.
pub struct SnapshotRegenerator {
    source: Arc<dyn PageSnapshotSource>,
    generator: SelectorGenerator,
}

impl SnapshotRegenerator {
    pub fn new(source: Arc<dyn PageSnapshotSource>, generator: SelectorGenerator) -> Self {
        Self { source, generator }
    }
}

#[async_trait]
impl SelectorRegenerator for SnapshotRegenerator {
    async fn regenerate(&self, map: &LevelSelectorMap) -> Result<Vec<String>, LocatorError> {
        if map.is_empty() {
            return Ok(Vec::new());
        }
        let doc = self.source.snapshot().await?;
        let selectors = self.generator.regenerate(&doc, map);
        info!("Regenerated {} selector(s) from {} level(s)", selectors.len(), map.len());
        Ok(selectors)
    }
}
