use std::path::Path;

use anyhow::{bail, Context, Result};
use dom_snapshot::{parse_html, Document, NodeId};
use selector_engine::SelectorEngine;
use tokio::fs;

/// Parse an HTML snapshot from disk.
pub async fn read_document(path: &Path) -> Result<Document> {
    let markup = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    parse_html(&markup).with_context(|| format!("parsing {}", path.display()))
}

/// The single element `selector` resolves to.
pub fn locate(engine: &SelectorEngine, doc: &Document, selector: &str) -> Result<NodeId> {
    match engine.query_strict(doc, selector, doc.root())? {
        Some(node) => Ok(node),
        None => bail!("No element matches {}", selector),
    }
}
