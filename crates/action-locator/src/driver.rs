//! Action drivers: the seam between the fallback loop and a page

use std::sync::Arc;

use async_trait::async_trait;
use dom_snapshot::{checked_state, is_disabled, is_visible, AriaTriState, Document, NodeId};
use selector_engine::SelectorEngine;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::errors::{ActionError, LocatorError};
use crate::regen::PageSnapshotSource;
use crate::types::{ActionOutput, SelectorAction};

/// Executes one action against the element a selector resolves to.
///
/// Assertions report what they read through [`ActionOutput`]; the fallback
/// loop compares it against the expectation.
#[async_trait]
pub trait ActionDriver: Send + Sync {
    async fn perform(
        &self,
        selector: &str,
        action: &SelectorAction,
    ) -> Result<ActionOutput, ActionError>;
}

/// Record of an action the snapshot driver carried out
#[derive(Debug, Clone, PartialEq)]
pub struct PerformedAction {
    pub selector: String,
    pub node: NodeId,
    pub action: SelectorAction,
}

/// Driver over an in-memory snapshot.
///
/// Resolves selectors in strict mode and applies the same interactability
/// rules a browser would before acting. `fill` writes the `value` attribute.
pub struct SnapshotDriver {
    document: Arc<RwLock<Document>>,
    engine: SelectorEngine,
    performed: Mutex<Vec<PerformedAction>>,
}

impl SnapshotDriver {
    pub fn new(document: Document) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
            engine: SelectorEngine::new(),
            performed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_engine(mut self, engine: SelectorEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Shared handle to the page, e.g. for replacing it between steps.
    pub fn document(&self) -> Arc<RwLock<Document>> {
        self.document.clone()
    }

    pub async fn performed(&self) -> Vec<PerformedAction> {
        self.performed.lock().await.clone()
    }

    fn resolve(&self, doc: &Document, selector: &str) -> Result<NodeId, ActionError> {
        match self.engine.query_strict(doc, selector, doc.root()) {
            Ok(Some(node)) => Ok(node),
            Ok(None) => Err(ActionError::NotFound(selector.to_string())),
            Err(err) if err.is_ambiguity() => Err(ActionError::Ambiguous(err)),
            Err(err) => Err(ActionError::InvalidSelector(err)),
        }
    }
}

/// Visibility, enabled state and element kind checks
fn check_interactable(
    doc: &Document,
    node: NodeId,
    action: &SelectorAction,
) -> Result<(), ActionError> {
    if !doc.is_element(node) {
        return Err(ActionError::Detached(format!("node {node} is gone")));
    }
    if !is_visible(doc, node) {
        return Err(ActionError::NotInteractable("element is not visible".to_string()));
    }
    if action.requires_enabled() && is_disabled(doc, node) {
        return Err(ActionError::NotInteractable("element is disabled".to_string()));
    }
    if matches!(action, SelectorAction::Fill { .. }) && !is_fillable(doc, node) {
        return Err(ActionError::NotInteractable(
            "element is not an <input>, <textarea>, <select> or [contenteditable] element"
                .to_string(),
        ));
    }
    Ok(())
}

/// Read-only checks for assertions; nothing on the page changes.
fn read_assertion(
    doc: &Document,
    node: NodeId,
    action: &SelectorAction,
) -> Result<ActionOutput, ActionError> {
    if !doc.is_element(node) {
        return Err(ActionError::Detached(format!("node {node} is gone")));
    }
    match action {
        SelectorAction::AssertVisible if !is_visible(doc, node) => Err(
            ActionError::AssertionFailed("element is not visible".to_string()),
        ),
        SelectorAction::AssertValue { .. } => input_value(doc, node).map(ActionOutput::Value),
        SelectorAction::AssertChecked { .. } => match checked_state(doc, node) {
            Some(state) => Ok(ActionOutput::Checked(state == AriaTriState::True)),
            None => Err(ActionError::NotInteractable(
                "element is not a checkbox or radio button".to_string(),
            )),
        },
        _ => Ok(ActionOutput::Done),
    }
}

fn input_value(doc: &Document, node: NodeId) -> Result<String, ActionError> {
    match doc.tag_name(node) {
        Some("input") => Ok(doc.attr(node, "value").unwrap_or_default().to_string()),
        Some("textarea") => Ok(doc
            .attr(node, "value")
            .map(str::to_string)
            .unwrap_or_else(|| doc.text_content(node))),
        Some("select") => {
            let options: Vec<NodeId> = doc
                .descendants(node)
                .into_iter()
                .filter(|option| doc.tag_name(*option) == Some("option"))
                .collect();
            let chosen = options
                .iter()
                .find(|option| doc.has_attr(**option, "selected"))
                .or_else(|| options.first());
            Ok(chosen
                .map(|option| {
                    doc.attr(*option, "value")
                        .map(str::to_string)
                        .unwrap_or_else(|| doc.text_content(*option).trim().to_string())
                })
                .unwrap_or_default())
        }
        _ => Err(ActionError::NotInteractable(
            "element is not an <input>, <textarea> or <select> element".to_string(),
        )),
    }
}

fn is_fillable(doc: &Document, node: NodeId) -> bool {
    let editable = doc
        .attr(node, "contenteditable")
        .is_some_and(|value| !value.eq_ignore_ascii_case("false"));
    let readonly = doc.has_attr(node, "readonly");
    match doc.tag_name(node) {
        Some("input") => {
            let kind = doc.attr(node, "type").unwrap_or("text").to_ascii_lowercase();
            !readonly
                && !matches!(
                    kind.as_str(),
                    "checkbox" | "radio" | "file" | "image" | "submit" | "reset" | "button"
                )
        }
        Some("textarea") => !readonly,
        Some("select") => true,
        _ => editable,
    }
}

#[async_trait]
impl ActionDriver for SnapshotDriver {
    async fn perform(
        &self,
        selector: &str,
        action: &SelectorAction,
    ) -> Result<ActionOutput, ActionError> {
        if action.is_assertion() {
            let doc = self.document.read().await;
            let node = self.resolve(&doc, selector)?;
            let output = read_assertion(&doc, node, action)?;
            debug!("Checked {} on {} via '{}': {:?}", action, node, selector, output);
            return Ok(output);
        }

        let node = {
            let doc = self.document.read().await;
            let node = self.resolve(&doc, selector)?;
            check_interactable(&doc, node, action)?;
            node
        };

        if let SelectorAction::Fill { content } = action {
            let mut doc = self.document.write().await;
            doc.set_attr(node, "value", content.as_str())
                .map_err(|err| ActionError::Detached(err.to_string()))?;
        }

        debug!("Performed {} on {} via '{}'", action, node, selector);
        self.performed.lock().await.push(PerformedAction {
            selector: selector.to_string(),
            node,
            action: action.clone(),
        });
        Ok(ActionOutput::Done)
    }
}

#[async_trait]
impl PageSnapshotSource for SnapshotDriver {
    async fn snapshot(&self) -> Result<Document, LocatorError> {
        Ok(self.document.read().await.clone())
    }
}
