use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use dom_snapshot::Document;
use selector_engine::{preview_node, unique_selector, SelectorEngine};
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::page::{locate, read_document};

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    /// Selector to evaluate
    pub selector: String,

    /// HTML snapshot of the page
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Selector for the query root (default: the document)
    #[arg(long)]
    pub root: Option<String>,

    /// Fail when more than one element matches
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct MatchEntry {
    node: usize,
    preview: String,
    selector: String,
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    selector: String,
    count: usize,
    matches: Vec<MatchEntry>,
}

pub async fn cmd_resolve(args: ResolveArgs, ctx: &CliContext) -> Result<()> {
    let engine = SelectorEngine::new();
    let doc = read_document(&args.page).await?;
    let root = match &args.root {
        Some(selector) => locate(&engine, &doc, selector)?,
        None => doc.root(),
    };

    let found = if args.strict {
        engine
            .query_strict(&doc, &args.selector, root)?
            .into_iter()
            .collect()
    } else {
        engine.query_all(&doc, &args.selector, root)?
    };

    let report = ResolveReport {
        selector: args.selector.clone(),
        count: found.len(),
        matches: found
            .iter()
            .map(|node| entry(&engine, &doc, *node))
            .collect(),
    };
    ctx.output().emit(&report, || render_human(&report))
}

fn entry(engine: &SelectorEngine, doc: &Document, node: dom_snapshot::NodeId) -> MatchEntry {
    MatchEntry {
        node: node.0,
        preview: preview_node(doc, node),
        selector: unique_selector(engine, doc, node),
    }
}

fn render_human(report: &ResolveReport) -> String {
    let mut lines = vec![format!(
        "\"{}\" resolved to {} element(s)",
        report.selector, report.count
    )];
    for (index, entry) in report.matches.iter().enumerate() {
        lines.push(format!(
            "  {}) {} aka selector(\"{}\")",
            index + 1,
            entry.preview,
            entry.selector
        ));
    }
    lines.join("\n")
}
