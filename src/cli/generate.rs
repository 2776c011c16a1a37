use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use selector_gen::SelectorInfo;
use tokio::fs;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::page::{locate, read_document};

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// HTML snapshot of the page
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Selector picking the recorded element; must match exactly one
    #[arg(short, long)]
    pub target: String,

    /// Write the selector info as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

pub async fn cmd_generate(args: GenerateArgs, ctx: &CliContext) -> Result<()> {
    let generator = ctx.generator()?;
    let doc = read_document(&args.page).await?;
    let target = locate(generator.engine(), &doc, &args.target)?;

    let info = generator.generate(&doc, target)?;
    if info.is_empty() {
        warn!(
            "No unique selector found for {}; consider a burying-point attribute",
            args.target
        );
    }

    if let Some(path) = &args.save {
        fs::write(path, info.to_json()?)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Saved selector info to {}", path.display());
    }

    ctx.output().emit(&info, || render_human(&info))
}

fn render_human(info: &SelectorInfo) -> String {
    let mut out = String::new();
    if info.first_selector.is_empty() {
        out.push_str("No selector resolves uniquely to the element\n");
    } else {
        out.push_str("Selectors:\n");
        for (index, selector) in info.first_selector.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", index + 1, selector);
        }
    }
    out.push_str("Level map:\n");
    for (level, table) in &info.level_selector_map {
        let _ = writeln!(out, "  level {level}:");
        for (key, fragment) in table.iter() {
            let _ = writeln!(out, "    {key:>2}  {fragment}");
        }
    }
    out.trim_end().to_string()
}
