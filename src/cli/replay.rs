use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use action_locator::{
    ActionOutput, ExecCtx, FallbackOutcome, FallbackRunner, Modifier, MouseButton, SelectorAction,
    SnapshotDriver, SnapshotRegenerator,
};
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use selector_gen::SelectorInfo;
use serde::Serialize;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::page::read_document;

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// HTML snapshot of the page at replay time
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Selector info JSON written by `generate --save`
    #[arg(short, long, value_name = "FILE")]
    pub info: PathBuf,

    /// Action to replay
    #[arg(short, long, value_enum, default_value = "click")]
    pub action: ActionKind,

    /// Text for `fill`, key for `press`, expected value for `assert-value`,
    /// `true`/`false` for `assert-checked`
    #[arg(long)]
    pub value: Option<String>,

    /// Modifier keys held during click or press
    #[arg(long = "modifier", value_enum)]
    pub modifiers: Vec<ModifierArg>,

    /// Never regenerate selectors, even when none were recorded
    #[arg(long)]
    pub no_regenerate: bool,

    /// Override the configured deadline
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ActionKind {
    Click,
    DoubleClick,
    RightClick,
    Hover,
    Fill,
    Press,
    AssertVisible,
    AssertValue,
    AssertChecked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModifierArg {
    Alt,
    Control,
    Meta,
    Shift,
}

impl From<ModifierArg> for Modifier {
    fn from(value: ModifierArg) -> Self {
        match value {
            ModifierArg::Alt => Modifier::Alt,
            ModifierArg::Control => Modifier::Control,
            ModifierArg::Meta => Modifier::Meta,
            ModifierArg::Shift => Modifier::Shift,
        }
    }
}

impl ReplayArgs {
    fn selector_action(&self) -> Result<SelectorAction> {
        let modifiers: Vec<Modifier> = self.modifiers.iter().copied().map(Into::into).collect();
        let action = match self.action {
            ActionKind::Click | ActionKind::RightClick => SelectorAction::Click {
                button: if self.action == ActionKind::RightClick {
                    MouseButton::Right
                } else {
                    MouseButton::Left
                },
                click_count: 1,
                modifiers,
            },
            ActionKind::DoubleClick => SelectorAction::DoubleClick,
            ActionKind::Hover => SelectorAction::Hover,
            ActionKind::Fill => SelectorAction::Fill {
                content: self.value.clone().context("fill requires --value")?,
            },
            ActionKind::Press => SelectorAction::Press {
                key: self.value.clone().context("press requires --value <KEY>")?,
                modifiers,
            },
            ActionKind::AssertVisible => SelectorAction::AssertVisible,
            ActionKind::AssertValue => SelectorAction::AssertValue {
                value: self.value.clone().unwrap_or_default(),
            },
            ActionKind::AssertChecked => SelectorAction::AssertChecked {
                checked: match self.value.as_deref() {
                    None | Some("true") => true,
                    Some("false") => false,
                    Some(other) => bail!("assert-checked expects true or false, got {}", other),
                },
            },
        };
        Ok(action)
    }
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    action: String,
    selector: String,
    index: usize,
    attempts: usize,
    regenerated: bool,
    output: ActionOutput,
    failed: Vec<FailedEntry>,
}

#[derive(Debug, Serialize)]
struct FailedEntry {
    selector: String,
    error: String,
}

impl ReplayReport {
    fn new(action: &SelectorAction, outcome: &FallbackOutcome) -> Self {
        Self {
            action: action.to_string(),
            selector: outcome.selector.clone(),
            index: outcome.index,
            attempts: outcome.attempts(),
            regenerated: outcome.regenerated,
            output: outcome.output.clone(),
            failed: outcome
                .failed
                .iter()
                .map(|attempt| FailedEntry {
                    selector: attempt.selector.clone(),
                    error: attempt.error.to_string(),
                })
                .collect(),
        }
    }
}

pub async fn cmd_replay(args: ReplayArgs, ctx: &CliContext) -> Result<()> {
    let action = args.selector_action()?;
    let raw = fs::read_to_string(&args.info)
        .await
        .with_context(|| format!("reading {}", args.info.display()))?;
    let info = SelectorInfo::from_json(&raw)
        .with_context(|| format!("parsing {}", args.info.display()))?;
    let doc = read_document(&args.page).await?;

    let replay = &ctx.config().replay;
    let driver = Arc::new(SnapshotDriver::new(doc));
    let mut runner = FallbackRunner::new(driver.clone());
    if replay.allow_regenerate && !args.no_regenerate {
        let regenerator = SnapshotRegenerator::new(driver.clone(), ctx.generator()?);
        runner = runner.with_regenerator(Arc::new(regenerator));
    }

    let timeout = Duration::from_millis(args.timeout_ms.unwrap_or(replay.timeout_ms));
    let cancel_token = CancellationToken::new();
    let exec_ctx = ExecCtx::new(Some(Instant::now() + timeout), cancel_token.clone());
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling replay");
            cancel_token.cancel();
        }
    });

    let result = runner.try_in_order(&exec_ctx, &info, &action).await;
    interrupt.abort();
    let outcome = result.context("Replay failed")?;

    info!(
        "Replayed {} with selector #{} after {} attempt(s)",
        action,
        outcome.index + 1,
        outcome.attempts()
    );
    let report = ReplayReport::new(&action, &outcome);
    ctx.output().emit(&report, || render_human(&report))
}

fn render_human(report: &ReplayReport) -> String {
    let mut lines = Vec::new();
    for failed in &report.failed {
        lines.push(format!("  skipped {}: {}", failed.selector, failed.error));
    }
    lines.push(format!(
        "{} succeeded with {}{}",
        report.action,
        report.selector,
        if report.regenerated { " (regenerated)" } else { "" }
    ));
    lines.join("\n")
}
