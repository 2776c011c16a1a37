//! Ordered selector fallback with optional regeneration

use std::sync::Arc;

use selector_gen::SelectorInfo;
use tracing::{debug, info, warn};

use crate::context::ExecCtx;
use crate::driver::ActionDriver;
use crate::errors::LocatorError;
use crate::regen::SelectorRegenerator;
use crate::types::{FailedAttempt, FallbackOutcome, SelectorAction};

/// Runs one logical action through the recorded selectors in order.
///
/// At most one selector performs the action. Earlier failures are logged and
/// swallowed; the last candidate's failure is returned. Assertions that read
/// a value compare it once, against the first selector that resolves.
pub struct FallbackRunner {
    driver: Arc<dyn ActionDriver>,
    regenerator: Option<Arc<dyn SelectorRegenerator>>,
    allow_regenerate: bool,
}

impl FallbackRunner {
    pub fn new(driver: Arc<dyn ActionDriver>) -> Self {
        Self {
            driver,
            regenerator: None,
            allow_regenerate: false,
        }
    }

    /// Enable regeneration through `regenerator` when no selector was recorded.
    pub fn with_regenerator(mut self, regenerator: Arc<dyn SelectorRegenerator>) -> Self {
        self.regenerator = Some(regenerator);
        self.allow_regenerate = true;
        self
    }

    pub fn allow_regenerate(mut self, allow: bool) -> Self {
        self.allow_regenerate = allow;
        self
    }

    pub async fn try_in_order(
        &self,
        ctx: &ExecCtx,
        info: &SelectorInfo,
        action: &SelectorAction,
    ) -> Result<FallbackOutcome, LocatorError> {
        let mut regenerated = false;
        let selectors = if info.first_selector.is_empty() {
            match (&self.regenerator, self.allow_regenerate && action.allows_regenerate()) {
                (Some(regenerator), true) => {
                    check_ctx(ctx, 0)?;
                    regenerated = true;
                    regenerator.regenerate(&info.level_selector_map).await?
                }
                _ => Vec::new(),
            }
        } else {
            info.first_selector.clone()
        };

        let mut outcome = self.try_selectors(ctx, &selectors, action).await?;
        outcome.regenerated = regenerated;
        Ok(outcome)
    }

    /// Attempt `action` with each selector until one succeeds.
    pub async fn try_selectors(
        &self,
        ctx: &ExecCtx,
        selectors: &[String],
        action: &SelectorAction,
    ) -> Result<FallbackOutcome, LocatorError> {
        if selectors.is_empty() {
            return Err(LocatorError::SelectorMissing);
        }

        let mut failed = Vec::new();
        let last = selectors.len() - 1;
        for (index, selector) in selectors.iter().enumerate() {
            check_ctx(ctx, failed.len())?;

            debug!(
                "Attempting {} with selector {}/{}: {}",
                action,
                index + 1,
                selectors.len(),
                selector
            );
            match self.driver.perform(selector, action).await {
                Ok(output) => {
                    if let Err(message) = action.verify(&output) {
                        return Err(LocatorError::Assertion {
                            selector: selector.clone(),
                            message,
                        });
                    }
                    info!(
                        "{} succeeded with selector '{}' after {} failure(s)",
                        action,
                        selector,
                        failed.len()
                    );
                    return Ok(FallbackOutcome {
                        selector: selector.clone(),
                        index,
                        failed,
                        regenerated: false,
                        output,
                    });
                }
                Err(error) if index == last => {
                    return Err(LocatorError::Action {
                        selector: selector.clone(),
                        source: error,
                    });
                }
                Err(error) => {
                    warn!("Selector '{}' failed, trying next: {}", selector, error);
                    failed.push(FailedAttempt {
                        index,
                        selector: selector.clone(),
                        error,
                    });
                }
            }
        }

        Err(LocatorError::SelectorMissing)
    }
}

fn check_ctx(ctx: &ExecCtx, attempts: usize) -> Result<(), LocatorError> {
    if ctx.is_cancelled() {
        return Err(LocatorError::Cancelled { attempts });
    }
    if ctx.is_timeout() {
        return Err(LocatorError::Timeout { attempts });
    }
    Ok(())
}
