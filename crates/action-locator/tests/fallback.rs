use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use action_locator::{
    ActionDriver, ActionError, ActionOutput, ExecCtx, FallbackRunner, LocatorError, SelectorAction,
    SelectorRegenerator, SnapshotDriver, SnapshotRegenerator,
};
use async_trait::async_trait;
use dom_snapshot::parse_html;
use selector_gen::{LevelSelectorMap, SelectorConfig, SelectorGenerator, SelectorInfo};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Driver scripted per selector; unknown selectors succeed.
#[derive(Default)]
struct ScriptedDriver {
    failures: HashMap<String, ActionError>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    fn failing(selectors: &[(&str, ActionError)]) -> Self {
        Self {
            failures: selectors
                .iter()
                .map(|(selector, error)| (selector.to_string(), error.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ActionDriver for ScriptedDriver {
    async fn perform(
        &self,
        selector: &str,
        _action: &SelectorAction,
    ) -> Result<ActionOutput, ActionError> {
        self.calls.lock().await.push(selector.to_string());
        match self.failures.get(selector) {
            Some(error) => Err(error.clone()),
            None => Ok(ActionOutput::Done),
        }
    }
}

#[derive(Default)]
struct CountingRegenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl SelectorRegenerator for CountingRegenerator {
    async fn regenerate(&self, _map: &LevelSelectorMap) -> Result<Vec<String>, LocatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["sel-regenerated".to_string()])
    }
}

fn info(selectors: &[&str]) -> SelectorInfo {
    SelectorInfo::new(
        LevelSelectorMap::new(),
        selectors.iter().map(|selector| selector.to_string()).collect(),
    )
}

#[tokio::test]
async fn second_selector_wins_after_first_is_not_interactable() {
    let driver = Arc::new(ScriptedDriver::failing(&[(
        "sel-A",
        ActionError::NotInteractable("element is not visible".to_string()),
    )]));
    let regenerator = Arc::new(CountingRegenerator::default());
    let runner = FallbackRunner::new(driver.clone()).with_regenerator(regenerator.clone());

    let outcome = runner
        .try_in_order(&ExecCtx::default(), &info(&["sel-A", "sel-B"]), &SelectorAction::click())
        .await
        .unwrap();

    assert_eq!(outcome.selector, "sel-B");
    assert_eq!(outcome.index, 1);
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(outcome.failed[0].selector, "sel-A");
    assert!(!outcome.regenerated);
    assert_eq!(driver.calls().await, vec!["sel-A", "sel-B"]);
    assert_eq!(regenerator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn last_failure_propagates() {
    let driver = Arc::new(ScriptedDriver::failing(&[
        ("sel-A", ActionError::NotFound("sel-A".to_string())),
        ("sel-B", ActionError::Driver("socket closed".to_string())),
    ]));
    let runner = FallbackRunner::new(driver.clone());

    let err = runner
        .try_in_order(&ExecCtx::default(), &info(&["sel-A", "sel-B"]), &SelectorAction::Hover)
        .await
        .unwrap_err();
    match err {
        LocatorError::Action { selector, source } => {
            assert_eq!(selector, "sel-B");
            assert!(matches!(source, ActionError::Driver(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(driver.calls().await.len(), 2);
}

#[tokio::test]
async fn empty_info_without_regeneration_is_missing() {
    let runner = FallbackRunner::new(Arc::new(ScriptedDriver::default()));
    let err = runner
        .try_in_order(&ExecCtx::default(), &info(&[]), &SelectorAction::click())
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::SelectorMissing));

    let regenerator = Arc::new(CountingRegenerator::default());
    let disabled = FallbackRunner::new(Arc::new(ScriptedDriver::default()))
        .with_regenerator(regenerator.clone())
        .allow_regenerate(false);
    assert!(disabled
        .try_in_order(&ExecCtx::default(), &info(&[]), &SelectorAction::click())
        .await
        .is_err());
    assert_eq!(regenerator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_info_regenerates_once() {
    let driver = Arc::new(ScriptedDriver::default());
    let regenerator = Arc::new(CountingRegenerator::default());
    let runner = FallbackRunner::new(driver.clone()).with_regenerator(regenerator.clone());

    let outcome = runner
        .try_in_order(&ExecCtx::default(), &info(&[]), &SelectorAction::DoubleClick)
        .await
        .unwrap();
    assert!(outcome.regenerated);
    assert_eq!(outcome.selector, "sel-regenerated");
    assert_eq!(regenerator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_attempt() {
    let token = CancellationToken::new();
    token.cancel();
    let driver = Arc::new(ScriptedDriver::default());
    let runner = FallbackRunner::new(driver.clone());

    let err = runner
        .try_in_order(&ExecCtx::new(None, token), &info(&["sel-A"]), &SelectorAction::click())
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::Cancelled { attempts: 0 }));
    assert!(driver.calls().await.is_empty());

    let expired = ExecCtx::with_timeout(std::time::Duration::ZERO);
    let err = runner
        .try_in_order(&expired, &info(&["sel-A"]), &SelectorAction::click())
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::Timeout { .. }));
}

const LOGIN: &str = r#"<html><body>
  <div data-form="login"><button class="go">Go</button></div>
  <div data-form="signup"><button class="go" disabled>Go</button></div>
</body></html>"#;

#[tokio::test]
async fn snapshot_driver_replays_recorded_and_regenerated_selectors() {
    let doc = parse_html(LOGIN).unwrap();
    let generator = SelectorGenerator::new(SelectorConfig::default()).unwrap();
    let target = generator
        .engine()
        .query_all(&doc, "div[data-form='login'] >> button", doc.root())
        .unwrap()[0];
    let recorded = generator.generate(&doc, target).unwrap();
    assert!(!recorded.is_empty());

    let driver = Arc::new(SnapshotDriver::new(doc));
    let runner = FallbackRunner::new(driver.clone());
    let outcome = runner
        .try_in_order(&ExecCtx::default(), &recorded, &SelectorAction::click())
        .await
        .unwrap();
    assert_eq!(outcome.index, 0);

    let stripped = SelectorInfo::new(recorded.level_selector_map.clone(), Vec::new());
    let regenerator = Arc::new(SnapshotRegenerator::new(driver.clone(), generator));
    let runner = FallbackRunner::new(driver.clone()).with_regenerator(regenerator);
    let outcome = runner
        .try_in_order(&ExecCtx::default(), &stripped, &SelectorAction::click())
        .await
        .unwrap();
    assert!(outcome.regenerated);

    let performed = driver.performed().await;
    assert_eq!(performed.len(), 2);
    assert!(performed.iter().all(|action| action.node == target));
}

const PROFILE: &str = r#"<html><body>
  <form>
    <input name="email" value="ada@example.com">
    <input name="email" value="old@example.com" style="display: none">
    <input id="news" type="checkbox" checked>
  </form>
  <p class="note" hidden>Saved</p>
  <p class="note">Saved</p>
</body></html>"#;

#[tokio::test]
async fn visible_assertion_falls_through_hidden_matches() {
    let driver = Arc::new(SnapshotDriver::new(parse_html(PROFILE).unwrap()));
    let runner = FallbackRunner::new(driver.clone());

    let outcome = runner
        .try_in_order(
            &ExecCtx::default(),
            &info(&["p.note >> nth=0", "p.note >> nth=1"]),
            &SelectorAction::AssertVisible,
        )
        .await
        .unwrap();
    assert_eq!(outcome.index, 1);
    assert!(matches!(outcome.failed[0].error, ActionError::AssertionFailed(_)));
    assert_eq!(outcome.output, ActionOutput::Done);
    assert!(driver.performed().await.is_empty());
}

#[tokio::test]
async fn visible_assertion_never_regenerates() {
    let regenerator = Arc::new(CountingRegenerator::default());
    let runner = FallbackRunner::new(Arc::new(ScriptedDriver::default()))
        .with_regenerator(regenerator.clone());

    let err = runner
        .try_in_order(&ExecCtx::default(), &info(&[]), &SelectorAction::AssertVisible)
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::SelectorMissing));
    assert_eq!(regenerator.calls.load(Ordering::SeqCst), 0);

    let outcome = runner
        .try_in_order(&ExecCtx::default(), &info(&[]), &SelectorAction::AssertChecked { checked: true })
        .await;
    // The scripted driver answers `Done`, which a checked assertion rejects.
    assert!(matches!(outcome, Err(LocatorError::Assertion { .. })));
    assert_eq!(regenerator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn value_assertion_compares_the_first_resolved_value() {
    let driver = Arc::new(SnapshotDriver::new(parse_html(PROFILE).unwrap()));
    let runner = FallbackRunner::new(driver.clone());
    let selectors = info(&["input[name=email] >> nth=0", "input[name=email] >> nth=1"]);

    let outcome = runner
        .try_in_order(
            &ExecCtx::default(),
            &selectors,
            &SelectorAction::AssertValue {
                value: "ada@example.com".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.index, 0);
    assert_eq!(outcome.output, ActionOutput::Value("ada@example.com".to_string()));

    // A mismatch is final; the second selector is not consulted.
    let err = runner
        .try_in_order(
            &ExecCtx::default(),
            &selectors,
            &SelectorAction::AssertValue {
                value: "old@example.com".to_string(),
            },
        )
        .await
        .unwrap_err();
    match err {
        LocatorError::Assertion { selector, message } => {
            assert_eq!(selector, "input[name=email] >> nth=0");
            assert!(message.contains("ada@example.com"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let outcome = runner
        .try_in_order(
            &ExecCtx::default(),
            &info(&["id=news"]),
            &SelectorAction::AssertChecked { checked: true },
        )
        .await
        .unwrap();
    assert_eq!(outcome.output, ActionOutput::Checked(true));
}
