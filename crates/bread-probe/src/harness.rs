//! Suite runner: each selected scenario on its own page, several at a time.

use crate::api::ApiClient;
use crate::browser::PageSource;
use crate::config::HarnessConfig;
use crate::driver::PageDriver;
use crate::locator::StrategyTable;
use crate::model::uniqueness_token;
use crate::result::ProbeResult;
use crate::scenario::{Journey, ScenarioContext, ScenarioResult};
use crate::scenarios::ScenarioKind;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Results from running a set of scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Identifier of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Scenario reports, in scenario order
    pub scenarios: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioResult::passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.total() - self.passed_count()
    }

    /// Total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    /// Failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.scenarios.iter().filter(|s| !s.passed()).collect()
    }
}

/// Runs scenarios against one application
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    table: StrategyTable,
    api: ApiClient,
}

impl Harness {
    /// Validate `config` and build the API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: HarnessConfig) -> ProbeResult<Self> {
        config.validate()?;
        let api = ApiClient::new(config.base_url.clone(), config.api_timeout())?;
        Ok(Self {
            config,
            table: StrategyTable::new(),
            api,
        })
    }

    /// Replace the locator strategies
    #[must_use]
    pub fn with_table(mut self, table: StrategyTable) -> Self {
        self.table = table;
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `kinds`, up to `jobs` at a time, each on a fresh page from `source`
    pub async fn run<S: PageSource>(&self, source: &S, kinds: &[ScenarioKind]) -> SuiteResults {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let jobs = self.config.jobs.unwrap_or(kinds.len()).max(1);
        tracing::info!(%run_id, scenarios = kinds.len(), jobs, base_url = %self.config.base_url, "suite started");

        let mut scenarios: Vec<ScenarioResult> = stream::iter(kinds.iter().copied())
            .map(|kind| self.run_one(source, kind))
            .buffer_unordered(jobs)
            .collect()
            .await;
        scenarios.sort_by_key(|result| {
            ScenarioKind::ALL
                .iter()
                .position(|kind| kind.name() == result.name)
                .unwrap_or(usize::MAX)
        });

        let results = SuiteResults {
            run_id,
            started_at,
            scenarios,
            duration: start.elapsed(),
        };
        tracing::info!(
            %run_id,
            passed = results.passed_count(),
            failed = results.failed_count(),
            "suite finished"
        );
        results
    }

    async fn run_one<S: PageSource>(&self, source: &S, kind: ScenarioKind) -> ScenarioResult {
        let page = match source.open_page().await {
            Ok(page) => page,
            Err(e) => return Journey::new(kind.name()).abort(&e),
        };
        let ctx = ScenarioContext {
            driver: &page,
            table: &self.table,
            config: &self.config,
            api: &self.api,
            token: uniqueness_token(),
        };
        let result = kind.execute(&ctx).await;
        if let Err(e) = page.close().await {
            tracing::warn!(scenario = kind.name(), error = %e, "page did not close cleanly");
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::result::ProbeError;
    use crate::scenario::{Checkpoint, CheckpointOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSource {
        opened: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for MockSource {
        type Page = MockDriver;

        async fn open_page(&self) -> ProbeResult<MockDriver> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(MockDriver::new())
        }
    }

    struct NoBrowser;

    #[async_trait]
    impl PageSource for NoBrowser {
        type Page = MockDriver;

        async fn open_page(&self) -> ProbeResult<MockDriver> {
            Err(ProbeError::BrowserLaunch {
                message: "no chromium".into(),
            })
        }
    }

    fn unreachable_config() -> HarnessConfig {
        // Port 9 (discard) is closed on test hosts; registration fails fast
        HarnessConfig::default()
            .with_base_url("http://127.0.0.1:9")
            .with_attempt_timeout(10)
            .with_settle_timeout(20)
            .with_poll_interval(2)
    }

    fn result(name: &str, outcome: CheckpointOutcome) -> ScenarioResult {
        ScenarioResult {
            name: name.into(),
            checkpoints: vec![Checkpoint {
                name: "c".into(),
                predicate: "p".into(),
                outcome,
                failure: None,
                observed: String::new(),
            }],
            fatal: None,
            duration: Duration::ZERO,
        }
    }

    mod suite_results_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let results = SuiteResults {
                run_id: Uuid::new_v4(),
                started_at: Utc::now(),
                scenarios: vec![
                    result("auth", CheckpointOutcome::Passed),
                    result("crud", CheckpointOutcome::Failed),
                    result("negative", CheckpointOutcome::Warned),
                ],
                duration: Duration::ZERO,
            };
            assert_eq!(results.total(), 3);
            assert_eq!(results.passed_count(), 2);
            assert_eq!(results.failed_count(), 1);
            assert!(!results.all_passed());
            assert_eq!(results.failures()[0].name, "crud");
        }

        #[test]
        fn test_json_shape() {
            let results = SuiteResults {
                run_id: Uuid::nil(),
                started_at: Utc::now(),
                scenarios: vec![result("auth", CheckpointOutcome::Passed)],
                duration: Duration::from_millis(5),
            };
            let json = serde_json::to_value(&results).unwrap();
            assert_eq!(json["run_id"], "00000000-0000-0000-0000-000000000000");
            assert_eq!(json["scenarios"][0]["checkpoints"][0]["outcome"], "Passed");
        }
    }

    mod harness_tests {
        use super::*;

        #[test]
        fn test_new_rejects_invalid_config() {
            let config = HarnessConfig::default().with_base_url("");
            assert!(Harness::new(config).is_err());
        }

        #[tokio::test]
        async fn test_failed_registration_is_fatal_per_scenario() {
            let harness = Harness::new(unreachable_config()).unwrap();
            let source = MockSource {
                opened: AtomicUsize::new(0),
            };
            let results = harness.run(&source, &ScenarioKind::ALL[..3]).await;

            assert_eq!(source.opened.load(Ordering::SeqCst), 3);
            let names: Vec<_> = results.scenarios.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, ["auth", "crud", "negative"]);
            for scenario in &results.scenarios {
                let fatal = scenario.fatal.as_deref().unwrap();
                assert!(fatal.contains("registration"), "{fatal}");
            }
            assert_eq!(results.failed_count(), 3);
        }

        #[tokio::test]
        async fn test_page_open_failure_is_reported() {
            let harness = Harness::new(unreachable_config()).unwrap();
            let results = harness.run(&NoBrowser, &[ScenarioKind::Registration]).await;
            assert_eq!(results.total(), 1);
            assert!(results.scenarios[0]
                .fatal
                .as_deref()
                .unwrap()
                .contains("no chromium"));
        }

        #[tokio::test]
        async fn test_single_job_still_runs_everything() {
            let config = unreachable_config();
            let config = HarnessConfig {
                jobs: Some(1),
                ..config
            };
            let harness = Harness::new(config).unwrap();
            let source = MockSource {
                opened: AtomicUsize::new(0),
            };
            let results = harness.run(&source, &ScenarioKind::ALL).await;
            assert_eq!(results.total(), 4);
            assert_eq!(source.opened.load(Ordering::SeqCst), 4);
        }

        #[tokio::test]
        async fn test_empty_selection() {
            let harness = Harness::new(unreachable_config()).unwrap();
            let source = MockSource {
                opened: AtomicUsize::new(0),
            };
            let results = harness.run(&source, &[]).await;
            assert_eq!(results.total(), 0);
            assert!(results.all_passed());
        }
    }
}
