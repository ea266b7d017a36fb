//! Scenario bookkeeping: the per-scenario state machine and its report.
//!
//! ```text
//! Init ──► Setup ──► Act(1) ──► Checkpoint(1) ──► Act(2) ... ──► Done
//!            │
//!            └── fixture error: terminal, recorded as `fatal`
//! ```
//!
//! Only setup failures end a journey early. Every other failed checkpoint
//! is recorded and the journey carries on.

use crate::action::{ActionOutcome, Actions};
use crate::api::ApiClient;
use crate::assertion::{AssertionResult, Observer};
use crate::config::HarnessConfig;
use crate::driver::PageDriver;
use crate::fixture::SessionBootstrapper;
use crate::locator::StrategyTable;
use crate::model::TestUser;
use crate::result::{FailureKind, ProbeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Where a journey is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Not started
    Init,
    /// Creating users and sessions
    Setup,
    /// Performing step n
    Act(usize),
    /// Evaluating checkpoint n
    Checkpoint(usize),
    /// Finished
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Setup => f.write_str("setup"),
            Self::Act(n) => write!(f, "act({n})"),
            Self::Checkpoint(n) => write!(f, "checkpoint({n})"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Grade of a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointOutcome {
    /// Condition held
    Passed,
    /// Condition did not hold; fails the scenario
    Failed,
    /// Condition did not hold but is tolerated
    Warned,
}

/// One evaluated acceptance condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Short name
    pub name: String,
    /// Predicate that was evaluated
    pub predicate: String,
    /// Grade
    pub outcome: CheckpointOutcome,
    /// Failure class, when not passed
    pub failure: Option<FailureKind>,
    /// What was observed, when not passed
    pub observed: String,
}

/// Report of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Checkpoints in evaluation order
    pub checkpoints: Vec<Checkpoint>,
    /// Setup error that ended the scenario
    pub fatal: Option<String>,
    /// Wall time
    pub duration: Duration,
}

impl ScenarioResult {
    /// No fatal error and no failed checkpoint
    #[must_use]
    pub fn passed(&self) -> bool {
        self.fatal.is_none()
            && self
                .checkpoints
                .iter()
                .all(|c| c.outcome != CheckpointOutcome::Failed)
    }

    /// Failed checkpoints
    #[must_use]
    pub fn failures(&self) -> Vec<&Checkpoint> {
        self.checkpoints
            .iter()
            .filter(|c| c.outcome == CheckpointOutcome::Failed)
            .collect()
    }

    /// Number of warned checkpoints
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.checkpoints
            .iter()
            .filter(|c| c.outcome == CheckpointOutcome::Warned)
            .count()
    }
}

/// State machine and checkpoint log of a running scenario
#[derive(Debug)]
pub struct Journey {
    scenario: String,
    phase: Phase,
    step: usize,
    checkpoints: Vec<Checkpoint>,
    started: Instant,
}

impl Journey {
    /// Start a journey in `Init`
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            phase: Phase::Init,
            step: 0,
            checkpoints: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Checkpoints so far
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    fn transition(&mut self, next: Phase, what: &str) {
        tracing::debug!(scenario = %self.scenario, from = %self.phase, to = %next, %what, "phase");
        self.phase = next;
    }

    /// Enter setup
    pub fn setup(&mut self) {
        self.transition(Phase::Setup, "setup");
    }

    /// Start the next step
    pub fn act(&mut self, what: &str) {
        self.step += 1;
        self.transition(Phase::Act(self.step), what);
    }

    /// Run-through of an action; a failed action becomes a failed
    /// checkpoint named after it. Returns whether the action completed.
    pub fn action(&mut self, name: &str, outcome: &ActionOutcome) -> bool {
        self.act(name);
        match outcome {
            ActionOutcome::Done { .. } => true,
            ActionOutcome::Failed { kind, detail } => {
                self.record(Checkpoint {
                    name: name.to_string(),
                    predicate: "action completes".to_string(),
                    outcome: CheckpointOutcome::Failed,
                    failure: Some(*kind),
                    observed: detail.clone(),
                });
                false
            }
        }
    }

    fn record(&mut self, checkpoint: Checkpoint) {
        self.transition(Phase::Checkpoint(self.checkpoints.len() + 1), &checkpoint.name);
        match checkpoint.outcome {
            CheckpointOutcome::Passed => {
                tracing::debug!(scenario = %self.scenario, checkpoint = %checkpoint.name, "passed");
            }
            CheckpointOutcome::Failed => tracing::warn!(
                scenario = %self.scenario,
                checkpoint = %checkpoint.name,
                predicate = %checkpoint.predicate,
                observed = %checkpoint.observed,
                "checkpoint failed"
            ),
            CheckpointOutcome::Warned => tracing::warn!(
                scenario = %self.scenario,
                checkpoint = %checkpoint.name,
                observed = %checkpoint.observed,
                "checkpoint warning"
            ),
        }
        self.checkpoints.push(checkpoint);
    }

    /// Record an assertion; returns whether it passed
    pub fn check(&mut self, name: &str, result: AssertionResult) -> bool {
        let outcome = if result.passed {
            CheckpointOutcome::Passed
        } else {
            CheckpointOutcome::Failed
        };
        self.grade(name, result, outcome)
    }

    /// Record an assertion whose failure is only a warning
    pub fn check_tolerant(&mut self, name: &str, result: AssertionResult) -> bool {
        let outcome = if result.passed {
            CheckpointOutcome::Passed
        } else {
            CheckpointOutcome::Warned
        };
        self.grade(name, result, outcome)
    }

    fn grade(&mut self, name: &str, result: AssertionResult, outcome: CheckpointOutcome) -> bool {
        let passed = result.passed;
        self.record(Checkpoint {
            name: name.to_string(),
            predicate: result.predicate,
            outcome,
            failure: result.failure,
            observed: result.observed,
        });
        passed
    }

    /// Record a tolerated deviation
    pub fn warn(&mut self, name: &str, predicate: impl Into<String>, observed: impl Into<String>) {
        self.record(Checkpoint {
            name: name.to_string(),
            predicate: predicate.into(),
            outcome: CheckpointOutcome::Warned,
            failure: None,
            observed: observed.into(),
        });
    }

    /// Close the journey
    #[must_use]
    pub fn finish(mut self) -> ScenarioResult {
        self.transition(Phase::Done, "finish");
        ScenarioResult {
            name: self.scenario,
            checkpoints: self.checkpoints,
            fatal: None,
            duration: self.started.elapsed(),
        }
    }

    /// Close the journey after a fatal error
    #[must_use]
    pub fn abort(mut self, error: &ProbeError) -> ScenarioResult {
        tracing::error!(scenario = %self.scenario, phase = %self.phase, %error, "scenario aborted");
        self.transition(Phase::Done, "abort");
        ScenarioResult {
            name: self.scenario,
            checkpoints: self.checkpoints,
            fatal: Some(error.to_string()),
            duration: self.started.elapsed(),
        }
    }
}

/// Everything a scenario may touch: one isolated page, the API, settings
#[derive(Debug)]
pub struct ScenarioContext<'a, D: PageDriver + ?Sized> {
    /// Page of this scenario
    pub driver: &'a D,
    /// Locator strategies
    pub table: &'a StrategyTable,
    /// Run settings
    pub config: &'a HarnessConfig,
    /// Application API
    pub api: &'a ApiClient,
    /// Uniqueness token for generated identities
    pub token: i64,
}

impl<'a, D: PageDriver + ?Sized> ScenarioContext<'a, D> {
    /// Action primitives on this page
    #[must_use]
    pub fn actions(&self) -> Actions<'a, D> {
        Actions::new(self.driver, self.table, self.config)
    }

    /// Assertions on this page
    #[must_use]
    pub fn observer(&self) -> Observer<'a, D> {
        Observer::new(self.driver, self.table, self.config)
    }

    /// Session bootstrapper on this page
    #[must_use]
    pub fn bootstrapper(&self) -> SessionBootstrapper<'a, D> {
        SessionBootstrapper::new(self.driver, self.table, self.config, self.api)
    }

    /// Fresh user with a scenario prefix
    #[must_use]
    pub fn user(&self, prefix: &str) -> TestUser {
        TestUser::generate(prefix, self.token)
    }
}
