//! Action primitives: resolve a target, then interact with it.
//!
//! Every primitive returns an [`ActionOutcome`]. Failures are logged at
//! `warn` and handed back; the caller decides whether they matter.

use crate::config::HarnessConfig;
use crate::driver::PageDriver;
use crate::locator::{LocatorKind, SemanticTarget, StrategyTable};
use crate::resolver::{ResolvedHandle, Resolution, Resolver};
use crate::result::FailureKind;
use futures::future::{select_ok, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Action completed
    Done {
        /// What was done, and through which strategy
        detail: String,
    },
    /// Action did not complete
    Failed {
        /// Failure class
        kind: FailureKind,
        /// What went wrong
        detail: String,
    },
}

impl ActionOutcome {
    fn done(detail: impl Into<String>) -> Self {
        Self::Done {
            detail: detail.into(),
        }
    }

    fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::warn!(%kind, %detail, "action failed");
        Self::Failed { kind, detail }
    }

    /// Whether the action completed
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Failure class, if failed
    #[must_use]
    pub const fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Done { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Detail text
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Done { detail } | Self::Failed { detail, .. } => detail,
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done { detail } => write!(f, "done: {detail}"),
            Self::Failed { kind, detail } => write!(f, "{kind} failure: {detail}"),
        }
    }
}

/// Action primitives bound to one page
#[derive(Debug)]
pub struct Actions<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    config: &'a HarnessConfig,
    resolver: Resolver<'a, D>,
}

impl<'a, D: PageDriver + ?Sized> Actions<'a, D> {
    /// Bind primitives to a page
    #[must_use]
    pub fn new(driver: &'a D, table: &'a StrategyTable, config: &'a HarnessConfig) -> Self {
        Self {
            driver,
            config,
            resolver: Resolver::new(driver, table, config.attempt_wait()),
        }
    }

    /// Resolver used by these primitives
    #[must_use]
    pub const fn resolver(&self) -> &Resolver<'a, D> {
        &self.resolver
    }

    /// Page driven by these primitives
    #[must_use]
    pub const fn driver(&self) -> &'a D {
        self.driver
    }

    /// Go to a base-relative path or absolute URL
    pub async fn navigate(&self, path: &str) -> ActionOutcome {
        let url = self.config.url(path);
        let bound = self.config.navigation_timeout();
        match tokio::time::timeout(bound, self.driver.goto(&url)).await {
            Ok(Ok(())) => ActionOutcome::done(format!("navigated to {url}")),
            Ok(Err(e)) => ActionOutcome::failed(FailureKind::Interaction, e.to_string()),
            Err(_) => ActionOutcome::failed(
                FailureKind::Timeout,
                format!("navigation to {url} exceeded {}ms", bound.as_millis()),
            ),
        }
    }

    async fn found(&self, target: SemanticTarget, required: usize) -> Result<ResolvedHandle, ActionOutcome> {
        match self.resolver.resolve(target, required).await {
            Resolution::Found(handle) => Ok(handle),
            not_found @ Resolution::NotFound { .. } => Err(ActionOutcome::failed(
                FailureKind::Resolution,
                not_found.to_string(),
            )),
        }
    }

    /// Fill a single field
    pub async fn type_into(&self, target: SemanticTarget, value: &str) -> ActionOutcome {
        let handle = match self.found(target, 1).await {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };
        match self.driver.fill(handle.selector(), 0, value).await {
            Ok(()) => ActionOutcome::done(format!("filled {target} via {}", handle.strategy)),
            Err(e) => ActionOutcome::failed(FailureKind::Interaction, format!("{target}: {e}")),
        }
    }

    /// Fill element `i` with value `i`, or one joined field with all values
    pub async fn type_values(&self, target: SemanticTarget, values: &[String]) -> ActionOutcome {
        let handle = match self.found(target, values.len()).await {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };

        if handle.is_joined() {
            let joined = values.join(LocatorKind::JOIN_SEPARATOR);
            return match self.driver.fill(handle.selector(), 0, &joined).await {
                Ok(()) => ActionOutcome::done(format!(
                    "filled {target} with joined \"{joined}\" via {}",
                    handle.strategy
                )),
                Err(e) => {
                    ActionOutcome::failed(FailureKind::Interaction, format!("{target}: {e}"))
                }
            };
        }

        for (index, value) in values.iter().enumerate() {
            if let Err(e) = self.driver.fill(handle.selector(), index, value).await {
                return ActionOutcome::failed(
                    FailureKind::Interaction,
                    format!("{target} #{index}: {e}"),
                );
            }
        }
        ActionOutcome::done(format!(
            "filled {} {target} via {}",
            values.len(),
            handle.strategy
        ))
    }

    /// Select an option by value or label
    pub async fn choose(&self, target: SemanticTarget, value: &str) -> ActionOutcome {
        let handle = match self.found(target, 1).await {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };
        match self.driver.select_option(handle.selector(), 0, value).await {
            Ok(true) => ActionOutcome::done(format!("chose {value} in {target}")),
            Ok(false) => ActionOutcome::failed(
                FailureKind::Interaction,
                format!("{target} has no option {value}"),
            ),
            Err(e) => ActionOutcome::failed(FailureKind::Interaction, format!("{target}: {e}")),
        }
    }

    /// Click a target
    pub async fn click(&self, target: SemanticTarget) -> ActionOutcome {
        let handle = match self.found(target, 1).await {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };
        self.click_handle(&handle).await
    }

    async fn click_handle(&self, handle: &ResolvedHandle) -> ActionOutcome {
        match self.driver.click(handle.selector(), 0).await {
            Ok(()) => ActionOutcome::done(format!("clicked {} via {}", handle.target, handle.strategy)),
            Err(e) => {
                ActionOutcome::failed(FailureKind::Interaction, format!("{}: {e}", handle.target))
            }
        }
    }

    /// Click whichever of several equivalent targets resolves first.
    ///
    /// All candidates are resolved concurrently. Exactly one click is
    /// issued; the losing lookups are dropped.
    pub async fn click_first(&self, targets: &[SemanticTarget]) -> ActionOutcome {
        if targets.is_empty() {
            return ActionOutcome::failed(FailureKind::Resolution, "no candidate targets");
        }

        let lookups: Vec<BoxFuture<'_, Result<ResolvedHandle, Resolution>>> = targets
            .iter()
            .map(|&target| {
                async move {
                    match self.resolver.resolve(target, 1).await {
                        Resolution::Found(handle) => Ok(handle),
                        not_found @ Resolution::NotFound { .. } => Err(not_found),
                    }
                }
                .boxed()
            })
            .collect();

        match select_ok(lookups).await {
            Ok((handle, _rest)) => self.click_handle(&handle).await,
            Err(_) => {
                let names: Vec<&str> = targets.iter().map(SemanticTarget::label).collect();
                ActionOutcome::failed(
                    FailureKind::Resolution,
                    format!("none of [{}] resolved", names.join(", ")),
                )
            }
        }
    }

    /// Auto-accept confirmation dialogs on this page
    pub async fn accept_dialogs(&self) -> ActionOutcome {
        match self.driver.accept_dialogs().await {
            Ok(()) => ActionOutcome::done("dialogs auto-accepted"),
            Err(e) => ActionOutcome::failed(FailureKind::Interaction, e.to_string()),
        }
    }

    /// Wipe web storage and cookies of this page
    pub async fn clear_session(&self) -> ActionOutcome {
        match self.driver.clear_session_state().await {
            Ok(()) => ActionOutcome::done("session state cleared"),
            Err(e) => ActionOutcome::failed(FailureKind::Interaction, e.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::locator::Selector;
    use proptest::prelude::*;
    use std::time::Duration;

    fn config() -> HarnessConfig {
        HarnessConfig::default()
            .with_attempt_timeout(20)
            .with_poll_interval(5)
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_accessors() {
            let done = ActionOutcome::done("ok");
            assert!(done.is_done());
            assert_eq!(done.failure(), None);
            let failed = ActionOutcome::failed(FailureKind::Timeout, "slow");
            assert_eq!(failed.failure(), Some(FailureKind::Timeout));
            assert_eq!(failed.detail(), "slow");
            assert_eq!(failed.to_string(), "timeout failure: slow");
        }
    }

    mod typing_tests {
        use super::*;

        #[tokio::test]
        async fn test_type_into_resolves_and_fills() {
            let sel = Selector::css("input#password");
            let driver = MockDriver::new().with_elements(sel.clone(), 1);
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            let outcome = actions.type_into(SemanticTarget::PasswordField, "pw").await;
            assert!(outcome.is_done(), "{outcome}");
            assert_eq!(driver.value_of(&sel, 0).as_deref(), Some("pw"));
        }

        #[tokio::test]
        async fn test_type_into_missing_is_resolution_failure() {
            let driver = MockDriver::new();
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            let outcome = actions.type_into(SemanticTarget::EmailField, "a@b").await;
            assert_eq!(outcome.failure(), Some(FailureKind::Resolution));
        }

        #[tokio::test]
        async fn test_type_values_fills_in_order() {
            let sel = Selector::css("input[name=\"inputs[]\"]");
            let driver = MockDriver::new().with_elements(sel.clone(), 2);
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            let values = vec!["7".to_string(), "3".to_string()];
            let outcome = actions.type_values(SemanticTarget::CalculationInputs, &values).await;
            assert!(outcome.is_done());
            assert_eq!(driver.value_of(&sel, 0).as_deref(), Some("7"));
            assert_eq!(driver.value_of(&sel, 1).as_deref(), Some("3"));
        }

        #[tokio::test]
        async fn test_type_values_joined_fallback() {
            let sel = Selector::css("input[name=\"inputs\"]");
            let driver = MockDriver::new().with_elements(sel.clone(), 1);
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            let values = vec!["8".to_string(), "2".to_string()];
            let outcome = actions.type_values(SemanticTarget::CalculationInputs, &values).await;
            assert!(outcome.is_done(), "{outcome}");
            assert!(outcome.detail().contains("joined"));
            assert_eq!(driver.value_of(&sel, 0).as_deref(), Some("8,2"));
        }
    }

    mod click_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_first_clicks_exactly_one() {
            let login = Selector::css_with_text("button", "Login");
            let submit = Selector::css("button[type=\"submit\"]");
            let driver = MockDriver::new()
                .with_elements(login, 1)
                .with_elements(submit, 1);
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            let outcome = actions
                .click_first(&[
                    SemanticTarget::LoginButton,
                    SemanticTarget::SignInButton,
                    SemanticTarget::SubmitButton,
                ])
                .await;
            assert!(outcome.is_done());
            let clicks = driver
                .history()
                .iter()
                .filter(|c| c.starts_with("click:"))
                .count();
            assert_eq!(clicks, 1);
        }

        #[tokio::test]
        async fn test_click_first_late_candidate_wins() {
            let driver = MockDriver::new();
            let late = driver.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                late.state()
                    .set_elements(Selector::css_with_text("button", "Sign in"), 1);
            });
            let table = StrategyTable::new();
            let config = HarnessConfig::default()
                .with_attempt_timeout(1_000)
                .with_poll_interval(5);
            let actions = Actions::new(&driver, &table, &config);
            let outcome = actions
                .click_first(&[SemanticTarget::LoginButton, SemanticTarget::SignInButton])
                .await;
            assert!(outcome.detail().contains("sign in button"), "{outcome}");
        }

        #[tokio::test]
        async fn test_click_first_none_resolves() {
            let driver = MockDriver::new();
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            let outcome = actions
                .click_first(&[SemanticTarget::UpdateButton, SemanticTarget::SaveButton])
                .await;
            assert_eq!(outcome.failure(), Some(FailureKind::Resolution));
            assert!(outcome.detail().contains("update button"));
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test]
        async fn test_click_first_empty() {
            let driver = MockDriver::new();
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            assert!(!actions.click_first(&[]).await.is_done());
        }

        #[tokio::test]
        async fn test_choose_by_label() {
            let sel = Selector::css("select[name=\"type\"]");
            let driver = MockDriver::new()
                .with_elements(sel.clone(), 1)
                .with_options(sel, &["addition", "multiplication"]);
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            assert!(actions
                .choose(SemanticTarget::CalculationTypeSelect, "multiplication")
                .await
                .is_done());
            let missing = actions
                .choose(SemanticTarget::CalculationTypeSelect, "power")
                .await;
            assert_eq!(missing.failure(), Some(FailureKind::Interaction));
        }
    }

    mod page_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_joins_base_url() {
            let driver = MockDriver::new();
            let table = StrategyTable::new();
            let config = config().with_base_url("http://app:8001");
            let actions = Actions::new(&driver, &table, &config);
            assert!(actions.navigate("/login").await.is_done());
            assert!(driver.was_called("goto:http://app:8001/login"));
        }

        #[tokio::test]
        async fn test_session_helpers() {
            let driver = MockDriver::new();
            let table = StrategyTable::new();
            let config = config();
            let actions = Actions::new(&driver, &table, &config);
            assert!(actions.accept_dialogs().await.is_done());
            assert!(actions.clear_session().await.is_done());
            assert!(driver.was_called("accept_dialogs"));
            assert!(driver.was_called("clear_session"));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_joined_fill_preserves_order(values in proptest::collection::vec("[0-9]{1,4}", 1..6)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let sel = Selector::css("input[name=\"inputs\"]");
            let driver = MockDriver::new().with_elements(sel.clone(), 1);
            let table = StrategyTable::new();
            let config = config().with_attempt_timeout(1);
            let outcome = runtime.block_on(async {
                Actions::new(&driver, &table, &config)
                    .type_values(SemanticTarget::CalculationInputs, &values)
                    .await
            });
            prop_assert!(outcome.is_done());
            let filled = driver.value_of(&sel, 0).unwrap();
            let split: Vec<String> = filled.split(',').map(ToString::to_string).collect();
            prop_assert_eq!(split, values);
        }
    }
}
