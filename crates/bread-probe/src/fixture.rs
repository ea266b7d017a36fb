//! Session bootstrapping: a registered, logged-in user on a fresh page.
//!
//! Registration goes through the API and must answer `201 Created`; that
//! is the one failure that aborts a scenario. Everything after it (UI
//! login, landing, token pickup) is recorded on the journey instead.

use crate::action::{ActionOutcome, Actions};
use crate::api::ApiClient;
use crate::assertion::AssertionResult;
use crate::config::HarnessConfig;
use crate::driver::PageDriver;
use crate::locator::{SemanticTarget, StrategyTable};
use crate::model::{SessionCredential, TestUser};
use crate::result::{FailureKind, ProbeError, ProbeResult};
use crate::scenario::Journey;
use crate::wait::{poll_until, Observation};
use serde::{Deserialize, Serialize};

/// Route of the authenticated landing area
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Name of the landing checkpoint
pub const LANDING_CHECKPOINT: &str = "authenticated landing reached";

/// What signalled a successful login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandingSignal {
    /// Success alert became visible
    SuccessAlert,
    /// URL reached the dashboard
    DashboardUrl,
}

/// Whether the authenticated area was reached after login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandingState {
    /// Reached, and how we could tell
    Reached(LandingSignal),
    /// Not reached within the settle timeout
    NotReached {
        /// Last URL seen
        observed: String,
    },
}

impl LandingState {
    /// Whether the landing was reached
    #[must_use]
    pub const fn is_reached(&self) -> bool {
        matches!(self, Self::Reached(_))
    }
}

/// A logged-in user on one page
#[derive(Debug, Clone)]
pub struct Session {
    /// The user
    pub user: TestUser,
    /// Bearer token picked up after login, if the page stored one
    pub credential: Option<SessionCredential>,
    /// Landing outcome
    pub landing: LandingState,
}

/// Creates users and sessions for a scenario
#[derive(Debug)]
pub struct SessionBootstrapper<'a, D: PageDriver + ?Sized> {
    actions: Actions<'a, D>,
    config: &'a HarnessConfig,
    api: &'a ApiClient,
}

impl<'a, D: PageDriver + ?Sized> SessionBootstrapper<'a, D> {
    /// Bootstrapper on one page
    #[must_use]
    pub fn new(
        driver: &'a D,
        table: &'a StrategyTable,
        config: &'a HarnessConfig,
        api: &'a ApiClient,
    ) -> Self {
        Self {
            actions: Actions::new(driver, table, config),
            config,
            api,
        }
    }

    /// Register `user` through the API, then log in through the UI.
    ///
    /// # Errors
    ///
    /// [`ProbeError::Fixture`] when registration does not answer 201 or the
    /// request itself fails.
    pub async fn create_authenticated_session(
        &self,
        user: TestUser,
        journey: &mut Journey,
    ) -> ProbeResult<Session> {
        journey.setup();
        self.register_via_api(&user).await?;
        let (landing, credential) = self.login(&user, journey).await;
        Ok(Session {
            user,
            credential,
            landing,
        })
    }

    /// Register through the API; anything but 201 is a fixture error.
    pub async fn register_via_api(&self, user: &TestUser) -> ProbeResult<()> {
        let response = self.api.register(user).await.map_err(|e| {
            ProbeError::fixture(format!("registration of {} failed: {e}", user.username))
        })?;
        response.ensure_status(201).map_err(|e| {
            ProbeError::fixture(format!("registration of {} rejected: {e}", user.username))
        })?;
        tracing::info!(username = %user.username, "user registered");
        Ok(())
    }

    /// Log in through the form, wait for the landing area, pick up the token.
    ///
    /// Records the landing checkpoint on `journey`.
    pub async fn login(
        &self,
        user: &TestUser,
        journey: &mut Journey,
    ) -> (LandingState, Option<SessionCredential>) {
        let outcome = self.submit_login_form(user).await;
        journey.action("submit login form", &outcome);

        let landing = self.await_landing().await;
        let result = match &landing {
            LandingState::Reached(_) => AssertionResult::pass(landing_predicate()),
            LandingState::NotReached { observed } => {
                AssertionResult::fail(FailureKind::Timeout, landing_predicate(), observed.clone())
            }
        };
        journey.check(LANDING_CHECKPOINT, result);

        let credential = self.pick_up_credential().await;
        if credential.is_none() {
            tracing::debug!(username = %user.username, key = %self.config.token_key, "no token in localStorage");
        }
        (landing, credential)
    }

    async fn submit_login_form(&self, user: &TestUser) -> ActionOutcome {
        let navigated = self.actions.navigate("/login").await;
        if !navigated.is_done() {
            return navigated;
        }
        for (target, value) in [
            (SemanticTarget::UsernameField, &user.username),
            (SemanticTarget::PasswordField, &user.password),
        ] {
            let outcome = self.actions.type_into(target, value).await;
            if !outcome.is_done() {
                return outcome;
            }
        }
        self.actions
            .click_first(&[
                SemanticTarget::LoginButton,
                SemanticTarget::SignInButton,
                SemanticTarget::SubmitButton,
            ])
            .await
    }

    /// First of: success alert visible, or URL on the dashboard
    pub async fn await_landing(&self) -> LandingState {
        let driver = self.actions.driver();
        let alert = self.actions.resolver().selectors(SemanticTarget::SuccessAlert);
        let polled = poll_until(&self.config.settle_wait(), landing_predicate(), || {
            let alert = &alert;
            async move {
                let url = driver.current_url().await?;
                if url.contains(DASHBOARD_PATH) {
                    return Ok(Observation::Satisfied(LandingSignal::DashboardUrl));
                }
                for selector in alert {
                    if driver.visible_count(selector).await.unwrap_or(0) > 0 {
                        return Ok(Observation::Satisfied(LandingSignal::SuccessAlert));
                    }
                }
                Ok(Observation::Unsatisfied(url))
            }
        })
        .await;
        match polled.value {
            Some(signal) => LandingState::Reached(signal),
            None => LandingState::NotReached {
                observed: polled.observed,
            },
        }
    }

    async fn pick_up_credential(&self) -> Option<SessionCredential> {
        let driver = self.actions.driver();
        let key = self.config.token_key.as_str();
        poll_until(&self.config.attempt_wait(), "session token", || async move {
            Ok(match driver.local_storage_item(key).await? {
                Some(token) if !token.is_empty() => Observation::Satisfied(SessionCredential::new(token)),
                _ => Observation::Unsatisfied("no token".to_string()),
            })
        })
        .await
        .value
    }

    /// Fill and submit the registration form.
    ///
    /// Username, email and password are required; the confirmation and
    /// name fields are filled when the form has them.
    pub async fn register_via_ui(&self, user: &TestUser) -> ActionOutcome {
        let navigated = self.actions.navigate("/register").await;
        if !navigated.is_done() {
            return navigated;
        }

        let required = [
            (SemanticTarget::UsernameField, user.username.as_str()),
            (SemanticTarget::EmailField, user.email.as_str()),
            (SemanticTarget::PasswordField, user.password.as_str()),
        ];
        for (target, value) in required {
            let outcome = self.actions.type_into(target, value).await;
            if !outcome.is_done() {
                return outcome;
            }
        }

        let optional = [
            (SemanticTarget::ConfirmPasswordField, user.password.as_str()),
            (SemanticTarget::FirstNameField, user.first_name.as_str()),
            (SemanticTarget::LastNameField, user.last_name.as_str()),
        ];
        for (target, value) in optional {
            let outcome = self.actions.type_into(target, value).await;
            if !outcome.is_done() {
                tracing::debug!(%target, "optional registration field skipped");
            }
        }

        self.actions
            .click_first(&[
                SemanticTarget::RegisterButton,
                SemanticTarget::SignUpButton,
                SemanticTarget::SubmitButton,
            ])
            .await
    }

    /// Visit `/logout`, then wipe storage and cookies
    pub async fn end_session(&self) -> ActionOutcome {
        let logout = self.actions.navigate("/logout").await;
        let cleared = self.actions.clear_session().await;
        if logout.is_done() {
            cleared
        } else {
            logout
        }
    }
}

fn landing_predicate() -> String {
    format!("success alert visible or url contains {DASHBOARD_PATH}")
}
