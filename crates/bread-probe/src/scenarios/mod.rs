//! The fixed set of user journeys.

mod auth;
mod crud;
pub mod flows;
mod negative;
mod registration;

use crate::driver::PageDriver;
use crate::result::ProbeResult;
use crate::scenario::{Journey, ScenarioContext, ScenarioResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A journey the harness knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Register and log in; duplicate and malformed registrations
    Auth,
    /// Add, browse, read, edit and delete a calculation
    Crud,
    /// Invalid inputs and unauthenticated access
    Negative,
    /// Registration through the UI form
    Registration,
}

impl ScenarioKind {
    /// Every scenario, in report order
    pub const ALL: [Self; 4] = [Self::Auth, Self::Crud, Self::Negative, Self::Registration];

    /// Name used in reports and `--filter`
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Crud => "crud",
            Self::Negative => "negative",
            Self::Registration => "registration",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Auth => "register and login, duplicate and malformed email rejected",
            Self::Crud => "add, browse, read, edit and delete a calculation",
            Self::Negative => "invalid inputs rejected, protected routes redirect to login",
            Self::Registration => "registration form creates a user who can log in",
        }
    }

    /// Username stem for generated users
    #[must_use]
    pub const fn user_prefix(&self) -> &'static str {
        match self {
            Self::Auth => "e2e_user",
            Self::Crud => "e2e_calc",
            Self::Negative => "e2e_neg",
            Self::Registration => "e2e_reg",
        }
    }

    /// Scenarios whose name contains `filter`; all when `None`
    #[must_use]
    pub fn select(filter: Option<&str>) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|kind| filter.map_or(true, |f| kind.name().contains(f)))
            .collect()
    }

    async fn journey<D: PageDriver + ?Sized>(
        self,
        ctx: &ScenarioContext<'_, D>,
        journey: &mut Journey,
    ) -> ProbeResult<()> {
        match self {
            Self::Auth => auth::run(ctx, journey).await,
            Self::Crud => crud::run(ctx, journey).await,
            Self::Negative => negative::run(ctx, journey).await,
            Self::Registration => registration::run(ctx, journey).await,
        }
    }

    /// Run the scenario to completion and report it
    pub async fn execute<D: PageDriver + ?Sized>(self, ctx: &ScenarioContext<'_, D>) -> ScenarioResult {
        tracing::info!(scenario = self.name(), "scenario started");
        let mut journey = Journey::new(self.name());
        let result = match self.journey(ctx, &mut journey).await {
            Ok(()) => journey.finish(),
            Err(e) => journey.abort(&e),
        };
        tracing::info!(
            scenario = self.name(),
            passed = result.passed(),
            checkpoints = result.checkpoints.len(),
            "scenario finished"
        );
        result
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown scenario: {s}"))
    }
}
