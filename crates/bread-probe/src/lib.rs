//! bread-probe: acceptance tests for the BREAD lifecycle of a calculation web app
//!
//! Drives registration, login and calculation Browse/Read/Edit/Add/Delete
//! journeys through the application's HTTP API and its rendered UI, and
//! grades each journey as a list of checkpoints.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   BREAD-PROBE Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Session    │    │ Actions    │            │
//! │   │ Harness    │───►│ Bootstrap  │───►│ + Resolver │──┐         │
//! │   └────────────┘    └────────────┘    └────────────┘  │         │
//! │         │                 │                           ▼         │
//! │         ▼                 ▼                    ┌────────────┐   │
//! │   ┌────────────┐    ┌────────────┐             │ PageDriver │   │
//! │   │ Assertions │    │ API client │             │ (CDP/mock) │   │
//! │   └────────────┘    └────────────┘             └────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! UI elements are looked up through ordered fallback strategies
//! ([`StrategyTable`]), so small markup differences in the application do
//! not break a run. Only a failed fixture aborts a scenario; everything else
//! is recorded on its [`ScenarioResult`].

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_frames))]

#[allow(clippy::missing_errors_doc)]
mod action;
#[allow(clippy::missing_errors_doc)]
mod api;
mod assertion;
mod browser;
#[allow(clippy::missing_errors_doc)]
mod config;
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod driver;
#[allow(clippy::missing_errors_doc)]
mod fixture;
mod harness;
mod locator;
mod model;
mod resolver;
mod result;
mod scenario;
pub mod scenarios;
mod wait;

pub use action::{ActionOutcome, Actions};
pub use api::{ApiClient, ApiError, ApiResponse};
pub use assertion::{AssertionResult, Observer, StatusClass, TextQuery, UrlPattern, Visibility};
#[cfg(feature = "browser")]
pub use browser::{Browser, CdpPage};
pub use browser::{BrowserConfig, PageSource};
pub use config::{CreationMode, HarnessConfig, InvalidInputPolicy, DEFAULT_BASE_URL};
pub use driver::{MatchMode, MockDriver, MockPage, PageDriver};
pub use fixture::{LandingSignal, LandingState, Session, SessionBootstrapper, DASHBOARD_PATH};
pub use harness::{Harness, SuiteResults};
pub use locator::{LocatorKind, SemanticTarget, Selector, Strategy, StrategyTable};
pub use model::{
    uniqueness_token, CalculationRequest, CalculationType, ExpectedCalculation, InputValue,
    SessionCredential, TestUser,
};
pub use resolver::{Attempt, Resolution, ResolvedHandle, Resolver};
pub use result::{FailureKind, ProbeError, ProbeResult};
pub use scenario::{Checkpoint, CheckpointOutcome, Journey, Phase, ScenarioContext, ScenarioResult};
pub use scenarios::ScenarioKind;
pub use wait::{poll_until, Observation, Polled, WaitOptions, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::action::*;
    pub use super::assertion::*;
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::driver::{MatchMode, MockDriver, PageDriver};
    pub use super::harness::*;
    pub use super::locator::{SemanticTarget, Selector, StrategyTable};
    pub use super::model::*;
    pub use super::result::*;
    pub use super::scenario::*;
    pub use super::scenarios::ScenarioKind;
}
