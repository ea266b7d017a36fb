//! Result and error types for bread-probe.
//!
//! Only [`ProbeError::Fixture`] aborts a scenario. Every other failure met
//! while a journey runs is turned into data on the scenario report (see
//! [`FailureKind`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for bread-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Non-fatal failure recorded on an action or checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// No locator strategy matched
    Resolution,
    /// Element found but the interaction failed
    Interaction,
    /// Condition not reached within its bound
    Timeout,
    /// Observed state contradicts the acceptance condition
    Assertion,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolution => "resolution",
            Self::Interaction => "interaction",
            Self::Timeout => "timeout",
            Self::Assertion => "assertion",
        })
    }
}

/// Errors that can occur in bread-probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Scenario fixture (user, session) could not be created
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Browser support was not compiled in
    #[error("Browser feature not enabled. Rebuild with --features browser")]
    BrowserUnavailable,

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// In-page script evaluation failed
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// No element at the requested position
    #[error("No element #{index} for {selector}")]
    ElementNotFound {
        /// Selector description
        selector: String,
        /// Element index that was requested
        index: usize,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Application API failure
    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Whether this error must abort the scenario it happened in
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fixture { .. })
    }
}
