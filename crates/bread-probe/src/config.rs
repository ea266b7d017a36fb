//! Harness configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, a YAML file,
//! environment, command-line flags. This module owns the first two and the
//! validation; the CLI applies the rest.

use crate::browser::BrowserConfig;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default application under test
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8001";

/// How the `crud` scenario creates its first calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationMode {
    /// Through the dashboard form
    #[default]
    Ui,
    /// Through `POST /calculations` with the session credential
    Api,
}

/// How a missing validation message for invalid inputs is graded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidInputPolicy {
    /// Neither an error message nor an unchanged listing fails the scenario
    #[default]
    Strict,
    /// Same condition is reported as a warning
    Warn,
}

/// Everything a run needs to know about the target and the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root URL of the application
    pub base_url: String,
    /// Run without a visible window
    pub headless: bool,
    /// Chromium executable
    pub chromium_path: Option<String>,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Bound on waits for client-side transitions (ms)
    pub settle_timeout_ms: u64,
    /// Bound on each selector strategy attempt (ms)
    pub attempt_timeout_ms: u64,
    /// Bound on page navigation (ms)
    pub navigation_timeout_ms: u64,
    /// Interval between polls (ms)
    pub poll_interval_ms: u64,
    /// Bound on API requests (ms)
    pub api_timeout_ms: u64,
    /// `localStorage` key holding the bearer token
    pub token_key: String,
    /// First-calculation creation path
    pub creation_mode: CreationMode,
    /// Grading of invalid-input checks
    pub invalid_input_policy: InvalidInputPolicy,
    /// Scenarios run concurrently (`None` = all at once)
    pub jobs: Option<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 720,
            settle_timeout_ms: 7_000,
            attempt_timeout_ms: 1_500,
            navigation_timeout_ms: 10_000,
            poll_interval_ms: 100,
            api_timeout_ms: 10_000,
            token_key: "access_token".to_string(),
            creation_mode: CreationMode::Ui,
            invalid_input_policy: InvalidInputPolicy::Strict,
            jobs: None,
        }
    }
}

impl HarnessConfig {
    /// Create configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set settle timeout
    #[must_use]
    pub const fn with_settle_timeout(mut self, ms: u64) -> Self {
        self.settle_timeout_ms = ms;
        self
    }

    /// Set per-attempt timeout
    #[must_use]
    pub const fn with_attempt_timeout(mut self, ms: u64) -> Self {
        self.attempt_timeout_ms = ms;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set creation mode
    #[must_use]
    pub const fn with_creation_mode(mut self, mode: CreationMode) -> Self {
        self.creation_mode = mode;
        self
    }

    /// Set invalid-input policy
    #[must_use]
    pub const fn with_invalid_input_policy(mut self, policy: InvalidInputPolicy) -> Self {
        self.invalid_input_policy = policy;
        self
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> ProbeResult<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ProbeError::config("base URL must not be empty"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base URL must start with http:// or https://, got {base}"
            )));
        }
        for (name, value) in [
            ("settle_timeout_ms", self.settle_timeout_ms),
            ("attempt_timeout_ms", self.attempt_timeout_ms),
            ("navigation_timeout_ms", self.navigation_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("api_timeout_ms", self.api_timeout_ms),
        ] {
            if value == 0 {
                return Err(ProbeError::config(format!("{name} must be greater than zero")));
            }
        }
        if self.token_key.trim().is_empty() {
            return Err(ProbeError::config("token_key must not be empty"));
        }
        if self.jobs == Some(0) {
            return Err(ProbeError::config("jobs must be at least 1"));
        }
        Ok(())
    }

    /// Absolute URL for a path; absolute URLs pass through
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Wait options for client-side transitions
    #[must_use]
    pub const fn settle_wait(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.settle_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Wait options for one selector strategy
    #[must_use]
    pub const fn attempt_wait(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.attempt_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Navigation bound
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// API request bound
    #[must_use]
    pub const fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    /// Browser launch settings
    #[must_use]
    pub fn browser_config(&self) -> BrowserConfig {
        let mut config = BrowserConfig::default()
            .with_headless(self.headless)
            .with_viewport(self.viewport_width, self.viewport_height)
            .with_navigation_timeout(self.navigation_timeout_ms);
        if let Some(path) = &self.chromium_path {
            config = config.with_chromium_path(path);
        }
        if !self.sandbox {
            config = config.with_no_sandbox();
        }
        config
    }
}
