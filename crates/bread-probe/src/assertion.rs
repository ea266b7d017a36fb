//! Outcome assertions.
//!
//! Predicates over the URL, visible text and HTTP status. Page predicates
//! are polled with a bound; none of them mutate the page.

use crate::config::HarnessConfig;
use crate::driver::{MatchMode, PageDriver};
use crate::locator::{SemanticTarget, StrategyTable};
use crate::resolver::{Resolution, Resolver};
use crate::result::FailureKind;
use crate::wait::{poll_until, Observation, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of an assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Failure class when it did not
    pub failure: Option<FailureKind>,
    /// The predicate, human readable
    pub predicate: String,
    /// What was observed (empty on success)
    pub observed: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub fn pass(predicate: impl Into<String>) -> Self {
        Self {
            passed: true,
            failure: None,
            predicate: predicate.into(),
            observed: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(kind: FailureKind, predicate: impl Into<String>, observed: impl Into<String>) -> Self {
        Self {
            passed: false,
            failure: Some(kind),
            predicate: predicate.into(),
            observed: observed.into(),
        }
    }
}

/// URL pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/edit-calculation/*")
    Glob(String),
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
        }
    }

    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            match url[pos..].find(part) {
                Some(found) => {
                    if i == 0 && found != 0 {
                        return false;
                    }
                    pos += found + part.len();
                }
                None => return false,
            }
        }
        pattern.ends_with('*') || pos == url.len()
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Prefix(p) => write!(f, "url starts with {p}"),
            Self::Contains(p) => write!(f, "url contains {p}"),
            Self::Regex(p) => write!(f, "url matches /{p}/"),
            Self::Glob(p) => write!(f, "url matches {p}"),
        }
    }
}

/// Acceptable class of HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    /// Exactly this code
    Exactly(u16),
    /// Anything but this code
    Not(u16),
    /// 2xx
    Success,
    /// Anything but 2xx
    NotSuccess,
    /// 4xx
    ClientError,
}

impl StatusClass {
    /// Whether `status` belongs to this class
    #[must_use]
    pub const fn matches(&self, status: u16) -> bool {
        match self {
            Self::Exactly(code) => status == *code,
            Self::Not(code) => status != *code,
            Self::Success => status >= 200 && status < 300,
            Self::NotSuccess => !(status >= 200 && status < 300),
            Self::ClientError => status >= 400 && status < 500,
        }
    }

    /// Assert `status` belongs to this class
    #[must_use]
    pub fn check(&self, status: u16) -> AssertionResult {
        if self.matches(status) {
            AssertionResult::pass(self.to_string())
        } else {
            AssertionResult::fail(FailureKind::Assertion, self.to_string(), format!("status {status}"))
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(code) => write!(f, "status == {code}"),
            Self::Not(code) => write!(f, "status != {code}"),
            Self::Success => f.write_str("status is 2xx"),
            Self::NotSuccess => f.write_str("status is not 2xx"),
            Self::ClientError => f.write_str("status is 4xx"),
        }
    }
}

/// Text to look for on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuery {
    /// Text to match
    pub text: String,
    /// How to compare
    pub mode: MatchMode,
    /// Region to search in; whole page when `None`
    pub scope: Option<SemanticTarget>,
}

impl TextQuery {
    /// Element text equal to `text` (trimmed)
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Exact,
            scope: None,
        }
    }

    /// Element text containing `text`
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Contains,
            scope: None,
        }
    }

    /// Restrict to a region
    #[must_use]
    pub const fn within(mut self, scope: SemanticTarget) -> Self {
        self.scope = Some(scope);
        self
    }

    /// A calculation result inside the listing, matched exactly
    #[must_use]
    pub fn listed(text: impl Into<String>) -> Self {
        Self::exact(text).within(SemanticTarget::ListingRegion)
    }
}

impl fmt::Display for TextQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.mode {
            MatchMode::Exact => "text ==",
            MatchMode::Contains => "text contains",
        };
        write!(f, "{op} \"{}\"", self.text)?;
        if let Some(scope) = self.scope {
            write!(f, " in {scope}")?;
        }
        Ok(())
    }
}

/// Expected presence of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// At least one visible match
    Visible,
    /// No visible match
    Absent,
}

/// Read-only predicates over one page
#[derive(Debug)]
pub struct Observer<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    resolver: Resolver<'a, D>,
    poll_interval_ms: u64,
}

impl<'a, D: PageDriver + ?Sized> Observer<'a, D> {
    /// Observe a page
    #[must_use]
    pub fn new(driver: &'a D, table: &'a StrategyTable, config: &HarnessConfig) -> Self {
        Self {
            driver,
            resolver: Resolver::new(driver, table, config.attempt_wait()),
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    fn wait(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// URL eventually matches `pattern`
    pub async fn url(&self, pattern: &UrlPattern, timeout_ms: u64) -> AssertionResult {
        let polled = poll_until(&self.wait(timeout_ms), pattern.to_string(), || async {
            let url = self.driver.current_url().await?;
            Ok(if pattern.matches(&url) {
                Observation::Satisfied(url)
            } else {
                Observation::Unsatisfied(url)
            })
        })
        .await;
        if polled.is_satisfied() {
            AssertionResult::pass(pattern.to_string())
        } else {
            AssertionResult::fail(FailureKind::Timeout, pattern.to_string(), polled.observed)
        }
    }

    /// URL eventually stops matching `pattern`, or `target` shows up
    /// (whichever comes first). `target = None` waits on the URL only.
    pub async fn leaves(
        &self,
        pattern: &UrlPattern,
        target: Option<SemanticTarget>,
        timeout_ms: u64,
    ) -> AssertionResult {
        let shown = target
            .map(|t| self.resolver.selectors(t))
            .unwrap_or_default();
        let predicate = match target {
            Some(t) => format!("not ({pattern}) or {t} visible"),
            None => format!("not ({pattern})"),
        };
        let polled = poll_until(&self.wait(timeout_ms), predicate.clone(), || {
            let shown = &shown;
            async move {
                let url = self.driver.current_url().await?;
                if !pattern.matches(&url) {
                    return Ok(Observation::Satisfied(()));
                }
                for selector in shown {
                    if self.driver.visible_count(selector).await.unwrap_or(0) > 0 {
                        return Ok(Observation::Satisfied(()));
                    }
                }
                Ok(Observation::Unsatisfied(url))
            }
        })
        .await;
        if polled.is_satisfied() {
            AssertionResult::pass(predicate)
        } else {
            AssertionResult::fail(FailureKind::Timeout, predicate, polled.observed)
        }
    }

    /// Text eventually reaches the expected visibility
    pub async fn text(&self, query: &TextQuery, expect: Visibility, timeout_ms: u64) -> AssertionResult {
        let scope = query
            .scope
            .map(|target| self.resolver.selectors(target))
            .unwrap_or_default();
        let predicate = match expect {
            Visibility::Visible => format!("{query} visible"),
            Visibility::Absent => format!("{query} absent"),
        };
        let polled = poll_until(&self.wait(timeout_ms), predicate.clone(), || {
            let scope = &scope;
            async move {
                let count = self.driver.text_count(scope, &query.text, query.mode).await?;
                let holds = match expect {
                    Visibility::Visible => count > 0,
                    Visibility::Absent => count == 0,
                };
                Ok(if holds {
                    Observation::Satisfied(count)
                } else {
                    Observation::Unsatisfied(format!("{count} visible match(es)"))
                })
            }
        })
        .await;
        if polled.is_satisfied() {
            AssertionResult::pass(predicate)
        } else {
            AssertionResult::fail(FailureKind::Assertion, predicate, polled.observed)
        }
    }

    /// Target resolves to a rendered element through its strategy chain
    pub async fn present(&self, target: SemanticTarget) -> AssertionResult {
        let predicate = format!("{target} visible");
        match self.resolver.resolve_visible(target, 1).await {
            Resolution::Found(_) => AssertionResult::pass(predicate),
            not_found @ Resolution::NotFound { .. } => {
                AssertionResult::fail(FailureKind::Resolution, predicate, not_found.to_string())
            }
        }
    }

    /// Current rendered match count of a target, without waiting
    pub async fn count(&self, target: SemanticTarget) -> usize {
        self.resolver.count_now(target).await
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

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_variants() {
            let url = "http://127.0.0.1:8001/edit-calculation/abc";
            assert!(UrlPattern::Contains("/edit-calculation/".into()).matches(url));
            assert!(UrlPattern::Prefix("http://127.0.0.1:8001/".into()).matches(url));
            assert!(UrlPattern::Regex(r"/edit-calculation/\w+$".into()).matches(url));
            assert!(UrlPattern::Glob("*/edit-calculation/*".into()).matches(url));
            assert!(!UrlPattern::Exact("http://127.0.0.1:8001/".into()).matches(url));
        }

        #[test]
        fn test_glob_anchors_start() {
            assert!(!UrlPattern::Glob("login*".into()).matches("http://x/login"));
            assert!(UrlPattern::Glob("http://*/login".into()).matches("http://x/login"));
        }

        #[test]
        fn test_invalid_regex_never_matches() {
            assert!(!UrlPattern::Regex("(".into()).matches("anything"));
        }

        #[test]
        fn test_display() {
            assert_eq!(
                UrlPattern::Contains("/login".into()).to_string(),
                "url contains /login"
            );
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_classes() {
            assert!(StatusClass::Exactly(201).matches(201));
            assert!(StatusClass::Not(201).matches(400));
            assert!(!StatusClass::Not(201).matches(201));
            assert!(StatusClass::Success.matches(204));
            assert!(StatusClass::NotSuccess.matches(422));
            assert!(StatusClass::ClientError.matches(409));
            assert!(!StatusClass::ClientError.matches(500));
        }

        #[test]
        fn test_check_reports_observed() {
            let result = StatusClass::Not(201).check(201);
            assert!(!result.passed);
            assert_eq!(result.failure, Some(FailureKind::Assertion));
            assert_eq!(result.predicate, "status != 201");
            assert_eq!(result.observed, "status 201");
        }
    }

    mod text_query_tests {
        use super::*;

        #[test]
        fn test_listed_is_exact_and_scoped() {
            let query = TextQuery::listed("10");
            assert_eq!(query.mode, MatchMode::Exact);
            assert_eq!(query.scope, Some(SemanticTarget::ListingRegion));
            assert_eq!(query.to_string(), "text == \"10\" in calculation listing");
        }
    }

    mod observer_tests {
        use super::*;

        #[tokio::test]
        async fn test_url_redirect_observed() {
            let driver = MockDriver::new();
            let late = driver.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                late.state().url = "http://x/login".into();
            });
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let result = observer
                .url(&UrlPattern::Contains("/login".into()), 1_000)
                .await;
            assert!(result.passed);
        }

        #[tokio::test]
        async fn test_url_timeout_reports_last_url() {
            let driver = MockDriver::new();
            driver.state().url = "http://x/dashboard".into();
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let result = observer
                .url(&UrlPattern::Contains("/login".into()), 20)
                .await;
            assert!(!result.passed);
            assert_eq!(result.failure, Some(FailureKind::Timeout));
            assert_eq!(result.observed, "http://x/dashboard");
        }

        #[tokio::test]
        async fn test_leaves_by_url_or_target() {
            let driver = MockDriver::new();
            driver.state().url = "http://x/register".into();
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let register = UrlPattern::Contains("/register".into());

            let stuck = observer.leaves(&register, None, 20).await;
            assert!(!stuck.passed);
            assert_eq!(stuck.observed, "http://x/register");

            driver
                .state()
                .set_elements(Selector::css("#successAlert"), 1);
            let shown = observer
                .leaves(&register, Some(SemanticTarget::SuccessAlert), 20)
                .await;
            assert!(shown.passed, "{shown:?}");

            driver.state().url = "http://x/login".into();
            assert!(observer.leaves(&register, None, 20).await.passed);
        }

        #[tokio::test]
        async fn test_hidden_alert_does_not_leave_register_page() {
            let driver = MockDriver::new().with_hidden(Selector::css("#successAlert"), 1);
            driver.state().url = "http://x/register".into();
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let register = UrlPattern::Contains("/register".into());

            let result = observer
                .leaves(&register, Some(SemanticTarget::SuccessAlert), 20)
                .await;
            assert!(!result.passed);
            assert_eq!(result.failure, Some(FailureKind::Timeout));

            driver.state().reveal(&Selector::css("#successAlert"));
            let result = observer
                .leaves(&register, Some(SemanticTarget::SuccessAlert), 20)
                .await;
            assert!(result.passed, "{result:?}");
        }

        #[tokio::test]
        async fn test_hidden_error_banner_is_not_present() {
            let driver = MockDriver::new().with_hidden(Selector::css(".alert-danger"), 1);
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let result = observer.present(SemanticTarget::ValidationError).await;
            assert!(!result.passed);
            assert_eq!(result.failure, Some(FailureKind::Resolution));
        }

        #[tokio::test]
        async fn test_exact_text_does_not_match_superstring() {
            let driver = MockDriver::new().with_text("100");
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let visible = observer
                .text(&TextQuery::listed("10"), Visibility::Visible, 20)
                .await;
            assert!(!visible.passed);
            assert_eq!(visible.failure, Some(FailureKind::Assertion));
            let absent = observer
                .text(&TextQuery::listed("10"), Visibility::Absent, 20)
                .await;
            assert!(absent.passed);
        }

        #[tokio::test]
        async fn test_text_disappears() {
            let driver = MockDriver::new().with_text("16");
            let late = driver.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                late.state().hide_text("16");
            });
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            let result = observer
                .text(&TextQuery::listed("16"), Visibility::Absent, 1_000)
                .await;
            assert!(result.passed);
        }

        #[tokio::test]
        async fn test_present_and_count() {
            let driver = MockDriver::new()
                .with_elements(Selector::css(".calculations"), 1)
                .with_elements(Selector::css("table tbody tr"), 3);
            let table = StrategyTable::new();
            let config = config();
            let observer = Observer::new(&driver, &table, &config);
            assert!(observer.present(SemanticTarget::ListingRegion).await.passed);
            let missing = observer.present(SemanticTarget::ValidationError).await;
            assert_eq!(missing.failure, Some(FailureKind::Resolution));
            assert_eq!(observer.count(SemanticTarget::ListingRow).await, 3);
        }
    }

    proptest! {
        #[test]
        fn prop_success_and_not_success_partition(status in 100u16..600) {
            prop_assert_ne!(
                StatusClass::Success.matches(status),
                StatusClass::NotSuccess.matches(status)
            );
        }

        #[test]
        fn prop_exactly_and_not_partition(status in 100u16..600, code in 100u16..600) {
            prop_assert_ne!(
                StatusClass::Exactly(code).matches(status),
                StatusClass::Not(code).matches(status)
            );
        }
    }
}
