//! `PageDriver` - the seam between the scenario engine and a browser page.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait)                                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐        ┌─────────────────────────┐ │
//! │  │  CdpPage             │        │  MockDriver             │ │
//! │  │  (feature "browser") │        │  (unit tests)           │ │
//! │  │  chromiumoxide, one  │        │  in-memory page state,  │ │
//! │  │  browser context     │        │  scripted click effects │ │
//! │  └──────────────────────┘        └─────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All methods take `&self` so several lookups can be in flight on the same
//! page at once (see [`crate::action::Actions::click_first`]).

#[cfg(feature = "browser")]
use crate::locator::{js_str, VISIBLE_TEST};
use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How visible text is compared against a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// Trimmed element text equals the query
    #[default]
    Exact,
    /// Element text contains the query
    Contains,
}

impl MatchMode {
    /// Compare one piece of rendered text
    #[must_use]
    pub fn matches(&self, rendered: &str, query: &str) -> bool {
        match self {
            Self::Exact => rendered.trim() == query,
            Self::Contains => rendered.contains(query),
        }
    }
}

/// Browser page operations used by the engine
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &Selector) -> ProbeResult<usize>;

    /// Number of matching elements that are rendered (non-empty box).
    /// Elements hidden by CSS or the `hidden` attribute are not counted.
    async fn visible_count(&self, selector: &Selector) -> ProbeResult<usize>;

    /// Replace the value of the `index`-th match
    async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()>;

    /// Click the `index`-th match
    async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()>;

    /// Select an option of the `index`-th match by value or label
    /// (case-insensitive). Returns `false` when no option matched.
    async fn select_option(
        &self,
        selector: &Selector,
        index: usize,
        value: &str,
    ) -> ProbeResult<bool>;

    /// Number of visible elements whose text matches `text`.
    ///
    /// When `scope` is non-empty only elements inside the first scope
    /// selector that exists on the page are considered.
    async fn text_count(&self, scope: &[Selector], text: &str, mode: MatchMode)
        -> ProbeResult<usize>;

    /// Read a `localStorage` entry
    async fn local_storage_item(&self, key: &str) -> ProbeResult<Option<String>>;

    /// Clear `localStorage`, `sessionStorage` and this page's cookies
    async fn clear_session_state(&self) -> ProbeResult<()>;

    /// Auto-accept `confirm` and `alert` dialogs from now on
    async fn accept_dialogs(&self) -> ProbeResult<()>;

    /// Release the page
    async fn close(&self) -> ProbeResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<D: PageDriver + ?Sized> PageDriver for Box<D> {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        (**self).goto(url).await
    }

    async fn current_url(&self) -> ProbeResult<String> {
        (**self).current_url().await
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        (**self).count(selector).await
    }

    async fn visible_count(&self, selector: &Selector) -> ProbeResult<usize> {
        (**self).visible_count(selector).await
    }

    async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()> {
        (**self).fill(selector, index, value).await
    }

    async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()> {
        (**self).click(selector, index).await
    }

    async fn select_option(
        &self,
        selector: &Selector,
        index: usize,
        value: &str,
    ) -> ProbeResult<bool> {
        (**self).select_option(selector, index, value).await
    }

    async fn text_count(
        &self,
        scope: &[Selector],
        text: &str,
        mode: MatchMode,
    ) -> ProbeResult<usize> {
        (**self).text_count(scope, text, mode).await
    }

    async fn local_storage_item(&self, key: &str) -> ProbeResult<Option<String>> {
        (**self).local_storage_item(key).await
    }

    async fn clear_session_state(&self) -> ProbeResult<()> {
        (**self).clear_session_state().await
    }

    async fn accept_dialogs(&self) -> ProbeResult<()> {
        (**self).accept_dialogs().await
    }

    async fn close(&self) -> ProbeResult<()> {
        (**self).close().await
    }
}

// ============================================================================
// In-page scripts shared by real drivers
// ============================================================================

#[cfg(feature = "browser")]
/// Script setting the value of the `index`-th match; evaluates to `false`
/// when there is no such element.
#[must_use]
pub fn fill_script(selector: &Selector, index: usize, value: &str) -> String {
    format!(
        "(() => {{ const el = {all}[{index}]; if (!el) return false; el.focus(); \
         const proto = Object.getPrototypeOf(el); \
         const desc = Object.getOwnPropertyDescriptor(proto, 'value'); \
         if (desc && desc.set) {{ desc.set.call(el, {v}); }} else {{ el.value = {v}; }} \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         return true; }})()",
        all = selector.to_all_query(),
        v = js_str(value),
    )
}

#[cfg(feature = "browser")]
/// Script clicking the `index`-th match
#[must_use]
pub fn click_script(selector: &Selector, index: usize) -> String {
    format!(
        "(() => {{ const el = {all}[{index}]; if (!el) return false; \
         el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})()",
        all = selector.to_all_query(),
    )
}

#[cfg(feature = "browser")]
/// Script choosing an option by value or case-insensitive label; evaluates
/// to `null` without an element, otherwise whether an option matched.
#[must_use]
pub fn select_script(selector: &Selector, index: usize, value: &str) -> String {
    format!(
        "(() => {{ const el = {all}[{index}]; if (!el) return null; \
         const want = {v}.toLowerCase(); \
         const opt = Array.from(el.options || []).find(o => \
           o.value.toLowerCase() === want || o.label.trim().toLowerCase() === want); \
         if (!opt) return false; el.value = opt.value; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         return true; }})()",
        all = selector.to_all_query(),
        v = js_str(value),
    )
}

#[cfg(feature = "browser")]
/// Script counting visible elements whose text matches
#[must_use]
pub fn text_count_script(scope: &[Selector], text: &str, mode: MatchMode) -> String {
    let roots = if scope.is_empty() {
        "[document.body]".to_string()
    } else {
        let candidates: Vec<String> = scope.iter().map(Selector::to_all_query).collect();
        format!(
            "(() => {{ for (const found of [{}]) {{ if (found.length) return found; }} return []; }})()",
            candidates.join(", ")
        )
    };
    let test = match mode {
        MatchMode::Exact => "(el.innerText || '').trim() === want",
        MatchMode::Contains => {
            "(el.innerText || '').includes(want) && \
             !Array.from(el.children).some(c => (c.innerText || '').includes(want))"
        }
    };
    format!(
        "(() => {{ const want = {w}; const roots = {roots}; let n = 0; \
         for (const root of roots) {{ \
           for (const el of [root, ...root.querySelectorAll('*')]) {{ \
             if (!{VISIBLE_TEST}) continue; \
             if ({test}) n++; }} }} \
         return n; }})()",
        w = js_str(text),
    )
}

#[cfg(feature = "browser")]
/// Script auto-accepting dialogs
pub const ACCEPT_DIALOGS_SCRIPT: &str =
    "window.confirm = () => true; window.alert = () => {}; true";

#[cfg(feature = "browser")]
/// Script clearing web storage
pub const CLEAR_STORAGE_SCRIPT: &str =
    "(() => { try { localStorage.clear(); sessionStorage.clear(); } catch (e) {} return true; })()";

// ============================================================================
// Mock Driver
// ============================================================================

/// Effect applied to the mock page when an element is clicked
pub type ClickEffect = Arc<dyn Fn(&mut MockPage) + Send + Sync>;

/// In-memory page state behind a [`MockDriver`]
#[derive(Default)]
pub struct MockPage {
    /// Current URL
    pub url: String,
    /// Elements present on the page, by selector
    pub elements: HashMap<Selector, usize>,
    /// Visible text pieces, one per element
    pub texts: Vec<String>,
    /// `localStorage`
    pub local_storage: HashMap<String, String>,
    /// Values written through `fill`, keyed by selector and index
    pub values: HashMap<(Selector, usize), String>,
    /// Options chosen through `select_option`
    pub selections: HashMap<Selector, String>,
    /// Options offered by select elements
    pub options: HashMap<Selector, Vec<String>>,
    /// How many of the matches of a selector are in the DOM but not rendered
    pub hidden: HashMap<Selector, usize>,
    /// Selectors whose lookup errors
    pub broken: HashSet<Selector>,
    /// Whether dialogs are auto-accepted
    pub dialogs_accepted: bool,
    /// Call history for verification
    pub history: Vec<String>,
    on_click: HashMap<Selector, ClickEffect>,
    on_goto: Vec<(String, ClickEffect)>,
}

impl fmt::Debug for MockPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPage")
            .field("url", &self.url)
            .field("elements", &self.elements)
            .field("texts", &self.texts)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl MockPage {
    /// Put `count` elements matching `selector` on the page
    pub fn set_elements(&mut self, selector: Selector, count: usize) {
        if count == 0 {
            self.elements.remove(&selector);
        } else {
            self.elements.insert(selector, count);
        }
    }

    /// Put `count` elements matching `selector` in the DOM without
    /// rendering them (`display: none`, `hidden`)
    pub fn set_hidden(&mut self, selector: Selector, count: usize) {
        let visible = self.visible(&selector);
        self.set_elements(selector.clone(), visible + count);
        if count == 0 {
            self.hidden.remove(&selector);
        } else {
            self.hidden.insert(selector, count);
        }
    }

    /// Render every hidden match of `selector`
    pub fn reveal(&mut self, selector: &Selector) {
        self.hidden.remove(selector);
    }

    /// Rendered matches of `selector`
    #[must_use]
    pub fn visible(&self, selector: &Selector) -> usize {
        let total = self.elements.get(selector).copied().unwrap_or(0);
        total.saturating_sub(self.hidden.get(selector).copied().unwrap_or(0))
    }

    /// Show a piece of text
    pub fn show_text(&mut self, text: impl Into<String>) {
        self.texts.push(text.into());
    }

    /// Remove every piece of text equal to `text`
    pub fn hide_text(&mut self, text: &str) {
        self.texts.retain(|t| t != text);
    }
}

/// Scriptable in-memory [`PageDriver`] for tests.
///
/// Cloning shares the page, so a test can keep a handle and mutate the page
/// while the engine drives it.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    page: Arc<Mutex<MockPage>>,
}

impl MockDriver {
    /// Create an empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let driver = Self::default();
        driver.state().url = "about:blank".to_string();
        driver
    }

    /// Lock the page state
    pub fn state(&self) -> MutexGuard<'_, MockPage> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder: put elements on the page
    #[must_use]
    pub fn with_elements(self, selector: Selector, count: usize) -> Self {
        self.state().set_elements(selector, count);
        self
    }

    /// Builder: put unrendered elements in the DOM
    #[must_use]
    pub fn with_hidden(self, selector: Selector, count: usize) -> Self {
        self.state().set_hidden(selector, count);
        self
    }

    /// Builder: show text
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.state().show_text(text);
        self
    }

    /// Builder: offer options on a select
    #[must_use]
    pub fn with_options(self, selector: Selector, options: &[&str]) -> Self {
        self.state()
            .options
            .insert(selector, options.iter().map(ToString::to_string).collect());
        self
    }

    /// Builder: make lookups of `selector` fail
    #[must_use]
    pub fn with_broken(self, selector: Selector) -> Self {
        self.state().broken.insert(selector);
        self
    }

    /// Run `effect` whenever `selector` is clicked
    #[must_use]
    pub fn on_click(self, selector: Selector, effect: impl Fn(&mut MockPage) + Send + Sync + 'static) -> Self {
        self.state().on_click.insert(selector, Arc::new(effect));
        self
    }

    /// Run `effect` after navigating to a URL containing `fragment`
    #[must_use]
    pub fn on_goto(self, fragment: impl Into<String>, effect: impl Fn(&mut MockPage) + Send + Sync + 'static) -> Self {
        self.state().on_goto.push((fragment.into(), Arc::new(effect)));
        self
    }

    /// Snapshot of the call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Value filled into the `index`-th match of `selector`
    #[must_use]
    pub fn value_of(&self, selector: &Selector, index: usize) -> Option<String> {
        self.state().values.get(&(selector.clone(), index)).cloned()
    }

    fn present(page: &MockPage, selector: &Selector, index: usize) -> ProbeResult<()> {
        if page.broken.contains(selector) {
            return Err(ProbeError::script(format!("lookup of {selector} failed")));
        }
        if page.elements.get(selector).copied().unwrap_or(0) > index {
            Ok(())
        } else {
            Err(ProbeError::ElementNotFound {
                selector: selector.to_string(),
                index,
            })
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let mut page = self.state();
        page.history.push(format!("goto:{url}"));
        page.url = url.to_string();
        let effects: Vec<ClickEffect> = page
            .on_goto
            .iter()
            .filter(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, effect)| Arc::clone(effect))
            .collect();
        for effect in effects {
            effect(&mut *page);
        }
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.state().url.clone())
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        let page = self.state();
        if page.broken.contains(selector) {
            return Err(ProbeError::script(format!("lookup of {selector} failed")));
        }
        Ok(page.elements.get(selector).copied().unwrap_or(0))
    }

    async fn visible_count(&self, selector: &Selector) -> ProbeResult<usize> {
        let page = self.state();
        if page.broken.contains(selector) {
            return Err(ProbeError::script(format!("lookup of {selector} failed")));
        }
        Ok(page.visible(selector))
    }

    async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()> {
        let mut page = self.state();
        Self::present(&page, selector, index)?;
        page.history.push(format!("fill:{selector}[{index}]={value}"));
        page.values.insert((selector.clone(), index), value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()> {
        let mut page = self.state();
        Self::present(&page, selector, index)?;
        page.history.push(format!("click:{selector}[{index}]"));
        if let Some(effect) = page.on_click.get(selector).cloned() {
            effect(&mut *page);
        }
        Ok(())
    }

    async fn select_option(
        &self,
        selector: &Selector,
        index: usize,
        value: &str,
    ) -> ProbeResult<bool> {
        let mut page = self.state();
        Self::present(&page, selector, index)?;
        page.history.push(format!("select:{selector}[{index}]={value}"));
        let wanted = value.to_lowercase();
        let chosen = page
            .options
            .get(selector)
            .and_then(|opts| opts.iter().find(|o| o.to_lowercase() == wanted).cloned());
        match chosen {
            Some(option) => {
                page.selections.insert(selector.clone(), option);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn text_count(
        &self,
        _scope: &[Selector],
        text: &str,
        mode: MatchMode,
    ) -> ProbeResult<usize> {
        let page = self.state();
        Ok(page.texts.iter().filter(|t| mode.matches(t, text)).count())
    }

    async fn local_storage_item(&self, key: &str) -> ProbeResult<Option<String>> {
        Ok(self.state().local_storage.get(key).cloned())
    }

    async fn clear_session_state(&self) -> ProbeResult<()> {
        let mut page = self.state();
        page.history.push("clear_session".to_string());
        page.local_storage.clear();
        Ok(())
    }

    async fn accept_dialogs(&self) -> ProbeResult<()> {
        let mut page = self.state();
        page.history.push("accept_dialogs".to_string());
        page.dialogs_accepted = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod match_mode_tests {
        use super::*;

        #[test]
        fn test_exact_trims_and_rejects_superstrings() {
            assert!(MatchMode::Exact.matches(" 10 ", "10"));
            assert!(!MatchMode::Exact.matches("100", "10"));
        }

        #[test]
        fn test_contains() {
            assert!(MatchMode::Contains.matches("Invalid input", "Invalid"));
            assert!(!MatchMode::Contains.matches("ok", "Invalid"));
        }
    }

    #[cfg(feature = "browser")]
    mod script_tests {
        use super::*;

        #[test]
        fn test_fill_script_quotes_value() {
            let script = fill_script(&Selector::css("input#username"), 0, "o'brien\"x");
            assert!(script.contains(r#""o'brien\"x""#));
            assert!(script.contains("[0]"));
            assert!(script.contains("dispatchEvent"));
        }

        #[test]
        fn test_select_script_matches_label_case_insensitively() {
            let script = select_script(&Selector::css("select"), 0, "Multiplication");
            assert!(script.contains(r#""Multiplication".toLowerCase()"#));
            assert!(script.contains("o.label"));
        }

        #[test]
        fn test_text_count_script_unscoped() {
            let script = text_count_script(&[], "10", MatchMode::Exact);
            assert!(script.contains("[document.body]"));
            assert!(script.contains("trim() === want"));
        }

        #[test]
        fn test_text_count_script_skips_unrendered() {
            let script = text_count_script(&[], "Invalid", MatchMode::Contains);
            assert!(script.contains("getClientRects().length"));
        }

        #[test]
        fn test_text_count_script_scoped() {
            let scope = [Selector::css("table"), Selector::css(".history")];
            let script = text_count_script(&scope, "16", MatchMode::Exact);
            assert!(script.contains(r#"querySelectorAll("table")"#));
            assert!(script.contains(r#"querySelectorAll(".history")"#));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[test]
        fn test_mock_driver_new() {
            let driver = MockDriver::new();
            assert_eq!(driver.state().url, "about:blank");
            assert!(driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_goto_records_and_runs_effects() {
            let driver = MockDriver::new().on_goto("/dashboard", |p| p.url = "http://x/login".into());
            driver.goto("http://x/dashboard").await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "http://x/login");
            assert!(driver.was_called("goto:http://x/dashboard"));
        }

        #[tokio::test]
        async fn test_fill_requires_element() {
            let sel = Selector::css("input");
            let driver = MockDriver::new().with_elements(sel.clone(), 2);
            driver.fill(&sel, 1, "3").await.unwrap();
            assert_eq!(driver.value_of(&sel, 1).as_deref(), Some("3"));
            let err = driver.fill(&sel, 2, "x").await.unwrap_err();
            assert!(matches!(err, ProbeError::ElementNotFound { index: 2, .. }));
        }

        #[tokio::test]
        async fn test_click_runs_effect() {
            let sel = Selector::css_with_text("button", "Login");
            let driver = MockDriver::new()
                .with_elements(sel.clone(), 1)
                .on_click(sel.clone(), |p| {
                    p.local_storage.insert("access_token".into(), "t".into());
                });
            driver.click(&sel, 0).await.unwrap();
            assert_eq!(
                driver.local_storage_item("access_token").await.unwrap().as_deref(),
                Some("t")
            );
        }

        #[tokio::test]
        async fn test_select_option() {
            let sel = Selector::css("select");
            let driver = MockDriver::new()
                .with_elements(sel.clone(), 1)
                .with_options(sel.clone(), &["addition", "multiplication"]);
            assert!(driver.select_option(&sel, 0, "Multiplication").await.unwrap());
            assert!(!driver.select_option(&sel, 0, "modulo").await.unwrap());
            assert_eq!(driver.state().selections[&sel], "multiplication");
        }

        #[tokio::test]
        async fn test_broken_selector_errors() {
            let sel = Selector::css("table");
            let driver = MockDriver::new().with_broken(sel.clone());
            assert!(driver.count(&sel).await.is_err());
        }

        #[tokio::test]
        async fn test_hidden_elements_exist_but_are_not_visible() {
            let alert = Selector::css("#successAlert");
            let driver = MockDriver::new().with_hidden(alert.clone(), 1);
            assert_eq!(driver.count(&alert).await.unwrap(), 1);
            assert_eq!(driver.visible_count(&alert).await.unwrap(), 0);

            driver.state().reveal(&alert);
            assert_eq!(driver.visible_count(&alert).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_visible_count_mixes_shown_and_hidden() {
            let rows = Selector::css("table tbody tr");
            let driver = MockDriver::new()
                .with_elements(rows.clone(), 2)
                .with_hidden(rows.clone(), 1);
            assert_eq!(driver.count(&rows).await.unwrap(), 3);
            assert_eq!(driver.visible_count(&rows).await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_text_count_exact() {
            let driver = MockDriver::new().with_text("100").with_text("10");
            assert_eq!(driver.text_count(&[], "10", MatchMode::Exact).await.unwrap(), 1);
            assert_eq!(driver.text_count(&[], "10", MatchMode::Contains).await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_clear_session_state() {
            let driver = MockDriver::new();
            driver.state().local_storage.insert("k".into(), "v".into());
            driver.clear_session_state().await.unwrap();
            assert!(driver.local_storage_item("k").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_boxed_driver_delegates() {
            let driver = MockDriver::new();
            let boxed: Box<dyn PageDriver> = Box::new(driver.clone());
            boxed.accept_dialogs().await.unwrap();
            assert!(driver.state().dialogs_accepted);
        }
    }
}
