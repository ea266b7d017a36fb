//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`Browser`] launches Chromium through
//! chromiumoxide and hands out [`CdpPage`]s, each living in its own browser
//! context so cookies and storage never leak between scenarios. Without the
//! feature only the configuration types are available.

use crate::driver::PageDriver;
use crate::result::ProbeResult;
use async_trait::async_trait;

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to Chromium executable
    pub chromium_path: Option<String>,
    /// Enable sandbox
    pub sandbox: bool,
    /// Bound on a single navigation (ms)
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
            navigation_timeout_ms: 10_000,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (required in some CI containers)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }
}

/// Source of fresh, isolated pages; one page per scenario.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Page type handed out
    type Page: PageDriver + 'static;

    /// Open a page with its own cookies and storage
    async fn open_page(&self) -> ProbeResult<Self::Page>;
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
mod cdp {
    use super::{BrowserConfig, PageSource};
    use crate::driver::{
        click_script, fill_script, select_script, text_count_script, MatchMode, PageDriver,
        ACCEPT_DIALOGS_SCRIPT, CLEAR_STORAGE_SCRIPT,
    };
    use crate::locator::{js_str, Selector};
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::network::DeleteCookiesParams;
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams,
    };
    use chromiumoxide::Page;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Running Chromium instance
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch Chromium
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(Duration::from_millis(config.navigation_timeout_ms));

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        tracing::debug!("CDP handler loop ended");
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Get browser config
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        pub async fn close(self) -> ProbeResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            let _ = browser.wait().await;
            self.handle.abort();
            Ok(())
        }
    }

    #[async_trait]
    impl PageSource for Browser {
        type Page = CdpPage;

        async fn open_page(&self) -> ProbeResult<CdpPage> {
            let mut browser = self.inner.lock().await;
            let context = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(|e| ProbeError::page(format!("browser context: {e}")))?;
            let params = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context.clone())
                .build()
                .map_err(ProbeError::page)?;
            let page = browser
                .new_page(params)
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            Ok(CdpPage {
                page,
                context,
                browser: Arc::clone(&self.inner),
                navigation_timeout: Duration::from_millis(self.config.navigation_timeout_ms),
            })
        }
    }

    /// One page in its own browser context
    #[derive(Debug)]
    pub struct CdpPage {
        page: Page,
        context: BrowserContextId,
        browser: Arc<Mutex<CdpBrowser>>,
        navigation_timeout: Duration,
    }

    impl CdpPage {
        async fn eval<T: DeserializeOwned>(&self, script: String) -> ProbeResult<T> {
            self.page
                .evaluate(script)
                .await
                .map_err(|e| ProbeError::script(e.to_string()))?
                .into_value()
                .map_err(|e| ProbeError::script(e.to_string()))
        }

        fn missing(selector: &Selector, index: usize) -> ProbeError {
            ProbeError::ElementNotFound {
                selector: selector.to_string(),
                index,
            }
        }
    }

    #[async_trait]
    impl PageDriver for CdpPage {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
                Err(_) => Err(ProbeError::Timeout {
                    ms: u64::try_from(self.navigation_timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        }

        async fn current_url(&self) -> ProbeResult<String> {
            self.page
                .url()
                .await
                .map(Option::unwrap_or_default)
                .map_err(|e| ProbeError::page(e.to_string()))
        }

        async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
            self.eval(selector.to_count_query()).await
        }

        async fn visible_count(&self, selector: &Selector) -> ProbeResult<usize> {
            self.eval(selector.to_visible_count_query()).await
        }

        async fn fill(&self, selector: &Selector, index: usize, value: &str) -> ProbeResult<()> {
            if self.eval::<bool>(fill_script(selector, index, value)).await? {
                Ok(())
            } else {
                Err(Self::missing(selector, index))
            }
        }

        async fn click(&self, selector: &Selector, index: usize) -> ProbeResult<()> {
            if let Selector::Css(css) = selector {
                // Real pointer events for plain CSS; scripted click otherwise
                let elements = self
                    .page
                    .find_elements(css.as_str())
                    .await
                    .map_err(|e| ProbeError::page(e.to_string()))?;
                let element = elements
                    .get(index)
                    .ok_or_else(|| Self::missing(selector, index))?;
                element
                    .scroll_into_view()
                    .await
                    .map_err(|e| ProbeError::page(e.to_string()))?
                    .click()
                    .await
                    .map_err(|e| ProbeError::page(e.to_string()))?;
                return Ok(());
            }
            if self.eval::<bool>(click_script(selector, index)).await? {
                Ok(())
            } else {
                Err(Self::missing(selector, index))
            }
        }

        async fn select_option(
            &self,
            selector: &Selector,
            index: usize,
            value: &str,
        ) -> ProbeResult<bool> {
            self.eval::<Option<bool>>(select_script(selector, index, value))
                .await?
                .ok_or_else(|| Self::missing(selector, index))
        }

        async fn text_count(
            &self,
            scope: &[Selector],
            text: &str,
            mode: MatchMode,
        ) -> ProbeResult<usize> {
            self.eval(text_count_script(scope, text, mode)).await
        }

        async fn local_storage_item(&self, key: &str) -> ProbeResult<Option<String>> {
            self.eval(format!("localStorage.getItem({})", js_str(key)))
                .await
        }

        async fn clear_session_state(&self) -> ProbeResult<()> {
            self.eval::<bool>(CLEAR_STORAGE_SCRIPT.to_string()).await?;
            let cookies = self
                .page
                .get_cookies()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            let mut deletions = Vec::with_capacity(cookies.len());
            for cookie in cookies {
                let params = DeleteCookiesParams::builder()
                    .name(cookie.name)
                    .domain(cookie.domain)
                    .path(cookie.path)
                    .build()
                    .map_err(ProbeError::page)?;
                deletions.push(params);
            }
            if !deletions.is_empty() {
                self.page
                    .delete_cookies(deletions)
                    .await
                    .map_err(|e| ProbeError::page(e.to_string()))?;
            }
            Ok(())
        }

        async fn accept_dialogs(&self) -> ProbeResult<()> {
            self.eval::<bool>(ACCEPT_DIALOGS_SCRIPT.to_string()).await?;
            Ok(())
        }

        async fn close(&self) -> ProbeResult<()> {
            self.page
                .clone()
                .close()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            let browser = self.browser.lock().await;
            browser
                .dispose_browser_context(self.context.clone())
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, CdpPage};
