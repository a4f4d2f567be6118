//! Dynamic fetch: fully rendered DOM via headless Chrome (chromiumoxide)
//!
//! Every render gets its own browser process and profile directory, torn
//! down whether the render succeeds or not. `DynamicFetcher` bounds how many
//! of those processes are alive at once.

use crate::config::DynamicFetchConfig;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::schema::FetchResult;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

const READY_POLL: Duration = Duration::from_millis(250);
const PROFILE_CLEANUP_RETRY: Duration = Duration::from_millis(500);

static NEXT_PROFILE: AtomicU64 = AtomicU64::new(0);

/// Render a URL and return the final DOM serialization
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Chrome launch and readiness settings
#[derive(Debug, Clone)]
pub struct ChromeSettings {
    pub executable: Option<PathBuf>,
    pub user_agent: Option<String>,
    /// CSS selector that must match before the DOM is captured
    pub ready_selector: String,
    pub ready_timeout: Duration,
}

impl From<&DynamicFetchConfig> for ChromeSettings {
    fn from(config: &DynamicFetchConfig) -> Self {
        Self {
            executable: config.chrome_executable.as_ref().map(PathBuf::from),
            user_agent: config.user_agent.clone(),
            ready_selector: config.ready_selector.clone(),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
        }
    }
}

pub struct ChromeRenderer {
    settings: ChromeSettings,
}

impl ChromeRenderer {
    pub fn new(settings: ChromeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let session = BrowserSession::launch(&self.settings).await?;
        let result = session.capture(url, timeout, &self.settings).await;
        session.shutdown().await;
        result
    }
}

/// Chrome user data directory, removed on drop
struct ProfileDir(PathBuf);

impl ProfileDir {
    fn next() -> Self {
        Self(std::env::temp_dir().join(format!(
            "pagediff-{}-{}",
            std::process::id(),
            NEXT_PROFILE.fetch_add(1, Ordering::Relaxed)
        )))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        let err = match std::fs::remove_dir_all(&self.0) {
            Ok(()) => return,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => e,
        };

        // a killed Chrome can still hold files for a moment
        let path = std::mem::take(&mut self.0);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(PROFILE_CLEANUP_RETRY).await;
                    if let Err(e) = tokio::fs::remove_dir_all(&path).await {
                        tracing::warn!("Failed to remove profile {}: {}", path.display(), e);
                    }
                });
            }
            Err(_) => tracing::warn!("Failed to remove profile {}: {}", path.display(), err),
        }
    }
}

/// One browser process with its CDP handler task and profile directory.
///
/// Fields drop in order: the browser (killing Chrome) goes before the
/// profile directory is removed.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: ProfileDir,
}

impl BrowserSession {
    async fn launch(settings: &ChromeSettings) -> Result<Self, FetchError> {
        let profile = ProfileDir::next();

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile.path())
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-setuid-sandbox")
            .arg("--no-first-run")
            .arg("--headless=new");
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| FetchError::Render(format!("browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            FetchError::Render(format!(
                "failed to launch Chrome (is Chrome/Chromium installed?): {}",
                e
            ))
        })?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    async fn capture(
        &self,
        url: &str,
        timeout: Duration,
        settings: &ChromeSettings,
    ) -> Result<String, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Render(format!("failed to open tab: {}", e)))?;

        if let Some(user_agent) = &settings.user_agent {
            page.execute(SetUserAgentOverrideParams::new(user_agent.as_str()))
                .await
                .map_err(|e| FetchError::Render(format!("failed to set user agent: {}", e)))?;
        }

        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                let message = e.to_string();
                return Err(FetchError::Render(format!(
                    "navigation failed ({}): {}",
                    classify_navigation_error(&message),
                    message
                )));
            }
            Err(_) => {
                return Err(FetchError::Render(format!(
                    "navigation timeout after {}ms",
                    timeout.as_millis()
                )))
            }
        }

        wait_until_ready(&page, &settings.ready_selector, settings.ready_timeout).await?;

        page.content()
            .await
            .map_err(|e| FetchError::Render(format!("failed to get page content: {}", e)))
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Browser wait failed: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn wait_until_ready(
    page: &Page,
    selector: &str,
    ready_timeout: Duration,
) -> Result<(), FetchError> {
    let poll = async {
        while page.find_element(selector).await.is_err() {
            tokio::time::sleep(READY_POLL).await;
        }
    };

    tokio::time::timeout(ready_timeout, poll).await.map_err(|_| {
        FetchError::Render(format!(
            "timed out after {}ms waiting for `{}`",
            ready_timeout.as_millis(),
            selector
        ))
    })
}

fn classify_navigation_error(error: &str) -> &'static str {
    if error.contains("ERR_NAME_NOT_RESOLVED") {
        "DNS_FAILED"
    } else if error.contains("ERR_CONNECTION_REFUSED") {
        "CONNECTION_REFUSED"
    } else if error.contains("ERR_CONNECTION_TIMED_OUT") {
        "TIMEOUT"
    } else if error.contains("ERR_CERT") || error.contains("SSL") {
        "SSL_ERROR"
    } else {
        "NETWORK_ERROR"
    }
}

/// Renders URLs with at most `concurrency` live renders at a time
pub struct DynamicFetcher {
    renderer: Arc<dyn Renderer>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    deadline: Duration,
}

impl DynamicFetcher {
    /// `timeout` is the page-load timeout handed to the renderer; `deadline`
    /// caps the whole render, after which it is dropped
    pub fn new(
        renderer: Arc<dyn Renderer>,
        concurrency: usize,
        timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            renderer,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
            deadline,
        }
    }

    /// Chrome-backed fetcher from configuration
    pub fn from_config(config: &DynamicFetchConfig) -> Self {
        Self::new(
            Arc::new(ChromeRenderer::new(ChromeSettings::from(config))),
            config.concurrency,
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.deadline_ms),
        )
    }

    /// Render slots not currently in use
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl Fetcher for DynamicFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let outcome = match self.permits.acquire().await {
            Ok(_permit) => {
                match tokio::time::timeout(self.deadline, self.renderer.render(url, self.timeout))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FetchError::Render(format!(
                        "render exceeded deadline of {}ms",
                        self.deadline.as_millis()
                    ))),
                }
            }
            Err(_) => Err(FetchError::Render("render pool closed".to_string())),
        };

        match outcome {
            Ok(content) => {
                tracing::info!("Fetched dynamic content from {}", url);
                FetchResult::fetched(url, content)
            }
            Err(e) => {
                tracing::error!("Error fetching dynamic content from {}: {}", url, e);
                FetchResult::failed(url, e)
            }
        }
    }
}
