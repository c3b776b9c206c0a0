// ABOUTME: Browser rendering module for the html2pptx application
// ABOUTME: Captures a screenshot and the visible text of each HTML document using a headless browser

use crate::config::RenderConfig;
use crate::errors::{ConvertError, RenderError, Result};
use crate::locate::DocumentRef;
use crate::utils;
use headless_chrome::browser::tab::EventListener;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::util::Wait;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Elements whose text is copied onto the text slide.
const TEXT_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, td, th";

/// Bitmap and optional text captured from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCapture {
    pub image: Vec<u8>,
    pub text: Option<String>,
}

/// Outcome of rendering one document. Produced once, never modified.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub document: DocumentRef,
    pub outcome: std::result::Result<PageCapture, RenderError>,
}

impl RenderResult {
    pub fn success(document: DocumentRef, capture: PageCapture) -> Self {
        Self {
            document,
            outcome: Ok(capture),
        }
    }

    pub fn failure(document: DocumentRef, error: RenderError) -> Self {
        Self {
            document,
            outcome: Err(error),
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.outcome.as_ref().ok().map(|capture| capture.image.as_slice())
    }

    pub fn text(&self) -> Option<&str> {
        self.outcome
            .as_ref()
            .ok()
            .and_then(|capture| capture.text.as_deref())
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.outcome.as_ref().err()
    }
}

/// Something that turns one document into a [`RenderResult`].
///
/// Implementations must contain their own failures: a render never returns
/// an error to the caller, it records it in the result.
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render(&self, document: &DocumentRef) -> RenderResult;
}

/// Deduplicate, join and truncate text fragments pulled from a page.
///
/// Falls back to `body` when no fragment has visible text. The result holds
/// at most `max_chars` characters.
pub fn compose_text(fragments: &[String], body: &str, max_chars: usize) -> String {
    let mut seen = HashSet::new();
    let mut texts: Vec<&str> = fragments
        .iter()
        .map(|fragment| fragment.trim())
        .filter(|fragment| !fragment.is_empty())
        .filter(|fragment| seen.insert(*fragment))
        .collect();

    if texts.is_empty() {
        texts.push(body.trim());
    }

    let joined = texts.join("\n\n");
    match joined.char_indices().nth(max_chars) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

/// A browser tab that is closed when dropped.
struct PageTab {
    tab: Arc<Tab>,
}

impl Drop for PageTab {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            debug!("Failed to close tab: {}", e);
        }
    }
}

/// Owns the headless browser. Dropping it shuts the browser down.
pub struct ChromeEngine {
    browser: Browser,
    config: Arc<RenderConfig>,
}

impl ChromeEngine {
    /// Launch a headless browser configured for `config`
    pub fn launch(config: &RenderConfig) -> Result<Self> {
        let mut launch_options_builder = LaunchOptionsBuilder::default();
        launch_options_builder.window_size(Some((config.width, config.height)));
        launch_options_builder.headless(true);
        launch_options_builder.sandbox(config.sandbox);
        // Keep the connection open while every tab sits in its settle delay
        launch_options_builder.idle_browser_timeout(Duration::from_millis(
            config.timeout_ms.saturating_mul(4).max(60_000),
        ));

        if let Some(browser_path) = &config.browser_path {
            launch_options_builder.path(Some(browser_path.into()));
        }

        let launch_options = launch_options_builder
            .build()
            .map_err(|e| ConvertError::BrowserError {
                message: format!("Failed to build browser options: {:?}", e),
                source: None,
            })?;

        info!("Launching headless browser");
        let browser = Browser::new(launch_options).map_err(|e| {
            let message = format!("Failed to launch browser: {}", e);
            warn!("{}", message);
            ConvertError::BrowserError {
                message,
                source: Some(e.into()),
            }
        })?;

        Ok(Self {
            browser,
            config: Arc::new(config.clone()),
        })
    }

    async fn capture(
        &self,
        document: &DocumentRef,
    ) -> std::result::Result<PageCapture, RenderError> {
        let url = utils::file_url(&document.path)
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        debug!("Opening page at URL: {}", url);

        let browser = self.browser.clone();
        let config = Arc::clone(&self.config);
        let mut page = run_blocking(move || open_page(&browser, &url, &config)).await?;

        match &self.config.ready_selector {
            Some(selector) => {
                let selector = selector.clone();
                let timeout_ms = self.config.timeout_ms;
                page = run_blocking(move || {
                    page.tab
                        .wait_for_element_with_custom_timeout(
                            &selector,
                            Duration::from_millis(timeout_ms),
                        )
                        .map_err(|e| {
                            classify(
                                e,
                                "waiting for ready marker",
                                timeout_ms,
                                RenderError::Navigation,
                            )
                        })?;
                    Ok(page)
                })
                .await?;
            }
            None => tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await,
        }

        let config = Arc::clone(&self.config);
        run_blocking(move || snapshot(page, &config)).await
    }
}

impl ChromeEngine {
    /// Number of tabs the browser currently has open
    pub fn open_tab_count(&self) -> usize {
        self.browser
            .get_tabs()
            .lock()
            .map(|tabs| tabs.len())
            .unwrap_or_default()
    }
}

impl Drop for ChromeEngine {
    fn drop(&mut self) {
        info!("Closing headless browser ({} tabs open)", self.open_tab_count());
    }
}

impl PageRenderer for ChromeEngine {
    async fn render(&self, document: &DocumentRef) -> RenderResult {
        match self.capture(document).await {
            Ok(capture) => RenderResult::success(document.clone(), capture),
            Err(error) => RenderResult::failure(document.clone(), error),
        }
    }
}

/// Run blocking browser calls off the scheduler thread
async fn run_blocking<T, F>(task: F) -> std::result::Result<T, RenderError>
where
    F: FnOnce() -> std::result::Result<T, RenderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| RenderError::Engine(format!("render task failed: {}", e)))?
}

/// Map a browser error to a timeout when that is what it was
fn classify(
    err: anyhow::Error,
    stage: &'static str,
    timeout_ms: u64,
    otherwise: fn(String) -> RenderError,
) -> RenderError {
    if err.is::<headless_chrome::util::Timeout>() {
        RenderError::Timeout { stage, timeout_ms }
    } else {
        otherwise(err.to_string())
    }
}

fn open_page(
    browser: &Browser,
    url: &str,
    config: &RenderConfig,
) -> std::result::Result<PageTab, RenderError> {
    let tab = browser
        .new_tab()
        .map_err(|e| RenderError::Engine(format!("Failed to create new tab: {}", e)))?;
    let page = PageTab { tab };

    let timeout = Duration::from_millis(config.timeout_ms);
    page.tab.set_default_timeout(timeout);
    let load = LoadWatch::attach(&page.tab)?;

    page.tab
        .navigate_to(url)
        .map_err(|e| classify(e, "navigating", config.timeout_ms, RenderError::Navigation))?;
    page.tab
        .wait_until_navigated()
        .map_err(|e| classify(e, "loading", config.timeout_ms, RenderError::Navigation))?;
    page.tab
        .wait_for_element_with_custom_timeout("body", timeout)
        .map_err(|e| classify(e, "waiting for body", config.timeout_ms, RenderError::Navigation))?;
    load.wait_for_network_idle(&page.tab, config.timeout_ms)?;

    Ok(page)
}

/// Lifecycle events seen on a tab's main frame
#[derive(Debug, Default)]
pub(crate) struct LoadState {
    /// Loader of the newest document started in the main frame.
    loader: Option<String>,
    idle: HashSet<String>,
}

impl LoadState {
    pub(crate) fn record(&mut self, name: &str, loader_id: &str) {
        match name {
            "init" => self.loader = Some(loader_id.to_string()),
            "networkIdle" => {
                self.idle.insert(loader_id.to_string());
            }
            _ => {}
        }
    }

    /// Whether the current document has gone quiet on the network
    pub(crate) fn is_network_idle(&self) -> bool {
        self.loader
            .as_ref()
            .is_some_and(|loader| self.idle.contains(loader))
    }
}

/// Follows `Page.lifecycleEvent` on a tab until its document is network idle
struct LoadWatch {
    state: Arc<Mutex<LoadState>>,
    listener: std::sync::Weak<dyn EventListener<Event> + Send + Sync>,
}

impl LoadWatch {
    /// Must run before navigating, or the events for the new document are missed.
    /// New tabs already have lifecycle events enabled.
    fn attach(tab: &Tab) -> std::result::Result<Self, RenderError> {
        let state = Arc::new(Mutex::new(LoadState::default()));
        let main_frame = tab.get_target_id().clone();
        let events = Arc::clone(&state);
        let listener = tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageLifecycleEvent(lifecycle) = event {
                    let params = &lifecycle.params;
                    if params.frame_id == main_frame {
                        events.lock().record(&params.name, &params.loader_id);
                    }
                }
            }))
            .map_err(|e| RenderError::Engine(format!("Failed to watch page load: {}", e)))?;

        Ok(Self { state, listener })
    }

    fn wait_for_network_idle(
        self,
        tab: &Tab,
        timeout_ms: u64,
    ) -> std::result::Result<(), RenderError> {
        let idle = Wait::with_timeout(Duration::from_millis(timeout_ms))
            .until(|| self.state.lock().is_network_idle().then_some(()));
        if let Err(e) = tab.remove_event_listener(&self.listener) {
            debug!("Failed to remove load listener: {}", e);
        }
        idle.map_err(|_| RenderError::Timeout {
            stage: "waiting for network idle",
            timeout_ms,
        })
    }
}

fn snapshot(page: PageTab, config: &RenderConfig) -> std::result::Result<PageCapture, RenderError> {
    let format = match config.format.to_lowercase().as_str() {
        "jpeg" | "jpg" => Page::CaptureScreenshotFormatOption::Jpeg,
        _ => Page::CaptureScreenshotFormatOption::Png,
    };
    let clip = Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: f64::from(config.width),
        height: f64::from(config.height),
        scale: 1.0,
    };

    let image = page
        .tab
        .capture_screenshot(format, None, Some(clip), true)
        .map_err(|e| classify(e, "capturing", config.timeout_ms, RenderError::Capture))?;

    let text = if config.extract_text {
        Some(extract_text(&page.tab, config.max_text_chars)?).filter(|text| !text.is_empty())
    } else {
        None
    };

    Ok(PageCapture { image, text })
}

fn extract_text(tab: &Tab, max_chars: usize) -> std::result::Result<String, RenderError> {
    let js = format!(
        r#"
        (function() {{
            var elements = document.querySelectorAll('{selector}');
            var fragments = Array.prototype.map.call(elements, function(el) {{
                return el.innerText || '';
            }});
            var body = document.body ? document.body.innerText : '';
            return JSON.stringify({{ fragments: fragments, body: body }});
        }})()
    "#,
        selector = TEXT_SELECTOR
    );

    let object = tab
        .evaluate(&js, false)
        .map_err(|e| RenderError::TextExtraction(e.to_string()))?;
    let raw = object
        .value
        .as_ref()
        .and_then(|value| value.as_str())
        .ok_or_else(|| RenderError::TextExtraction("script returned no value".to_string()))?;
    let parsed: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| RenderError::TextExtraction(e.to_string()))?;

    let fragments: Vec<String> = parsed["fragments"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let body = parsed["body"].as_str().unwrap_or_default();

    Ok(compose_text(&fragments, body, max_chars))
}
