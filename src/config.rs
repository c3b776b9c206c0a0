// ABOUTME: Configuration module for the html2pptx application
// ABOUTME: Provides run configuration, defaults and environment variable handling

use crate::deck::AspectRatio;
use crate::errors::{ConvertError, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_INPUT_DIR: &str = "inhtml";
pub const DEFAULT_OUTPUT_DIR: &str = "outppt";
pub const DEFAULT_OUTPUT_NAME: &str = "output.pptx";
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_TEXT_CHARS: usize = 5000;

/// Configuration for rendering a single document
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Upper bound on waiting for the page to load (and for `ready_selector`).
    pub timeout_ms: u64,
    /// Fixed pause after loading so script-driven animations can finish.
    pub settle_delay_ms: u64,
    pub max_text_chars: usize,
    pub extract_text: bool,
    /// When set, wait for this element instead of sleeping `settle_delay_ms`.
    pub ready_selector: Option<String>,
    pub browser_path: Option<String>,
    pub sandbox: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            format: "png".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            extract_text: true,
            ready_selector: None,
            browser_path: None,
            sandbox: false,
        }
    }
}

/// Configuration for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
    /// Document extension without the leading dot.
    pub extension: String,
    pub concurrency: usize,
    /// Write an empty deck instead of failing when no documents match.
    pub allow_empty: bool,
    pub aspect: AspectRatio,
    pub title: String,
    pub render: RenderConfig,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            extension: "html".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            allow_empty: false,
            aspect: AspectRatio::Widescreen,
            title: "Presentation".to_string(),
            render: RenderConfig::default(),
        }
    }
}

impl ConvertConfig {
    /// Full path of the deck this run writes
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ConvertError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConvertError::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.render.width, self.render.height
            )));
        }
        if !matches!(
            self.render.format.to_lowercase().as_str(),
            "png" | "jpeg" | "jpg"
        ) {
            return Err(ConvertError::ConfigError(format!(
                "unsupported screenshot format: {}",
                self.render.format
            )));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(ConvertError::ConfigError(
                "document extension must not be empty".to_string(),
            ));
        }
        if self.output_name.is_empty() {
            return Err(ConvertError::ConfigError(
                "output file name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Treat an unset or empty variable the same way
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn browser_path_from_env() -> Option<String> {
    non_empty(env::var("BROWSER_PATH").ok())
}

/// Environment-derived defaults for the application
pub struct Config {
    pub browser_path: Option<String>,
    pub default_timeout_ms: u64,
    pub default_settle_delay_ms: u64,
    pub default_concurrency: usize,
    pub sandbox: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_path: browser_path_from_env(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            default_concurrency: DEFAULT_CONCURRENCY,
            sandbox: false,
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let browser_path = browser_path_from_env();
        let default_timeout_ms = env::var("DEFAULT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let default_settle_delay_ms = env::var("SETTLE_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SETTLE_DELAY_MS);
        let default_concurrency = env::var("RENDER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CONCURRENCY);
        let sandbox = env::var("CHROME_SANDBOX")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            browser_path,
            default_timeout_ms,
            default_settle_delay_ms,
            default_concurrency,
            sandbox,
        }
    }

    /// Get a render configuration with defaults from this config
    pub fn get_render_config(
        &self,
        width: Option<u32>,
        height: Option<u32>,
        format: Option<String>,
        timeout_ms: Option<u64>,
        settle_delay_ms: Option<u64>,
    ) -> RenderConfig {
        RenderConfig {
            width: width.unwrap_or(1280),
            height: height.unwrap_or(720),
            format: format.unwrap_or_else(|| "png".to_string()),
            timeout_ms: timeout_ms.unwrap_or(self.default_timeout_ms),
            settle_delay_ms: settle_delay_ms.unwrap_or(self.default_settle_delay_ms),
            browser_path: self.browser_path.clone(),
            sandbox: self.sandbox,
            ..RenderConfig::default()
        }
    }

    /// Get a conversion configuration with defaults
    pub fn get_convert_config(
        &self,
        input_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        concurrency: Option<usize>,
        render: RenderConfig,
    ) -> ConvertConfig {
        ConvertConfig {
            input_dir: input_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            output_dir: output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            concurrency: concurrency.unwrap_or(self.default_concurrency),
            render,
            ..ConvertConfig::default()
        }
    }
}
