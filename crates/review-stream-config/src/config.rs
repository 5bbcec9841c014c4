use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration detected before any pipeline work begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_queue_size must be greater than zero")]
    ZeroQueueSize,
    #[error("num_consumers must be at least 1")]
    ZeroConsumers,
    #[error("max_records, when set, must be greater than zero")]
    ZeroMaxRecords,
    #[error("overlap_threshold must be within (0, 1], got {0}")]
    BadOverlapThreshold(f64),
    #[error("overlap_window_pages must be at least 1")]
    ZeroOverlapWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl ScrapeConfig {
    /// Load from a TOML file, falling back to defaults when the file does
    /// not exist. A present-but-malformed file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Total per-request timeout; a timeout counts as a retryable network
    /// failure.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bound of the producer/consumer queue; the only backpressure knob.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_num_consumers")]
    pub num_consumers: usize,
    /// Stop once this many unique reviews have been admitted.
    #[serde(default)]
    pub max_records: Option<usize>,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Delay between successive page fetches of one direction.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Duplicate fraction at which a direction stops early. Heuristic only;
    /// duplicates are always filtered regardless.
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f64,
    /// How many recent pages the duplicate fraction is measured over.
    #[serde(default = "default_overlap_window_pages")]
    pub overlap_window_pages: usize,
    /// Minimum records inside the window before the heuristic may fire.
    #[serde(default = "default_overlap_min_records")]
    pub overlap_min_records: usize,
    /// Drop records that carry neither text nor a known rating.
    #[serde(default)]
    pub require_content: bool,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::ZeroQueueSize);
        }
        if self.num_consumers == 0 {
            return Err(ConfigError::ZeroConsumers);
        }
        if self.max_records == Some(0) {
            return Err(ConfigError::ZeroMaxRecords);
        }
        if !(self.overlap_threshold > 0.0 && self.overlap_threshold <= 1.0) {
            return Err(ConfigError::BadOverlapThreshold(self.overlap_threshold));
        }
        if self.overlap_window_pages == 0 {
            return Err(ConfigError::ZeroOverlapWindow);
        }
        Ok(())
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            num_consumers: default_num_consumers(),
            max_records: None,
            retry_limit: default_retry_limit(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            page_delay_ms: default_page_delay_ms(),
            overlap_threshold: default_overlap_threshold(),
            overlap_window_pages: default_overlap_window_pages(),
            overlap_min_records: default_overlap_min_records(),
            require_content: false,
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_queue_size() -> usize {
    32
}

fn default_num_consumers() -> usize {
    2
}

fn default_retry_limit() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_overlap_threshold() -> f64 {
    0.8
}

fn default_overlap_window_pages() -> usize {
    3
}

fn default_overlap_min_records() -> usize {
    20
}
