pub mod config;
pub mod paths;

pub use config::{ConfigError, HttpConfig, PipelineConfig, ScrapeConfig};
pub use paths::PathManager;
