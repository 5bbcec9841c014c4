use anyhow::Result;
use std::path::{Path, PathBuf};

pub struct PathManager {
    config_dir: PathBuf,
    output_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("reviewstream");

        Ok(Self {
            config_dir: base_dir.clone(),
            output_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            log_dir: base_dir.join("logs"),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

impl Default for PathManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("./logs"),
        })
    }
}
