use crate::error::{HoundError, Result};
use crate::types::Config;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_FILE: &str = "config.json";

/// Persistence for the tool's [`Config`].
pub trait ConfigStore {
    /// Load the config, creating a default one when none exists yet.
    fn load(&self) -> Result<Config>;
    fn save(&self, config: &Config) -> Result<()>;
    fn path(&self) -> &Path;
}

pub struct LocalFsStore {
    path: PathBuf,
}

impl LocalFsStore {
    /// Store at the platform config directory.
    pub fn new() -> Result<Self> {
        let proj = ProjectDirs::from("io", "weibo-image-hound", "weibo-image-hound").ok_or_else(|| {
            HoundError::storage_error("initialization", "could not resolve config dir")
        })?;
        Ok(Self {
            path: proj.config_dir().join(CONFIG_FILE),
        })
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `--config` when given, otherwise the platform default.
    pub fn from_override(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Ok(Self::at(p)),
            None => Self::new(),
        }
    }
}

impl ConfigStore for LocalFsStore {
    fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "config file not found, creating one");
            let config = Config::default();
            self.save(&config)?;
            return Ok(config);
        }

        let raw = fs::read(&self.path)?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Config::default());
        }
        serde_json::from_slice(&raw)
            .map_err(|e| HoundError::storage_error("load", &format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, config)?;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
