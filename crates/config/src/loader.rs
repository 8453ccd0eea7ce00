//! Configuration loader for remex
//!
//! Layers, lowest precedence first: defaults, an optional JSON file, then
//! `REMEX_*` environment variables.

use crate::config::ClientConfig;
use remex_core::{
    constants::{
        REMEX_DOWNLOAD_CONCURRENCY_VAR, REMEX_INSTANCE_NAME_VAR, REMEX_SKIP_CACHE_LOOKUP_VAR,
        REMEX_VERIFY_DOWNLOADS_VAR,
    },
    Error, Result,
};
use std::path::{Path, PathBuf};

/// Configuration loader that resolves a [`ClientConfig`]
pub struct ConfigLoader {
    /// Optional JSON file to read
    file: Option<PathBuf>,
    /// Whether to apply `REMEX_*` overrides from the process environment
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }

    /// Read settings from a JSON file
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set whether environment overrides apply
    pub fn use_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    /// Load the configuration
    pub fn load(self) -> Result<ClientConfig> {
        let mut config = match &self.file {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if self.use_env {
            apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        }

        config.validate()?;
        tracing::debug!(
            instance_name = %config.instance_name,
            download_concurrency = config.download_concurrency,
            "Loaded client configuration"
        );
        Ok(config)
    }
}

impl ClientConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Read a JSON configuration file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::local_io(path, "read configuration file", e))?;
        serde_json::from_slice(&data).map_err(|e| {
            Error::configuration(format!("invalid configuration in {}: {e}", path.display()))
        })
    }
}

/// Overlay `REMEX_*` variables resolved through `lookup`
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(instance_name) = lookup(REMEX_INSTANCE_NAME_VAR) {
        config.instance_name = instance_name;
    }
    if let Some(value) = lookup(REMEX_SKIP_CACHE_LOOKUP_VAR) {
        config.skip_cache_lookup = parse_bool(REMEX_SKIP_CACHE_LOOKUP_VAR, &value)?;
    }
    if let Some(value) = lookup(REMEX_DOWNLOAD_CONCURRENCY_VAR) {
        config.download_concurrency = value.trim().parse().map_err(|_| {
            Error::configuration(format!(
                "{REMEX_DOWNLOAD_CONCURRENCY_VAR} must be a positive integer, got '{value}'"
            ))
        })?;
    }
    if let Some(value) = lookup(REMEX_VERIFY_DOWNLOADS_VAR) {
        config.verify_downloads = parse_bool(REMEX_VERIFY_DOWNLOADS_VAR, &value)?;
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}
