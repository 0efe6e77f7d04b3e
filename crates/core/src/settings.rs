use crate::manifest::{FetchConfig, RetryPolicy, SessionConfig};
use crate::SnatchError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "snatcher.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    engine: EngineSection,
    session: SessionSection,
    fetch: FetchSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct EngineSection {
    max_command_send_retries: Option<u32>,
    max_retries_per_item: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct SessionSection {
    poll_interval_ms: Option<u64>,
    poll_attempts: Option<u32>,
    settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct FetchSection {
    max_retries: Option<u32>,
    backoff_ms: Option<u64>,
    redirect_limit: Option<u8>,
}

/// Layered settings: built-in defaults, then `snatcher.toml`, then
/// environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    config_dir: PathBuf,
    file: SettingsFile,
}

impl Settings {
    /// Loads `snatcher.toml` from the config directory (if present) and
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        let config_dir = if let Ok(home) = std::env::var("SNATCHER_HOME") {
            PathBuf::from(home)
        } else {
            dirs::config_dir()
                .context("Could not find config directory")?
                .join("snatcher")
        };

        let path = config_dir.join(SETTINGS_FILE);
        let file = if path.exists() {
            read_file(&path)?
        } else {
            SettingsFile::default()
        };

        let mut settings = Self { config_dir, file };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Loads an explicit settings file, ignoring the config directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = read_file(path)?;
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut settings = Self { config_dir, file };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SnatchError> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| SnatchError::Config(e.to_string()))?;
        Ok(Self {
            config_dir: PathBuf::from("."),
            file,
        })
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "SNATCHER_POLL_ATTEMPTS") {
            self.file.session.poll_attempts = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "SNATCHER_POLL_INTERVAL_MS") {
            self.file.session.poll_interval_ms = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "SNATCHER_FETCH_RETRIES") {
            self.file.fetch.max_retries = Some(v);
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Values set in the settings file win over the processor's defaults.
    pub fn retry_policy(&self, defaults: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_command_send_retries: self
                .file
                .engine
                .max_command_send_retries
                .unwrap_or(defaults.max_command_send_retries),
            max_retries_per_item: self
                .file
                .engine
                .max_retries_per_item
                .unwrap_or(defaults.max_retries_per_item),
        }
    }

    pub fn session(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        let section = &self.file.session;
        SessionConfig {
            poll_interval: section
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            poll_attempts: section.poll_attempts.unwrap_or(defaults.poll_attempts),
            settle: section
                .settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle),
        }
    }

    pub fn fetch(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        let section = &self.file.fetch;
        FetchConfig {
            max_retries: section.max_retries.unwrap_or(defaults.max_retries).max(1),
            backoff: section
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
            redirect_limit: section.redirect_limit.unwrap_or(defaults.redirect_limit),
        }
    }
}

fn read_file(path: &Path) -> Result<SettingsFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}
