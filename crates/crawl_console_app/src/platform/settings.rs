use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crawl_console_core::POLL_INTERVAL;
use crawl_console_engine::{AtomicFileWriter, ServiceSettings};
use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use url::Url;

use super::cli::Cli;

/// Keeps the settings file from growing without bound.
const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DownloadRecord {
    pub task_id: String,
    pub url: Option<String>,
    pub path: PathBuf,
    pub downloaded_utc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub(crate) struct PersistedSettings {
    pub server_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub use_feed: Option<bool>,
    pub history: Vec<DownloadRecord>,
}

impl PersistedSettings {
    pub fn record_download(&mut self, record: DownloadRecord) {
        self.history.push(record);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

/// Effective configuration after merging command line, settings file and
/// defaults, in that order of precedence.
#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub service: ServiceSettings,
    pub poll_interval: Duration,
    pub use_feed: bool,
    pub initial_url: Option<String>,
    pub auto_preview: bool,
    pub auto_download: bool,
}

impl AppConfig {
    pub fn resolve(cli: &Cli, saved: &PersistedSettings) -> Result<Self> {
        let defaults = ServiceSettings::default();

        let base_url = match cli.server.as_deref().or(saved.server_url.as_deref()) {
            Some(raw) => parse_server_url(raw)?,
            None => defaults.base_url.clone(),
        };
        let output_dir = cli
            .output
            .clone()
            .or_else(|| saved.output_dir.clone())
            .unwrap_or_else(|| defaults.output_dir.clone());
        let poll_interval = cli
            .poll_interval_ms
            .or(saved.poll_interval_ms)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(POLL_INTERVAL);
        let use_feed = if cli.feed {
            true
        } else if cli.no_feed {
            false
        } else {
            saved.use_feed.unwrap_or(true)
        };

        Ok(Self {
            service: ServiceSettings {
                base_url,
                output_dir,
                ..defaults
            },
            poll_interval,
            use_feed,
            initial_url: cli.url.clone(),
            auto_preview: cli.preview,
            auto_download: cli.download,
        })
    }

    /// Writes the effective values back so the next run starts from them.
    /// `use_feed` is left alone: `--no-feed` only applies to the current run.
    pub fn store_into(&self, saved: &mut PersistedSettings) {
        saved.server_url = Some(self.service.base_url.to_string());
        saved.output_dir = Some(self.service.output_dir.clone());
        saved.poll_interval_ms = Some(self.poll_interval.as_millis() as u64);
    }
}

/// Directory-style base so relative endpoints resolve below it.
fn parse_server_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid server url {raw:?}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("server url {raw:?} cannot be used as a base");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn load_settings(path: &Path) -> PersistedSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PersistedSettings::default();
        }
        Err(err) => {
            engine_warn!("Failed to read settings from {:?}: {}", path, err);
            return PersistedSettings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            engine_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            engine_warn!("Failed to parse settings from {:?}: {}", path, err);
            PersistedSettings::default()
        }
    }
}

pub(crate) fn save_settings(path: &Path, settings: &PersistedSettings) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(settings, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize settings: {}", err);
            return;
        }
    };

    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        engine_error!("Settings path {:?} has no file name", path);
        return;
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let writer = AtomicFileWriter::new(dir);
    if let Err(err) = writer.write(filename, content.as_bytes()) {
        engine_error!("Failed to write settings to {:?}: {}", path, err);
    }
}
