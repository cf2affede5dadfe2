//! Sidecar configuration: optional TOML file plus environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "SIMASD_CONFIG";
pub const LOG_ENV: &str = "SIMASD_LOG";
pub const WORKSPACE_ENV: &str = "SIMASD_WORKSPACE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter directive, e.g. `info` or `simasd=debug`.
    pub log_level: Option<String>,
    /// Workspace opened at startup, before any `workspace.select`.
    pub workspace: Option<PathBuf>,
    /// Default directory for exported recaps.
    pub report_dir: Option<PathBuf>,
}

impl Config {
    pub fn parse(text: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Missing file means defaults. An unreadable file is reported back as a
    /// warning string alongside the defaults, since logging is not up yet.
    pub fn load() -> (Config, Option<String>) {
        let (mut cfg, warning) = match config_path() {
            Some(path) if path.is_file() => match read_file(&path) {
                Ok(cfg) => (cfg, None),
                Err(e) => (
                    Config::default(),
                    Some(format!("ignoring config {}: {e:#}", path.to_string_lossy())),
                ),
            },
            _ => (Config::default(), None),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        (cfg, warning)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(level) = var(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = Some(level);
        }
        if let Some(ws) = var(WORKSPACE_ENV).filter(|v| !v.trim().is_empty()) {
            self.workspace = Some(PathBuf::from(ws));
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|d| d.join("simasd").join("config.toml"))
}

fn read_file(path: &Path) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path)?;
    Config::parse(&text)
}
