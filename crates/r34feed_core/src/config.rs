/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - R34Feed Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_ENV: &str = "R34FEED_CONFIG";
pub const DATA_DIR_ENV: &str = "R34FEED_DATA_DIR";
pub const POST_LIST_URL_ENV: &str = "R34FEED_API_POST_LIST_URL";
pub const API_KEY_ENV: &str = "R34FEED_API_KEY";
pub const USER_ID_ENV: &str = "R34FEED_API_USER_ID";

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Post listing endpoint, already carrying its own query string
    /// (e.g. `https://host/index.php?page=dapi&s=post&q=index`).
    pub base_url: String,
    pub api_key: String,
    pub user_id: String,
    pub data_dir: Option<String>,
    pub http_timeout_secs: u64,
    pub retry_attempts: u32,
    pub page_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rule34.xxx/index.php?page=dapi&s=post&q=index".to_string(),
            api_key: String::new(),
            user_id: String::new(),
            data_dir: None,
            http_timeout_secs: 20,
            retry_attempts: 3,
            page_limit: 100,
        }
    }
}

impl ClientConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("decode client config")
    }

    /// Reads `path`; a missing file yields defaults, env overrides apply either way.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)
                .with_context(|| format!("parse config: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("config missing: {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read config: {}", path.display()));
            }
        };
        cfg.apply_env_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn apply_env_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = non_empty(POST_LIST_URL_ENV) {
            self.base_url = v;
        }
        if let Some(v) = non_empty(API_KEY_ENV) {
            self.api_key = v;
        }
        if let Some(v) = non_empty(USER_ID_ENV) {
            self.user_id = v;
        }
        if let Some(v) = non_empty(DATA_DIR_ENV) {
            self.data_dir = Some(v);
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => default_data_dir(),
        }
    }

    pub fn storage_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("r34feed.db"))
    }
}

pub fn default_data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("net", "r34feed", "R34Feed")
        .context("unable to determine platform data dir")?;
    Ok(proj.data_local_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("net", "r34feed", "R34Feed")
        .context("unable to determine platform config dir")?;
    Ok(proj.config_dir().join("config.json"))
}

/// `--config` wins over `R34FEED_CONFIG`, which wins over the platform path.
pub fn resolve_config_path(cli: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli {
        return Ok(path);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    default_config_path()
}
