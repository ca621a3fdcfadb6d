// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use dexview_api::DEFAULT_LISTING_LIMIT;
use dexview_app::DEFAULT_HYDRATION_WORKERS;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const APP_NAME: &str = "dexview";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_LISTING_URL: &str = "https://pokeapi.co/api/v2/pokemon";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub hydration: Hydration,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            hydration: Hydration::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub listing_url: Option<String>,
    pub listing_limit: Option<i64>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            listing_url: Some(DEFAULT_LISTING_URL.to_owned()),
            listing_limit: Some(DEFAULT_LISTING_LIMIT as i64),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hydration {
    pub workers: Option<i64>,
}

impl Default for Hydration {
    fn default() -> Self {
        Self {
            workers: Some(DEFAULT_HYDRATION_WORKERS as i64),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DEXVIEW_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set DEXVIEW_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [hydration], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(raw) = &self.api.listing_url {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                bail!("api.listing_url in {} must not be empty", path.display());
            }
            let parsed = Url::parse(trimmed).with_context(|| {
                format!("api.listing_url in {} is not a valid URL", path.display())
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!(
                    "api.listing_url in {} must use http or https, got {:?}",
                    path.display(),
                    parsed.scheme()
                );
            }
        }

        if let Some(limit) = self.api.listing_limit
            && limit <= 0
        {
            bail!(
                "api.listing_limit in {} must be positive, got {}",
                path.display(),
                limit
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(workers) = self.hydration.workers
            && workers <= 0
        {
            bail!(
                "hydration.workers in {} must be positive, got {}",
                path.display(),
                workers
            );
        }

        if let Some(file) = &self.logging.file
            && file.trim().is_empty()
        {
            bail!("logging.file in {} must not be empty", path.display());
        }

        Ok(())
    }

    pub fn listing_url(&self) -> &str {
        self.api
            .listing_url
            .as_deref()
            .unwrap_or(DEFAULT_LISTING_URL)
            .trim()
            .trim_end_matches('/')
    }

    pub fn listing_limit(&self) -> usize {
        self.api
            .listing_limit
            .and_then(|limit| usize::try_from(limit).ok())
            .unwrap_or(DEFAULT_LISTING_LIMIT)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn hydration_workers(&self) -> usize {
        self.hydration
            .workers
            .and_then(|workers| usize::try_from(workers).ok())
            .unwrap_or(DEFAULT_HYDRATION_WORKERS)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.logging.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                let data_root = dirs::data_dir().ok_or_else(|| {
                    anyhow!("cannot resolve data directory; set [logging].file in the config")
                })?;
                Ok(data_root.join(APP_NAME).join("dexview.log"))
            }
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# dexview config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nlisting_url = \"{}\"\nlisting_limit = {}\ntimeout = \"{}\"\n\n[hydration]\nworkers = {}\n\n[logging]\nlevel = \"{}\"\n# Optional. Default is platform data dir (for example ~/.local/share/dexview/dexview.log)\n# file = \"/absolute/path/to/dexview.log\"\n",
            path.display(),
            DEFAULT_LISTING_URL,
            DEFAULT_LISTING_LIMIT,
            DEFAULT_TIMEOUT,
            DEFAULT_HYDRATION_WORKERS,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
