//! Service configuration.
//!
//! Resolution order: built-in defaults, then the TOML file named by
//! `HOMELY_CONFIG` (or `homely.toml` in the working directory when present),
//! then `HOMELY_*` environment overrides. Override values that fail to parse
//! are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::pipeline::ArtifactPaths;

const CONFIG_ENV: &str = "HOMELY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "homely.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub model: PathBuf,
    pub preprocessor: PathBuf,
    pub explainer: Option<PathBuf>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/xgb_model.json"),
            preprocessor: PathBuf::from("models/xgb_model_preprocessor.json"),
            explainer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive for the `homely` target.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Runtime configuration of the prediction service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load defaults, the config file if any, and environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match resolve_config_path()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config file {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed parsing TOML config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_non_empty);
    }

    /// Apply `HOMELY_*` overrides from an arbitrary lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOMELY_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("HOMELY_PORT") {
            if let Ok(parsed) = v.trim().parse::<u16>() {
                self.server.port = parsed;
            }
        }
        if let Some(v) = lookup("HOMELY_MODEL_PATH") {
            self.artifacts.model = PathBuf::from(v);
        }
        if let Some(v) = lookup("HOMELY_PREPROCESSOR_PATH") {
            self.artifacts.preprocessor = PathBuf::from(v);
        }
        if let Some(v) = lookup("HOMELY_EXPLAINER_PATH") {
            self.artifacts.explainer = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HOMELY_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// `host:port` to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.artifacts.model.clone(),
            preprocessor: self.artifacts.preprocessor.clone(),
            explainer: self.artifacts.explainer.clone(),
        }
    }
}

fn resolve_config_path() -> Result<Option<PathBuf>> {
    if let Some(path) = env_non_empty(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if !path.is_file() {
            anyhow::bail!("{CONFIG_ENV} points to missing file {}", path.display());
        }
        return Ok(Some(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    Ok(default.is_file().then_some(default))
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
