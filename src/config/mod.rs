//! Configuration Management
//!
//! This module loads and saves the dbsniff configuration file and resolves the
//! connection settings for a run.
//!
//! # Configuration Location
//! - Default: `~/.config/dbsniff/config.json` (per-user, via `dirs`)
//! - Override: `--config PATH`
//!
//! # Resolution Precedence
//! 1. Explicit CLI parameters (highest priority)
//! 2. Named profile (or the configured default profile)
//! 3. Interactive prompt for anything still missing (done by the binary)
//!
//! There is no process-wide configuration: the resolved [`ConnectionConfig`] and the
//! [`Thresholds`] are passed explicitly to every operation that needs them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::ConnectionConfig;
use crate::error::{Result, SniffError};
use crate::probe::Thresholds;

/// Contents of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SniffConfig {
    /// Named connection profiles
    #[serde(default)]
    pub connections: BTreeMap<String, StoredConnection>,

    /// Profile used when none is named on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Policy thresholds for the diagnostic probes
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Stored connection profile
///
/// The password can be stored inline or read from an environment variable at
/// resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConnection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// WARNING: stored in clear text, prefer `password_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Partially resolved connection settings
///
/// Every field may still be missing; the binary prompts for the gaps before
/// calling [`ConnectionDraft::complete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDraft {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl ConnectionDraft {
    /// Overlay `other` on top of `self`; values present in `other` win
    #[must_use]
    pub fn overlay(self, other: Self) -> Self {
        Self {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            database: other.database.or(self.database),
        }
    }

    /// Names of the fields that are still missing
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.is_none() {
            missing.push("host");
        }
        if self.port.is_none() {
            missing.push("port");
        }
        if self.user.is_none() {
            missing.push("user");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        if self.database.is_none() {
            missing.push("database");
        }
        missing
    }

    /// Turn the draft into a validated [`ConnectionConfig`]
    pub fn complete(self) -> Result<ConnectionConfig> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(SniffError::invalid_input(format!(
                "missing connection parameters: {}",
                missing.join(", ")
            )));
        }

        let config = ConnectionConfig::new(
            self.host.unwrap_or_default(),
            self.port.unwrap_or_default(),
            self.user.unwrap_or_default(),
            self.password.unwrap_or_default(),
            self.database.unwrap_or_default(),
        );
        config.validate()?;
        Ok(config)
    }
}

impl StoredConnection {
    /// Build a profile from a validated config
    ///
    /// When `password_env` is given the password itself is not stored.
    #[must_use]
    pub fn from_config(config: &ConnectionConfig, password_env: Option<String>) -> Self {
        Self {
            host: Some(config.host.clone()),
            port: Some(config.port),
            user: Some(config.user.clone()),
            password: if password_env.is_some() { None } else { Some(config.password.clone()) },
            password_env,
            database: Some(config.database.clone()),
        }
    }

    /// Resolve environment variables and return a draft
    pub fn resolve(&self) -> Result<ConnectionDraft> {
        let password = match &self.password_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                SniffError::config_error(format!("Environment variable {var} not found for password"))
            })?),
            None => self.password.clone(),
        };

        Ok(ConnectionDraft {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password,
            database: self.database.clone(),
        })
    }
}

impl SniffConfig {
    /// Resolve the named profile, or the default profile when `name` is `None`
    ///
    /// With no name and no default an empty draft is returned.
    pub fn profile_draft(&self, name: Option<&str>) -> Result<ConnectionDraft> {
        let Some(name) = name.or(self.default.as_deref()) else {
            return Ok(ConnectionDraft::default());
        };

        let stored = self.connections.get(name).ok_or_else(|| {
            let available: Vec<_> = self.connections.keys().collect();
            SniffError::config_error(format!(
                "Profile '{name}' not found. Available profiles: {available:?}"
            ))
        })?;

        stored.resolve()
    }

    /// Insert or replace a profile; the first profile saved becomes the default
    pub fn upsert_profile(&mut self, name: impl Into<String>, profile: StoredConnection) {
        let name = name.into();
        if self.connections.is_empty() && self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.connections.insert(name, profile);
    }
}

/// Default config path: `~/.config/dbsniff/config.json`
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SniffError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("dbsniff").join("config.json"))
}

/// Load the config file; a missing file yields the default configuration
pub fn load_config(path: &Path) -> Result<SniffConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(SniffConfig::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| SniffError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents)
        .map_err(|e| SniffError::config_error(format!("Invalid config file format: {e}")))
}

/// Write the config file, creating its directory if needed
pub fn save_config(path: &Path, config: &SniffConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SniffError::config_error(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(config)
        .map_err(|e| SniffError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| SniffError::config_error(format!("Could not write config file: {e}")))?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
