//! Connection settings
//!
//! Read once at startup, from an optional TOML file named by
//! `CMKCTL_CONFIG` and then from the environment. Environment variables win
//! over file values, except the login shell's `USER`, which only fills in a
//! username the file left unset.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Environment variable naming an optional TOML settings file
pub const CONFIG_ENV: &str = "CMKCTL_CONFIG";

/// Checkmk connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Checkmk site name (`SITE_NAME`)
    pub site_name: Option<String>,
    /// REST base URL, e.g. `https://cmk/site/check_mk/api/1.0` (`REST_URL`)
    pub rest_url: Option<String>,
    /// CA bundle used to verify the server (`CAFILE`)
    pub ca_file: Option<PathBuf>,
    /// Automation user (`CMKCTL_USER`, or `USER` if the file sets none)
    pub username: Option<String>,
    /// File whose first line is the automation secret (`TOKENF`)
    pub secret_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `CMKCTL_CONFIG` (if set) and the process environment
    ///
    /// # Errors
    /// Returns a configuration error if the settings file cannot be read or
    /// parsed, or if a required setting is missing.
    pub fn load() -> Result<Self> {
        let settings = Self::resolve()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`], without checking for required settings
    ///
    /// # Errors
    /// Returns a configuration error if the settings file cannot be read or
    /// parsed.
    pub fn resolve() -> Result<Self> {
        let base = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.merge_env(|key| std::env::var(key).ok()))
    }

    /// Parse a TOML settings file
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Override fields with the environment variables found by `lookup`
    #[must_use]
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(site) = lookup("SITE_NAME") {
            self.site_name = Some(site);
        }
        if let Some(url) = lookup("REST_URL") {
            self.rest_url = Some(url);
        }
        if let Some(ca) = lookup("CAFILE") {
            self.ca_file = Some(PathBuf::from(ca));
        }
        if let Some(user) = lookup("CMKCTL_USER") {
            self.username = Some(user);
        } else if self.username.is_none() {
            self.username = lookup("USER");
        }
        if let Some(secret) = lookup("TOKENF") {
            self.secret_file = Some(PathBuf::from(secret));
        }

        debug!(
            site_name = ?self.site_name,
            rest_url = ?self.rest_url,
            ca_file = ?self.ca_file,
            username = ?self.username,
            secret_file = ?self.secret_file,
            "resolved settings"
        );
        self
    }

    /// Check that every required setting is present
    ///
    /// # Errors
    /// Returns a configuration error naming the first missing setting
    pub fn validate(&self) -> Result<()> {
        self.site()?;
        self.url()?;
        self.user()?;
        self.secret_path()?;
        Ok(())
    }

    /// Site name
    ///
    /// # Errors
    /// Returns a configuration error if unset
    pub fn site(&self) -> Result<&str> {
        required(self.site_name.as_deref(), "SITE_NAME")
    }

    /// REST base URL
    ///
    /// # Errors
    /// Returns a configuration error if unset
    pub fn url(&self) -> Result<&str> {
        required(self.rest_url.as_deref(), "REST_URL")
    }

    /// Automation user
    ///
    /// # Errors
    /// Returns a configuration error if unset
    pub fn user(&self) -> Result<&str> {
        required(self.username.as_deref(), "USER")
    }

    fn secret_path(&self) -> Result<&Path> {
        self.secret_file
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("TOKENF is not set".to_string()))
    }

    /// Read the automation secret: the first line of the secret file
    ///
    /// # Errors
    /// Returns a configuration error if the file is unset or unreadable
    pub fn read_secret(&self) -> Result<String> {
        let path = self.secret_path()?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!(
                "cannot read secret file {}: {e}",
                path.display()
            ))
        })?;
        let first = content.lines().next().unwrap_or_default();
        Ok(first.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ClientError::Configuration(format!("{name} is not set"))),
    }
}
