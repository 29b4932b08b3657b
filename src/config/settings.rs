//! Configuration file support for obu

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub behavior: Behavior,
}

/// Fallback values for command arguments
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Defaults {
    /// Namespace used when neither `-n` nor the current context provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Internal registry settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistrySettings {
    #[serde(default = "default_service_account")]
    pub service_account: String,

    #[serde(default = "default_internal_host_prefix")]
    pub internal_host_prefix: String,
}

/// Behavior settings
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Behavior {
    /// Exit with status 1 when a query fails instead of only reporting it.
    #[serde(default)]
    pub exit_nonzero_on_error: bool,
}

// Default value functions
fn default_service_account() -> String {
    "builder".to_string()
}

fn default_internal_host_prefix() -> String {
    "image-registry.openshift-image-registry".to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            service_account: default_service_account(),
            internal_host_prefix: default_internal_host_prefix(),
        }
    }
}

impl Settings {
    /// Load settings from file or return defaults
    pub fn load() -> Self {
        let Some(path) = Self::find_config_file() else {
            return Self::default();
        };

        match Self::load_from_file(&path) {
            Ok(settings) => {
                crate::log_debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                crate::log_warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .obu.toml in current directory
    /// 2. ~/.config/obu/config.toml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(".obu.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("obu").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }
}
