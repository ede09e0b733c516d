//! Configuration file loading for tether.
//!
//! Reads `.tether/tether.json` and provides typed access to all settings.
//! Falls back to sensible defaults when the config file is missing or incomplete.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RenderOptions;

/// Top-level tether configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TetherConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Module prefixes owned by the checked program. Subclass instances of
    /// classes under these prefixes are held to the parent's declared types.
    #[serde(default)]
    pub checked_prefixes: Vec<String>,
    #[serde(default)]
    pub returns: ReturnsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Return-site narrowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsConfig {
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

/// Per-annotation checker cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Violation rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_true")]
    pub show_source: bool,
    #[serde(default = "default_max_given_chars")]
    pub max_given_chars: usize,
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_true() -> bool {
    true
}
fn default_lookback() -> usize {
    2
}
fn default_max_given_chars() -> usize {
    200
}

impl Default for ReturnsConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_source: true,
            max_given_chars: default_max_given_chars(),
        }
    }
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            checked_prefixes: vec![],
            returns: ReturnsConfig::default(),
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(cfg: &RenderConfig) -> Self {
        RenderOptions {
            show_source: cfg.show_source,
            max_given_chars: cfg.max_given_chars,
        }
    }
}

impl TetherConfig {
    /// Load configuration from `tether.json` inside the given tether directory.
    /// Returns defaults if the file doesn't exist or can't be parsed.
    pub fn load(tether_dir: &Path) -> Self {
        let config_path = tether_dir.join("tether.json");
        let content = match std::fs::read_to_string(&config_path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "failed to parse tether config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Whether `module` lies under one of the owned prefixes.
    pub fn is_owned(&self, module: &str) -> bool {
        self.checked_prefixes
            .iter()
            .any(|p| module == p || module.starts_with(&format!("{p}.")))
    }
}
