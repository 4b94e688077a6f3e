//! Check Configuration - JSON, Every Field Defaulted

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::messages::MessageCatalog;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConfig {
    /// Directory, relative to the package root, searched for SVG assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    #[serde(default)]
    pub write_mode: WriteMode,
    /// Message id -> template overrides
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

fn default_assets_dir() -> String { "assets".to_string() }

/// How a sanitized asset replaces the original file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Write straight over the existing file
    #[default]
    Overwrite,
    /// Write a sibling temp file, then rename it over the original
    Atomic,
}

impl CheckConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn catalog(&self) -> MessageCatalog {
        MessageCatalog::with_overrides(&self.messages)
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            write_mode: WriteMode::default(),
            messages: BTreeMap::new(),
        }
    }
}
