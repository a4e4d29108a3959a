// src/config.rs

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::file_cleaner::error::Result;
use crate::file_cleaner::removal::running_as_root;

pub const CATALOG_ENV: &str = "MAC_CLEANER_CATALOG";
pub const ALLOW_ELEVATION_ENV: &str = "MAC_CLEANER_ALLOW_ELEVATION";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    // Catalog document location
    pub catalog_path: PathBuf,

    // Validator
    pub protected_paths: Vec<PathBuf>,
    pub reject_traversal: bool,

    // Privileged removal fallback
    pub allow_elevation: bool,
    pub elevation_program: String, // "sudo", or "osascript" on macOS
}

impl Default for CleanerConfig {
    fn default() -> Self {
        CleanerConfig {
            catalog_path: default_catalog_path(),
            protected_paths: [
                "/System",
                "/usr",
                "/bin",
                "/sbin",
                "/etc",
                "/private/etc",
                "/Library/Apple",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            reject_traversal: true,
            allow_elevation: running_as_root(),
            elevation_program: "sudo".to_string(),
        }
    }
}

impl CleanerConfig {
    /// Reads a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = env::var(CATALOG_ENV) {
            if !path.trim().is_empty() {
                self.catalog_path = PathBuf::from(path);
            }
        }
        if let Ok(value) = env::var(ALLOW_ELEVATION_ENV) {
            if let Some(flag) = parse_flag(&value) {
                self.allow_elevation = flag;
            }
        }
        self
    }
}

fn default_catalog_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("config"));
    path.push("mac-cleaner");
    path.push("locations_db.json");
    path
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
