//! # Configuration Module
//!
//! Data directory setup and the optional on-disk planner defaults.
//!
//! ## Locations
//!
//! The SQLite catalog lives in the platform data directory:
//! - Linux: `~/.local/share/journey/library.db`
//! - macOS: `~/Library/Application Support/journey/library.db`
//! - Windows: `%APPDATA%\journey\library.db`
//!
//! Planner defaults are read from `config.json` in the platform config
//! directory (`~/.config/journey/config.json` on Linux). The file is
//! optional; missing keys take their defaults. Command-line flags override
//! whatever it sets.

use crate::energy::Progression;
use crate::journey::{DEFAULT_BLEND_SECONDS, DEFAULT_BPM_RANGE};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "journey";

/// Returns the journey data directory, creating it if needed.
///
/// # Errors
///
/// Fails if the platform has no data directory or it cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let journey_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&journey_dir).with_context(|| {
        format!(
            "Failed to create journey data directory at {}. Please check file permissions.",
            journey_dir.display()
        )
    })?;

    Ok(journey_dir)
}

/// Returns the SQLite catalog path.
///
/// ```no_run
/// let db_path = journey::config::get_db_path()?;
/// println!("Catalog location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.db"))
}

/// Returns the path of the optional `config.json`. The file may not exist.
///
/// # Errors
///
/// Fails if the platform has no config directory.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine system config directory."))?;
    Ok(config_dir.join(APP_DIR).join("config.json"))
}

/// Defaults for `journey generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerDefaults {
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Seconds.
    pub blend_duration: u32,
    pub progression: Progression,
    pub strict_key: bool,
    pub prefer_labels: bool,
    /// Fixed seed for reproducible plans; random when absent.
    pub seed: Option<u64>,
    /// Number of plans to try, keeping the best.
    pub alternatives: usize,
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        Self {
            min_bpm: DEFAULT_BPM_RANGE.0,
            max_bpm: DEFAULT_BPM_RANGE.1,
            blend_duration: DEFAULT_BLEND_SECONDS,
            progression: Progression::GradualBuild,
            strict_key: false,
            prefer_labels: true,
            seed: None,
            alternatives: 1,
        }
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the SQLite catalog
    pub db_path: PathBuf,
    pub planner: PlannerDefaults,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: get_db_path().unwrap_or_else(|_| PathBuf::from("library.db")),
            planner: PlannerDefaults::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the standard config location, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// Fails only when a config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load a specific config file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Create configuration with explicit database path
    #[must_use]
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            planner: PlannerDefaults::default(),
        }
    }
}
