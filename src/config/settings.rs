//! Application settings loaded from config.toml
//!
//! The file carries the depreciation policy constants and an optional list of
//! items used to seed an empty inventory. Every section is optional; a missing
//! section falls back to its defaults.

use crate::core::depreciation::DepreciationPolicy;
use crate::entities::ItemStatus;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Depreciation constants (residual value, days per year)
    #[serde(default)]
    pub depreciation: DepreciationPolicy,
    /// Items to insert when the inventory is empty
    #[serde(default)]
    pub items: Vec<ItemSeed>,
}

/// Configuration for a single seed item
#[derive(Debug, Deserialize, Clone)]
pub struct ItemSeed {
    /// Top-level category
    pub category: String,
    /// Finer category
    #[serde(default)]
    pub sub_category: String,
    /// Manufacturer name
    pub manufacturer: String,
    /// Model designation
    pub model: String,
    /// Initial status
    #[serde(default)]
    pub status: ItemStatus,
    /// Number of identical units
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Whether the item can hold other items
    #[serde(default)]
    pub is_container: bool,
    /// Purchase date as `YYYY-MM-DD`
    #[serde(default)]
    pub purchase_date: Option<String>,
    /// Purchase price in whole currency units
    #[serde(default)]
    pub purchase_price: i64,
    /// Useful life in years
    pub lifespan: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields of a seed item are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
///
/// The depreciation policy is validated so a bad constant cannot turn into
/// NaN book values later.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.depreciation.validate()?;
    Ok(config)
}

/// Loads ./config.toml, or the defaults when the file does not exist.
///
/// A file that exists but fails to parse is still an error.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if !path.exists() {
        warn!("config.toml not found, using default settings");
        return Ok(Config::default());
    }
    load_config(path)
}
