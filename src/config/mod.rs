/// Database configuration and connection management
pub mod database;

/// Depreciation policy and seed items from config.toml
pub mod settings;
