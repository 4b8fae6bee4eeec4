//! Shared test utilities for `GearTracker`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test items with sensible defaults.

use crate::{
    core::item::{NewItem, create_item},
    entities::{ItemStatus, item},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a plain (non-container) test item.
///
/// # Defaults
/// * `category`: "Audio"
/// * `manufacturer`: "Test"
/// * `purchase_date`: None
/// * `purchase_price`: 100
/// * `lifespan`: 5
pub async fn create_test_item(db: &DatabaseConnection, model: &str) -> Result<item::Model> {
    create_item(
        db,
        NewItem {
            category: "Audio".to_string(),
            manufacturer: "Test".to_string(),
            model: model.to_string(),
            purchase_price: 100,
            lifespan: 5,
            ..Default::default()
        },
    )
    .await
}

/// Creates a test item flagged as a container.
pub async fn create_test_container(db: &DatabaseConnection, model: &str) -> Result<item::Model> {
    create_item(
        db,
        NewItem {
            category: "Cases".to_string(),
            manufacturer: "Test".to_string(),
            model: model.to_string(),
            is_container: true,
            purchase_price: 100,
            lifespan: 10,
            ..Default::default()
        },
    )
    .await
}

/// Builds an in-memory item for pure graph tests, no database involved.
#[must_use]
pub fn snapshot_item(id: i64, is_container: bool, container_id: Option<i64>) -> item::Model {
    let now = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH.naive_utc();
    item::Model {
        id,
        category: "Audio".to_string(),
        sub_category: String::new(),
        manufacturer: "Test".to_string(),
        model: format!("Item {id}"),
        status: ItemStatus::Available,
        quantity: 1,
        is_container,
        container_id,
        purchase_date: None,
        purchase_price: 0,
        lifespan: 1,
        created_at: now,
        updated_at: now,
    }
}

/// Builds an in-memory item with the fields used for display ordering.
#[must_use]
pub fn described_item(
    id: i64,
    category: &str,
    manufacturer: &str,
    model: &str,
    container_id: Option<i64>,
) -> item::Model {
    item::Model {
        category: category.to_string(),
        manufacturer: manufacturer.to_string(),
        model: model.to_string(),
        ..snapshot_item(id, false, container_id)
    }
}
