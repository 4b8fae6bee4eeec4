//! Item entity - Represents a single piece of gear in the inventory.
//!
//! An item is a microphone, a mixer, a flight case and so on. Items flagged with
//! `is_container` may hold other items, which point back at them through
//! `container_id`. Purchase data feeds the depreciation engine.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an item
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Ready to be used
    #[default]
    #[sea_orm(string_value = "available")]
    Available,
    /// Out on a job
    #[sea_orm(string_value = "in_use")]
    InUse,
    /// Scheduled maintenance
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    /// Known to be broken
    #[sea_orm(string_value = "broken")]
    Broken,
    /// Sold, kept for the record
    #[sea_orm(string_value = "sold")]
    Sold,
    /// Away for repair
    #[sea_orm(string_value = "repair")]
    Repair,
    /// Cannot be located
    #[sea_orm(string_value = "missing")]
    Missing,
}

/// Item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Top-level category (e.g., "Audio", "Lighting", "Cases")
    pub category: String,
    /// Finer category (e.g., "Microphone", "Mixer")
    pub sub_category: String,
    /// Manufacturer name
    pub manufacturer: String,
    /// Model designation
    pub model: String,
    /// Current status
    pub status: ItemStatus,
    /// Number of identical physical units represented by this record
    pub quantity: i32,
    /// Whether other items may be stored inside this one
    pub is_container: bool,
    /// Container this item is stored in, if any
    pub container_id: Option<i64>,
    /// Date of acquisition; records without one cannot be depreciated
    pub purchase_date: Option<Date>,
    /// Acquisition cost in whole currency units
    pub purchase_price: i64,
    /// Useful life in years
    pub lifespan: i32,
    /// When the item was created
    pub created_at: DateTime,
    /// When the item was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item may be stored inside one container item
    #[sea_orm(belongs_to = "Entity", from = "Column::ContainerId", to = "Column::Id")]
    Container,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Human-readable label used in logs and listings, e.g. `"Shure SM58"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.manufacturer, self.model).trim().to_string()
    }
}
