//! Core business logic - framework-agnostic containment, depreciation and item operations.

/// Which item is stored inside which container
pub mod containment;
/// Straight-line depreciation engine
pub mod depreciation;
/// Item records: create, update, delete, seed
pub mod item;
/// Depreciation ledger and inventory valuation
pub mod ledger;
