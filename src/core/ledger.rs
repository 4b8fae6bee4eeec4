//! Depreciation ledger and inventory valuation.
//!
//! Builds the structured rows that spreadsheet, PDF and label generators
//! format. Items whose depreciation cannot be computed (usually a blank
//! purchase date) stay in the ledger with an explicit "not computable" value
//! instead of a made-up number.

use crate::{
    core::{
        containment,
        depreciation::{DepreciationPolicy, DepreciationResult},
    },
    entities::{ItemStatus, item},
    errors::Result,
};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Book value of one ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BookValue {
    /// Depreciation was computed
    Computed(DepreciationResult),
    /// Depreciation cannot be computed for this item
    NotComputable {
        /// Why the value is missing
        reason: String,
    },
}

impl BookValue {
    /// The computed result, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&DepreciationResult> {
        match self {
            Self::Computed(result) => Some(result),
            Self::NotComputable { .. } => None,
        }
    }
}

/// One item in the depreciation ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    /// Item id
    pub item_id: i64,
    /// Top-level category
    pub category: String,
    /// Manufacturer and model
    pub label: String,
    /// Current status
    pub status: ItemStatus,
    /// Number of identical units
    pub quantity: i32,
    /// Acquisition cost per unit
    pub purchase_price: i64,
    /// Depreciation figures per unit
    pub book_value: BookValue,
}

/// Totals over a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryValuation {
    /// Sum of purchase price × quantity over computable rows, saturating at `i64::MAX`
    pub total_purchase_value: i64,
    /// Sum of book value × quantity over computable rows, saturating at `i64::MAX`
    pub total_book_value: i64,
    /// Rows with a computed book value
    pub computable_items: usize,
    /// Rows without a computable book value
    pub not_computable_items: usize,
    /// Rows at the end of their useful life
    pub fully_depreciated_items: usize,
    /// Number of item records per status
    pub items_by_status: BTreeMap<ItemStatus, usize>,
}

/// Builds ledger rows for `items` as of `as_of`.
#[must_use]
pub fn build_ledger(
    items: &[item::Model],
    policy: &DepreciationPolicy,
    as_of: NaiveDateTime,
) -> Vec<LedgerRow> {
    items
        .iter()
        .map(|item| {
            let lifespan = u32::try_from(item.lifespan).unwrap_or(0);
            let book_value =
                match policy.compute(item.purchase_date, item.purchase_price, lifespan, as_of) {
                    Ok(result) => BookValue::Computed(result),
                    Err(e) => {
                        debug!("Item {} not depreciable: {}", item.id, e);
                        BookValue::NotComputable {
                            reason: e.to_string(),
                        }
                    }
                };

            LedgerRow {
                item_id: item.id,
                category: item.category.clone(),
                label: item.label(),
                status: item.status,
                quantity: item.quantity,
                purchase_price: item.purchase_price,
                book_value,
            }
        })
        .collect()
}

/// Totals a ledger.
#[must_use]
pub fn summarize(rows: &[LedgerRow]) -> InventoryValuation {
    let mut valuation = InventoryValuation::default();

    for row in rows {
        *valuation.items_by_status.entry(row.status).or_default() += 1;

        match row.book_value.result() {
            Some(result) => {
                let units = i64::from(row.quantity);
                valuation.computable_items += 1;
                valuation.total_purchase_value = valuation
                    .total_purchase_value
                    .saturating_add(row.purchase_price.saturating_mul(units));
                valuation.total_book_value = valuation
                    .total_book_value
                    .saturating_add(result.book_value.saturating_mul(units));
                if result.is_fully_depreciated() {
                    valuation.fully_depreciated_items += 1;
                }
            }
            None => valuation.not_computable_items += 1,
        }
    }

    valuation
}

/// Loads the current inventory and builds its ledger and valuation.
#[instrument(skip(db, policy))]
pub async fn generate_ledger(
    db: &DatabaseConnection,
    policy: &DepreciationPolicy,
    as_of: NaiveDateTime,
) -> Result<(Vec<LedgerRow>, InventoryValuation)> {
    let items = containment::load_snapshot(db).await?;
    let rows = build_ledger(&items, policy, as_of);
    let valuation = summarize(&rows);
    Ok((rows, valuation))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::item::{NewItem, create_item};
    use crate::test_utils::*;
    use chrono::NaiveDate;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn priced(id: i64, date: Option<NaiveDate>, price: i64, quantity: i32) -> item::Model {
        let mut item = snapshot_item(id, false, None);
        item.purchase_date = date;
        item.purchase_price = price;
        item.quantity = quantity;
        item.lifespan = 5;
        item
    }

    #[test]
    fn test_build_ledger_marks_missing_dates() {
        let items = vec![
            priced(1, NaiveDate::from_ymd_opt(2024, 1, 1), 1_000, 2),
            priced(2, None, 500, 1),
        ];
        let rows = build_ledger(&items, &DepreciationPolicy::default(), as_of());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].book_value.result().unwrap().book_value, 1_000);
        assert!(matches!(rows[1].book_value, BookValue::NotComputable { .. }));
    }

    #[test]
    fn test_summarize_totals() {
        let mut sold = priced(3, NaiveDate::from_ymd_opt(2010, 1, 1), 300, 1);
        sold.status = ItemStatus::Sold;
        let items = vec![
            priced(1, NaiveDate::from_ymd_opt(2024, 1, 1), 1_000, 2),
            priced(2, None, 500, 1),
            sold,
        ];
        let rows = build_ledger(&items, &DepreciationPolicy::default(), as_of());
        let valuation = summarize(&rows);

        assert_eq!(valuation.computable_items, 2);
        assert_eq!(valuation.not_computable_items, 1);
        assert_eq!(valuation.fully_depreciated_items, 1);
        assert_eq!(valuation.total_purchase_value, 2_300);
        assert_eq!(valuation.total_book_value, 2_001);
        assert_eq!(
            valuation.items_by_status.get(&ItemStatus::Available),
            Some(&2)
        );
        assert_eq!(valuation.items_by_status.get(&ItemStatus::Sold), Some(&1));
    }

    #[test]
    fn test_summarize_saturates_large_totals() {
        let items = vec![
            priced(1, NaiveDate::from_ymd_opt(2024, 1, 1), i64::MAX / 2, 3),
            priced(2, NaiveDate::from_ymd_opt(2024, 1, 1), i64::MAX, 1),
        ];
        let rows = build_ledger(&items, &DepreciationPolicy::default(), as_of());
        let valuation = summarize(&rows);

        assert_eq!(valuation.computable_items, 2);
        assert_eq!(valuation.total_purchase_value, i64::MAX);
        assert_eq!(valuation.total_book_value, i64::MAX);
    }

    #[tokio::test]
    async fn test_generate_ledger_integration() -> Result<()> {
        let db = setup_test_db().await?;
        create_item(
            &db,
            NewItem {
                category: "Audio".to_string(),
                manufacturer: "Allen & Heath".to_string(),
                model: "SQ-5".to_string(),
                purchase_date: NaiveDate::from_ymd_opt(2019, 1, 1),
                purchase_price: 100_000,
                lifespan: 5,
                ..Default::default()
            },
        )
        .await?;
        create_test_item(&db, "No Date").await?;

        let (rows, valuation) =
            generate_ledger(&db, &DepreciationPolicy::default(), as_of()).await?;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Allen & Heath SQ-5");
        let result = rows[0].book_value.result().unwrap();
        assert_eq!(result.yearly_breakdown.last().unwrap().depreciation, 20_003);
        assert_eq!(valuation.not_computable_items, 1);
        Ok(())
    }
}
