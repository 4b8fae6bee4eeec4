//! Item business logic - Handles creating, reading, updating and deleting gear records.
//!
//! Every mutation refreshes `updated_at`. Container assignments made here go
//! through the same validation as [`crate::core::containment::set_container`],
//! and deleting an item releases everything stored inside it within the same
//! database transaction.

use crate::{
    config::settings::ItemSeed,
    core::{
        containment::{self, ContainmentGraph},
        depreciation::parse_purchase_date,
    },
    entities::{Item, ItemStatus, item},
    errors::{ContainmentViolation, Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Fields needed to create an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Top-level category
    pub category: String,
    /// Finer category
    pub sub_category: String,
    /// Manufacturer name
    pub manufacturer: String,
    /// Model designation
    pub model: String,
    /// Initial status
    pub status: ItemStatus,
    /// Number of identical units
    pub quantity: i32,
    /// Whether other items may be stored inside this one
    pub is_container: bool,
    /// Container to store the new item in
    pub container_id: Option<i64>,
    /// Date of acquisition
    pub purchase_date: Option<NaiveDate>,
    /// Acquisition cost in whole currency units
    pub purchase_price: i64,
    /// Useful life in years
    pub lifespan: i32,
}

impl Default for NewItem {
    fn default() -> Self {
        Self {
            category: String::new(),
            sub_category: String::new(),
            manufacturer: String::new(),
            model: String::new(),
            status: ItemStatus::Available,
            quantity: 1,
            is_container: false,
            container_id: None,
            purchase_date: None,
            purchase_price: 0,
            lifespan: 1,
        }
    }
}

/// Editable descriptive and financial fields of an existing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetails {
    /// Top-level category
    pub category: String,
    /// Finer category
    pub sub_category: String,
    /// Manufacturer name
    pub manufacturer: String,
    /// Model designation
    pub model: String,
    /// Number of identical units
    pub quantity: i32,
    /// Date of acquisition
    pub purchase_date: Option<NaiveDate>,
    /// Acquisition cost in whole currency units
    pub purchase_price: i64,
    /// Useful life in years
    pub lifespan: i32,
}

impl From<&item::Model> for ItemDetails {
    fn from(model: &item::Model) -> Self {
        Self {
            category: model.category.clone(),
            sub_category: model.sub_category.clone(),
            manufacturer: model.manufacturer.clone(),
            model: model.model.clone(),
            quantity: model.quantity,
            purchase_date: model.purchase_date,
            purchase_price: model.purchase_price,
            lifespan: model.lifespan,
        }
    }
}

fn validate_numbers(purchase_price: i64, lifespan: i32, quantity: i32) -> Result<()> {
    if purchase_price < 0 {
        return Err(Error::InvalidInput {
            field: "purchase_price",
            message: format!("must not be negative, got {purchase_price}"),
        });
    }
    if lifespan < 1 {
        return Err(Error::InvalidInput {
            field: "lifespan",
            message: format!("must be at least 1 year, got {lifespan}"),
        });
    }
    if quantity < 0 {
        return Err(Error::InvalidInput {
            field: "quantity",
            message: format!("must not be negative, got {quantity}"),
        });
    }
    Ok(())
}

/// Retrieves all items ordered by id.
pub async fn get_all_items(db: &DatabaseConnection) -> Result<Vec<item::Model>> {
    containment::load_snapshot(db).await
}

/// Finds an item by its id.
pub async fn get_item_by_id(db: &DatabaseConnection, item_id: i64) -> Result<Option<item::Model>> {
    Item::find_by_id(item_id).one(db).await.map_err(Into::into)
}

async fn find_existing<C>(db: &C, item_id: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(Error::ItemNotFound { id: item_id })
}

/// Creates a new item.
///
/// When `container_id` is set the item is inserted and then assigned inside
/// one transaction, so a rejected assignment leaves no record behind.
///
/// # Errors
/// - [`Error::InvalidInput`] for a negative price or quantity, or a lifespan below 1
/// - [`Error::InvalidContainment`] if the requested container is invalid
/// - [`Error::Database`] if the insert fails
#[instrument(skip(db, new_item), fields(model = %new_item.model))]
pub async fn create_item(db: &DatabaseConnection, new_item: NewItem) -> Result<item::Model> {
    validate_numbers(new_item.purchase_price, new_item.lifespan, new_item.quantity)?;

    let now = chrono::Utc::now().naive_utc();
    let txn = db.begin().await?;

    let active = item::ActiveModel {
        category: Set(new_item.category.trim().to_string()),
        sub_category: Set(new_item.sub_category.trim().to_string()),
        manufacturer: Set(new_item.manufacturer.trim().to_string()),
        model: Set(new_item.model.trim().to_string()),
        status: Set(new_item.status),
        quantity: Set(new_item.quantity),
        is_container: Set(new_item.is_container),
        container_id: Set(None),
        purchase_date: Set(new_item.purchase_date),
        purchase_price: Set(new_item.purchase_price),
        lifespan: Set(new_item.lifespan),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let mut created = active.insert(&txn).await?;

    if let Some(container_id) = new_item.container_id {
        let snapshot = containment::load_snapshot(&txn).await?;
        ContainmentGraph::new(&snapshot).validate_assignment(created.id, Some(container_id))?;

        let mut active: item::ActiveModel = created.into();
        active.container_id = Set(Some(container_id));
        created = active.update(&txn).await?;
    }

    txn.commit().await?;
    info!("Created item {} ({})", created.id, created.label());
    Ok(created)
}

/// Updates the descriptive and financial fields of an item.
///
/// # Errors
/// - [`Error::InvalidInput`] for a negative price or quantity, or a lifespan below 1
/// - [`Error::ItemNotFound`] if the item does not exist
#[instrument(skip(db, details))]
pub async fn update_item_details(
    db: &DatabaseConnection,
    item_id: i64,
    details: ItemDetails,
) -> Result<item::Model> {
    validate_numbers(details.purchase_price, details.lifespan, details.quantity)?;

    let mut active: item::ActiveModel = find_existing(db, item_id).await?.into();
    active.category = Set(details.category.trim().to_string());
    active.sub_category = Set(details.sub_category.trim().to_string());
    active.manufacturer = Set(details.manufacturer.trim().to_string());
    active.model = Set(details.model.trim().to_string());
    active.quantity = Set(details.quantity);
    active.purchase_date = Set(details.purchase_date);
    active.purchase_price = Set(details.purchase_price);
    active.lifespan = Set(details.lifespan);
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    active.update(db).await.map_err(Into::into)
}

/// Changes the status of an item.
#[instrument(skip(db))]
pub async fn update_item_status(
    db: &DatabaseConnection,
    item_id: i64,
    status: ItemStatus,
) -> Result<item::Model> {
    let mut active: item::ActiveModel = find_existing(db, item_id).await?.into();
    active.status = Set(status);
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(db).await?;
    info!("Item {} is now {:?}", item_id, status);
    Ok(updated)
}

/// Turns the container flag of an item on or off.
///
/// # Errors
/// Returns [`ContainmentViolation::StillHasContents`] when clearing the flag
/// of a container that still holds items.
#[instrument(skip(db))]
pub async fn set_is_container(
    db: &DatabaseConnection,
    item_id: i64,
    is_container: bool,
) -> Result<item::Model> {
    let existing = find_existing(db, item_id).await?;
    if existing.is_container == is_container {
        return Ok(existing);
    }

    if !is_container {
        let held = Item::find()
            .filter(item::Column::ContainerId.eq(item_id))
            .count(db)
            .await?;
        if held > 0 {
            return Err(Error::containment(
                item_id,
                None,
                ContainmentViolation::StillHasContents,
            ));
        }
    }

    let mut active: item::ActiveModel = existing.into();
    active.is_container = Set(is_container);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await.map_err(Into::into)
}

/// Deletes an item after releasing everything stored inside it.
///
/// Both steps run in one transaction: if the references cannot be cleared
/// the item is not deleted. Returns the number of items released.
#[instrument(skip(db))]
pub async fn delete_item(db: &DatabaseConnection, item_id: i64) -> Result<u64> {
    let txn = db.begin().await?;

    let existing = find_existing(&txn, item_id).await?;
    let released = containment::on_item_deleted(&txn, item_id).await?;
    Item::delete_by_id(item_id).exec(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted item {} ({}), released {} contained items",
        item_id,
        existing.label(),
        released
    );
    Ok(released)
}

/// Inserts the configured seed items when the inventory is empty.
///
/// Seeds with an unusable purchase date are still inserted, without a date.
/// Returns the number of items created.
#[instrument(skip(db, seeds), fields(seeds = seeds.len()))]
pub async fn seed_items(db: &DatabaseConnection, seeds: &[ItemSeed]) -> Result<usize> {
    if Item::find().count(db).await? > 0 {
        info!("Inventory already populated, skipping seed items");
        return Ok(0);
    }

    let mut created = 0;
    for seed in seeds {
        let purchase_date = match seed.purchase_date.as_deref().map(parse_purchase_date) {
            Some(Ok(date)) => Some(date),
            Some(Err(e)) => {
                warn!("Seed item {} {}: {}", seed.manufacturer, seed.model, e);
                None
            }
            None => None,
        };

        create_item(
            db,
            NewItem {
                category: seed.category.clone(),
                sub_category: seed.sub_category.clone(),
                manufacturer: seed.manufacturer.clone(),
                model: seed.model.clone(),
                status: seed.status,
                quantity: seed.quantity,
                is_container: seed.is_container,
                container_id: None,
                purchase_date,
                purchase_price: seed.purchase_price,
                lifespan: seed.lifespan,
            },
        )
        .await?;
        created += 1;
    }

    info!("Seeded {} items", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::containment::{get_contents, get_parent, set_container};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_item_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let created = create_item(
            &db,
            NewItem {
                category: " Audio ".to_string(),
                manufacturer: "Shure".to_string(),
                model: "SM58".to_string(),
                quantity: 6,
                purchase_date: NaiveDate::from_ymd_opt(2023, 2, 1),
                purchase_price: 110,
                lifespan: 5,
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(created.category, "Audio");
        assert_eq!(created.status, ItemStatus::Available);
        assert_eq!(created.quantity, 6);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.label(), "Shure SM58");

        let found = get_item_by_id(&db, created.id).await?.unwrap();
        assert_eq!(found, created);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_item_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_item(
            &db,
            NewItem {
                purchase_price: -1,
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InvalidInput {
                field: "purchase_price",
                ..
            })
        ));

        let result = create_item(
            &db,
            NewItem {
                lifespan: 0,
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InvalidInput {
                field: "lifespan",
                ..
            })
        ));

        let result = create_item(
            &db,
            NewItem {
                quantity: -3,
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InvalidInput {
                field: "quantity",
                ..
            })
        ));

        assert!(get_all_items(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_item_inside_container() -> Result<()> {
        let db = setup_test_db().await?;
        let case = create_test_container(&db, "Case").await?;
        let amp = create_test_item(&db, "Amp").await?;

        let mic = create_item(
            &db,
            NewItem {
                model: "Beta 58".to_string(),
                container_id: Some(case.id),
                lifespan: 5,
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(mic.container_id, Some(case.id));

        let result = create_item(
            &db,
            NewItem {
                model: "Stray".to_string(),
                container_id: Some(amp.id),
                lifespan: 5,
                ..Default::default()
            },
        )
        .await;
        assert_eq!(
            result.unwrap_err().containment_violation(),
            Some(ContainmentViolation::NotAContainer)
        );

        // The rejected item was rolled back
        assert_eq!(get_all_items(&db).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_item_details_and_status() -> Result<()> {
        let db = setup_test_db().await?;
        let mixer = create_test_item(&db, "X32").await?;

        let mut details = ItemDetails::from(&mixer);
        details.manufacturer = "Behringer".to_string();
        details.purchase_price = 2_400;
        details.lifespan = 7;

        let updated = update_item_details(&db, mixer.id, details.clone()).await?;
        assert_eq!(updated.manufacturer, "Behringer");
        assert_eq!(updated.purchase_price, 2_400);
        assert_eq!(updated.lifespan, 7);
        assert!(updated.updated_at >= mixer.updated_at);

        details.lifespan = 0;
        let result = update_item_details(&db, mixer.id, details).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let repaired = update_item_status(&db, mixer.id, ItemStatus::Repair).await?;
        assert_eq!(repaired.status, ItemStatus::Repair);

        let result = update_item_status(&db, 999, ItemStatus::Sold).await;
        assert!(matches!(result, Err(Error::ItemNotFound { id: 999 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_is_container_guards_contents() -> Result<()> {
        let db = setup_test_db().await?;
        let case = create_test_container(&db, "Case").await?;
        let mic = create_test_item(&db, "Mic").await?;
        set_container(&db, mic.id, Some(case.id)).await?;

        let err = set_is_container(&db, case.id, false).await.unwrap_err();
        assert_eq!(
            err.containment_violation(),
            Some(ContainmentViolation::StillHasContents)
        );

        set_container(&db, mic.id, None).await?;
        let plain = set_is_container(&db, case.id, false).await?;
        assert!(!plain.is_container);

        let promoted = set_is_container(&db, mic.id, true).await?;
        assert!(promoted.is_container);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_item_releases_contents() -> Result<()> {
        let db = setup_test_db().await?;
        let case = create_test_container(&db, "Case").await?;
        let a = create_test_item(&db, "A").await?;
        let b = create_test_item(&db, "B").await?;
        set_container(&db, a.id, Some(case.id)).await?;
        set_container(&db, b.id, Some(case.id)).await?;

        let released = delete_item(&db, case.id).await?;
        assert_eq!(released, 2);

        assert!(get_item_by_id(&db, case.id).await?.is_none());
        assert!(get_parent(&db, a.id).await?.is_none());
        assert!(get_parent(&db, b.id).await?.is_none());
        assert!(get_contents(&db, case.id).await?.is_empty());

        let result = delete_item(&db, case.id).await;
        assert!(matches!(result, Err(Error::ItemNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_items_only_when_empty() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = crate::config::settings::parse_config(
            r#"
            [[items]]
            category = "Audio"
            manufacturer = "Shure"
            model = "SM58"
            purchase_date = "2022-01-10"
            purchase_price = 100
            lifespan = 5

            [[items]]
            category = "Audio"
            manufacturer = "Yamaha"
            model = "MG10"
            purchase_date = "not a date"
            lifespan = 5
            "#,
        )?
        .items;

        assert_eq!(seed_items(&db, &seeds).await?, 2);
        let items = get_all_items(&db).await?;
        assert_eq!(items[0].purchase_date, NaiveDate::from_ymd_opt(2022, 1, 10));
        assert_eq!(items[1].purchase_date, None);

        assert_eq!(seed_items(&db, &seeds).await?, 0);
        assert_eq!(get_all_items(&db).await?.len(), 2);
        Ok(())
    }
}
