//! Containment business logic - which item is stored inside which container.
//!
//! Containment is a single nullable `container_id` reference on each item. The
//! field alone does not stop deep or looping chains, so every assignment is
//! checked against a [`ContainmentGraph`]: an arena of item snapshots keyed by
//! id, walked explicitly when looking for cycles.
//!
//! The store-backed functions always load a fresh snapshot before validating.
//! Containment edits made elsewhere since the last read would otherwise slip
//! past the cycle check.

use crate::{
    entities::{Item, item},
    errors::{ContainmentViolation, Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Read-only view of the containment relation over one snapshot of the items.
#[derive(Debug)]
pub struct ContainmentGraph<'a> {
    items: &'a [item::Model],
    index: HashMap<i64, usize>,
}

/// Membership changes needed to bring a container to a desired set of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentsPlan {
    /// Container being edited
    pub container_id: i64,
    /// Items that must be moved into the container
    pub added: Vec<i64>,
    /// Items that must be taken out of the container
    pub removed: Vec<i64>,
}

impl ContentsPlan {
    /// Number of item records the plan changes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// True when the container already holds exactly the desired items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl<'a> ContainmentGraph<'a> {
    /// Indexes a snapshot of the item collection by id.
    #[must_use]
    pub fn new(items: &'a [item::Model]) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id, position))
            .collect();
        Self { items, index }
    }

    /// Looks up an item in the snapshot.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&'a item::Model> {
        self.index.get(&id).map(|&position| &self.items[position])
    }

    /// Items whose container is `container_id`, in snapshot order.
    ///
    /// The iterator is recomputed from the snapshot on every call.
    pub fn contents(&self, container_id: i64) -> impl Iterator<Item = &'a item::Model> + use<'a> {
        self.items
            .iter()
            .filter(move |item| item.container_id == Some(container_id))
    }

    /// The container holding `item_id`, if any.
    #[must_use]
    pub fn parent(&self, item_id: i64) -> Option<&'a item::Model> {
        self.get(item_id)
            .and_then(|item| item.container_id)
            .and_then(|container_id| self.get(container_id))
    }

    /// Checks that `item_id` may be stored in `container_id`.
    ///
    /// `None` (taking the item out of any container) is always allowed. A
    /// target is rejected when it is the item itself, is unknown, is not
    /// flagged as a container, or already sits (directly or further up the
    /// chain) inside `item_id`.
    pub fn validate_assignment(&self, item_id: i64, container_id: Option<i64>) -> Result<()> {
        let Some(target_id) = container_id else {
            return Ok(());
        };
        let reject = |violation: ContainmentViolation| -> Result<()> {
            Err(Error::containment(item_id, container_id, violation))
        };

        if target_id == item_id {
            return reject(ContainmentViolation::SelfReference);
        }
        let Some(target) = self.get(target_id) else {
            return reject(ContainmentViolation::ContainerNotFound);
        };
        if !target.is_container {
            return reject(ContainmentViolation::NotAContainer);
        }

        // Walk up from the proposed container. The walk is bounded by the
        // snapshot size; revisiting a node means the stored data already loops.
        let mut visited = HashSet::with_capacity(self.items.len());
        let mut current = Some(target_id);
        while let Some(id) = current {
            if id == item_id {
                return reject(ContainmentViolation::Cycle);
            }
            if !visited.insert(id) {
                warn!("Existing containment loop found at item {}", id);
                return reject(ContainmentViolation::Cycle);
            }
            current = self.get(id).and_then(|ancestor| ancestor.container_id);
        }

        Ok(())
    }

    /// Computes the changes that make `desired` the full contents of `container_id`.
    ///
    /// Ids missing from the snapshot are skipped. Every item entering the
    /// container is validated; one invalid member rejects the whole plan.
    pub fn plan_contents(&self, container_id: i64, desired: &HashSet<i64>) -> Result<ContentsPlan> {
        match self.get(container_id) {
            None => {
                return Err(Error::containment(
                    container_id,
                    Some(container_id),
                    ContainmentViolation::ContainerNotFound,
                ));
            }
            Some(container) if !container.is_container => {
                return Err(Error::containment(
                    container_id,
                    Some(container_id),
                    ContainmentViolation::NotAContainer,
                ));
            }
            Some(_) => {}
        }

        let current: HashSet<i64> = self.contents(container_id).map(|item| item.id).collect();

        let mut added: Vec<i64> = desired
            .iter()
            .copied()
            .filter(|id| !current.contains(id))
            .filter(|&id| {
                let known = self.index.contains_key(&id);
                if !known {
                    debug!("Skipping unknown item {} for container {}", id, container_id);
                }
                known
            })
            .collect();
        added.sort_unstable();

        for &id in &added {
            self.validate_assignment(id, Some(container_id))?;
        }

        let mut removed: Vec<i64> = current.difference(desired).copied().collect();
        removed.sort_unstable();

        Ok(ContentsPlan {
            container_id,
            added,
            removed,
        })
    }
}

/// Orders assignment candidates for a content editor: items already in
/// `container_id` first, then category, manufacturer and model, compared
/// case-insensitively.
pub fn sort_candidates(container_id: i64, items: &mut [item::Model]) {
    items.sort_by_cached_key(|item| {
        (
            item.container_id != Some(container_id),
            item.category.to_lowercase(),
            item.manufacturer.to_lowercase(),
            item.model.to_lowercase(),
            item.id,
        )
    });
}

/// Loads the whole item collection, ordered by id.
pub(crate) async fn load_snapshot<C>(db: &C) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find()
        .order_by_asc(item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn write_container(
    db: &DatabaseConnection,
    item: item::Model,
    container_id: Option<i64>,
    now: NaiveDateTime,
) -> std::result::Result<item::Model, DbErr> {
    let mut active: item::ActiveModel = item.into();
    active.container_id = Set(container_id);
    active.updated_at = Set(now);
    active.update(db).await
}

/// Moves `item_id` into `container_id`, or out of any container when `None`.
///
/// # Errors
/// - [`Error::ItemNotFound`] if the item does not exist
/// - [`Error::InvalidContainment`] if the assignment breaks an invariant;
///   nothing is written in that case
/// - [`Error::Database`] if the store fails
#[instrument(skip(db))]
pub async fn set_container(
    db: &DatabaseConnection,
    item_id: i64,
    container_id: Option<i64>,
) -> Result<item::Model> {
    let snapshot = load_snapshot(db).await?;
    let graph = ContainmentGraph::new(&snapshot);

    let item = graph
        .get(item_id)
        .ok_or(Error::ItemNotFound { id: item_id })?
        .clone();
    graph.validate_assignment(item_id, container_id)?;

    if item.container_id == container_id {
        debug!("Item {} already has container {:?}", item_id, container_id);
        return Ok(item);
    }

    let now = chrono::Utc::now().naive_utc();
    let updated = write_container(db, item, container_id, now).await?;
    info!("Item {} moved to container {:?}", item_id, container_id);
    Ok(updated)
}

/// Makes `desired` the exact contents of `container_id`.
///
/// The diff is computed once from a single snapshot, then applied as one
/// update per changed item. Returns the number of changed records; `0` means
/// there was nothing to save.
///
/// Dropping the returned future abandons the remaining writes. Writes already
/// applied are not rolled back.
///
/// # Errors
/// - [`Error::InvalidContainment`] if the container or any entering item is
///   invalid; nothing is written in that case
/// - [`Error::PartialUpdate`] if the store fails part way through the batch
#[instrument(skip(db, desired), fields(desired = desired.len()))]
pub async fn bulk_set_contents(
    db: &DatabaseConnection,
    container_id: i64,
    desired: &HashSet<i64>,
) -> Result<usize> {
    let snapshot = load_snapshot(db).await?;
    let graph = ContainmentGraph::new(&snapshot);
    let plan = graph.plan_contents(container_id, desired)?;

    if plan.is_empty() {
        info!("Container {} already up to date", container_id);
        return Ok(0);
    }

    let planned = plan.change_count();
    let now = chrono::Utc::now().naive_utc();
    let changes = plan
        .added
        .iter()
        .map(|&id| (id, Some(container_id)))
        .chain(plan.removed.iter().map(|&id| (id, None)));

    let mut applied = 0;
    for (id, target) in changes {
        let Some(item) = graph.get(id) else {
            continue;
        };
        if let Err(source) = write_container(db, item.clone(), target, now).await {
            warn!(
                "Bulk update of container {} failed after {} changes",
                container_id, applied
            );
            return Err(Error::PartialUpdate {
                applied,
                planned,
                source,
            });
        }
        applied += 1;
    }

    info!(
        "Container {}: {} added, {} removed",
        container_id,
        plan.added.len(),
        plan.removed.len()
    );
    Ok(applied)
}

/// Items currently stored in `container_id`, read fresh from the store.
pub async fn get_contents(db: &DatabaseConnection, container_id: i64) -> Result<Vec<item::Model>> {
    Item::find()
        .filter(item::Column::ContainerId.eq(container_id))
        .order_by_asc(item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The container holding `item_id`, or `None` when it is not contained.
///
/// # Errors
/// Returns [`Error::ItemNotFound`] if `item_id` does not exist.
pub async fn get_parent(db: &DatabaseConnection, item_id: i64) -> Result<Option<item::Model>> {
    let item = Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(Error::ItemNotFound { id: item_id })?;

    match item.container_id {
        Some(container_id) => Item::find_by_id(container_id)
            .one(db)
            .await
            .map_err(Into::into),
        None => Ok(None),
    }
}

/// Clears `container_id` on every item stored in `item_id`.
///
/// Must run before (or in the same transaction as) deleting `item_id`.
/// Returns the number of items released.
#[instrument(skip(db))]
pub async fn on_item_deleted<C>(db: &C, item_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let result = Item::update_many()
        .col_expr(item::Column::ContainerId, Expr::value(Option::<i64>::None))
        .col_expr(item::Column::UpdatedAt, Expr::value(now))
        .filter(item::Column::ContainerId.eq(item_id))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!(
            "Released {} items from deleted container {}",
            result.rows_affected, item_id
        );
    }
    Ok(result.rows_affected)
}

/// Candidate items for the content editor of `container_id`.
///
/// The container itself is left out. `query` filters case-insensitively on
/// category, sub-category, manufacturer and model. Results come back in
/// [`sort_candidates`] order.
pub async fn list_assignment_candidates(
    db: &DatabaseConnection,
    container_id: i64,
    query: Option<&str>,
) -> Result<Vec<item::Model>> {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut candidates: Vec<item::Model> = load_snapshot(db)
        .await?
        .into_iter()
        .filter(|item| item.id != container_id)
        .filter(|item| {
            needle.as_ref().is_none_or(|needle| {
                [
                    &item.category,
                    &item.sub_category,
                    &item.manufacturer,
                    &item.model,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str()))
            })
        })
        .collect();

    sort_candidates(container_id, &mut candidates);
    Ok(candidates)
}
