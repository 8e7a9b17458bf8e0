//! Behavioral contract for `Store` implementations.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use stockledger_types::{
    EntityKind, LedgerScope, MovementRepository, NewMovement, Product, ProductRepository,
    SavepointName, Store, StoreError, TransactionContext, Warehouse, WarehouseRepository,
};
use tokio::time::Instant;

use crate::fixtures::{income_entry, new_product, new_warehouse, unique_user_id};

/// A contract scenario that did not hold, with the reason.
#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl ContractTestFailure {
    fn new(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self {
            scenario,
            detail: detail.into(),
        }
    }

    fn store_error(scenario: &'static str, operation: &'static str, error: StoreError) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }

    fn assertion(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self::new(scenario, detail)
    }
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

/// Outcome of one contract scenario.
pub type ContractTestResult = Result<(), ContractTestFailure>;

fn savepoint(scenario: &'static str, raw: &str) -> Result<SavepointName, ContractTestFailure> {
    SavepointName::try_new(raw).map_err(|error| {
        ContractTestFailure::assertion(
            scenario,
            format!("unable to construct savepoint name `{raw}`: {error}"),
        )
    })
}

/// Commit a fresh warehouse and product so the scenario has parents for its
/// ledger entries.
async fn seed_catalog<S: Store>(
    scenario: &'static str,
    store: &S,
) -> Result<(Warehouse, Product), ContractTestFailure> {
    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "begin", error))?;
    let warehouse = store
        .warehouses()
        .create(&mut tx, new_warehouse(unique_user_id()))
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "create_warehouse", error))?;
    let product = store
        .products()
        .create(&mut tx, new_product("contract", true))
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "create_product", error))?;
    tx.commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "commit", error))?;

    Ok((warehouse, product))
}

async fn append_committed<S: Store>(
    scenario: &'static str,
    store: &S,
    entries: Vec<NewMovement>,
) -> ContractTestResult {
    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "begin", error))?;
    store
        .movements()
        .bulk_create(&mut tx, entries)
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "bulk_create", error))?;
    tx.commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "commit", error))
}

async fn tail_available<S: Store>(
    scenario: &'static str,
    store: &S,
    scope: LedgerScope,
) -> Result<i64, ContractTestFailure> {
    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "begin", error))?;
    let tail = store
        .movements()
        .find_last_movement(&mut tx, scope)
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "find_last_movement", error))?;
    tx.rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(scenario, "rollback", error))?;

    Ok(tail.available.into_inner())
}

/// The tail of a scope is the entry with the highest id, and each scope
/// only sees its own entries.
pub async fn test_tail_follows_highest_id<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "tail_follows_highest_id";

    let store = make_store();
    let (north, widget) = seed_catalog(SCENARIO, &store).await?;
    let (south, gadget) = seed_catalog(SCENARIO, &store).await?;

    append_committed(
        SCENARIO,
        &store,
        vec![
            income_entry(north.id, widget.id, 1, 1),
            income_entry(north.id, gadget.id, 5, 5),
            income_entry(south.id, widget.id, 7, 7),
            income_entry(north.id, widget.id, 2, 3),
        ],
    )
    .await?;

    let pair = tail_available(
        SCENARIO,
        &store,
        LedgerScope::WarehouseProduct {
            warehouse_id: north.id,
            product_id: widget.id,
        },
    )
    .await?;
    if pair != 3 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected (warehouse, product) tail balance 3, observed {pair}"),
        ));
    }

    let warehouse_tail = tail_available(SCENARIO, &store, LedgerScope::Warehouse(north.id)).await?;
    if warehouse_tail != 3 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected warehouse tail to be the last north entry, observed balance {warehouse_tail}"),
        ));
    }

    let product_tail = tail_available(SCENARIO, &store, LedgerScope::Product(gadget.id)).await?;
    if product_tail != 5 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected product tail balance 5, observed {product_tail}"),
        ));
    }

    Ok(())
}

/// A scope without history reports `NotFound`.
pub async fn test_missing_scope_is_not_found<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "missing_scope_is_not_found";

    let store = make_store();
    let (warehouse, product) = seed_catalog(SCENARIO, &store).await?;
    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;

    for scope in [
        LedgerScope::WarehouseProduct {
            warehouse_id: warehouse.id,
            product_id: product.id,
        },
        LedgerScope::Warehouse(warehouse.id),
        LedgerScope::Product(product.id),
    ] {
        match store.movements().find_last_movement(&mut tx, scope).await {
            Err(StoreError::NotFound {
                entity: EntityKind::Movement,
            }) => {}
            Err(error) => {
                return Err(ContractTestFailure::store_error(
                    SCENARIO,
                    "find_last_movement",
                    error,
                ))
            }
            Ok(movement) => {
                return Err(ContractTestFailure::assertion(
                    SCENARIO,
                    format!("expected no history for {scope:?}, found {:?}", movement.id),
                ))
            }
        }
    }

    tx.rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))
}

/// Rolled-back writes are never visible and a finished transaction refuses
/// to commit.
pub async fn test_rollback_discards_writes<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "rollback_discards_writes";

    let store = make_store();
    let user_id = unique_user_id();

    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let _ = store
        .warehouses()
        .create(&mut tx, new_warehouse(user_id))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "create_warehouse", error))?;
    tx.rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    // A second rollback is a no-op, a commit is refused.
    tx.rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;
    match tx.commit().await {
        Err(StoreError::TransactionFinished) => {}
        Err(error) => return Err(ContractTestFailure::store_error(SCENARIO, "commit", error)),
        Ok(()) => {
            return Err(ContractTestFailure::assertion(
                SCENARIO,
                "expected commit after rollback to be refused",
            ))
        }
    }
    if tx.is_active() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "rolled back transaction still reports itself active",
        ));
    }

    let mut check = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let lookup = store.warehouses().find_by_user_id(&mut check, user_id).await;
    check
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    match lookup {
        Err(error) if error.is_not_found() => Ok(()),
        Err(error) => Err(ContractTestFailure::store_error(
            SCENARIO,
            "find_by_user_id",
            error,
        )),
        Ok(_) => Err(ContractTestFailure::assertion(
            SCENARIO,
            "warehouse created in a rolled back transaction is visible",
        )),
    }
}

/// A trailing rollback after a successful commit keeps the committed writes.
pub async fn test_rollback_after_commit_is_noop<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "rollback_after_commit_is_noop";

    let store = make_store();
    let user_id = unique_user_id();

    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let created = store
        .warehouses()
        .create(&mut tx, new_warehouse(user_id))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "create_warehouse", error))?;
    tx.commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "commit", error))?;
    tx.rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    let mut check = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let found = store
        .warehouses()
        .find_by_user_id(&mut check, user_id)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_by_user_id", error))?;
    check
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    if found.id != created.id {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!(
                "expected committed warehouse {} to survive rollback, found {}",
                created.id, found.id
            ),
        ));
    }

    Ok(())
}

/// Rolling back to a savepoint discards only the writes made after it.
pub async fn test_savepoint_rollback_discards_later_writes<F, S>(
    make_store: F,
) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "savepoint_rollback_discards_later_writes";

    let store = make_store();
    let (warehouse, product) = seed_catalog(SCENARIO, &store).await?;
    let leg = savepoint(SCENARIO, "second_leg")?;

    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let _ = store
        .movements()
        .create(&mut tx, income_entry(warehouse.id, product.id, 4, 4))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "create_movement", error))?;
    tx.savepoint(&leg)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "savepoint", error))?;
    let _ = store
        .movements()
        .create(&mut tx, income_entry(warehouse.id, product.id, 6, 10))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "create_movement", error))?;
    tx.rollback_to_savepoint(&leg)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback_to_savepoint", error))?;
    tx.release_savepoint(&leg)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "release_savepoint", error))?;

    match tx.rollback_to_savepoint(&leg).await {
        Err(StoreError::UnknownSavepoint { .. }) => {}
        Err(error) => {
            return Err(ContractTestFailure::store_error(
                SCENARIO,
                "rollback_to_savepoint",
                error,
            ))
        }
        Ok(()) => {
            return Err(ContractTestFailure::assertion(
                SCENARIO,
                "expected released savepoint to be unknown",
            ))
        }
    }

    tx.commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "commit", error))?;

    let available = tail_available(
        SCENARIO,
        &store,
        LedgerScope::WarehouseProduct {
            warehouse_id: warehouse.id,
            product_id: product.id,
        },
    )
    .await?;
    if available != 4 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected only the entry before the savepoint to persist, tail balance {available}"),
        ));
    }

    Ok(())
}

/// A second warehouse for one user, or a duplicate slug, is a `Conflict`.
pub async fn test_uniqueness_conflicts<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "uniqueness_conflicts";

    let store = make_store();
    let user_id = unique_user_id();
    let product = new_product("duplicate", true);

    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let _ = store
        .warehouses()
        .create(&mut tx, new_warehouse(user_id))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "create_warehouse", error))?;
    let _ = store
        .products()
        .create(&mut tx, product.clone())
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "create_product", error))?;
    tx.commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "commit", error))?;

    let mut second_owner = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let owner_result = store
        .warehouses()
        .create(&mut second_owner, new_warehouse(user_id))
        .await;
    second_owner
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    let mut second_slug = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let slug_result = store.products().create(&mut second_slug, product).await;
    second_slug
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    if !matches!(
        owner_result,
        Err(StoreError::Conflict {
            entity: EntityKind::Warehouse
        })
    ) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected second warehouse for one user to conflict, observed {owner_result:?}"),
        ));
    }

    if !matches!(
        slug_result,
        Err(StoreError::Conflict {
            entity: EntityKind::Product
        })
    ) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected duplicate slug to conflict, observed {slug_result:?}"),
        ));
    }

    Ok(())
}

/// A locked warehouse row blocks a second transaction until the first one
/// finishes.
pub async fn test_row_lock_serializes_transactions<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "row_lock_serializes_transactions";

    let store = Arc::new(make_store());
    let (warehouse, _) = seed_catalog(SCENARIO, store.as_ref()).await?;

    let mut holder = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let _ = store
        .warehouses()
        .find_and_lock_by_id(&mut holder, warehouse.id)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_and_lock_by_id", error))?;

    let contender_store = Arc::clone(&store);
    let contender = tokio::spawn(async move {
        let mut tx = contender_store.begin().await?;
        let _ = contender_store
            .warehouses()
            .find_and_lock_by_id(&mut tx, warehouse.id)
            .await?;
        let acquired_at = Instant::now();
        tx.commit().await?;
        Ok::<Instant, StoreError>(acquired_at)
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let released_at = Instant::now();
    holder
        .commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "commit", error))?;

    let acquired_at = contender
        .await
        .map_err(|error| {
            ContractTestFailure::assertion(SCENARIO, format!("contender task failed: {error}"))
        })?
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_and_lock_by_id", error))?;

    if acquired_at < released_at {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "second transaction acquired the row lock while the first still held it",
        ));
    }

    Ok(())
}

/// Product updates and warehouse deletes are visible after commit.
pub async fn test_catalog_updates_persist<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "catalog_updates_persist";

    let store = make_store();
    let (warehouse, product) = seed_catalog(SCENARIO, &store).await?;

    let mut tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let disabled = store
        .products()
        .set_enabled(&mut tx, product.id, false)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "set_enabled", error))?;
    store
        .warehouses()
        .delete(&mut tx, warehouse.id)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "delete_warehouse", error))?;
    tx.commit()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "commit", error))?;

    if disabled.enabled {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "set_enabled(false) returned an enabled product",
        ));
    }

    let mut check = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let reloaded = store
        .products()
        .find_and_lock_by_id(&mut check, product.id)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_and_lock_by_id", error))?;
    let deleted = store
        .warehouses()
        .find_and_lock_by_id(&mut check, warehouse.id)
        .await;
    check
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    if reloaded.enabled {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "disabled flag was not persisted",
        ));
    }

    match deleted {
        Err(error) if error.is_not_found() => Ok(()),
        Err(error) => Err(ContractTestFailure::store_error(
            SCENARIO,
            "find_and_lock_by_id",
            error,
        )),
        Ok(_) => Err(ContractTestFailure::assertion(
            SCENARIO,
            "deleted warehouse is still visible",
        )),
    }
}

/// Rows referenced by ledger entries refuse deletion with `Referenced`.
pub async fn test_referenced_rows_cannot_be_deleted<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: Store + 'static,
{
    const SCENARIO: &str = "referenced_rows_cannot_be_deleted";

    let store = make_store();
    let (warehouse, product) = seed_catalog(SCENARIO, &store).await?;
    append_committed(
        SCENARIO,
        &store,
        vec![income_entry(warehouse.id, product.id, 2, 2)],
    )
    .await?;

    let mut product_tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let product_result = store.products().delete(&mut product_tx, product.id).await;
    product_tx
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    let mut warehouse_tx = store
        .begin()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "begin", error))?;
    let warehouse_result = store
        .warehouses()
        .delete(&mut warehouse_tx, warehouse.id)
        .await;
    warehouse_tx
        .rollback()
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "rollback", error))?;

    if !matches!(
        product_result,
        Err(StoreError::Referenced {
            entity: EntityKind::Product
        })
    ) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected product with history to be referenced, observed {product_result:?}"),
        ));
    }

    if !matches!(
        warehouse_result,
        Err(StoreError::Referenced {
            entity: EntityKind::Warehouse
        })
    ) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!(
                "expected warehouse with history to be referenced, observed {warehouse_result:?}"
            ),
        ));
    }

    let available = tail_available(
        SCENARIO,
        &store,
        LedgerScope::WarehouseProduct {
            warehouse_id: warehouse.id,
            product_id: product.id,
        },
    )
    .await?;
    if available != 2 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected history to survive refused deletes, tail balance {available}"),
        ));
    }

    Ok(())
}

/// Generate one `#[tokio::test]` per contract scenario for the store built
/// by `make_store`.
///
/// ```ignore
/// store_contract_tests! {
///     suite = in_memory,
///     make_store = stockledger_memory::InMemoryStore::new,
/// }
/// ```
#[macro_export]
macro_rules! store_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        #[allow(non_snake_case)]
        mod $suite {
            use $crate::contract::{
                test_catalog_updates_persist, test_missing_scope_is_not_found,
                test_referenced_rows_cannot_be_deleted, test_rollback_after_commit_is_noop,
                test_rollback_discards_writes,
                test_row_lock_serializes_transactions,
                test_savepoint_rollback_discards_later_writes, test_tail_follows_highest_id,
                test_uniqueness_conflicts,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn tail_follows_highest_id_contract() {
                test_tail_follows_highest_id($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn missing_scope_is_not_found_contract() {
                test_missing_scope_is_not_found($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn rollback_discards_writes_contract() {
                test_rollback_discards_writes($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn rollback_after_commit_is_noop_contract() {
                test_rollback_after_commit_is_noop($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn savepoint_rollback_discards_later_writes_contract() {
                test_savepoint_rollback_discards_later_writes($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn uniqueness_conflicts_contract() {
                test_uniqueness_conflicts($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn row_lock_serializes_transactions_contract() {
                test_row_lock_serializes_transactions($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn catalog_updates_persist_contract() {
                test_catalog_updates_persist($make_store)
                    .await
                    .expect("store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn referenced_rows_cannot_be_deleted_contract() {
                test_referenced_rows_cannot_be_deleted($make_store)
                    .await
                    .expect("store contract failed");
            }
        }
    };
}

pub use store_contract_tests;
