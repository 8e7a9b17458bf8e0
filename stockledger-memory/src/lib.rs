//! In-memory store for the `StockLedger` inventory ledger
//!
//! This crate provides an in-memory implementation of the `Store` trait from
//! stockledger-types, useful for testing and development scenarios where
//! persistence is not required.
//!
//! The store behaves like a row-locking relational database:
//! - `find_and_lock_*` take per-row exclusive locks owned by the transaction
//!   and held until it commits, rolls back or is dropped.
//! - Writes are staged in the transaction and read back through an overlay
//!   on the committed tables. On commit every staged write is re-checked
//!   against committed state (unique owners and slugs, ledger parents, rows
//!   still referenced by the ledger) before any of them is applied.
//! - Identifiers come from monotonically increasing sequences that are not
//!   reused after a rollback.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use stockledger_types::{
    EntityKind, LedgerScope, Movement, MovementId, MovementRepository, NewMovement, NewProduct,
    NewWarehouse, ParameterStore, Product, ProductId, ProductRepository, ProductSlug,
    SavepointName, Store, StoreError, TransactionContext, UserId, Warehouse, WarehouseId,
    WarehouseRepository,
};
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};
use tracing::{debug, instrument, warn};

/// Thread-safe in-memory store for testing
#[derive(Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
    warehouses: InMemoryWarehouses,
    products: InMemoryProducts,
    movements: InMemoryMovements,
}

#[derive(Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<RowMutex<()>>>>,
    parameters: RwLock<HashMap<String, i64>>,
    warehouse_seq: AtomicI64,
    product_seq: AtomicI64,
    movement_seq: AtomicI64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Warehouse(WarehouseId),
    Product(ProductId),
}

/// Committed rows plus the indexes the repositories read through.
#[derive(Debug, Default)]
struct Tables {
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    products: BTreeMap<ProductId, Product>,
    movements: BTreeMap<MovementId, Movement>,
    owners: HashMap<UserId, WarehouseId>,
    slugs: HashMap<ProductSlug, ProductId>,
    /// Highest committed movement id per scope.
    tails: HashMap<LedgerScope, MovementId>,
}

#[derive(Debug, Clone)]
enum Write {
    InsertWarehouse(Warehouse),
    DeleteWarehouse(WarehouseId),
    InsertProduct(Product),
    UpdateProduct(Product),
    DeleteProduct(ProductId),
    InsertMovement(Movement),
}

/// Every scope a ledger entry belongs to.
const fn scopes_of(movement: &Movement) -> [LedgerScope; 3] {
    [
        LedgerScope::WarehouseProduct {
            warehouse_id: movement.warehouse_id,
            product_id: movement.product_id,
        },
        LedgerScope::Warehouse(movement.warehouse_id),
        LedgerScope::Product(movement.product_id),
    ]
}

impl Tables {
    fn apply(&mut self, write: Write) {
        match write {
            Write::InsertWarehouse(warehouse) => {
                let _ = self.owners.insert(warehouse.user_id, warehouse.id);
                let _ = self.warehouses.insert(warehouse.id, warehouse);
            }
            Write::DeleteWarehouse(id) => {
                if let Some(removed) = self.warehouses.remove(&id) {
                    let _ = self.owners.remove(&removed.user_id);
                }
            }
            Write::InsertProduct(product) => {
                let _ = self.slugs.insert(product.slug.clone(), product.id);
                let _ = self.products.insert(product.id, product);
            }
            Write::UpdateProduct(product) => {
                let _ = self.products.insert(product.id, product);
            }
            Write::DeleteProduct(id) => {
                if let Some(removed) = self.products.remove(&id) {
                    let _ = self.slugs.remove(&removed.slug);
                }
            }
            Write::InsertMovement(movement) => {
                // Ids are drawn when staged, so commits can arrive out of id order.
                for scope in scopes_of(&movement) {
                    let tail = self.tails.entry(scope).or_insert(movement.id);
                    if *tail < movement.id {
                        *tail = movement.id;
                    }
                }
                let _ = self.movements.insert(movement.id, movement);
            }
        }
    }
}

/// Committed tables seen through a list of staged writes.
struct Overlay<'a> {
    tables: &'a Tables,
    writes: &'a [Write],
}

impl Overlay<'_> {
    fn warehouse(&self, id: WarehouseId) -> Option<Warehouse> {
        for write in self.writes.iter().rev() {
            match write {
                Write::InsertWarehouse(warehouse) if warehouse.id == id => {
                    return Some(warehouse.clone());
                }
                Write::DeleteWarehouse(deleted) if *deleted == id => return None,
                _ => {}
            }
        }
        self.tables.warehouses.get(&id).cloned()
    }

    fn warehouse_by_user(&self, user_id: UserId) -> Option<Warehouse> {
        let staged = self.writes.iter().rev().filter_map(|write| match write {
            Write::InsertWarehouse(warehouse) if warehouse.user_id == user_id => Some(warehouse.id),
            _ => None,
        });
        staged
            .chain(self.tables.owners.get(&user_id).copied())
            .find_map(|id| self.warehouse(id))
    }

    fn product(&self, id: ProductId) -> Option<Product> {
        for write in self.writes.iter().rev() {
            match write {
                Write::InsertProduct(product) | Write::UpdateProduct(product)
                    if product.id == id =>
                {
                    return Some(product.clone());
                }
                Write::DeleteProduct(deleted) if *deleted == id => return None,
                _ => {}
            }
        }
        self.tables.products.get(&id).cloned()
    }

    fn slug_taken(&self, slug: &ProductSlug) -> bool {
        let staged = self.writes.iter().filter_map(|write| match write {
            Write::InsertProduct(product) if product.slug == *slug => Some(product.id),
            _ => None,
        });
        staged
            .chain(self.tables.slugs.get(slug).copied())
            .any(|id| self.product(id).is_some())
    }

    fn last_movement(&self, scope: LedgerScope) -> Option<Movement> {
        let staged = self
            .writes
            .iter()
            .filter_map(|write| match write {
                Write::InsertMovement(movement) if scope.contains(movement) => Some(movement),
                _ => None,
            })
            .max_by_key(|movement| movement.id);
        let committed = self
            .tables
            .tails
            .get(&scope)
            .and_then(|id| self.tables.movements.get(id));

        match (staged, committed) {
            (Some(staged), Some(committed)) if committed.id > staged.id => Some(committed.clone()),
            (Some(staged), _) => Some(staged.clone()),
            (None, committed) => committed.cloned(),
        }
    }

    fn parents_exist(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<(), StoreError> {
        if self.warehouse(warehouse_id).is_none() {
            return Err(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            });
        }
        if self.product(product_id).is_none() {
            return Err(StoreError::NotFound {
                entity: EntityKind::Product,
            });
        }
        Ok(())
    }

    /// Whether `write` can be applied on top of this overlay.
    fn check(&self, write: &Write) -> Result<(), StoreError> {
        match write {
            Write::InsertWarehouse(warehouse) => {
                if self.warehouse_by_user(warehouse.user_id).is_some() {
                    return Err(StoreError::Conflict {
                        entity: EntityKind::Warehouse,
                    });
                }
            }
            Write::DeleteWarehouse(id) => {
                if self.warehouse(*id).is_none() {
                    return Err(StoreError::NotFound {
                        entity: EntityKind::Warehouse,
                    });
                }
                if self.last_movement(LedgerScope::Warehouse(*id)).is_some() {
                    return Err(StoreError::Referenced {
                        entity: EntityKind::Warehouse,
                    });
                }
            }
            Write::InsertProduct(product) => {
                if self.slug_taken(&product.slug) {
                    return Err(StoreError::Conflict {
                        entity: EntityKind::Product,
                    });
                }
            }
            Write::UpdateProduct(product) => {
                if self.product(product.id).is_none() {
                    return Err(StoreError::NotFound {
                        entity: EntityKind::Product,
                    });
                }
            }
            Write::DeleteProduct(id) => {
                if self.product(*id).is_none() {
                    return Err(StoreError::NotFound {
                        entity: EntityKind::Product,
                    });
                }
                if self.last_movement(LedgerScope::Product(*id)).is_some() {
                    return Err(StoreError::Referenced {
                        entity: EntityKind::Product,
                    });
                }
            }
            Write::InsertMovement(movement) => {
                self.parents_exist(movement.warehouse_id, movement.product_id)?;
            }
        }
        Ok(())
    }
}

impl InMemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or overwrite an integer parameter served through
    /// [`ParameterStore`].
    pub fn set_parameter(&self, name: impl Into<String>, value: i64) {
        let _ = self.shared.parameters.write().insert(name.into(), value);
    }

    /// Committed ledger entries in id order.
    pub fn committed_movements(&self) -> Vec<Movement> {
        self.shared.tables.read().movements.values().cloned().collect()
    }
}

impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;
    type Warehouses = InMemoryWarehouses;
    type Products = InMemoryProducts;
    type Movements = InMemoryMovements;

    async fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        Ok(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            status: Status::Active,
            held_locks: HashMap::new(),
            writes: Vec::new(),
            savepoints: Vec::new(),
        })
    }

    fn warehouses(&self) -> &InMemoryWarehouses {
        &self.warehouses
    }

    fn products(&self) -> &InMemoryProducts {
        &self.products
    }

    fn movements(&self) -> &InMemoryMovements {
        &self.movements
    }
}

#[async_trait]
impl ParameterStore for InMemoryStore {
    async fn get_param_int(&self, name: &str) -> Result<i64, StoreError> {
        self.shared
            .parameters
            .read()
            .get(name)
            .copied()
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Parameter,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Active,
    Committed,
    RolledBack,
}

/// Transaction over an [`InMemoryStore`].
///
/// Dropping the transaction without committing discards its writes and
/// releases its row locks.
pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    status: Status,
    held_locks: HashMap<RowKey, OwnedMutexGuard<()>>,
    writes: Vec<Write>,
    savepoints: Vec<(SavepointName, usize)>,
}

impl InMemoryTransaction {
    fn ensure_active(&self) -> Result<(), StoreError> {
        match self.status {
            Status::Active => Ok(()),
            Status::Committed | Status::RolledBack => Err(StoreError::TransactionFinished),
        }
    }

    /// Run `read` against committed state with this transaction's staged
    /// writes layered on top.
    fn read<R>(&self, read: impl FnOnce(&Overlay<'_>) -> R) -> Result<R, StoreError> {
        self.ensure_active()?;
        let tables = self.shared.tables.read();
        Ok(read(&Overlay {
            tables: &tables,
            writes: &self.writes,
        }))
    }

    async fn lock_row(&mut self, key: RowKey) -> Result<(), StoreError> {
        self.ensure_active()?;
        if self.held_locks.contains_key(&key) {
            return Ok(());
        }

        let row_lock = {
            let mut row_locks = self.shared.row_locks.lock();
            Arc::clone(row_locks.entry(key).or_default())
        };
        let guard = row_lock.lock_owned().await;
        debug!(row = ?key, "[memory.lock_row] row lock acquired");
        let _ = self.held_locks.insert(key, guard);
        Ok(())
    }

    /// Drop held row locks and forget the ones nobody else is using.
    fn unlock_rows(&mut self) {
        if self.held_locks.is_empty() {
            return;
        }

        let keys: Vec<RowKey> = self.held_locks.keys().copied().collect();
        self.held_locks.clear();

        let mut row_locks = self.shared.row_locks.lock();
        for key in keys {
            if row_locks
                .get(&key)
                .is_some_and(|row_lock| Arc::strong_count(row_lock) == 1)
            {
                let _ = row_locks.remove(&key);
            }
        }
    }

    fn release(&mut self, status: Status) {
        self.status = status;
        self.writes.clear();
        self.savepoints.clear();
        self.unlock_rows();
    }

    fn savepoint_index(&self, name: &SavepointName) -> Result<usize, StoreError> {
        self.savepoints
            .iter()
            .rposition(|(existing, _)| existing == name)
            .ok_or_else(|| StoreError::UnknownSavepoint { name: name.clone() })
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        self.unlock_rows();
    }
}

impl TransactionContext for InMemoryTransaction {
    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_active()?;

        let outcome = {
            let mut tables = self.shared.tables.write();
            let checked = self.writes.iter().enumerate().try_for_each(|(index, write)| {
                Overlay {
                    tables: &tables,
                    writes: &self.writes[..index],
                }
                .check(write)
            });
            if checked.is_ok() {
                for write in self.writes.drain(..) {
                    tables.apply(write);
                }
            }
            checked
        };

        match outcome {
            Ok(()) => {
                self.release(Status::Committed);
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "[memory.commit] constraint check failed, rolling back");
                self.release(Status::RolledBack);
                Err(error)
            }
        }
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if self.status == Status::Active {
            self.release(Status::RolledBack);
        }
        Ok(())
    }

    async fn savepoint(&mut self, name: &SavepointName) -> Result<(), StoreError> {
        self.ensure_active()?;
        self.savepoints.push((name.clone(), self.writes.len()));
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &SavepointName) -> Result<(), StoreError> {
        self.ensure_active()?;
        let index = self.savepoint_index(name)?;
        let mark = self.savepoints[index].1;
        self.savepoints.truncate(index + 1);
        self.writes.truncate(mark);
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &SavepointName) -> Result<(), StoreError> {
        self.ensure_active()?;
        let index = self.savepoint_index(name)?;
        self.savepoints.truncate(index);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

fn next_id(sequence: &AtomicI64) -> i64 {
    sequence.fetch_add(1, Ordering::SeqCst) + 1
}

/// Stage `write` if it holds against the transaction's current view.
fn stage(tx: &mut InMemoryTransaction, write: Write) -> Result<(), StoreError> {
    tx.read(|overlay| overlay.check(&write))??;
    tx.writes.push(write);
    Ok(())
}

/// Warehouse repository of the in-memory store.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryWarehouses;

impl WarehouseRepository<InMemoryTransaction> for InMemoryWarehouses {
    #[instrument(name = "memory.warehouses.create", skip(self, tx))]
    async fn create(
        &self,
        tx: &mut InMemoryTransaction,
        warehouse: NewWarehouse,
    ) -> Result<Warehouse, StoreError> {
        if tx.read(|overlay| overlay.warehouse_by_user(warehouse.user_id).is_some())? {
            return Err(StoreError::Conflict {
                entity: EntityKind::Warehouse,
            });
        }

        let created = Warehouse {
            id: WarehouseId::new(next_id(&tx.shared.warehouse_seq)),
            name: warehouse.name,
            address: warehouse.address,
            user_id: warehouse.user_id,
            created_at: Utc::now(),
        };
        tx.writes.push(Write::InsertWarehouse(created.clone()));
        Ok(created)
    }

    async fn find_by_user_id(
        &self,
        tx: &mut InMemoryTransaction,
        user_id: UserId,
    ) -> Result<Warehouse, StoreError> {
        tx.read(|overlay| overlay.warehouse_by_user(user_id))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            })
    }

    async fn find_and_lock_by_id(
        &self,
        tx: &mut InMemoryTransaction,
        id: WarehouseId,
    ) -> Result<Warehouse, StoreError> {
        tx.lock_row(RowKey::Warehouse(id)).await?;
        tx.read(|overlay| overlay.warehouse(id))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            })
    }

    async fn find_and_lock_by_user_id(
        &self,
        tx: &mut InMemoryTransaction,
        user_id: UserId,
    ) -> Result<Warehouse, StoreError> {
        let candidate = self.find_by_user_id(tx, user_id).await?;
        let locked = self.find_and_lock_by_id(tx, candidate.id).await?;

        // Ownership may have changed while waiting for the lock.
        if locked.user_id == user_id {
            Ok(locked)
        } else {
            Err(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            })
        }
    }

    async fn delete(&self, tx: &mut InMemoryTransaction, id: WarehouseId) -> Result<(), StoreError> {
        stage(tx, Write::DeleteWarehouse(id))
    }
}

/// Product repository of the in-memory store.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryProducts;

impl ProductRepository<InMemoryTransaction> for InMemoryProducts {
    #[instrument(name = "memory.products.create", skip(self, tx))]
    async fn create(
        &self,
        tx: &mut InMemoryTransaction,
        product: NewProduct,
    ) -> Result<Product, StoreError> {
        if tx.read(|overlay| overlay.slug_taken(&product.slug))? {
            return Err(StoreError::Conflict {
                entity: EntityKind::Product,
            });
        }

        let created = Product {
            id: ProductId::new(next_id(&tx.shared.product_seq)),
            name: product.name,
            slug: product.slug,
            enabled: product.enabled,
            description: product.description,
            created_at: Utc::now(),
        };
        tx.writes.push(Write::InsertProduct(created.clone()));
        Ok(created)
    }

    async fn find_and_lock_by_id(
        &self,
        tx: &mut InMemoryTransaction,
        id: ProductId,
    ) -> Result<Product, StoreError> {
        tx.lock_row(RowKey::Product(id)).await?;
        tx.read(|overlay| overlay.product(id))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Product,
            })
    }

    async fn set_enabled(
        &self,
        tx: &mut InMemoryTransaction,
        id: ProductId,
        enabled: bool,
    ) -> Result<Product, StoreError> {
        let mut product = self.find_and_lock_by_id(tx, id).await?;
        product.enabled = enabled;
        tx.writes.push(Write::UpdateProduct(product.clone()));
        Ok(product)
    }

    async fn delete(&self, tx: &mut InMemoryTransaction, id: ProductId) -> Result<(), StoreError> {
        stage(tx, Write::DeleteProduct(id))
    }
}

/// Ledger repository of the in-memory store.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryMovements;

impl InMemoryMovements {
    fn append(tx: &mut InMemoryTransaction, movement: NewMovement) -> Result<Movement, StoreError> {
        tx.read(|overlay| overlay.parents_exist(movement.warehouse_id, movement.product_id))??;

        let created = Movement {
            id: MovementId::new(next_id(&tx.shared.movement_seq)),
            product_id: movement.product_id,
            warehouse_id: movement.warehouse_id,
            quantity: movement.quantity,
            movement_type: movement.movement_type,
            available: movement.available,
            concept: movement.concept,
            created_at: Utc::now(),
        };
        tx.writes.push(Write::InsertMovement(created.clone()));
        Ok(created)
    }
}

impl MovementRepository<InMemoryTransaction> for InMemoryMovements {
    #[instrument(name = "memory.movements.create", skip(self, tx))]
    async fn create(
        &self,
        tx: &mut InMemoryTransaction,
        movement: NewMovement,
    ) -> Result<Movement, StoreError> {
        Self::append(tx, movement)
    }

    async fn find_last_movement(
        &self,
        tx: &mut InMemoryTransaction,
        scope: LedgerScope,
    ) -> Result<Movement, StoreError> {
        tx.read(|overlay| overlay.last_movement(scope))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Movement,
            })
    }

    #[instrument(name = "memory.movements.bulk_create", skip(self, tx, movements), fields(count = movements.len()))]
    async fn bulk_create(
        &self,
        tx: &mut InMemoryTransaction,
        movements: Vec<NewMovement>,
    ) -> Result<(), StoreError> {
        for movement in movements {
            let _ = Self::append(tx, movement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_types::{Available, Concept, DisplayName, MovementType, ProductSlug, Quantity};

    async fn seed(store: &InMemoryStore) -> (Warehouse, Product) {
        let mut tx = store.begin().await.unwrap();
        let warehouse = store
            .warehouses()
            .create(
                &mut tx,
                NewWarehouse {
                    name: DisplayName::try_new("North").unwrap(),
                    address: "1 Dock Road".to_string(),
                    user_id: UserId::new(1),
                },
            )
            .await
            .unwrap();
        let product = store
            .products()
            .create(
                &mut tx,
                NewProduct {
                    name: DisplayName::try_new("Widget").unwrap(),
                    slug: ProductSlug::try_new("widget").unwrap(),
                    enabled: true,
                    description: None,
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (warehouse, product)
    }

    fn entry(warehouse: &Warehouse, product: &Product, available: i64) -> NewMovement {
        NewMovement {
            product_id: product.id,
            warehouse_id: warehouse.id,
            quantity: Quantity::try_new(1).unwrap(),
            movement_type: MovementType::Income,
            available: Available::try_new(available).unwrap(),
            concept: Concept::try_new("seed").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.committed_movements().is_empty());
    }

    #[tokio::test]
    async fn test_clone_shares_storage() {
        let store1 = InMemoryStore::new();
        #[allow(clippy::redundant_clone)]
        let store2 = store1.clone();

        assert!(Arc::ptr_eq(&store1.shared, &store2.shared));
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_visible_only_inside_transaction() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;

        let mut tx = store.begin().await.unwrap();
        let _ = store
            .movements()
            .create(&mut tx, entry(&warehouse, &product, 1))
            .await
            .unwrap();

        let inside = store
            .movements()
            .find_last_movement(&mut tx, LedgerScope::Warehouse(warehouse.id))
            .await;
        assert!(inside.is_ok());
        assert!(store.committed_movements().is_empty());

        drop(tx);
        assert!(store.committed_movements().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_transaction_releases_row_locks() {
        let store = InMemoryStore::new();
        let (warehouse, _) = seed(&store).await;

        let mut first = store.begin().await.unwrap();
        let _ = store
            .warehouses()
            .find_and_lock_by_id(&mut first, warehouse.id)
            .await
            .unwrap();
        drop(first);

        let mut second = store.begin().await.unwrap();
        let locked = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.warehouses().find_and_lock_by_id(&mut second, warehouse.id),
        )
        .await;
        assert!(matches!(locked, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_locking_same_row_twice_in_one_transaction_does_not_block() {
        let store = InMemoryStore::new();
        let (warehouse, _) = seed(&store).await;

        let mut tx = store.begin().await.unwrap();
        let _ = store
            .warehouses()
            .find_and_lock_by_user_id(&mut tx, UserId::new(1))
            .await
            .unwrap();
        let again = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.warehouses().find_and_lock_by_id(&mut tx, warehouse.id),
        )
        .await;

        assert!(matches!(again, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_commit_rechecks_unique_owner() {
        let store = InMemoryStore::new();
        let new_warehouse = |name: &str| NewWarehouse {
            name: DisplayName::try_new(name).unwrap(),
            address: "somewhere".to_string(),
            user_id: UserId::new(9),
        };

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        let _ = store
            .warehouses()
            .create(&mut first, new_warehouse("A"))
            .await
            .unwrap();
        let _ = store
            .warehouses()
            .create(&mut second, new_warehouse("B"))
            .await
            .unwrap();

        first.commit().await.unwrap();
        let result = second.commit().await;

        assert_eq!(
            result,
            Err(StoreError::Conflict {
                entity: EntityKind::Warehouse
            })
        );
        assert!(!second.is_active());
    }

    #[tokio::test]
    async fn test_movement_requires_existing_parents() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;
        let mut orphan = entry(&warehouse, &product, 1);
        orphan.product_id = ProductId::new(999);

        let mut tx = store.begin().await.unwrap();
        let result = store.movements().create(&mut tx, orphan).await;

        assert_eq!(
            result,
            Err(StoreError::NotFound {
                entity: EntityKind::Product
            })
        );
    }

    #[tokio::test]
    async fn test_commit_rejects_movement_whose_product_was_deleted() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;

        let mut import = store.begin().await.unwrap();
        store
            .movements()
            .bulk_create(&mut import, vec![entry(&warehouse, &product, 3)])
            .await
            .unwrap();

        let mut removal = store.begin().await.unwrap();
        store.products().delete(&mut removal, product.id).await.unwrap();
        removal.commit().await.unwrap();

        let result = import.commit().await;

        assert_eq!(
            result,
            Err(StoreError::NotFound {
                entity: EntityKind::Product
            })
        );
        assert!(!import.is_active());
        assert!(store.committed_movements().is_empty());
    }

    #[tokio::test]
    async fn test_commit_rejects_delete_of_row_that_gained_history() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;

        let mut removal = store.begin().await.unwrap();
        store.products().delete(&mut removal, product.id).await.unwrap();

        let mut import = store.begin().await.unwrap();
        let _ = store
            .movements()
            .create(&mut import, entry(&warehouse, &product, 1))
            .await
            .unwrap();
        import.commit().await.unwrap();

        let result = removal.commit().await;

        assert_eq!(
            result,
            Err(StoreError::Referenced {
                entity: EntityKind::Product
            })
        );
        let mut check = store.begin().await.unwrap();
        assert!(store
            .products()
            .find_and_lock_by_id(&mut check, product.id)
            .await
            .is_ok());
        assert_eq!(store.committed_movements().len(), 1);
    }

    #[tokio::test]
    async fn test_staged_delete_of_warehouse_with_history_is_referenced() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;
        let mut tx = store.begin().await.unwrap();
        let _ = store
            .movements()
            .create(&mut tx, entry(&warehouse, &product, 1))
            .await
            .unwrap();

        let result = store.warehouses().delete(&mut tx, warehouse.id).await;

        assert_eq!(
            result,
            Err(StoreError::Referenced {
                entity: EntityKind::Warehouse
            })
        );
    }

    #[tokio::test]
    async fn test_tail_is_highest_id_when_commits_arrive_out_of_order() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;

        let mut earlier = store.begin().await.unwrap();
        let mut later = store.begin().await.unwrap();
        let first = store
            .movements()
            .create(&mut earlier, entry(&warehouse, &product, 1))
            .await
            .unwrap();
        let second = store
            .movements()
            .create(&mut later, entry(&warehouse, &product, 2))
            .await
            .unwrap();
        later.commit().await.unwrap();
        earlier.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let tail = store
            .movements()
            .find_last_movement(
                &mut tx,
                LedgerScope::WarehouseProduct {
                    warehouse_id: warehouse.id,
                    product_id: product.id,
                },
            )
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(tail.id, second.id);
    }

    #[tokio::test]
    async fn test_finished_transactions_leave_no_row_locks_behind() {
        let store = InMemoryStore::new();
        let (warehouse, product) = seed(&store).await;

        let mut committed = store.begin().await.unwrap();
        let _ = store
            .warehouses()
            .find_and_lock_by_id(&mut committed, warehouse.id)
            .await
            .unwrap();
        committed.commit().await.unwrap();

        let mut dropped = store.begin().await.unwrap();
        let _ = store
            .products()
            .find_and_lock_by_id(&mut dropped, product.id)
            .await
            .unwrap();
        assert_eq!(store.shared.row_locks.lock().len(), 1);
        drop(dropped);

        assert!(store.shared.row_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_parameters_round_trip() {
        let store = InMemoryStore::new();
        store.set_parameter("max_movement_quantity", 500);

        assert_eq!(store.get_param_int("max_movement_quantity").await, Ok(500));
        assert_eq!(
            store.get_param_int("missing").await,
            Err(StoreError::NotFound {
                entity: EntityKind::Parameter
            })
        );
    }
}
