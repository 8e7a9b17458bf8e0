//! Warehouse and product maintenance, including the delete guards.
//!
//! A warehouse or product that appears anywhere in the ledger can never be
//! deleted: the guard locks the row, looks up the tail of the entity's ledger
//! scope and refuses when an entry exists or when the lookup itself fails.

use stockledger_types::{
    EntityKind, LedgerScope, MovementRepository, NewProduct, NewWarehouse, Product, ProductId,
    ProductRepository, Store, TransactionContext, UserId, Warehouse, WarehouseRepository,
};
use tracing::{info, instrument, warn};

use crate::errors::{DeleteRefusal, LedgerError};
use crate::transaction::finish;

/// Refuse deletion when `scope` has ledger history.
async fn ensure_no_history<Tx, M>(
    movements: &M,
    tx: &mut Tx,
    entity: EntityKind,
    scope: LedgerScope,
) -> Result<(), LedgerError>
where
    Tx: TransactionContext,
    M: MovementRepository<Tx>,
{
    match movements.find_last_movement(tx, scope).await {
        Ok(tail) => {
            warn!(
                entity = %entity,
                last_movement_id = %tail.id,
                "[delete_guard] ledger history exists, refusing deletion"
            );
            Err(LedgerError::CannotDelete {
                entity,
                reason: DeleteRefusal::HistoryExists,
            })
        }
        Err(error) if error.is_not_found() => Ok(()),
        Err(error) => {
            warn!(
                entity = %entity,
                error = %error,
                "[delete_guard] history lookup failed, refusing deletion"
            );
            Err(LedgerError::CannotDelete {
                entity,
                reason: DeleteRefusal::HistoryLookupFailed,
            })
        }
    }
}

/// Creates, finds and deletes warehouses.
pub struct WarehouseService<S> {
    store: S,
}

impl<S> WarehouseService<S>
where
    S: Store,
{
    /// A service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register the warehouse of a user. A user owns at most one.
    #[instrument(name = "warehouse.create", skip(self, warehouse), fields(user_id = %warehouse.user_id))]
    pub async fn create(&self, warehouse: NewWarehouse) -> Result<Warehouse, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .store
            .warehouses()
            .create(&mut tx, warehouse)
            .await
            .map_err(LedgerError::from);
        let created = finish(tx, outcome, "warehouse.create").await?;

        info!(warehouse_id = %created.id, "[warehouse.create] warehouse created");
        Ok(created)
    }

    /// The warehouse owned by `user_id`.
    pub async fn find_for_user(&self, user_id: UserId) -> Result<Warehouse, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .store
            .warehouses()
            .find_by_user_id(&mut tx, user_id)
            .await
            .map_err(LedgerError::from);
        finish(tx, outcome, "warehouse.find_for_user").await
    }

    /// Delete the warehouse owned by `user_id` unless it has ledger history.
    #[instrument(name = "warehouse.delete", skip(self))]
    pub async fn delete(&self, user_id: UserId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self.delete_in(&mut tx, user_id).await;
        finish(tx, outcome, "warehouse.delete").await
    }

    async fn delete_in(&self, tx: &mut S::Tx, user_id: UserId) -> Result<(), LedgerError> {
        let warehouses = self.store.warehouses();
        let warehouse = warehouses.find_and_lock_by_user_id(tx, user_id).await?;

        ensure_no_history(
            self.store.movements(),
            tx,
            EntityKind::Warehouse,
            LedgerScope::Warehouse(warehouse.id),
        )
        .await?;

        warehouses.delete(tx, warehouse.id).await?;
        info!(warehouse_id = %warehouse.id, "[warehouse.delete] warehouse deleted");
        Ok(())
    }
}

/// Creates, toggles and deletes catalog products.
pub struct ProductService<S> {
    store: S,
}

impl<S> ProductService<S>
where
    S: Store,
{
    /// A service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Add a product to the catalog. Slugs are unique.
    #[instrument(name = "product.create", skip(self, product), fields(slug = %product.slug))]
    pub async fn create(&self, product: NewProduct) -> Result<Product, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .store
            .products()
            .create(&mut tx, product)
            .await
            .map_err(LedgerError::from);
        let created = finish(tx, outcome, "product.create").await?;

        info!(product_id = %created.id, "[product.create] product created");
        Ok(created)
    }

    /// Enable or disable a product. Disabled products refuse new movements.
    #[instrument(name = "product.set_enabled", skip(self))]
    pub async fn set_enabled(
        &self,
        product_id: ProductId,
        enabled: bool,
    ) -> Result<Product, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .store
            .products()
            .set_enabled(&mut tx, product_id, enabled)
            .await
            .map_err(LedgerError::from);
        finish(tx, outcome, "product.set_enabled").await
    }

    /// Delete a product unless it has ledger history in any warehouse.
    #[instrument(name = "product.delete", skip(self))]
    pub async fn delete(&self, product_id: ProductId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self.delete_in(&mut tx, product_id).await;
        finish(tx, outcome, "product.delete").await
    }

    async fn delete_in(&self, tx: &mut S::Tx, product_id: ProductId) -> Result<(), LedgerError> {
        let products = self.store.products();
        let product = products.find_and_lock_by_id(tx, product_id).await?;

        ensure_no_history(
            self.store.movements(),
            tx,
            EntityKind::Product,
            LedgerScope::Product(product.id),
        )
        .await?;

        products.delete(tx, product.id).await?;
        info!(product_id = %product.id, "[product.delete] product deleted");
        Ok(())
    }
}
