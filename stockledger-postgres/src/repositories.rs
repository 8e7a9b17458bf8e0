//! SQL repositories bound to [`PostgresTransaction`].

use sqlx::query;
use stockledger_types::{
    EntityKind, LedgerScope, Movement, MovementRepository, NewMovement, NewProduct,
    NewWarehouse, Operation, Product, ProductId, ProductRepository, StoreError, UserId, Warehouse,
    WarehouseId, WarehouseRepository,
};
use tracing::{debug, instrument};

use crate::rows::{self, MOVEMENT_COLUMNS, PRODUCT_COLUMNS, WAREHOUSE_COLUMNS};
use crate::{map_sqlx_error, PostgresTransaction};

/// Warehouse rows of a [`crate::PostgresStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresWarehouses;

/// Product rows of a [`crate::PostgresStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresProducts;

/// The append-only `movements` table of a [`crate::PostgresStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresMovements;

impl WarehouseRepository<PostgresTransaction> for PostgresWarehouses {
    #[instrument(name = "postgres.warehouses.create", skip(self, tx))]
    async fn create(
        &self,
        tx: &mut PostgresTransaction,
        warehouse: NewWarehouse,
    ) -> Result<Warehouse, StoreError> {
        let sql = format!(
            "INSERT INTO warehouses (name, address, user_id) VALUES ($1, $2, $3) \
             RETURNING {WAREHOUSE_COLUMNS}"
        );
        let row = query(&sql)
            .bind(warehouse.name.as_ref())
            .bind(&warehouse.address)
            .bind(warehouse.user_id.into_inner())
            .fetch_one(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Insert, EntityKind::Warehouse))?;

        rows::warehouse(&row)
    }

    async fn find_by_user_id(
        &self,
        tx: &mut PostgresTransaction,
        user_id: UserId,
    ) -> Result<Warehouse, StoreError> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE user_id = $1");
        let row = query(&sql)
            .bind(user_id.into_inner())
            .fetch_optional(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::ReadRow, EntityKind::Warehouse))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            })?;

        rows::warehouse(&row)
    }

    #[instrument(name = "postgres.warehouses.lock", skip(self, tx))]
    async fn find_and_lock_by_id(
        &self,
        tx: &mut PostgresTransaction,
        id: WarehouseId,
    ) -> Result<Warehouse, StoreError> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1 FOR UPDATE");
        let row = query(&sql)
            .bind(id.into_inner())
            .fetch_optional(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::LockRow, EntityKind::Warehouse))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            })?;

        debug!(warehouse_id = %id, "[postgres.lock_row] warehouse row locked");
        rows::warehouse(&row)
    }

    #[instrument(name = "postgres.warehouses.lock_by_user", skip(self, tx))]
    async fn find_and_lock_by_user_id(
        &self,
        tx: &mut PostgresTransaction,
        user_id: UserId,
    ) -> Result<Warehouse, StoreError> {
        let sql =
            format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE user_id = $1 FOR UPDATE");
        let row = query(&sql)
            .bind(user_id.into_inner())
            .fetch_optional(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::LockRow, EntityKind::Warehouse))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            })?;

        debug!(user_id = %user_id, "[postgres.lock_row] warehouse row locked");
        rows::warehouse(&row)
    }

    #[instrument(name = "postgres.warehouses.delete", skip(self, tx))]
    async fn delete(&self, tx: &mut PostgresTransaction, id: WarehouseId) -> Result<(), StoreError> {
        let result = query("DELETE FROM warehouses WHERE id = $1")
            .bind(id.into_inner())
            .execute(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Delete, EntityKind::Warehouse))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: EntityKind::Warehouse,
            });
        }
        Ok(())
    }
}

impl ProductRepository<PostgresTransaction> for PostgresProducts {
    #[instrument(name = "postgres.products.create", skip(self, tx))]
    async fn create(
        &self,
        tx: &mut PostgresTransaction,
        product: NewProduct,
    ) -> Result<Product, StoreError> {
        let sql = format!(
            "INSERT INTO products (name, slug, enabled, description) VALUES ($1, $2, $3, $4) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = query(&sql)
            .bind(product.name.as_ref())
            .bind(product.slug.as_ref())
            .bind(product.enabled)
            .bind(product.description.as_deref())
            .fetch_one(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Insert, EntityKind::Product))?;

        rows::product(&row)
    }

    #[instrument(name = "postgres.products.lock", skip(self, tx))]
    async fn find_and_lock_by_id(
        &self,
        tx: &mut PostgresTransaction,
        id: ProductId,
    ) -> Result<Product, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let row = query(&sql)
            .bind(id.into_inner())
            .fetch_optional(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::LockRow, EntityKind::Product))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Product,
            })?;

        debug!(product_id = %id, "[postgres.lock_row] product row locked");
        rows::product(&row)
    }

    #[instrument(name = "postgres.products.set_enabled", skip(self, tx))]
    async fn set_enabled(
        &self,
        tx: &mut PostgresTransaction,
        id: ProductId,
        enabled: bool,
    ) -> Result<Product, StoreError> {
        let sql =
            format!("UPDATE products SET enabled = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
        let row = query(&sql)
            .bind(id.into_inner())
            .bind(enabled)
            .fetch_optional(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Update, EntityKind::Product))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Product,
            })?;

        rows::product(&row)
    }

    #[instrument(name = "postgres.products.delete", skip(self, tx))]
    async fn delete(&self, tx: &mut PostgresTransaction, id: ProductId) -> Result<(), StoreError> {
        let result = query("DELETE FROM products WHERE id = $1")
            .bind(id.into_inner())
            .execute(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Delete, EntityKind::Product))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: EntityKind::Product,
            });
        }
        Ok(())
    }
}

impl MovementRepository<PostgresTransaction> for PostgresMovements {
    #[instrument(name = "postgres.movements.create", skip(self, tx))]
    async fn create(
        &self,
        tx: &mut PostgresTransaction,
        movement: NewMovement,
    ) -> Result<Movement, StoreError> {
        let sql = format!(
            "INSERT INTO stock_movements \
             (product_id, warehouse_id, quantity, type, available, concept) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MOVEMENT_COLUMNS}"
        );
        let row = query(&sql)
            .bind(movement.product_id.into_inner())
            .bind(movement.warehouse_id.into_inner())
            .bind(movement.quantity.into_inner())
            .bind(i16::from(movement.movement_type))
            .bind(movement.available.into_inner())
            .bind(movement.concept.as_ref())
            .fetch_one(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::Insert, EntityKind::Movement))?;

        rows::movement(&row)
    }

    async fn find_last_movement(
        &self,
        tx: &mut PostgresTransaction,
        scope: LedgerScope,
    ) -> Result<Movement, StoreError> {
        let statement = match scope {
            LedgerScope::WarehouseProduct {
                warehouse_id,
                product_id,
            } => query(TAIL_BY_WAREHOUSE_PRODUCT)
                .bind(warehouse_id.into_inner())
                .bind(product_id.into_inner()),
            LedgerScope::Warehouse(warehouse_id) => {
                query(TAIL_BY_WAREHOUSE).bind(warehouse_id.into_inner())
            }
            LedgerScope::Product(product_id) => {
                query(TAIL_BY_PRODUCT).bind(product_id.into_inner())
            }
        };

        let row = statement
            .fetch_optional(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::ReadTail, EntityKind::Movement))?
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Movement,
            })?;

        rows::movement(&row)
    }

    #[instrument(
        name = "postgres.movements.bulk_create",
        skip(self, tx, movements),
        fields(count = movements.len())
    )]
    async fn bulk_create(
        &self,
        tx: &mut PostgresTransaction,
        movements: Vec<NewMovement>,
    ) -> Result<(), StoreError> {
        if movements.is_empty() {
            return Ok(());
        }

        let mut product_ids = Vec::with_capacity(movements.len());
        let mut warehouse_ids = Vec::with_capacity(movements.len());
        let mut quantities = Vec::with_capacity(movements.len());
        let mut types = Vec::with_capacity(movements.len());
        let mut balances = Vec::with_capacity(movements.len());
        let mut concepts = Vec::with_capacity(movements.len());
        for movement in movements {
            product_ids.push(movement.product_id.into_inner());
            warehouse_ids.push(movement.warehouse_id.into_inner());
            quantities.push(movement.quantity.into_inner());
            types.push(i16::from(movement.movement_type));
            balances.push(movement.available.into_inner());
            concepts.push(movement.concept.into_inner());
        }

        let _ = query(BULK_INSERT)
            .bind(product_ids)
            .bind(warehouse_ids)
            .bind(quantities)
            .bind(types)
            .bind(balances)
            .bind(concepts)
            .execute(tx.connection()?)
            .await
            .map_err(|error| map_sqlx_error(error, Operation::BulkInsert, EntityKind::Movement))?;

        Ok(())
    }
}

const TAIL_BY_WAREHOUSE_PRODUCT: &str = "SELECT id, product_id, warehouse_id, quantity, type, \
     available, concept, created_at FROM stock_movements \
     WHERE warehouse_id = $1 AND product_id = $2 ORDER BY id DESC LIMIT 1";

const TAIL_BY_WAREHOUSE: &str = "SELECT id, product_id, warehouse_id, quantity, type, \
     available, concept, created_at FROM stock_movements \
     WHERE warehouse_id = $1 ORDER BY id DESC LIMIT 1";

const TAIL_BY_PRODUCT: &str = "SELECT id, product_id, warehouse_id, quantity, type, \
     available, concept, created_at FROM stock_movements \
     WHERE product_id = $1 ORDER BY id DESC LIMIT 1";

// Rows keep their batch order so identity values follow it.
const BULK_INSERT: &str = "INSERT INTO stock_movements \
     (product_id, warehouse_id, quantity, type, available, concept) \
     SELECT product_id, warehouse_id, quantity, type, available, concept \
     FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::BIGINT[], $4::SMALLINT[], $5::BIGINT[], \
     $6::VARCHAR[]) WITH ORDINALITY \
     AS batch (product_id, warehouse_id, quantity, type, available, concept, ord) \
     ORDER BY ord";

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_types::MovementType;

    #[test]
    fn tail_queries_select_every_movement_column() {
        for sql in [TAIL_BY_WAREHOUSE_PRODUCT, TAIL_BY_WAREHOUSE, TAIL_BY_PRODUCT] {
            assert!(sql.contains(MOVEMENT_COLUMNS));
            assert!(sql.ends_with("ORDER BY id DESC LIMIT 1"));
        }
    }

    #[test]
    fn movement_type_is_stored_as_its_sign() {
        assert_eq!(i16::from(MovementType::Income), 1);
        assert_eq!(i16::from(MovementType::Outcome), -1);
    }
}
