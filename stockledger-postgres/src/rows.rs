//! Row decoding for the stock ledger tables.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use stockledger_types::{
    Available, Concept, DisplayName, EntityKind, Movement, MovementId, MovementType, Operation,
    Product, ProductId, ProductSlug, Quantity, StoreError, UserId, Warehouse, WarehouseId,
};

use crate::map_sqlx_error;

pub(crate) const WAREHOUSE_COLUMNS: &str = "id, name, address, user_id, created_at";
pub(crate) const PRODUCT_COLUMNS: &str = "id, name, slug, enabled, description, created_at";
pub(crate) const MOVEMENT_COLUMNS: &str =
    "id, product_id, warehouse_id, quantity, type, available, concept, created_at";

fn column<'r, T>(row: &'r PgRow, name: &str, entity: EntityKind) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|error| map_sqlx_error(error, Operation::DecodeRow, entity))
}

fn invalid(column: &str, error: &impl std::fmt::Display) -> StoreError {
    StoreError::StoreFailure {
        operation: Operation::DecodeRow,
        detail: format!("column {column} holds an invalid value: {error}"),
    }
}

pub(crate) fn warehouse(row: &PgRow) -> Result<Warehouse, StoreError> {
    let entity = EntityKind::Warehouse;
    let name: String = column(row, "name", entity)?;
    let created_at: DateTime<Utc> = column(row, "created_at", entity)?;

    Ok(Warehouse {
        id: WarehouseId::new(column(row, "id", entity)?),
        name: DisplayName::try_new(name).map_err(|error| invalid("name", &error))?,
        address: column(row, "address", entity)?,
        user_id: UserId::new(column(row, "user_id", entity)?),
        created_at,
    })
}

pub(crate) fn product(row: &PgRow) -> Result<Product, StoreError> {
    let entity = EntityKind::Product;
    let name: String = column(row, "name", entity)?;
    let slug: String = column(row, "slug", entity)?;

    Ok(Product {
        id: ProductId::new(column(row, "id", entity)?),
        name: DisplayName::try_new(name).map_err(|error| invalid("name", &error))?,
        slug: ProductSlug::try_new(slug).map_err(|error| invalid("slug", &error))?,
        enabled: column(row, "enabled", entity)?,
        description: column(row, "description", entity)?,
        created_at: column(row, "created_at", entity)?,
    })
}

pub(crate) fn movement(row: &PgRow) -> Result<Movement, StoreError> {
    let entity = EntityKind::Movement;
    let quantity: i64 = column(row, "quantity", entity)?;
    let movement_type: i16 = column(row, "type", entity)?;
    let available: i64 = column(row, "available", entity)?;
    let concept: String = column(row, "concept", entity)?;

    Ok(Movement {
        id: MovementId::new(column(row, "id", entity)?),
        product_id: ProductId::new(column(row, "product_id", entity)?),
        warehouse_id: WarehouseId::new(column(row, "warehouse_id", entity)?),
        quantity: Quantity::try_new(quantity).map_err(|error| invalid("quantity", &error))?,
        movement_type: MovementType::try_from(movement_type)
            .map_err(|error| invalid("type", &error))?,
        available: Available::try_new(available).map_err(|error| invalid("available", &error))?,
        concept: Concept::try_new(concept).map_err(|error| invalid("concept", &error))?,
        created_at: column(row, "created_at", entity)?,
    })
}
