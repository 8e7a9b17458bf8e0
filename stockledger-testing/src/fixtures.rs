//! Builders for test entities.
//!
//! Names, slugs and user ids are randomized so tests can run in parallel
//! against a shared database.

use stockledger_types::{
    Available, Concept, DisplayName, MovementType, NewMovement, NewProduct, NewWarehouse,
    ProductId, ProductSlug, Quantity, UserId, WarehouseId,
};
use uuid::Uuid;

/// A user id that is very unlikely to collide with another test's.
pub fn unique_user_id() -> UserId {
    UserId::new(i64::from(rand::random::<u32>()) + 1)
}

/// A warehouse owned by `user_id` with a unique name.
pub fn new_warehouse(user_id: UserId) -> NewWarehouse {
    NewWarehouse {
        name: DisplayName::try_new(format!("warehouse {}", Uuid::now_v7()))
            .expect("generated warehouse name is valid"),
        address: "1 Test Street".to_string(),
        user_id,
    }
}

/// A product with a unique slug starting with `prefix`.
pub fn new_product(prefix: &str, enabled: bool) -> NewProduct {
    let slug = format!("{}-{}", prefix, Uuid::now_v7().simple());
    NewProduct {
        name: DisplayName::try_new(slug.clone()).expect("generated product name is valid"),
        slug: ProductSlug::try_new(slug).expect("generated slug is valid"),
        enabled,
        description: Some("created by a test fixture".to_string()),
    }
}

/// An income entry carrying a precomputed running balance.
pub fn income_entry(
    warehouse_id: WarehouseId,
    product_id: ProductId,
    quantity: i64,
    available: i64,
) -> NewMovement {
    NewMovement {
        product_id,
        warehouse_id,
        quantity: Quantity::try_new(quantity).expect("fixture quantity is positive"),
        movement_type: MovementType::Income,
        available: Available::try_new(available).expect("fixture balance is non-negative"),
        concept: Concept::try_new("fixture income").expect("fixture concept is valid"),
    }
}
