//! Shared setup for stockledger integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use stockledger::{
    DisplayName, LedgerConfig, LedgerError, MaxMovementQuantity, Movement, MovementRequest,
    MovementType, NewWarehouse, Product, ProductService, StaticParameters, StockLedgerService,
    Store, UserId, Warehouse, WarehouseService,
};
use stockledger_memory::InMemoryStore;
use stockledger_testing::fixtures::new_product;

/// Services sharing one store.
pub struct Services<S> {
    pub ledger: StockLedgerService<S>,
    pub warehouses: WarehouseService<S>,
    pub products: ProductService<S>,
}

pub fn parameters(max_movement_quantity: i64) -> Arc<StaticParameters> {
    let config = LedgerConfig {
        max_movement_quantity: MaxMovementQuantity::try_new(max_movement_quantity)
            .expect("positive maximum"),
    };
    Arc::new(StaticParameters::from(&config))
}

pub fn services(store: &InMemoryStore) -> Services<InMemoryStore> {
    Services {
        ledger: StockLedgerService::new(store.clone(), parameters(1_000)),
        warehouses: WarehouseService::new(store.clone()),
        products: ProductService::new(store.clone()),
    }
}

impl<S: Store> Services<S> {
    pub async fn warehouse(&self, user: i64, name: &str) -> Warehouse {
        self.warehouses
            .create(NewWarehouse {
                name: DisplayName::try_new(name).expect("valid name"),
                address: format!("{name} street"),
                user_id: UserId::new(user),
            })
            .await
            .expect("warehouse created")
    }

    pub async fn product(&self, enabled: bool) -> Product {
        self.products
            .create(new_product("item", enabled))
            .await
            .expect("product created")
    }

    pub async fn income(&self, user: i64, product: &Product, quantity: i64) -> Movement {
        self.ledger
            .create(movement(user, product, quantity, MovementType::Income, None))
            .await
            .expect("income recorded")
    }

    pub async fn outcome(
        &self,
        user: i64,
        product: &Product,
        quantity: i64,
    ) -> Result<Movement, LedgerError> {
        self.ledger
            .create(movement(user, product, quantity, MovementType::Outcome, None))
            .await
    }

    pub async fn transfer(
        &self,
        user: i64,
        product: &Product,
        quantity: i64,
        target: &Warehouse,
    ) -> Result<Movement, LedgerError> {
        self.ledger
            .create(movement(
                user,
                product,
                quantity,
                MovementType::Outcome,
                Some(target),
            ))
            .await
    }

    pub async fn available(&self, user: i64, product: &Product) -> i64 {
        self.ledger
            .balance(UserId::new(user), product.id)
            .await
            .expect("balance readable")
            .into_inner()
    }
}

pub fn movement(
    user: i64,
    product: &Product,
    quantity: i64,
    movement_type: MovementType,
    target: Option<&Warehouse>,
) -> MovementRequest {
    MovementRequest {
        product_id: product.id.into_inner(),
        quantity,
        movement_type: movement_type.into(),
        concept: "test movement".to_string(),
        target_warehouse_id: target.map(|w| w.id.into_inner()),
        user_id: user,
    }
}
