mod common;

use std::num::NonZeroUsize;

use common::{movement, parameters, services};
use stockledger::{
    EntityKind, InvalidMovement, LedgerError, MovementType, Operation, StockLedgerService,
    StoreError,
};
use stockledger_memory::InMemoryStore;
use stockledger_testing::chaos::{ChaosConfig, ChaosStoreExt};

#[tokio::test]
async fn transfer_writes_outcome_and_income_legs() {
    // Given: North holds 10 units, South holds 2
    let store = InMemoryStore::new();
    let app = services(&store);
    let north = app.warehouse(1, "North").await;
    let south = app.warehouse(2, "South").await;
    let product = app.product(true).await;
    let _ = app.income(1, &product, 10).await;
    let _ = app.income(2, &product, 2).await;

    // When: North transfers 4 units to South
    let first_leg = app
        .transfer(1, &product, 4, &south)
        .await
        .expect("transfer recorded");

    // Then: North's leg is returned and South receives a matching income
    assert_eq!(first_leg.warehouse_id, north.id);
    assert_eq!(first_leg.movement_type, MovementType::Outcome);
    assert_eq!(first_leg.available.into_inner(), 6);
    assert_eq!(
        first_leg.concept.as_ref(),
        "Transfer to warehouse South: test movement"
    );

    let movements = store.committed_movements();
    assert_eq!(movements.len(), 4);
    let second_leg = movements.last().expect("second leg written");
    assert_eq!(second_leg.warehouse_id, south.id);
    assert_eq!(second_leg.movement_type, MovementType::Income);
    assert_eq!(second_leg.quantity, first_leg.quantity);
    assert_eq!(second_leg.available.into_inner(), 6);
    assert_eq!(
        second_leg.concept.as_ref(),
        "Transfer from warehouse North: test movement"
    );
    assert!(second_leg.id > first_leg.id);

    assert_eq!(app.available(1, &product).await, 6);
    assert_eq!(app.available(2, &product).await, 6);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn transfer_log_names_both_legs() {
    // Given: North holds 5 units
    let store = InMemoryStore::new();
    let app = services(&store);
    let _ = app.warehouse(1, "North").await;
    let south = app.warehouse(2, "South").await;
    let product = app.product(true).await;
    let _ = app.income(1, &product, 5).await;

    // When: North transfers 2 units to South
    let first_leg = app
        .transfer(1, &product, 2, &south)
        .await
        .expect("transfer recorded");

    // Then: the completion event carries the id of each leg
    let second_leg = store
        .committed_movements()
        .last()
        .cloned()
        .expect("second leg written");
    assert!(logs_contain("[ledger.create] transfer recorded"));
    assert!(logs_contain(&format!("movement_id={}", first_leg.id)));
    assert!(logs_contain(&format!("counterpart_id={}", second_leg.id)));
    assert!(logs_contain(&format!("target_warehouse_id={}", south.id)));
}

#[tokio::test]
async fn self_transfer_is_rejected_without_writes() {
    // Given: North holds 5 units
    let store = InMemoryStore::new();
    let app = services(&store);
    let north = app.warehouse(1, "North").await;
    let product = app.product(true).await;
    let _ = app.income(1, &product, 5).await;

    // When: North transfers to itself
    let result = app.transfer(1, &product, 1, &north).await;

    // Then: the transfer is refused and only the seed entry exists
    assert_eq!(
        result,
        Err(LedgerError::InvalidMovement(InvalidMovement::SelfTransfer))
    );
    assert_eq!(store.committed_movements().len(), 1);
}

#[tokio::test]
async fn transfer_beyond_stock_is_rejected() {
    // Given: North holds 3 units
    let store = InMemoryStore::new();
    let app = services(&store);
    let _ = app.warehouse(1, "North").await;
    let south = app.warehouse(2, "South").await;
    let product = app.product(true).await;
    let _ = app.income(1, &product, 3).await;

    // When: North transfers 4 units
    let result = app.transfer(1, &product, 4, &south).await;

    // Then: nothing reaches South
    assert!(matches!(
        result,
        Err(LedgerError::InvalidMovement(
            InvalidMovement::InsufficientStock { available: 3, .. }
        ))
    ));
    assert_eq!(app.available(2, &product).await, 0);
}

#[tokio::test]
async fn transfer_to_unknown_warehouse_is_not_found() {
    // Given: North holds stock
    let store = InMemoryStore::new();
    let app = services(&store);
    let _ = app.warehouse(1, "North").await;
    let product = app.product(true).await;
    let _ = app.income(1, &product, 3).await;
    let mut request = movement(1, &product, 1, MovementType::Outcome, None);
    request.target_warehouse_id = Some(9_999);

    // When: transferring to a warehouse that does not exist
    let result = app.ledger.create(request).await;

    // Then: the target is reported missing and North keeps its stock
    assert_eq!(
        result,
        Err(LedgerError::NotFound {
            entity: EntityKind::Warehouse
        })
    );
    assert_eq!(app.available(1, &product).await, 3);
}

#[tokio::test]
async fn failing_second_leg_rolls_back_first_leg() {
    // Given: North holds 10 units, seeded through the plain store
    let base = InMemoryStore::new();
    let app = services(&base);
    let _ = app.warehouse(1, "North").await;
    let south = app.warehouse(2, "South").await;
    let product = app.product(true).await;
    let _ = app.income(1, &product, 10).await;

    // And: a ledger whose second ledger write fails
    let chaos = base.clone().with_chaos(
        ChaosConfig::deterministic().failing_nth_create(NonZeroUsize::new(2).expect("non-zero")),
    );
    let ledger = StockLedgerService::new(chaos, parameters(1_000));

    // When: North transfers 4 units to South
    let result = ledger
        .create(movement(1, &product, 4, MovementType::Outcome, Some(&south)))
        .await;

    // Then: the failure surfaces and neither leg is visible
    assert!(matches!(
        result,
        Err(LedgerError::Storage(StoreError::StoreFailure {
            operation: Operation::Insert,
            ..
        }))
    ));
    assert_eq!(ledger.store().create_calls(), 2);
    assert_eq!(base.committed_movements().len(), 1);
    assert_eq!(app.available(1, &product).await, 10);
    assert_eq!(app.available(2, &product).await, 0);
}
