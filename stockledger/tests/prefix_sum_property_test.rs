mod common;

use common::{movement, services};
use proptest::prelude::*;
use stockledger::{InvalidMovement, LedgerError, MovementType};
use stockledger_memory::InMemoryStore;

fn movement_type() -> impl Strategy<Value = MovementType> {
    prop_oneof![Just(MovementType::Income), Just(MovementType::Outcome)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn ledger_balance_is_the_prefix_sum_of_accepted_movements(
        steps in prop::collection::vec((1i64..=25, movement_type()), 1..30)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime builds");

        runtime.block_on(async {
            let store = InMemoryStore::new();
            let app = services(&store);
            let _ = app.warehouse(1, "North").await;
            let product = app.product(true).await;
            let mut expected = 0_i64;

            for (quantity, movement_type) in steps {
                let result = app
                    .ledger
                    .create(movement(1, &product, quantity, movement_type, None))
                    .await;
                let next = expected + quantity * movement_type.sign();

                if next < 0 {
                    prop_assert_eq!(
                        result,
                        Err(LedgerError::InvalidMovement(InvalidMovement::InsufficientStock {
                            available: expected,
                            requested: quantity,
                        }))
                    );
                } else {
                    let entry = result.expect("movement accepted");
                    prop_assert_eq!(entry.available.into_inner(), next);
                    expected = next;
                }
            }

            let mut running = 0_i64;
            for entry in store.committed_movements() {
                running += entry.signed_quantity();
                prop_assert!(running >= 0);
                prop_assert_eq!(entry.available.into_inner(), running);
            }
            prop_assert_eq!(running, expected);
            Ok(())
        })?;
    }
}
