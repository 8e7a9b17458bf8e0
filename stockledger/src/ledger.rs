//! The stock ledger service.
//!
//! Every movement is recorded inside one store transaction:
//!
//! 1. lock the warehouses involved, in ascending id order;
//! 2. lock the product and check that it is enabled;
//! 3. read the ledger tail of (warehouse, product) and compute the new
//!    running balance;
//! 4. append the entry, plus the income leg on the target for a transfer;
//! 5. commit.
//!
//! Locks are held until the transaction finishes, so two writers on the same
//! warehouse serialize and each sees the other's tail. Opposite transfers over
//! the same pair of warehouses lock in the same order and cannot deadlock.

use std::sync::Arc;

use stockledger_types::{
    Available, Concept, EntityKind, LedgerScope, Movement, MovementRepository, MovementType,
    NewMovement, ParameterStore, Product, ProductId, ProductRepository, Store, UserId, Warehouse,
    WarehouseId, WarehouseRepository, MAX_MOVEMENT_QUANTITY,
};
use tracing::{info, instrument, warn};

use crate::errors::{InvalidMovement, LedgerError, ValidationError};
use crate::request::{MovementRequest, ValidatedMovement};
use crate::transaction::finish;

/// Records stock movements and transfers.
pub struct StockLedgerService<S> {
    store: S,
    parameters: Arc<dyn ParameterStore>,
}

/// Entries written for one movement.
struct Recorded {
    entry: Movement,
    counterpart: Option<Movement>,
}

/// Warehouses locked for one movement.
struct LockedWarehouses {
    source: Warehouse,
    target: Option<Warehouse>,
}

impl<S> StockLedgerService<S>
where
    S: Store,
{
    /// A ledger over `store`, reading limits from `parameters`.
    pub fn new(store: S, parameters: Arc<dyn ParameterStore>) -> Self {
        Self { store, parameters }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and record a movement, returning the entry written for the
    /// acting user's warehouse.
    ///
    /// A transfer writes a second, income entry on the target warehouse in
    /// the same transaction. Any failure rolls both back.
    #[instrument(
        name = "ledger.create",
        skip(self, request),
        fields(user_id = request.user_id, product_id = request.product_id)
    )]
    pub async fn create(&self, request: MovementRequest) -> Result<Movement, LedgerError> {
        let movement = request.validate().map_err(|error| {
            warn!(error = %error, "[ledger.create] request rejected");
            LedgerError::from(error)
        })?;

        if movement.is_transfer() && movement.movement_type != MovementType::Outcome {
            warn!("[ledger.create] transfer requested as income");
            return Err(InvalidMovement::TransferMustBeOutcome.into());
        }

        let max = self.parameters.get_param_int(MAX_MOVEMENT_QUANTITY).await?;
        let quantity = movement.quantity.into_inner();
        if quantity > max {
            warn!(quantity, max, "[ledger.create] quantity above maximum");
            return Err(InvalidMovement::QuantityAboveMaximum { quantity, max }.into());
        }

        let mut tx = self.store.begin().await?;
        let outcome = self.record(&mut tx, &movement).await;
        let Recorded { entry, counterpart } = finish(tx, outcome, "ledger.create").await?;

        match counterpart {
            Some(counterpart) => info!(
                movement_id = %entry.id,
                warehouse_id = %entry.warehouse_id,
                available = %entry.available,
                counterpart_id = %counterpart.id,
                target_warehouse_id = %counterpart.warehouse_id,
                target_available = %counterpart.available,
                "[ledger.create] transfer recorded"
            ),
            None => info!(
                movement_id = %entry.id,
                warehouse_id = %entry.warehouse_id,
                available = %entry.available,
                "[ledger.create] movement recorded"
            ),
        }
        Ok(entry)
    }

    /// Current stock of `product_id` in the warehouse owned by `user_id`,
    /// zero when the pair has no history.
    #[instrument(name = "ledger.balance", skip(self))]
    pub async fn balance(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Available, LedgerError> {
        let mut tx = self.store.begin().await?;
        let outcome = self.read_balance(&mut tx, user_id, product_id).await;
        finish(tx, outcome, "ledger.balance").await
    }

    async fn read_balance(
        &self,
        tx: &mut S::Tx,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Available, LedgerError> {
        let warehouse = self.store.warehouses().find_by_user_id(tx, user_id).await?;
        self.tail_balance(tx, warehouse.id, product_id).await
    }

    async fn record(
        &self,
        tx: &mut S::Tx,
        movement: &ValidatedMovement,
    ) -> Result<Recorded, LedgerError> {
        let LockedWarehouses { source, target } = self.lock_warehouses(tx, movement).await?;
        let product = self.lock_enabled_product(tx, movement.product_id).await?;

        let available = self
            .tail_balance(tx, source.id, product.id)
            .await?
            .apply(movement.quantity, movement.movement_type)
            .map_err(|error| {
                warn!(
                    warehouse_id = %source.id,
                    product_id = %product.id,
                    error = %error,
                    "[ledger.create] balance check failed"
                );
                LedgerError::from(error)
            })?;

        let concept = match &target {
            Some(target) => generated_concept("Transfer to warehouse", target, &movement.concept)?,
            None => movement.concept.clone(),
        };
        let first_leg = self
            .store
            .movements()
            .create(
                tx,
                NewMovement {
                    product_id: product.id,
                    warehouse_id: source.id,
                    quantity: movement.quantity,
                    movement_type: movement.movement_type,
                    available,
                    concept,
                },
            )
            .await?;

        let Some(target) = target else {
            return Ok(Recorded {
                entry: first_leg,
                counterpart: None,
            });
        };

        let target_available = self
            .tail_balance(tx, target.id, product.id)
            .await?
            .apply(movement.quantity, MovementType::Income)?;
        let concept = generated_concept("Transfer from warehouse", &source, &movement.concept)?;
        let second_leg = self
            .store
            .movements()
            .create(
                tx,
                NewMovement {
                    product_id: product.id,
                    warehouse_id: target.id,
                    quantity: movement.quantity,
                    movement_type: MovementType::Income,
                    available: target_available,
                    concept,
                },
            )
            .await?;

        Ok(Recorded {
            entry: first_leg,
            counterpart: Some(second_leg),
        })
    }

    async fn lock_warehouses(
        &self,
        tx: &mut S::Tx,
        movement: &ValidatedMovement,
    ) -> Result<LockedWarehouses, LedgerError> {
        let warehouses = self.store.warehouses();

        let Some(target_id) = movement.target_warehouse_id else {
            let source = warehouses
                .find_and_lock_by_user_id(tx, movement.user_id)
                .await?;
            return Ok(LockedWarehouses {
                source,
                target: None,
            });
        };

        let actor = warehouses.find_by_user_id(tx, movement.user_id).await?;
        if actor.id == target_id {
            warn!(warehouse_id = %actor.id, "[ledger.create] self transfer rejected");
            return Err(InvalidMovement::SelfTransfer.into());
        }

        let (low, high) = ascending(actor.id, target_id);
        let low = warehouses.find_and_lock_by_id(tx, low).await?;
        let high = warehouses.find_and_lock_by_id(tx, high).await?;
        let (source, target) = if low.id == actor.id {
            (low, high)
        } else {
            (high, low)
        };

        // Ownership is only trusted once the row is locked.
        if source.user_id != movement.user_id {
            return Err(LedgerError::NotFound {
                entity: EntityKind::Warehouse,
            });
        }

        Ok(LockedWarehouses {
            source,
            target: Some(target),
        })
    }

    async fn lock_enabled_product(
        &self,
        tx: &mut S::Tx,
        product_id: ProductId,
    ) -> Result<Product, LedgerError> {
        let product = self
            .store
            .products()
            .find_and_lock_by_id(tx, product_id)
            .await?;

        if product.enabled {
            Ok(product)
        } else {
            warn!(product_id = %product_id, "[ledger.create] product is disabled");
            Err(LedgerError::ProductNotEnabled { product_id })
        }
    }

    async fn tail_balance(
        &self,
        tx: &mut S::Tx,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Available, LedgerError> {
        let scope = LedgerScope::WarehouseProduct {
            warehouse_id,
            product_id,
        };

        match self.store.movements().find_last_movement(tx, scope).await {
            Ok(tail) => Ok(tail.available),
            Err(error) if error.is_not_found() => Ok(Available::default()),
            Err(error) => Err(error.into()),
        }
    }
}

fn ascending(a: WarehouseId, b: WarehouseId) -> (WarehouseId, WarehouseId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn generated_concept(
    prefix: &str,
    counterpart: &Warehouse,
    concept: &Concept,
) -> Result<Concept, LedgerError> {
    Concept::truncated(&format!("{prefix} {}: {concept}", counterpart.name))
        .map_err(|_| ValidationError::InvalidConcept.into())
}
