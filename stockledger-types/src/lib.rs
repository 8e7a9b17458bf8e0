#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared vocabulary types and traits for the StockLedger inventory ledger.
//!
//! This crate provides the types shared between the `stockledger` service
//! crate and store adapters like `stockledger-memory` and
//! `stockledger-postgres`.
//!
//! # Overview
//!
//! This crate contains:
//! - Storage traits: `Store`, `TransactionContext`, `WarehouseRepository`,
//!   `ProductRepository`, `MovementRepository`, `ParameterStore`
//! - Domain types: `Warehouse`, `Product`, `Movement`, `NewMovement`,
//!   `LedgerScope`, and the validated newtypes they are built from
//! - Errors: `StoreError`, `Operation`, `EntityKind`, `BalanceError`

mod model;
mod parameters;
mod store;
mod validation;

pub use model::{
    Available, AvailableError, BalanceError, Concept, ConceptError, DisplayName,
    DisplayNameError, InvalidMovementType, LedgerScope, Movement, MovementId, MovementType,
    NewMovement, NewProduct, NewWarehouse, Product, ProductId, ProductSlug, ProductSlugError,
    Quantity, QuantityError, UserId, Warehouse, WarehouseId, CONCEPT_MAX_CHARS,
};
pub use parameters::{ParameterStore, MAX_MOVEMENT_QUANTITY};
pub use store::{
    EntityKind, MovementRepository, Operation, ProductRepository, SavepointName,
    SavepointNameError, Store, StoreError, TransactionContext, WarehouseRepository,
};
