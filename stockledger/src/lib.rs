//! `StockLedger` - transactional stock ledger for a network of warehouses
//!
//! Each user owns one warehouse. Stock is never stored as a mutable counter:
//! every change is an immutable ledger entry carrying the running balance of
//! its (warehouse, product) pair, written under pessimistic row locks so the
//! balance stays correct and non-negative under concurrent writers.
//!
//! - [`StockLedgerService`] records movements and two-leg transfers.
//! - [`WarehouseService`] and [`ProductService`] maintain the catalog and
//!   refuse to delete anything that has ledger history.
//! - [`LedgerConfig`] and [`StaticParameters`] supply the per-movement
//!   quantity limit.
//!
//! Storage is pluggable through the [`Store`] trait; see the
//! `stockledger-memory` and `stockledger-postgres` crates.

#![forbid(unsafe_code)]

mod catalog;
mod config;
mod errors;
mod ledger;
mod request;
pub mod telemetry;
mod transaction;

pub use catalog::{ProductService, WarehouseService};
pub use config::{
    ConfigError, LedgerConfig, MaxMovementQuantity, MaxMovementQuantityError, StaticParameters,
    MAX_MOVEMENT_QUANTITY_ENV,
};
pub use errors::{DeleteRefusal, InvalidMovement, LedgerError, ValidationError};
pub use ledger::StockLedgerService;
pub use request::{MovementRequest, ValidatedMovement};
pub use stockledger_types::*;
