#![forbid(unsafe_code)]

//! Reusable verification tooling for `Store` implementations.
//!
//! - [`contract`]: behavioral contract every backend must satisfy, exposed as
//!   async functions and the [`store_contract_tests!`] macro.
//! - [`chaos`]: a store wrapper injecting ledger persistence failures.
//! - [`fixtures`]: builders for uniquely named warehouses and products so
//!   tests can share one database.

pub mod chaos;
pub mod contract;
pub mod fixtures;

pub use chaos::{ChaosConfig, ChaosStore, ChaosStoreExt, Probability};
