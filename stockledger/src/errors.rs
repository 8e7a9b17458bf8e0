//! Error types for the stock ledger service.
//!
//! Store adapters report [`StoreError`]; the service layer lifts those into
//! [`LedgerError`] so callers can tell input problems, business rule
//! rejections and infrastructure failures apart:
//!
//! - **Validation**: the request is malformed, fix the input.
//! - **InvalidMovement**: the request is well formed but breaks a ledger rule
//!   (overdraw, self-transfer, ...). Nothing was written.
//! - **NotFound / AlreadyExists / ProductNotEnabled / CannotDelete**: the
//!   current catalog state refuses the operation.
//! - **Storage**: the backing store failed. The transaction was rolled back.

use stockledger_types::{
    BalanceError, EntityKind, InvalidMovementType, ProductId, StoreError,
};
use thiserror::Error;

/// Shape errors in a movement request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Quantity is zero or negative.
    #[error("quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(i64),

    /// Movement type is neither income nor outcome.
    #[error(transparent)]
    MovementType(#[from] InvalidMovementType),

    /// Concept is empty or too long.
    #[error("concept must contain between 1 and 100 characters")]
    InvalidConcept,

    /// An id field is zero or negative.
    #[error("{field} must be a positive identifier, got {value}")]
    NonPositiveId {
        /// Name of the request field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },
}

/// A well-formed movement that the ledger refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMovement {
    /// A transfer was requested with the income type.
    #[error("a transfer must be an outcome movement")]
    TransferMustBeOutcome,

    /// Quantity is above the configured per-movement limit.
    #[error("quantity {quantity} exceeds the maximum of {max} per movement")]
    QuantityAboveMaximum {
        /// Requested quantity.
        quantity: i64,
        /// Current limit.
        max: i64,
    },

    /// Source and target warehouse are the same.
    #[error("cannot transfer stock to the source warehouse")]
    SelfTransfer,

    /// The outcome would take the balance below zero.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        /// Balance before the movement.
        available: i64,
        /// Quantity requested.
        requested: i64,
    },

    /// The income would overflow the balance.
    #[error("resulting balance does not fit in the ledger")]
    BalanceOverflow,
}

impl From<BalanceError> for InvalidMovement {
    fn from(error: BalanceError) -> Self {
        match error {
            BalanceError::Insufficient {
                available,
                requested,
            } => Self::InsufficientStock {
                available,
                requested,
            },
            BalanceError::Overflow => Self::BalanceOverflow,
        }
    }
}

/// Why a delete guard refused to remove an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRefusal {
    /// The ledger holds at least one entry for the entity.
    HistoryExists,
    /// The ledger could not be queried, so history cannot be ruled out.
    HistoryLookupFailed,
}

impl std::fmt::Display for DeleteRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HistoryExists => write!(f, "it has ledger history"),
            Self::HistoryLookupFailed => write!(f, "its ledger history could not be checked"),
        }
    }
}

/// Errors returned by the ledger and catalog services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The request is malformed.
    #[error("invalid movement request: {0}")]
    Validation(#[from] ValidationError),

    /// The request breaks a ledger rule; nothing was written.
    #[error("movement rejected: {0}")]
    InvalidMovement(#[from] InvalidMovement),

    /// A referenced row does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of the missing row.
        entity: EntityKind,
    },

    /// The product exists but is disabled.
    #[error("product {product_id} is not enabled")]
    ProductNotEnabled {
        /// The disabled product.
        product_id: ProductId,
    },

    /// A unique owner or slug is already taken.
    #[error("{entity} already exists")]
    AlreadyExists {
        /// Kind of the conflicting row.
        entity: EntityKind,
    },

    /// A delete guard refused the deletion.
    #[error("cannot delete {entity}: {reason}")]
    CannotDelete {
        /// Kind of the protected row.
        entity: EntityKind,
        /// Why the guard refused.
        reason: DeleteRefusal,
    },

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity } => Self::NotFound { entity },
            StoreError::Conflict { entity } => Self::AlreadyExists { entity },
            StoreError::Referenced { entity } => Self::CannotDelete {
                entity,
                reason: DeleteRefusal::HistoryExists,
            },
            other => Self::Storage(other),
        }
    }
}

impl From<BalanceError> for LedgerError {
    fn from(error: BalanceError) -> Self {
        Self::InvalidMovement(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_types::Operation;

    #[test]
    fn store_not_found_and_conflict_map_to_service_counterparts() {
        assert_eq!(
            LedgerError::from(StoreError::NotFound {
                entity: EntityKind::Product
            }),
            LedgerError::NotFound {
                entity: EntityKind::Product
            }
        );
        assert_eq!(
            LedgerError::from(StoreError::Conflict {
                entity: EntityKind::Warehouse
            }),
            LedgerError::AlreadyExists {
                entity: EntityKind::Warehouse
            }
        );
    }

    #[test]
    fn referenced_row_maps_to_history_refusal() {
        let error = LedgerError::from(StoreError::Referenced {
            entity: EntityKind::Product,
        });

        assert_eq!(
            error,
            LedgerError::CannotDelete {
                entity: EntityKind::Product,
                reason: DeleteRefusal::HistoryExists
            }
        );
    }

    #[test]
    fn infrastructure_failures_stay_storage_errors() {
        let failure = StoreError::StoreFailure {
            operation: Operation::LockRow,
            detail: "lock timeout".to_string(),
        };

        assert_eq!(
            LedgerError::from(failure.clone()),
            LedgerError::Storage(failure)
        );
        assert_eq!(
            LedgerError::from(StoreError::TransactionFinished),
            LedgerError::Storage(StoreError::TransactionFinished)
        );
    }

    #[test]
    fn insufficient_balance_becomes_invalid_movement() {
        let error = LedgerError::from(BalanceError::Insufficient {
            available: 6,
            requested: 7,
        });

        assert_eq!(
            error,
            LedgerError::InvalidMovement(InvalidMovement::InsufficientStock {
                available: 6,
                requested: 7
            })
        );
        assert_eq!(
            error.to_string(),
            "movement rejected: insufficient stock: 6 available, 7 requested"
        );
    }

    #[test]
    fn cannot_delete_message_names_reason() {
        let error = LedgerError::CannotDelete {
            entity: EntityKind::Product,
            reason: DeleteRefusal::HistoryExists,
        };

        assert_eq!(error.to_string(), "cannot delete product: it has ledger history");
    }
}
