use crate::model::{
    LedgerScope, Movement, NewMovement, NewProduct, NewWarehouse, Product, ProductId, UserId,
    Warehouse, WarehouseId,
};
use crate::validation::is_sql_identifier;
use nutype::nutype;
use std::future::Future;

/// Transaction context shared by every repository taking part in one logical
/// operation.
///
/// A context is obtained from [`Store::begin`] and passed by `&mut` into the
/// typed repositories returned by [`Store::warehouses`], [`Store::products`]
/// and [`Store::movements`]. All of them then read, lock and write inside the
/// same physical transaction.
///
/// # Finalization
///
/// - [`commit`](Self::commit) makes the writes durable and releases locks.
/// - [`rollback`](Self::rollback) discards the writes and releases locks. It is
///   a no-op after a successful commit or an earlier rollback, so callers may
///   run it unconditionally on every exit path.
/// - Dropping an active context rolls it back.
pub trait TransactionContext: Send {
    /// Commit the transaction.
    ///
    /// Returns [`StoreError::TransactionFinished`] if the transaction was
    /// already rolled back.
    fn commit(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Roll the transaction back. Safe to call after `commit`.
    fn rollback(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Establish a nested rollback point.
    fn savepoint(
        &mut self,
        name: &SavepointName,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard every write made after the named savepoint was established.
    ///
    /// The savepoint stays defined and can be rolled back to again.
    fn rollback_to_savepoint(
        &mut self,
        name: &SavepointName,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Forget the named savepoint, keeping the writes made after it.
    fn release_savepoint(
        &mut self,
        name: &SavepointName,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether the transaction can still be used.
    fn is_active(&self) -> bool;
}

/// Entry point of a backing store.
///
/// Repository types are associated types rather than trait objects, so the
/// repositories handed to the service are statically tied to the store's
/// transaction type.
pub trait Store: Send + Sync {
    /// Transaction context produced by [`Store::begin`].
    type Tx: TransactionContext;
    /// Warehouse repository operating on [`Store::Tx`].
    type Warehouses: WarehouseRepository<Self::Tx>;
    /// Product repository operating on [`Store::Tx`].
    type Products: ProductRepository<Self::Tx>;
    /// Ledger repository operating on [`Store::Tx`].
    type Movements: MovementRepository<Self::Tx>;

    /// Start a new transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// Warehouse repository bound to this store.
    fn warehouses(&self) -> &Self::Warehouses;

    /// Product repository bound to this store.
    fn products(&self) -> &Self::Products;

    /// Ledger repository bound to this store.
    fn movements(&self) -> &Self::Movements;
}

/// Warehouse accessor with pessimistic locking lookups.
///
/// `find_and_lock_*` take an exclusive row lock held until the transaction
/// finishes. Locking a row the transaction already holds does not block.
pub trait WarehouseRepository<Tx: TransactionContext>: Send + Sync {
    /// Insert a warehouse. Fails with [`StoreError::Conflict`] when the user
    /// already owns one.
    fn create(
        &self,
        tx: &mut Tx,
        warehouse: NewWarehouse,
    ) -> impl Future<Output = Result<Warehouse, StoreError>> + Send;

    /// Look up the warehouse owned by `user_id` without locking it.
    fn find_by_user_id(
        &self,
        tx: &mut Tx,
        user_id: UserId,
    ) -> impl Future<Output = Result<Warehouse, StoreError>> + Send;

    /// Look up a warehouse by id and lock its row.
    fn find_and_lock_by_id(
        &self,
        tx: &mut Tx,
        id: WarehouseId,
    ) -> impl Future<Output = Result<Warehouse, StoreError>> + Send;

    /// Look up the warehouse owned by `user_id` and lock its row.
    fn find_and_lock_by_user_id(
        &self,
        tx: &mut Tx,
        user_id: UserId,
    ) -> impl Future<Output = Result<Warehouse, StoreError>> + Send;

    /// Remove a warehouse. Fails with [`StoreError::Referenced`] when ledger
    /// entries still point at it.
    fn delete(
        &self,
        tx: &mut Tx,
        id: WarehouseId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Product accessor with pessimistic locking lookups.
pub trait ProductRepository<Tx: TransactionContext>: Send + Sync {
    /// Insert a product. Fails with [`StoreError::Conflict`] on a duplicate slug.
    fn create(
        &self,
        tx: &mut Tx,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Look up a product by id and lock its row.
    fn find_and_lock_by_id(
        &self,
        tx: &mut Tx,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Lock the product row and switch its enabled flag.
    fn set_enabled(
        &self,
        tx: &mut Tx,
        id: ProductId,
        enabled: bool,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Remove a product. Fails with [`StoreError::Referenced`] when ledger
    /// entries still point at it.
    fn delete(
        &self,
        tx: &mut Tx,
        id: ProductId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Append-only ledger persistence.
pub trait MovementRepository<Tx: TransactionContext>: Send + Sync {
    /// Persist one entry. The store assigns the id and creation timestamp.
    fn create(
        &self,
        tx: &mut Tx,
        movement: NewMovement,
    ) -> impl Future<Output = Result<Movement, StoreError>> + Send;

    /// Return the most recent entry of `scope`, ordered strictly by
    /// descending id, or [`StoreError::NotFound`] when the scope has no
    /// history.
    fn find_last_movement(
        &self,
        tx: &mut Tx,
        scope: LedgerScope,
    ) -> impl Future<Output = Result<Movement, StoreError>> + Send;

    /// Persist a batch of precomputed entries in order.
    fn bulk_create(
        &self,
        tx: &mut Tx,
        movements: Vec<NewMovement>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Savepoint name, restricted to an unquoted SQL identifier.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 63, predicate = is_sql_identifier),
    derive(Debug, Clone, PartialEq, Eq, Hash, AsRef, Deref, Display)
)]
pub struct SavepointName(String);

/// Kind of stored entity, used to qualify lookup and constraint errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A row of the warehouses table.
    Warehouse,
    /// A row of the product catalog.
    Product,
    /// A ledger entry.
    Movement,
    /// A named integer parameter.
    Parameter,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Warehouse => write!(f, "warehouse"),
            EntityKind::Product => write!(f, "product"),
            EntityKind::Movement => write!(f, "movement"),
            EntityKind::Parameter => write!(f, "parameter"),
        }
    }
}

/// Identifies the store operation that failed.
///
/// Used by `StoreError::StoreFailure` to provide strongly-typed
/// identification of which operation encountered an infrastructure failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Starting a transaction.
    BeginTransaction,
    /// Committing a transaction.
    CommitTransaction,
    /// Rolling a transaction back.
    RollbackTransaction,
    /// Creating, rolling back to or releasing a savepoint.
    Savepoint,
    /// Taking a row lock.
    LockRow,
    /// Reading a row without a lock.
    ReadRow,
    /// Inserting a row.
    Insert,
    /// Updating a row.
    Update,
    /// Deleting a row.
    Delete,
    /// Reading the ledger tail of a scope.
    ReadTail,
    /// Inserting a batch of ledger entries.
    BulkInsert,
    /// Reading a parameter.
    ReadParameter,
    /// Decoding a stored row into a domain value.
    DecodeRow,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::BeginTransaction => write!(f, "begin_transaction"),
            Operation::CommitTransaction => write!(f, "commit_transaction"),
            Operation::RollbackTransaction => write!(f, "rollback_transaction"),
            Operation::Savepoint => write!(f, "savepoint"),
            Operation::LockRow => write!(f, "lock_row"),
            Operation::ReadRow => write!(f, "read_row"),
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::ReadTail => write!(f, "read_tail"),
            Operation::BulkInsert => write!(f, "bulk_insert"),
            Operation::ReadParameter => write!(f, "read_parameter"),
            Operation::DecodeRow => write!(f, "decode_row"),
        }
    }
}

/// Error type returned by store operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested row, ledger tail or parameter does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of the missing row.
        entity: EntityKind,
    },

    /// A uniqueness constraint rejected the write (one warehouse per user,
    /// one product per slug).
    #[error("{entity} violates a uniqueness constraint")]
    Conflict {
        /// Kind of the row that collided.
        entity: EntityKind,
    },

    /// The row cannot be deleted because ledger entries reference it.
    #[error("{entity} is still referenced by ledger entries")]
    Referenced {
        /// Kind of the referenced row.
        entity: EntityKind,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction has already been committed or rolled back")]
    TransactionFinished,

    /// No savepoint with this name is defined in the transaction.
    #[error("savepoint {name} is not defined")]
    UnknownSavepoint {
        /// The name that was looked up.
        name: SavepointName,
    },

    /// Infrastructure failure surfaced by the backing store.
    #[error("{operation} operation failed: {detail}")]
    StoreFailure {
        /// The operation that failed.
        operation: Operation,
        /// Adapter-specific description of the failure.
        detail: String,
    },
}

impl StoreError {
    /// Whether this is [`StoreError::NotFound`], i.e. an absent row or an
    /// empty ledger scope.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savepoint_name_rejects_sql_injection() {
        assert!(SavepointName::try_new("transfer_leg").is_ok());
        assert!(SavepointName::try_new("leg; ROLLBACK").is_err());
        assert!(SavepointName::try_new("").is_err());
    }

    #[test]
    fn store_failure_message_names_operation() {
        let error = StoreError::StoreFailure {
            operation: Operation::ReadTail,
            detail: "connection reset".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "read_tail operation failed: connection reset"
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let error = StoreError::NotFound {
            entity: EntityKind::Warehouse,
        };

        assert_eq!(error.to_string(), "warehouse not found");
        assert!(error.is_not_found());
    }
}
