//! Runtime-tunable integer parameters.

use crate::store::StoreError;
use async_trait::async_trait;

/// Name of the parameter holding the largest quantity a single movement may
/// carry.
pub const MAX_MOVEMENT_QUANTITY: &str = "max_movement_quantity";

/// Source of named integer parameters.
///
/// Injected into services as `Arc<dyn ParameterStore>`, so tests and
/// deployments can choose static values, a database table, or anything else.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Read an integer parameter, or [`StoreError::NotFound`] with
    /// `EntityKind::Parameter` when it is not defined.
    async fn get_param_int(&self, name: &str) -> Result<i64, StoreError>;
}
