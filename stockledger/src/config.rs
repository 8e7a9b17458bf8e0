//! Service configuration and the static parameter store built from it.

use std::collections::HashMap;

use async_trait::async_trait;
use nutype::nutype;
use serde::Deserialize;
use stockledger_types::{EntityKind, ParameterStore, StoreError, MAX_MOVEMENT_QUANTITY};
use thiserror::Error;

/// Environment variable overriding [`LedgerConfig::max_movement_quantity`].
pub const MAX_MOVEMENT_QUANTITY_ENV: &str = "STOCKLEDGER_MAX_MOVEMENT_QUANTITY";

/// Largest quantity a single movement may carry.
///
/// # Examples
///
/// ```ignore
/// use stockledger::MaxMovementQuantity;
///
/// let limit = MaxMovementQuantity::try_new(500).unwrap();
/// assert!(MaxMovementQuantity::try_new(0).is_err());
/// ```
#[nutype(
    validate(greater = 0),
    default = 100_000,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Default,
        Display,
        Into,
        Deserialize
    )
)]
pub struct MaxMovementQuantity(i64);

/// Tunables of the stock ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on a single movement's quantity (default: 100 000).
    pub max_movement_quantity: MaxMovementQuantity,
}

/// A configuration value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The variable is set but does not parse as an integer.
    #[error("{variable} must be an integer, got `{value}`")]
    NotAnInteger {
        /// Name of the environment variable.
        variable: &'static str,
        /// The raw value found.
        value: String,
    },

    /// The variable parses but is not a valid limit.
    #[error("{variable} must be greater than zero, got {value}")]
    OutOfRange {
        /// Name of the environment variable.
        variable: &'static str,
        /// The parsed value.
        value: i64,
    },
}

impl LedgerConfig {
    /// Defaults overridden by `STOCKLEDGER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_MOVEMENT_QUANTITY_ENV) {
            let value = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::NotAnInteger {
                    variable: MAX_MOVEMENT_QUANTITY_ENV,
                    value: raw.clone(),
                })?;
            config.max_movement_quantity =
                MaxMovementQuantity::try_new(value).map_err(|_| ConfigError::OutOfRange {
                    variable: MAX_MOVEMENT_QUANTITY_ENV,
                    value,
                })?;
        }

        Ok(config)
    }
}

/// Parameter store answering from a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    values: HashMap<String, i64>,
}

impl StaticParameters {
    /// An empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or overwrite a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        let _ = self.values.insert(name.into(), value);
        self
    }
}

impl From<&LedgerConfig> for StaticParameters {
    fn from(config: &LedgerConfig) -> Self {
        Self::new().with(
            MAX_MOVEMENT_QUANTITY,
            config.max_movement_quantity.into_inner(),
        )
    }
}

#[async_trait]
impl ParameterStore for StaticParameters {
    async fn get_param_int(&self, name: &str) -> Result<i64, StoreError> {
        self.values
            .get(name)
            .copied()
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Parameter,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let config = LedgerConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.max_movement_quantity.into_inner(), 100_000);
    }

    #[test]
    fn environment_overrides_maximum() {
        let config = LedgerConfig::from_lookup(|name| {
            (name == MAX_MOVEMENT_QUANTITY_ENV).then(|| " 250 ".to_string())
        })
        .unwrap();

        assert_eq!(config.max_movement_quantity.into_inner(), 250);
    }

    #[test]
    fn environment_rejects_garbage_and_zero() {
        let garbage = LedgerConfig::from_lookup(|_| Some("lots".to_string()));
        let zero = LedgerConfig::from_lookup(|_| Some("0".to_string()));

        assert!(matches!(garbage, Err(ConfigError::NotAnInteger { .. })));
        assert_eq!(
            zero,
            Err(ConfigError::OutOfRange {
                variable: MAX_MOVEMENT_QUANTITY_ENV,
                value: 0
            })
        );
    }

    #[test]
    fn config_deserializes_with_missing_fields_defaulted() {
        let empty: LedgerConfig = serde_json::from_str("{}").unwrap();
        let custom: LedgerConfig =
            serde_json::from_str(r#"{"max_movement_quantity": 42}"#).unwrap();

        assert_eq!(empty, LedgerConfig::default());
        assert_eq!(custom.max_movement_quantity.into_inner(), 42);
        assert!(serde_json::from_str::<LedgerConfig>(r#"{"max_movement_quantity": -1}"#).is_err());
    }

    #[tokio::test]
    async fn static_parameters_serve_configured_maximum() {
        let parameters = StaticParameters::from(&LedgerConfig::default());

        assert_eq!(
            parameters.get_param_int(MAX_MOVEMENT_QUANTITY).await,
            Ok(100_000)
        );
        assert_eq!(
            parameters.get_param_int("unknown").await,
            Err(StoreError::NotFound {
                entity: EntityKind::Parameter
            })
        );
    }
}
