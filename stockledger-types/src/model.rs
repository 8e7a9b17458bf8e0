use crate::validation::is_slug;
use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Warehouse identifier assigned by the store.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct WarehouseId(i64);

/// Product identifier assigned by the store.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct ProductId(i64);

/// Ledger entry identifier.
///
/// Assigned by the store from a monotonically increasing sequence. The ledger
/// tail is defined by descending `MovementId`, never by creation timestamp.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct MovementId(i64);

/// Identity of a user of the network. Each user owns at most one warehouse.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct UserId(i64);

/// Human readable name of a warehouse or product.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct DisplayName(String);

/// URL-safe product slug, unique across the catalog.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255, predicate = is_slug),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ProductSlug(String);

/// Positive magnitude of a stock movement.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Quantity(i64);

/// Running balance of a (warehouse, product) pair after a ledger entry.
///
/// The type cannot hold a negative value, so an entry whose resulting balance
/// would be negative cannot be constructed.
#[nutype(
    validate(greater_or_equal = 0),
    default = 0,
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
        Serialize,
        Deserialize
    )
)]
pub struct Available(i64);

impl Available {
    /// Apply a signed movement to this balance.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let six = Available::default()
    ///     .apply(Quantity::try_new(10)?, MovementType::Income)?
    ///     .apply(Quantity::try_new(4)?, MovementType::Outcome)?;
    /// assert_eq!(six.into_inner(), 6);
    /// ```
    pub fn apply(self, quantity: Quantity, movement_type: MovementType) -> Result<Self, BalanceError> {
        let available = self.into_inner();
        let delta = quantity
            .into_inner()
            .checked_mul(movement_type.sign())
            .ok_or(BalanceError::Overflow)?;
        let next = available.checked_add(delta).ok_or(BalanceError::Overflow)?;

        Self::try_new(next).map_err(|_| BalanceError::Insufficient {
            available,
            requested: quantity.into_inner(),
        })
    }
}

/// Error returned when a movement cannot be applied to a balance.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// The outgoing quantity exceeds the available stock.
    #[error("cannot take {requested} units when only {available} are available")]
    Insufficient {
        /// Balance before the movement.
        available: i64,
        /// Quantity the movement tried to take.
        requested: i64,
    },

    /// The resulting balance does not fit in the balance representation.
    #[error("balance overflow")]
    Overflow,
}

/// Free-text reason attached to a ledger entry (1 to 100 characters).
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct Concept(String);

/// Maximum number of characters in a [`Concept`].
pub const CONCEPT_MAX_CHARS: usize = 100;

impl Concept {
    /// Build a concept from generated text, cutting it at
    /// [`CONCEPT_MAX_CHARS`] characters.
    pub fn truncated(text: &str) -> Result<Self, ConceptError> {
        Self::try_new(text.chars().take(CONCEPT_MAX_CHARS).collect::<String>())
    }
}

/// Direction of a ledger entry: `+1` income or `-1` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum MovementType {
    /// Stock enters the warehouse (`+1`).
    Income,
    /// Stock leaves the warehouse (`-1`).
    Outcome,
}

impl MovementType {
    /// The sign applied to the quantity when computing the running balance.
    pub const fn sign(self) -> i64 {
        match self {
            Self::Income => 1,
            Self::Outcome => -1,
        }
    }
}

/// Returned when an integer is neither `+1` nor `-1`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("movement type must be 1 or -1, got {0}")]
pub struct InvalidMovementType(pub i16);

impl TryFrom<i16> for MovementType {
    type Error = InvalidMovementType;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Income),
            -1 => Ok(Self::Outcome),
            other => Err(InvalidMovementType(other)),
        }
    }
}

impl From<MovementType> for i16 {
    fn from(value: MovementType) -> Self {
        match value {
            MovementType::Income => 1,
            MovementType::Outcome => -1,
        }
    }
}

/// A warehouse owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    /// Store-assigned identifier.
    pub id: WarehouseId,
    /// Display name.
    pub name: DisplayName,
    /// Free-form postal address.
    pub address: String,
    /// The single user owning this warehouse.
    pub user_id: UserId,
    /// When the warehouse was created.
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWarehouse {
    /// Display name.
    pub name: DisplayName,
    /// Free-form postal address.
    pub address: String,
    /// Owner; must not own another warehouse.
    pub user_id: UserId,
}

/// A product from the shared catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier.
    pub id: ProductId,
    /// Display name.
    pub name: DisplayName,
    /// Catalog-wide unique slug.
    pub slug: ProductSlug,
    /// Disabled products accept no new movements.
    pub enabled: bool,
    /// Optional long description.
    pub description: Option<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    /// Display name.
    pub name: DisplayName,
    /// Slug; must not be taken by another product.
    pub slug: ProductSlug,
    /// Initial enabled flag.
    pub enabled: bool,
    /// Optional long description.
    pub description: Option<String>,
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Store-assigned, increasing identifier; orders the ledger.
    pub id: MovementId,
    /// Product whose stock changed.
    pub product_id: ProductId,
    /// Warehouse whose stock changed.
    pub warehouse_id: WarehouseId,
    /// Magnitude of the change.
    pub quantity: Quantity,
    /// Direction of the change.
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Balance of (warehouse, product) after this entry.
    pub available: Available,
    /// Reason for the movement.
    pub concept: Concept,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// `quantity * type` for this entry.
    pub fn signed_quantity(&self) -> i64 {
        self.quantity.into_inner() * self.movement_type.sign()
    }
}

/// A ledger entry ready to be persisted; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    /// Product whose stock changes.
    pub product_id: ProductId,
    /// Warehouse whose stock changes.
    pub warehouse_id: WarehouseId,
    /// Magnitude of the change.
    pub quantity: Quantity,
    /// Direction of the change.
    pub movement_type: MovementType,
    /// Precomputed balance after this entry.
    pub available: Available,
    /// Reason for the movement.
    pub concept: Concept,
}

/// Key selecting a slice of the ledger for tail lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerScope {
    /// The running-balance key: one product in one warehouse.
    WarehouseProduct {
        /// Warehouse half of the key.
        warehouse_id: WarehouseId,
        /// Product half of the key.
        product_id: ProductId,
    },
    /// Every entry of a warehouse, across products.
    Warehouse(WarehouseId),
    /// Every entry of a product, across warehouses.
    Product(ProductId),
}

impl LedgerScope {
    /// Whether `movement` belongs to this scope.
    pub fn contains(&self, movement: &Movement) -> bool {
        match *self {
            Self::WarehouseProduct {
                warehouse_id,
                product_id,
            } => movement.warehouse_id == warehouse_id && movement.product_id == product_id,
            Self::Warehouse(warehouse_id) => movement.warehouse_id == warehouse_id,
            Self::Product(product_id) => movement.product_id == product_id,
        }
    }
}
