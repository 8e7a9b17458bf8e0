use serde::Deserialize;
use stockledger_types::{Concept, MovementType, ProductId, Quantity, UserId, WarehouseId};

use crate::errors::ValidationError;

/// A movement as received from the request layer, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MovementRequest {
    /// The product being moved.
    pub product_id: i64,
    /// Units moved; must be positive.
    pub quantity: i64,
    /// `1` for income, `-1` for outcome.
    #[serde(rename = "type")]
    pub movement_type: i16,
    /// Free-text reason for the movement.
    pub concept: String,
    /// Present when the movement is a transfer to another warehouse.
    #[serde(default)]
    pub target_warehouse_id: Option<i64>,
    /// The acting user; the movement applies to the warehouse they own.
    pub user_id: i64,
}

/// A movement request whose shape has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMovement {
    /// The product being moved.
    pub product_id: ProductId,
    /// Units moved.
    pub quantity: Quantity,
    /// Direction of the movement.
    pub movement_type: MovementType,
    /// Reason for the movement.
    pub concept: Concept,
    /// Receiving warehouse of a transfer.
    pub target_warehouse_id: Option<WarehouseId>,
    /// The acting user.
    pub user_id: UserId,
}

impl ValidatedMovement {
    /// Whether this movement also credits another warehouse.
    pub const fn is_transfer(&self) -> bool {
        self.target_warehouse_id.is_some()
    }
}

fn positive_id(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ValidationError::NonPositiveId { field, value })
    }
}

impl MovementRequest {
    /// Check ids, quantity, type and concept, converting into domain types.
    pub fn validate(self) -> Result<ValidatedMovement, ValidationError> {
        let product_id = ProductId::new(positive_id("product_id", self.product_id)?);
        let user_id = UserId::new(positive_id("user_id", self.user_id)?);
        let target_warehouse_id = self
            .target_warehouse_id
            .map(|id| positive_id("target_warehouse_id", id).map(WarehouseId::new))
            .transpose()?;
        let quantity = Quantity::try_new(self.quantity)
            .map_err(|_| ValidationError::NonPositiveQuantity(self.quantity))?;
        let movement_type = MovementType::try_from(self.movement_type)?;
        let concept = Concept::try_new(self.concept).map_err(|_| ValidationError::InvalidConcept)?;

        Ok(ValidatedMovement {
            product_id,
            quantity,
            movement_type,
            concept,
            target_warehouse_id,
            user_id,
        })
    }
}

impl TryFrom<MovementRequest> for ValidatedMovement {
    type Error = ValidationError;

    fn try_from(request: MovementRequest) -> Result<Self, Self::Error> {
        request.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_types::InvalidMovementType;

    fn request() -> MovementRequest {
        MovementRequest {
            product_id: 3,
            quantity: 10,
            movement_type: 1,
            concept: "  restock  ".to_string(),
            target_warehouse_id: None,
            user_id: 7,
        }
    }

    #[test]
    fn valid_request_is_trimmed_and_typed() {
        let movement = request().validate().unwrap();

        assert_eq!(movement.product_id, ProductId::new(3));
        assert_eq!(movement.movement_type, MovementType::Income);
        assert_eq!(movement.concept.as_ref(), "restock");
        assert!(!movement.is_transfer());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let zero = MovementRequest {
            quantity: 0,
            ..request()
        };

        assert_eq!(zero.validate(), Err(ValidationError::NonPositiveQuantity(0)));
    }

    #[test]
    fn movement_type_must_be_signed_unit() {
        let sideways = MovementRequest {
            movement_type: 2,
            ..request()
        };

        assert_eq!(
            sideways.validate(),
            Err(ValidationError::MovementType(InvalidMovementType(2)))
        );
    }

    #[test]
    fn concept_must_fit_between_one_and_one_hundred_characters() {
        let blank = MovementRequest {
            concept: "   ".to_string(),
            ..request()
        };
        let long = MovementRequest {
            concept: "x".repeat(101),
            ..request()
        };

        assert_eq!(blank.validate(), Err(ValidationError::InvalidConcept));
        assert_eq!(long.validate(), Err(ValidationError::InvalidConcept));
    }

    #[test]
    fn identifiers_must_be_positive() {
        let bad_target = MovementRequest {
            target_warehouse_id: Some(0),
            ..request()
        };

        assert_eq!(
            bad_target.validate(),
            Err(ValidationError::NonPositiveId {
                field: "target_warehouse_id",
                value: 0
            })
        );
    }

    #[test]
    fn request_deserializes_type_field() {
        let parsed: MovementRequest = serde_json::from_str(
            r#"{"product_id": 1, "quantity": 4, "type": -1, "concept": "sale", "user_id": 2}"#,
        )
        .unwrap();

        assert_eq!(parsed.movement_type, -1);
        assert_eq!(parsed.target_warehouse_id, None);
    }
}
