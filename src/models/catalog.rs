use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CartItemCandidate, ServiceId, UnitType, Validate, ValidationError};

/// A priced service as delivered by the service catalog, or as re-submitted
/// from a cart line.
///
/// Upstream field naming is inconsistent, so every field is optional here and
/// normalization into [`CartItemCandidate`] decides what wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceListing {
    #[serde(default)]
    pub id: Option<ServiceId>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl TryFrom<ServiceListing> for CartItemCandidate {
    type Error = ValidationError;

    fn try_from(listing: ServiceListing) -> Result<Self, Self::Error> {
        listing.validate()?;

        let service_id = listing
            .id
            .or(listing.service_id)
            .ok_or_else(|| ValidationError::RequiredField {
                field: "serviceId".to_string(),
            })?;

        let category = first_non_empty(&[&listing.category, &listing.method_name]);
        let method = first_non_empty(&[&listing.method, &listing.method_name]);

        let unit_type = match listing.unit_type.as_deref() {
            Some(raw) => UnitType::parse_lenient(raw).unwrap_or_else(|| {
                debug!(unit_type = %raw, "Unknown unit type, defaulting to ITEM");
                UnitType::Item
            }),
            None => UnitType::default(),
        };

        // Missing or non-positive quantities count as one; validate() has
        // already rejected anything above the u32 range
        let quantity = listing
            .quantity
            .filter(|q| *q > 0)
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1);

        Ok(CartItemCandidate {
            service_id,
            name: listing.name.unwrap_or_default(),
            category,
            method,
            unit_type,
            price: listing.price.unwrap_or(Decimal::ZERO),
            quantity,
        })
    }
}

fn first_non_empty(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .filter_map(|value| value.as_deref())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_LISTING_QUANTITY;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn listing(value: serde_json::Value) -> ServiceListing {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_catalog_shape_normalization() {
        let candidate = CartItemCandidate::try_from(listing(json!({
            "id": 7,
            "name": "Bed Sheet",
            "category": "Household",
            "method": "wash-and-fold",
            "unitType": "KG",
            "price": 45.5
        })))
        .unwrap();

        assert_eq!(candidate.service_id, ServiceId::Number(7));
        assert_eq!(candidate.name, "Bed Sheet");
        assert_eq!(candidate.category, "Household");
        assert_eq!(candidate.method, "wash-and-fold");
        assert_eq!(candidate.unit_type, UnitType::Kg);
        assert_eq!(candidate.price, dec!(45.5));
        assert_eq!(candidate.quantity, 1);
    }

    #[test]
    fn test_method_name_fills_category_and_method() {
        let candidate = CartItemCandidate::try_from(listing(json!({
            "serviceId": "svc-12",
            "name": "Suit",
            "methodName": "Dry Clean",
            "unitType": "piece",
            "price": "300"
        })))
        .unwrap();

        assert_eq!(candidate.service_id, ServiceId::from("svc-12"));
        assert_eq!(candidate.category, "Dry Clean");
        assert_eq!(candidate.method, "Dry Clean");
        assert_eq!(candidate.unit_type, UnitType::Piece);
    }

    #[test]
    fn test_id_wins_over_service_id() {
        let candidate = CartItemCandidate::try_from(listing(json!({
            "id": 1,
            "serviceId": 2,
            "method": "wash"
        })))
        .unwrap();

        assert_eq!(candidate.service_id, ServiceId::Number(1));
    }

    #[test]
    fn test_empty_category_falls_back_to_method_name() {
        let candidate = CartItemCandidate::try_from(listing(json!({
            "id": 1,
            "category": "",
            "methodName": "Iron"
        })))
        .unwrap();

        assert_eq!(candidate.category, "Iron");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let candidate = CartItemCandidate::try_from(listing(json!({ "id": 4 }))).unwrap();

        assert_eq!(candidate.name, "");
        assert_eq!(candidate.category, "");
        assert_eq!(candidate.method, "");
        assert_eq!(candidate.unit_type, UnitType::Item);
        assert_eq!(candidate.price, Decimal::ZERO);
        assert_eq!(candidate.quantity, 1);
    }

    #[test]
    fn test_unknown_unit_type_defaults_to_item() {
        let candidate = CartItemCandidate::try_from(listing(json!({
            "id": 4,
            "unitType": "BAG"
        })))
        .unwrap();

        assert_eq!(candidate.unit_type, UnitType::Item);
    }

    #[test]
    fn test_explicit_quantity_is_carried_and_total_ignored() {
        let candidate = CartItemCandidate::try_from(listing(json!({
            "id": 4,
            "price": 10,
            "quantity": 3,
            "totalPrice": 1
        })))
        .unwrap();

        assert_eq!(candidate.quantity, 3);
        assert_eq!(candidate.price, dec!(10));
    }

    #[test]
    fn test_non_positive_listing_quantity_counts_as_one() {
        for quantity in [0, -3] {
            let candidate = CartItemCandidate::try_from(listing(json!({
                "id": 4,
                "quantity": quantity
            })))
            .unwrap();

            assert_eq!(candidate.quantity, 1);
        }
    }

    #[test]
    fn test_invalid_listings_are_rejected() {
        assert!(CartItemCandidate::try_from(listing(json!({ "name": "x" }))).is_err());
        assert!(
            CartItemCandidate::try_from(listing(json!({ "id": 1, "price": -1 }))).is_err()
        );
        assert!(CartItemCandidate::try_from(listing(json!({
            "id": 1,
            "quantity": MAX_LISTING_QUANTITY + 1
        })))
        .is_err());
    }
}
