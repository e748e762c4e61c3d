use rust_decimal::Decimal;

use super::{ServiceListing, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_KEY_SEGMENT_LENGTH: usize = 128;
pub const MAX_LISTING_QUANTITY: i64 = u32::MAX as i64;

impl Validate for ServiceListing {
    fn validate(&self) -> ValidationResult<()> {
        if self.id.is_none() && self.service_id.is_none() {
            return Err(ValidationError::RequiredField {
                field: "serviceId".to_string(),
            });
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        if let Some(quantity) = self.quantity {
            validate_listing_quantity(quantity)?;
        }
        Ok(())
    }
}

/// Validate a unit price
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            value: price.to_string(),
            reason: "Price cannot be negative".to_string(),
        });
    }
    Ok(())
}

/// Validate a quantity supplied with a catalog listing.
///
/// Non-positive values are accepted here and normalized to one.
pub fn validate_listing_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity > MAX_LISTING_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: "1".to_string(),
            max: MAX_LISTING_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }
    Ok(())
}

/// Validate one segment of a snapshot key (an origin or a record name)
pub fn validate_key_segment(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_KEY_SEGMENT_LENGTH {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "1".to_string(),
            max: MAX_KEY_SEGMENT_LENGTH.to_string(),
            value: value.len().to_string(),
        });
    }

    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid || value == "." || value == ".." {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Only ASCII letters, digits, '.', '-' and '_' are allowed".to_string(),
        });
    }

    Ok(())
}
