use bigdecimal::BigDecimal;

use super::error::CatalogError;

/// Total digits a stored quantity may carry.
pub const QUANTITY_MAX_DIGITS: u32 = 10;
/// Digits kept after the decimal point.
pub const QUANTITY_DECIMAL_PLACES: i64 = 2;

const REQUIRED: &str = "this field is required";

/// Trims a required string, rejecting blank values and values over `max_chars`.
pub fn required(
    field: &'static str,
    value: String,
    max_chars: Option<usize>,
) -> Result<String, CatalogError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::validation(field, REQUIRED));
    }

    check_length(field, value, max_chars)?;
    Ok(value.to_owned())
}

/// Blank optional strings are stored as absent.
pub fn optional(
    field: &'static str,
    value: Option<String>,
    max_chars: Option<usize>,
) -> Result<Option<String>, CatalogError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    check_length(field, value, max_chars)?;
    Ok(Some(value.to_owned()))
}

/// Rejects quantities that do not fit `NUMERIC(10, 2)` and returns the value at scale 2.
///
/// Sizes are read off the normalized digits, so a huge exponent is rejected
/// without ever being expanded.
pub fn quantity(field: &'static str, value: BigDecimal) -> Result<BigDecimal, CatalogError> {
    let (digits, scale) = value.normalized().as_bigint_and_exponent();
    if scale > QUANTITY_DECIMAL_PLACES {
        return Err(CatalogError::validation(
            field,
            format!("ensure that there are no more than {QUANTITY_DECIMAL_PLACES} decimal places"),
        ));
    }

    let integer_digits = QUANTITY_MAX_DIGITS as i64 - QUANTITY_DECIMAL_PLACES;
    let digit_count = digits.magnitude().to_string().len() as i64;
    if digit_count - scale > integer_digits {
        return Err(CatalogError::validation(
            field,
            format!("ensure that there are no more than {integer_digits} digits before the decimal point"),
        ));
    }

    Ok(value.with_scale(QUANTITY_DECIMAL_PLACES))
}

fn check_length(
    field: &'static str,
    value: &str,
    max_chars: Option<usize>,
) -> Result<(), CatalogError> {
    match max_chars {
        Some(max) if value.chars().count() > max => Err(CatalogError::validation(
            field,
            format!("ensure this value has at most {max} characters"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        str::FromStr,
        time::{Duration, Instant},
    };

    use super::*;

    fn decimal(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Bread ".into(), Some(255)).unwrap(), "Bread");

        let error = required("name", "   ".into(), Some(255)).unwrap_err();
        assert!(matches!(error, CatalogError::Validation { field: "name", .. }));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(required("unit", "é".repeat(50), Some(50)).is_ok());
        assert!(required("unit", "é".repeat(51), Some(50)).is_err());
    }

    #[test]
    fn blank_optional_is_absent() {
        assert_eq!(optional("notes", Some("  ".into()), Some(255)).unwrap(), None);
        assert_eq!(optional("notes", None, Some(255)).unwrap(), None);
        assert_eq!(
            optional("notes", Some(" chopped ".into()), Some(255)).unwrap(),
            Some("chopped".to_owned())
        );
    }

    #[test]
    fn quantity_is_stored_at_two_places() {
        let stored = quantity("quantity", decimal("500")).unwrap();
        assert_eq!(stored.to_string(), "500.00");

        let stored = quantity("quantity", decimal("0.5")).unwrap();
        assert_eq!(stored.to_string(), "0.50");
    }

    #[test]
    fn quantity_rejects_extra_precision() {
        assert!(quantity("quantity", decimal("1.234")).is_err());
        assert!(quantity("quantity", decimal("1.230")).is_ok());
    }

    #[test]
    fn quantity_rejects_more_than_ten_digits() {
        assert!(quantity("quantity", decimal("99999999.99")).is_ok());
        assert!(quantity("quantity", decimal("100000000")).is_err());
        assert!(quantity("quantity", decimal("-100000000.00")).is_err());
    }

    #[test]
    fn quantity_rejects_huge_exponents_quickly() {
        let started = Instant::now();

        assert!(quantity("quantity", decimal("1e200000000")).is_err());
        assert!(quantity("quantity", decimal("-1e5000000")).is_err());
        assert!(quantity("quantity", decimal("1e-200000000")).is_err());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn quantity_accepts_exponents_that_fit() {
        assert_eq!(quantity("quantity", decimal("5e2")).unwrap().to_string(), "500.00");
        assert_eq!(quantity("quantity", decimal("125e-2")).unwrap().to_string(), "1.25");
        assert_eq!(quantity("quantity", decimal("0")).unwrap().to_string(), "0.00");
        assert!(quantity("quantity", decimal("1e8")).is_err());
    }
}
