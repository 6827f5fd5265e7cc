//! Gate between parsing and persistence.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::{Category, NewRecord};

/// Why a candidate was turned away before reaching storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// No usable price was found in the response.
    #[error("no price found")]
    MissingPrice,

    /// A price was found but is not positive (after rounding to cents).
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    /// A price above [`MAX_PRICE`].
    #[error("price {0} exceeds the maximum of 99999999.99")]
    PriceTooLarge(Decimal),
}

/// Largest storable price: the `DECIMAL(10,2)` column limit, enforced for
/// both engines.
// 9_999_999_999 at scale 2, split into 32-bit parts (lo, mid, hi).
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Reporter identity attached to every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reporter {
    pub id: i64,
    pub name: Option<String>,
}

impl Reporter {
    pub fn new(id: i64, name: Option<String>) -> Self {
        Self { id, name }
    }
}

/// Accept or reject a candidate record.
///
/// Only the price is checked. It is rounded to two decimals (both storage
/// engines keep cents) and must then lie in `(0, MAX_PRICE]`. Code and
/// description pass through untouched, sentinels included.
pub fn validate_record(
    price: Option<Decimal>,
    category: Category,
    code: &str,
    description: &str,
    reporter: &Reporter,
) -> Result<NewRecord, RejectReason> {
    let price = price.ok_or(RejectReason::MissingPrice)?;
    let price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    if price <= Decimal::ZERO {
        return Err(RejectReason::NonPositivePrice(price));
    }
    if price > MAX_PRICE {
        return Err(RejectReason::PriceTooLarge(price));
    }

    Ok(NewRecord {
        price,
        category,
        code: code.to_string(),
        description: description.to_string(),
        timestamp: None,
        reporter_id: reporter.id,
        reporter_name: reporter.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn reporter() -> Reporter {
        Reporter::new(42, Some("Ana".to_string()))
    }

    #[test]
    fn test_rejects_missing_price() {
        let result = validate_record(None, Category::PaintYellow, "X", "Y", &reporter());
        assert_eq!(result, Err(RejectReason::MissingPrice));
    }

    #[test]
    fn test_rejects_zero_and_negative() {
        for p in ["0", "-5", "0.004"] {
            let price = Decimal::from_str(p).unwrap();
            let result =
                validate_record(Some(price), Category::PaintYellow, "X", "Y", &reporter());
            assert!(
                matches!(result, Err(RejectReason::NonPositivePrice(_))),
                "{} should be rejected",
                p
            );
        }
    }

    #[test]
    fn test_max_price_constant() {
        assert_eq!(MAX_PRICE, Decimal::from_str("99999999.99").unwrap());
    }

    #[test]
    fn test_price_upper_bound() {
        let accepted = validate_record(
            Some(Decimal::from_str("99999999.99").unwrap()),
            Category::PaintYellow,
            "X",
            "Y",
            &reporter(),
        );
        assert!(accepted.is_ok());

        for p in ["100000000.00", "99999999.995", "1000000000000000000000000000"] {
            let price = Decimal::from_str(p).unwrap();
            let result =
                validate_record(Some(price), Category::PaintYellow, "X", "Y", &reporter());
            assert!(
                matches!(result, Err(RejectReason::PriceTooLarge(_))),
                "{} should be rejected, got {:?}",
                p,
                result
            );
        }
    }

    #[test]
    fn test_accepts_and_passes_fields_through() {
        let record = validate_record(
            Some(Decimal::from_str("10.505").unwrap()),
            Category::ConstructionRed,
            "No visible",
            "Sin descripción",
            &reporter(),
        )
        .unwrap();

        assert_eq!(record.price, Decimal::from_str("10.51").unwrap());
        assert_eq!(record.category, Category::ConstructionRed);
        assert_eq!(record.code, "No visible");
        assert_eq!(record.description, "Sin descripción");
        assert_eq!(record.timestamp, None);
        assert_eq!(record.reporter_id, 42);
        assert_eq!(record.reporter_name.as_deref(), Some("Ana"));
    }
}
