//! Price extraction and labeled-response parsing.
//!
//! The vision model is asked to answer with four labeled lines:
//!
//! ```text
//! PRECIO: $1,234.56
//! CATEGORÍA: Rojo-Construcción
//! CÓDIGO: AB-1234
//! DESCRIPCIÓN: Martillo de uña 16oz
//! ```
//!
//! Models do not always comply, so [`parse_label_response`] tolerates
//! reordered, unaccented, and missing lines, and [`extract_price`] accepts
//! any text at all.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::category::normalize_category;
use crate::models::{Category, CODE_NOT_VISIBLE, DESCRIPTION_MISSING};

lazy_static! {
    // $1,234.56
    static ref CURRENCY_PREFIXED: Regex =
        Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})*(?:\.\d{2})?)").unwrap();

    // 1,234.56$
    static ref CURRENCY_SUFFIXED: Regex =
        Regex::new(r"(\d{1,3}(?:,\d{3})*(?:\.\d{2})?)\s*\$").unwrap();

    // Catch-all. Over-matches product codes and other stray digits.
    static ref BARE_NUMBER: Regex = Regex::new(r"(\d+(?:\.\d{2})?)").unwrap();
}

/// Extract a price from arbitrary text.
///
/// Patterns are tried in priority order (currency-prefixed, currency-suffixed,
/// bare number); within a pattern the leftmost match wins. Thousands
/// separators are stripped before parsing. If a match fails to parse, the
/// next pattern is tried.
///
/// Returns `None` when no pattern yields a number.
pub fn extract_price(text: &str) -> Option<Decimal> {
    let patterns: [&Regex; 3] = [&CURRENCY_PREFIXED, &CURRENCY_SUFFIXED, &BARE_NUMBER];

    for pattern in patterns {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let cleaned = caps[1].replace(',', "");
        match Decimal::from_str(&cleaned) {
            Ok(price) => return Some(price),
            Err(e) => {
                tracing::debug!(candidate = %cleaned, error = %e, "price candidate did not parse");
            }
        }
    }

    None
}

/// Fields recovered from a vision-model response.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFields {
    pub price: Option<Decimal>,
    pub category: Category,
    pub code: String,
    pub description: String,
}

impl Default for LabelFields {
    fn default() -> Self {
        Self {
            price: None,
            category: Category::Uncategorized,
            code: CODE_NOT_VISIBLE.to_string(),
            description: DESCRIPTION_MISSING.to_string(),
        }
    }
}

const PRICE_LABELS: &[&str] = &["PRECIO:"];
const CATEGORY_LABELS: &[&str] = &["CATEGORÍA:", "CATEGORIA:"];
const CODE_LABELS: &[&str] = &["CÓDIGO:", "CODIGO:"];
const DESCRIPTION_LABELS: &[&str] = &["DESCRIPCIÓN:", "DESCRIPCION:"];

/// Codes the model uses to say it could not read one.
const UNREADABLE_CODES: &[&str] = &["no visible", "no encontrado", ""];

fn strip_label<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    labels
        .iter()
        .find_map(|label| line.strip_prefix(label))
        .map(str::trim)
}

/// Split a labeled response into its fields.
///
/// Lines may appear in any order; unknown lines are ignored. Missing
/// fields keep their sentinel defaults. The price extractor only sees
/// the `PRECIO:` line, never the whole response.
pub fn parse_label_response(text: &str) -> LabelFields {
    let mut fields = LabelFields::default();

    for line in text.trim().lines() {
        let line = line.trim();

        if let Some(value) = strip_label(line, PRICE_LABELS) {
            fields.price = extract_price(value);
        } else if let Some(value) = strip_label(line, CATEGORY_LABELS) {
            fields.category = normalize_category(value);
        } else if let Some(value) = strip_label(line, CODE_LABELS) {
            fields.code = if UNREADABLE_CODES.contains(&value.to_lowercase().as_str()) {
                CODE_NOT_VISIBLE.to_string()
            } else {
                value.to_string()
            };
        } else if let Some(value) = strip_label(line, DESCRIPTION_LABELS) {
            if !value.is_empty() {
                fields.description = value.to_string();
            }
        }
    }

    tracing::debug!(
        price = ?fields.price,
        category = %fields.category,
        "parsed label response"
    );

    fields
}
