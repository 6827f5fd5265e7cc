//! Core data models used throughout Label Ledger.
//!
//! These types represent the records that flow from the ingestion pipeline
//! into storage and back out to the reporting engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stored in place of a product code the vision model could not read.
pub const CODE_NOT_VISIBLE: &str = "No visible";

/// Stored in place of a missing product description.
pub const DESCRIPTION_MISSING: &str = "Sin descripción";

/// Shelf-label category, derived from the label colour.
///
/// Only these four values are ever persisted. The string form is the
/// label stored in the `categoria` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    AgricultureGreen,
    ConstructionRed,
    PaintYellow,
    Uncategorized,
}

impl Category {
    /// All categories, in normalizer priority order.
    pub const ALL: [Category; 4] = [
        Category::AgricultureGreen,
        Category::ConstructionRed,
        Category::PaintYellow,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AgricultureGreen => "Verde-Agricultura",
            Category::ConstructionRed => "Rojo-Construcción",
            Category::PaintYellow => "Amarillo-Pintura",
            Category::Uncategorized => "Sin categoría",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown category label: '{}'", s))
    }
}

/// A validated candidate, ready to be inserted.
///
/// `timestamp` is `None` unless the caller needs a fixed instant; the
/// storage layer fills in the insertion time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub price: Decimal,
    pub category: Category,
    pub code: String,
    pub description: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub reporter_id: i64,
    pub reporter_name: Option<String>,
}

impl NewRecord {
    /// Pin the record to an explicit instant instead of the insertion time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A persisted product observation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: i64,
    pub price: Decimal,
    pub category: Category,
    pub code: Option<String>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub reporter_id: i64,
    pub reporter_name: Option<String>,
}

/// Count and price total for one category on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryTotals {
    pub count: u64,
    pub total: Decimal,
}
