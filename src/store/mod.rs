//! Storage abstraction for Label Ledger.
//!
//! The [`RecordStore`] trait defines every storage operation the ingestion
//! pipeline and the reporting engine need. Two engines implement it:
//! [`SqliteStore`](sqlite::SqliteStore) (embedded, file-resident) and
//! [`PgStore`](postgres::PgStore) (client/server). For the same sequence of
//! operations both must return the same records, in the same order, with
//! the same field values.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod postgres;
pub mod sqlite;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SubsecRound, Utc};
use rust_decimal::Decimal;

use crate::models::{Category, CategoryTotals, NewRecord, Record};

/// Per-category counts and totals for one date.
pub type CategoryBreakdown = BTreeMap<Category, CategoryTotals>;

/// Abstract storage backend.
///
/// Records are append-only: there is no update or delete. Every listing is
/// ordered by timestamp descending, ties broken by id descending.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`init_schema`](RecordStore::init_schema) | Create table and indexes (idempotent) |
/// | [`insert_record`](RecordStore::insert_record) | Append a record, returning its id |
/// | [`query_all`](RecordStore::query_all) | Every record, newest first |
/// | [`query_by_date`](RecordStore::query_by_date) | Records of one UTC date |
/// | [`count_by_date`](RecordStore::count_by_date) | Number of records of one date |
/// | [`aggregate_total_by_date`](RecordStore::aggregate_total_by_date) | Price sum of one date |
/// | [`aggregate_by_category_for_date`](RecordStore::aggregate_by_category_for_date) | Count and sum per category |
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short engine name for logs (`"sqlite"`, `"postgres"`).
    fn engine(&self) -> &'static str;

    /// Create the record table and its timestamp/category indexes if absent.
    async fn init_schema(&self) -> Result<()>;

    /// Append a record and return the id the engine assigned.
    ///
    /// A record without a timestamp is stamped with the insertion instant.
    async fn insert_record(&self, record: &NewRecord) -> Result<i64>;

    /// Full scan, newest first.
    async fn query_all(&self) -> Result<Vec<Record>>;

    async fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Record>>;

    async fn count_by_date(&self, date: NaiveDate) -> Result<u64>;

    /// Sum of prices on `date`; zero when there are no records.
    async fn aggregate_total_by_date(&self, date: NaiveDate) -> Result<Decimal>;

    /// Count and price total per category on `date`. Categories with no
    /// records are absent from the map.
    async fn aggregate_by_category_for_date(&self, date: NaiveDate) -> Result<CategoryBreakdown>;
}

/// Half-open UTC range `[date 00:00, date+1 00:00)` covering one date.
///
/// Both engines filter with this range rather than a SQL date function so
/// day boundaries cannot drift between them.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// The instant actually written for `record`: its own timestamp or now,
/// truncated to whole microseconds (the coarser of the two engines).
pub(crate) fn stored_timestamp(record: &NewRecord) -> DateTime<Utc> {
    record.timestamp.unwrap_or_else(Utc::now).trunc_subsecs(6)
}
