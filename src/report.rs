//! Read-only reporting over persisted records.
//!
//! [`ReportEngine`] answers the questions the chat bot's daily summary and
//! the dashboard ask: the full sorted listing, total and count for a date,
//! per-category breakdown, and a combined [`DailySummary`]. The free
//! functions ([`filter_period`], [`price_stats`], [`daily_totals`]) work on an
//! already-fetched record slice so one query can feed several views.
//!
//! Listings are short-lived snapshots: the engine keeps the full record scan
//! in a [`SnapshotCache`] for `reporting.cache_ttl_secs` and only re-reads
//! storage once that window has passed.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::backend::Storage;
use crate::config::ReportingConfig;
use crate::models::{Category, Record};
use crate::store::CategoryBreakdown;

/// Time window applied to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Last7Days,
    Last30Days,
    AllTime,
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Period::Today),
            "7d" => Ok(Period::Last7Days),
            "30d" => Ok(Period::Last30Days),
            "all" => Ok(Period::AllTime),
            other => bail!(
                "Unknown period: '{}'. Must be today, 7d, 30d, or all.",
                other
            ),
        }
    }
}

/// Everything the daily summary shows.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: u64,
    pub by_category: CategoryBreakdown,
    /// Latest records of the date, newest first.
    pub recent: Vec<Record>,
}

/// Descriptive statistics over a set of prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats {
    pub count: usize,
    pub total: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub mean: Decimal,
    pub median: Decimal,
}

/// Total and count for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: usize,
}

/// Reporting queries against the pinned storage.
pub struct ReportEngine<'a> {
    storage: &'a Storage,
    recent_limit: usize,
    snapshot: SnapshotCache<Vec<Record>>,
}

impl<'a> ReportEngine<'a> {
    pub fn new(storage: &'a Storage, config: &ReportingConfig) -> Self {
        Self {
            storage,
            recent_limit: config.recent_limit,
            snapshot: SnapshotCache::new(Duration::from_secs(config.cache_ttl_secs)),
        }
    }

    /// Every record, newest first. Served from the snapshot while it is
    /// younger than the configured TTL.
    pub async fn records(&self) -> Vec<Record> {
        self.snapshot
            .get_or_refresh(|| self.storage.query_all())
            .await
    }

    pub async fn total_for_date(&self, date: NaiveDate) -> Decimal {
        self.storage.aggregate_total_by_date(date).await
    }

    pub async fn count_for_date(&self, date: NaiveDate) -> u64 {
        self.storage.count_by_date(date).await
    }

    pub async fn breakdown_for_date(&self, date: NaiveDate) -> CategoryBreakdown {
        self.storage.aggregate_by_category_for_date(date).await
    }

    pub async fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        let total = self.total_for_date(date).await;
        let by_category = self.breakdown_for_date(date).await;
        let mut recent = self.storage.query_by_date(date).await;
        let count = recent.len() as u64;
        recent.truncate(self.recent_limit);

        DailySummary {
            date,
            total,
            count,
            by_category,
            recent,
        }
    }

    /// Records inside `period` (relative to `now`), optionally restricted to
    /// one category.
    pub async fn list(
        &self,
        period: Period,
        category: Option<Category>,
        now: DateTime<Utc>,
    ) -> Vec<Record> {
        let mut records = filter_period(self.records().await, period, now);
        if let Some(category) = category {
            records.retain(|r| r.category == category);
        }
        records
    }
}

/// Keep the records that fall in `period`.
///
/// `Today` means the UTC date of `now`; the N-day periods keep anything at or
/// after `now - N days`.
pub fn filter_period(records: Vec<Record>, period: Period, now: DateTime<Utc>) -> Vec<Record> {
    let days = match period {
        Period::AllTime => return records,
        Period::Today => {
            let today = now.date_naive();
            return records
                .into_iter()
                .filter(|r| r.timestamp.date_naive() == today)
                .collect();
        }
        Period::Last7Days => 7,
        Period::Last30Days => 30,
    };

    let cutoff = now - chrono::Duration::days(days);
    records
        .into_iter()
        .filter(|r| r.timestamp >= cutoff)
        .collect()
}

/// Min, max, mean, and median price. `None` for an empty slice.
pub fn price_stats(records: &[Record]) -> Option<PriceStats> {
    if records.is_empty() {
        return None;
    }

    let mut prices: Vec<Decimal> = records.iter().map(|r| r.price).collect();
    prices.sort();

    let count = prices.len();
    let total: Decimal = prices.iter().copied().sum();
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (prices[mid - 1] + prices[mid]) / Decimal::from(2)
    } else {
        prices[mid]
    };

    Some(PriceStats {
        count,
        total,
        min: prices[0],
        max: prices[count - 1],
        mean: (total / Decimal::from(count)).round_dp(2),
        median,
    })
}

/// Per-date totals, oldest date first.
pub fn daily_totals(records: &[Record]) -> Vec<DailyTotal> {
    let mut by_date: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_date
            .entry(record.timestamp.date_naive())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += record.price;
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (total, count))| DailyTotal { date, total, count })
        .collect()
}

/// Holds one computed value for a fixed time-to-live.
///
/// The lock is held while refreshing, so concurrent callers that find the
/// snapshot expired wait for a single recomputation instead of each running
/// their own query.
pub struct SnapshotCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached value, recomputing it with `refresh` if it is
    /// missing or older than the TTL.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((taken_at, value)) = slot.as_ref() {
            if taken_at.elapsed() < self.ttl {
                return value.clone();
            }
        }

        let value = refresh().await;
        *slot = Some((Instant::now(), value.clone()));
        value
    }
}
