//! End-to-end tests of ingestion and reporting against the embedded engine.
//!
//! Each test gets its own SQLite file in a temp directory and goes through
//! the same `select_backend` path the binary uses (no PostgreSQL configured,
//! so the fallback is pinned).

use chrono::{Duration, TimeZone, Utc};
use label_ledger::backend::{select_backend, BackendKind, Storage};
use label_ledger::config::{Config, ReportingConfig};
use label_ledger::ingest::{ingest_fields, ingest_label, IngestError};
use label_ledger::parse::LabelFields;
use label_ledger::models::{Category, NewRecord};
use label_ledger::report::{Period, ReportEngine};
use label_ledger::validate::{validate_record, Reporter};
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;

async fn setup() -> (TempDir, Storage) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.sqlite_path = tmp.path().join("ledger.sqlite");
    let storage = select_backend(&config).await.unwrap();
    assert_eq!(storage.kind(), BackendKind::Fallback);
    (tmp, storage)
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn reporter() -> Reporter {
    Reporter::new(1001, Some("Carlos".to_string()))
}

fn candidate(price: &str) -> NewRecord {
    validate_record(
        Some(dec(price)),
        Category::ConstructionRed,
        "No visible",
        "Cemento gris 50kg",
        &reporter(),
    )
    .unwrap()
}

#[tokio::test]
async fn non_positive_prices_are_rejected_and_not_stored() {
    let (_tmp, storage) = setup().await;

    for response in ["PRECIO: $0\nDESCRIPCIÓN: Regalo", "PRECIO: 0.00$\nCATEGORÍA: rojo"] {
        let result = ingest_label(&storage, response, &reporter()).await;
        assert!(
            matches!(result, Err(IngestError::ValidationFailure(_))),
            "expected rejection for {:?}, got {:?}",
            response,
            result
        );
    }

    let negative = LabelFields {
        price: Some(dec("-5")),
        ..LabelFields::default()
    };
    let result = ingest_fields(&storage, &negative, &reporter()).await;
    assert_eq!(result.unwrap_err(), IngestError::ValidationFailure(dec("-5")));

    assert!(storage.query_all().await.is_empty());
}

#[tokio::test]
async fn oversize_prices_are_rejected_without_panicking() {
    let (_tmp, storage) = setup().await;

    let result = ingest_label(&storage, "PRECIO: 1000000000000000000000000000", &reporter()).await;
    assert_eq!(
        result.unwrap_err(),
        IngestError::ValidationFailure(dec("1000000000000000000000000000"))
    );

    let result = ingest_label(&storage, "PRECIO: $100,000,000.00", &reporter()).await;
    assert_eq!(
        result.unwrap_err(),
        IngestError::ValidationFailure(dec("100000000.00"))
    );
    assert!(storage.query_all().await.is_empty());

    let receipt = ingest_label(&storage, "PRECIO: $99,999,999.99", &reporter())
        .await
        .unwrap();
    let records = storage.query_all().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, receipt.id);
    assert_eq!(records[0].price, dec("99999999.99"));
}

#[tokio::test]
async fn missing_price_is_a_parse_failure() {
    let (_tmp, storage) = setup().await;
    let result = ingest_label(&storage, "CATEGORÍA: Verde\nCÓDIGO: X1", &reporter()).await;
    assert_eq!(result.unwrap_err(), IngestError::ParseFailure);
    assert!(storage.query_all().await.is_empty());
}

#[tokio::test]
async fn inserted_record_reads_back_with_default_timestamp() {
    let (_tmp, storage) = setup().await;

    let before = Utc::now() - Duration::seconds(1);
    let receipt = ingest_label(
        &storage,
        "PRECIO: $10.50\nCATEGORÍA: Amarillo - Pintura\nCÓDIGO: no visible\nDESCRIPCIÓN: Rodillo 9\"",
        &reporter(),
    )
    .await
    .unwrap();
    let after = Utc::now() + Duration::seconds(1);

    let records = storage.query_all().await;
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.id, receipt.id);
    assert_eq!(r.price, dec("10.5"));
    assert_eq!(r.category, Category::PaintYellow);
    assert_eq!(r.code.as_deref(), Some("No visible"));
    assert_eq!(r.description, "Rodillo 9\"");
    assert_eq!(r.reporter_id, 1001);
    assert_eq!(r.reporter_name.as_deref(), Some("Carlos"));
    assert!(r.timestamp >= before && r.timestamp <= after);
}

#[tokio::test]
async fn daily_total_excludes_other_dates() {
    let (_tmp, storage) = setup().await;
    let now = Utc::now();
    let today = now.date_naive();

    for price in ["10", "20", "30"] {
        assert!(storage.insert_record(&candidate(price).at(now)).await.is_some());
    }
    let yesterday = now - Duration::days(1);
    storage
        .insert_record(&candidate("999").at(yesterday))
        .await
        .unwrap();

    assert_eq!(storage.aggregate_total_by_date(today).await, dec("60"));
    assert_eq!(storage.count_by_date(today).await, 3);
    assert_eq!(
        storage.aggregate_total_by_date(yesterday.date_naive()).await,
        dec("999")
    );
    assert_eq!(storage.query_by_date(today).await.len(), 3);
}

#[tokio::test]
async fn empty_date_totals_zero() {
    let (_tmp, storage) = setup().await;
    let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    assert_eq!(storage.aggregate_total_by_date(date).await, Decimal::ZERO);
    assert!(storage.aggregate_by_category_for_date(date).await.is_empty());
}

#[tokio::test]
async fn daily_summary_combines_aggregates() {
    let (_tmp, storage) = setup().await;
    let day = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();

    let rows = [
        ("12.00", Category::AgricultureGreen, 8),
        ("3.25", Category::AgricultureGreen, 9),
        ("40", Category::ConstructionRed, 10),
        ("7.75", Category::Uncategorized, 11),
    ];
    for (price, category, hour) in rows {
        let mut record = candidate(price);
        record.category = category;
        storage
            .insert_record(&record.at(day + Duration::hours(hour)))
            .await
            .unwrap();
    }

    let engine = ReportEngine::new(&storage, &ReportingConfig::default());
    let summary = engine.daily_summary(day.date_naive()).await;

    assert_eq!(summary.total, dec("63.00"));
    assert_eq!(summary.count, 4);
    assert_eq!(summary.by_category.len(), 3);
    assert_eq!(summary.by_category[&Category::AgricultureGreen].count, 2);
    assert_eq!(summary.by_category[&Category::AgricultureGreen].total, dec("15.25"));
    assert_eq!(summary.recent.len(), 3);
    assert_eq!(summary.recent[0].price, dec("7.75"));
    assert_eq!(engine.count_for_date(day.date_naive()).await, 4);
}

#[tokio::test]
async fn list_filters_by_period_and_category() {
    let (_tmp, storage) = setup().await;
    let now = Utc::now();

    let mut green = candidate("5");
    green.category = Category::AgricultureGreen;
    storage.insert_record(&green.at(now)).await.unwrap();
    storage.insert_record(&candidate("6").at(now)).await.unwrap();
    storage
        .insert_record(&candidate("7").at(now - Duration::days(10)))
        .await
        .unwrap();

    let engine = ReportEngine::new(&storage, &ReportingConfig::default());
    assert_eq!(engine.list(Period::AllTime, None, now).await.len(), 3);
    assert_eq!(engine.list(Period::Last7Days, None, now).await.len(), 2);
    let reds = engine
        .list(Period::Last30Days, Some(Category::ConstructionRed), now)
        .await;
    assert_eq!(reds.len(), 2);
    assert!(reds.iter().all(|r| r.category == Category::ConstructionRed));
}

#[tokio::test]
async fn listings_are_served_from_the_snapshot_until_it_expires() {
    let (_tmp, storage) = setup().await;
    storage.insert_record(&candidate("5")).await.unwrap();

    let long_lived = ReportingConfig {
        cache_ttl_secs: 3600,
        ..ReportingConfig::default()
    };
    let engine = ReportEngine::new(&storage, &long_lived);
    assert_eq!(engine.records().await.len(), 1);

    storage.insert_record(&candidate("6")).await.unwrap();
    assert_eq!(engine.records().await.len(), 1);
    assert_eq!(engine.list(Period::AllTime, None, Utc::now()).await.len(), 1);

    // A fresh engine takes a fresh snapshot.
    let engine = ReportEngine::new(&storage, &long_lived);
    assert_eq!(engine.records().await.len(), 2);
}

#[tokio::test]
async fn concurrent_submissions_all_land() {
    let (_tmp, storage) = setup().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let reporter = Reporter::new(i, None);
            ingest_label(&storage, &format!("PRECIO: ${}.00", i + 1), &reporter).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let records = storage.query_all().await;
    assert_eq!(records.len(), 8);
    let total: Decimal = records.iter().map(|r| r.price).sum();
    assert_eq!(total, dec("36"));
}
