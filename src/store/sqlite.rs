//! SQLite-backed [`RecordStore`] implementation (the embedded engine).
//!
//! Prices are kept as integer cents and timestamps as integer microseconds
//! since the Unix epoch, so sums are exact and ordering is numeric.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{day_bounds, stored_timestamp, CategoryBreakdown, RecordStore};
use crate::db;
use crate::models::{Category, CategoryTotals, NewRecord, Record};

const SELECT_COLUMNS: &str = "SELECT id, precio_centavos, categoria, codigo, descripcion, \
     fecha_hora, usuario_telegram, usuario_nombre FROM productos";

/// SQLite implementation of the [`RecordStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_sqlite(path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_cents(price: Decimal) -> Result<i64> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or_else(|| anyhow!("price out of range: {}", price))
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let cents: i64 = row.try_get("precio_centavos")?;
    let micros: i64 = row.try_get("fecha_hora")?;
    let category: String = row.try_get("categoria")?;

    Ok(Record {
        id: row.try_get("id")?,
        price: Decimal::new(cents, 2),
        category: category.parse()?,
        code: row.try_get("codigo")?,
        description: row.try_get("descripcion")?,
        timestamp: DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| anyhow!("stored timestamp out of range: {}", micros))?,
        reporter_id: row.try_get("usuario_telegram")?,
        reporter_name: row.try_get("usuario_nombre")?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS productos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                precio_centavos INTEGER NOT NULL
                    CHECK (precio_centavos > 0 AND precio_centavos <= 9999999999),
                categoria TEXT NOT NULL,
                codigo TEXT,
                descripcion TEXT NOT NULL,
                fecha_hora INTEGER NOT NULL,
                usuario_telegram INTEGER NOT NULL,
                usuario_nombre TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating productos table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_productos_fecha ON productos(fecha_hora)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_productos_categoria ON productos(categoria)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_record(&self, record: &NewRecord) -> Result<i64> {
        let timestamp = stored_timestamp(record);

        let result = sqlx::query(
            r#"
            INSERT INTO productos (precio_centavos, categoria, codigo, descripcion,
                                   fecha_hora, usuario_telegram, usuario_nombre)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_cents(record.price)?)
        .bind(record.category.as_str())
        .bind(&record.code)
        .bind(&record.description)
        .bind(timestamp.timestamp_micros())
        .bind(record.reporter_id)
        .bind(&record.reporter_name)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query(&format!("{} ORDER BY fecha_hora DESC, id DESC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Record>> {
        let (start, end) = day_bounds(date);
        let rows = sqlx::query(&format!(
            "{} WHERE fecha_hora >= ? AND fecha_hora < ? ORDER BY fecha_hora DESC, id DESC",
            SELECT_COLUMNS
        ))
        .bind(start.timestamp_micros())
        .bind(end.timestamp_micros())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn count_by_date(&self, date: NaiveDate) -> Result<u64> {
        let (start, end) = day_bounds(date);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM productos WHERE fecha_hora >= ? AND fecha_hora < ?",
        )
        .bind(start.timestamp_micros())
        .bind(end.timestamp_micros())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn aggregate_total_by_date(&self, date: NaiveDate) -> Result<Decimal> {
        let (start, end) = day_bounds(date);
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(precio_centavos), 0) FROM productos WHERE fecha_hora >= ? AND fecha_hora < ?",
        )
        .bind(start.timestamp_micros())
        .bind(end.timestamp_micros())
        .fetch_one(&self.pool)
        .await?;

        Ok(Decimal::new(cents, 2))
    }

    async fn aggregate_by_category_for_date(&self, date: NaiveDate) -> Result<CategoryBreakdown> {
        let (start, end) = day_bounds(date);
        let rows = sqlx::query(
            r#"
            SELECT categoria, COUNT(*) AS cantidad, SUM(precio_centavos) AS total
            FROM productos
            WHERE fecha_hora >= ? AND fecha_hora < ?
            GROUP BY categoria
            "#,
        )
        .bind(start.timestamp_micros())
        .bind(end.timestamp_micros())
        .fetch_all(&self.pool)
        .await?;

        let mut breakdown = CategoryBreakdown::new();
        for row in &rows {
            let label: String = row.try_get("categoria")?;
            let count: i64 = row.try_get("cantidad")?;
            let cents: i64 = row.try_get("total")?;
            breakdown.insert(
                label.parse::<Category>()?,
                CategoryTotals {
                    count: count as u64,
                    total: Decimal::new(cents, 2),
                },
            );
        }

        Ok(breakdown)
    }
}
