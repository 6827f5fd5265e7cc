//! PostgreSQL-backed [`RecordStore`] implementation (the client/server engine).
//!
//! The table layout matches the `productos` table the shop already runs:
//! `SERIAL` ids, `DECIMAL(10,2)` prices and naive `TIMESTAMP`s, which this
//! crate always writes in UTC.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{day_bounds, stored_timestamp, CategoryBreakdown, RecordStore};
use crate::models::{Category, CategoryTotals, NewRecord, Record};

const SELECT_COLUMNS: &str = "SELECT id::BIGINT AS id, precio, categoria, codigo, descripcion, \
     fecha_hora, usuario_telegram, usuario_nombre FROM productos";

/// PostgreSQL implementation of the [`RecordStore`] trait.
///
/// Holds a lazily-connecting pool; each operation checks a connection out
/// and returns it when done.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// NUMERIC values come back with whatever scale the expression had
/// (`COALESCE(SUM(..), 0)` can be scale 0). Pin everything to cents.
fn cents(mut value: Decimal) -> Decimal {
    value.rescale(2);
    value
}

fn record_from_row(row: &PgRow) -> Result<Record> {
    let category: String = row.try_get("categoria")?;
    let timestamp: chrono::NaiveDateTime = row.try_get("fecha_hora")?;

    Ok(Record {
        id: row.try_get("id")?,
        price: cents(row.try_get("precio")?),
        category: category.parse()?,
        code: row.try_get("codigo")?,
        description: row.try_get("descripcion")?,
        timestamp: timestamp.and_utc(),
        reporter_id: row.try_get("usuario_telegram")?,
        reporter_name: row.try_get("usuario_nombre")?,
    })
}

#[async_trait]
impl RecordStore for PgStore {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS productos (
                id SERIAL PRIMARY KEY,
                precio DECIMAL(10,2) NOT NULL,
                categoria VARCHAR(100) NOT NULL,
                codigo VARCHAR(100),
                descripcion TEXT NOT NULL,
                fecha_hora TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                usuario_telegram BIGINT NOT NULL,
                usuario_nombre VARCHAR(100)
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

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO productos (precio, categoria, codigo, descripcion,
                                   fecha_hora, usuario_telegram, usuario_nombre)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id::BIGINT
            "#,
        )
        .bind(record.price)
        .bind(record.category.as_str())
        .bind(&record.code)
        .bind(&record.description)
        .bind(timestamp.naive_utc())
        .bind(record.reporter_id)
        .bind(&record.reporter_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
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
            "{} WHERE fecha_hora >= $1 AND fecha_hora < $2 ORDER BY fecha_hora DESC, id DESC",
            SELECT_COLUMNS
        ))
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn count_by_date(&self, date: NaiveDate) -> Result<u64> {
        let (start, end) = day_bounds(date);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM productos WHERE fecha_hora >= $1 AND fecha_hora < $2",
        )
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn aggregate_total_by_date(&self, date: NaiveDate) -> Result<Decimal> {
        let (start, end) = day_bounds(date);
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(precio), 0) FROM productos WHERE fecha_hora >= $1 AND fecha_hora < $2",
        )
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(cents(total))
    }

    async fn aggregate_by_category_for_date(&self, date: NaiveDate) -> Result<CategoryBreakdown> {
        let (start, end) = day_bounds(date);
        let rows = sqlx::query(
            r#"
            SELECT categoria, COUNT(*) AS cantidad, SUM(precio) AS total
            FROM productos
            WHERE fecha_hora >= $1 AND fecha_hora < $2
            GROUP BY categoria
            "#,
        )
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_all(&self.pool)
        .await?;

        let mut breakdown = CategoryBreakdown::new();
        for row in &rows {
            let label: String = row.try_get("categoria")?;
            let count: i64 = row.try_get("cantidad")?;
            let total: Decimal = row.try_get("total")?;
            breakdown.insert(
                label.parse::<Category>()?,
                CategoryTotals {
                    count: count as u64,
                    total: cents(total),
                },
            );
        }

        Ok(breakdown)
    }
}
