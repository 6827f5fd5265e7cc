//! Ingestion pipeline orchestration.
//!
//! Coordinates one submission end to end: vision-model response →
//! field parsing → category normalization → validation → storage. Nothing is
//! written unless a positive price was found.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::backend::Storage;
use crate::config::Config;
use crate::models::NewRecord;
use crate::parse::{parse_label_response, LabelFields};
use crate::validate::{validate_record, RejectReason, Reporter};

/// Why a submission was not stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// No usable price in the response.
    #[error("no price could be read from the label")]
    ParseFailure,

    /// A price was read but it is not positive or is too large to store.
    #[error("price {0} is outside the accepted range")]
    ValidationFailure(Decimal),

    /// The storage engine refused or failed the insert.
    #[error("the record could not be saved")]
    OperationFailure,
}

impl From<RejectReason> for IngestError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::MissingPrice => IngestError::ParseFailure,
            RejectReason::NonPositivePrice(price) | RejectReason::PriceTooLarge(price) => {
                IngestError::ValidationFailure(price)
            }
        }
    }
}

/// What was stored for a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReceipt {
    pub id: i64,
    pub record: NewRecord,
}

/// Validate already-parsed fields and store them.
pub async fn ingest_fields(
    storage: &Storage,
    fields: &LabelFields,
    reporter: &Reporter,
) -> Result<IngestReceipt, IngestError> {
    let record = validate_record(
        fields.price,
        fields.category,
        &fields.code,
        &fields.description,
        reporter,
    )?;

    let id = storage
        .insert_record(&record)
        .await
        .ok_or(IngestError::OperationFailure)?;

    Ok(IngestReceipt { id, record })
}

/// Parse a vision-model response and store the resulting record.
pub async fn ingest_label(
    storage: &Storage,
    response: &str,
    reporter: &Reporter,
) -> Result<IngestReceipt, IngestError> {
    let fields = parse_label_response(response);
    let result = ingest_fields(storage, &fields, reporter).await;

    match &result {
        Ok(receipt) => tracing::info!(
            reporter = reporter.id,
            id = receipt.id,
            category = %receipt.record.category,
            "label ingested"
        ),
        Err(e) => tracing::info!(reporter = reporter.id, reason = %e, "label not stored"),
    }

    result
}

/// Render a receipt the way the bot replies to a successful submission.
pub fn format_receipt(receipt: &IngestReceipt) -> String {
    let record = &receipt.record;
    let mut out = String::new();
    out.push_str("Product registered\n");
    out.push_str(&format!("  id:          {}\n", receipt.id));
    out.push_str(&format!("  price:       ${:.2}\n", record.price));
    out.push_str(&format!("  category:    {}\n", record.category));
    out.push_str(&format!("  code:        {}\n", record.code));
    out.push_str(&format!("  description: {}\n", record.description));
    if let Some(name) = &record.reporter_name {
        out.push_str(&format!("  reported by: {}\n", name));
    }
    out
}

/// CLI entry point: read a response from `input` (or stdin), ingest it, and
/// print the outcome. Returns `Ok(false)` when the submission was rejected.
pub async fn run_ingest(
    config: &Config,
    input: Option<&Path>,
    reporter: &Reporter,
) -> Result<bool> {
    let response = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read response file: {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?,
    };

    let storage = crate::backend::select_backend(config).await?;

    match ingest_label(&storage, &response, reporter).await {
        Ok(receipt) => {
            print!("{}", format_receipt(&receipt));
            Ok(true)
        }
        Err(e) => {
            println!("Not saved: {}", e);
            println!("--- response ---");
            println!("{}", response.trim());
            Ok(false)
        }
    }
}
