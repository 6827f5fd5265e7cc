//! Console reports: the daily summary and record listings.
//!
//! Used by `ledger stats` and `ledger list`. Both commands print a
//! human-readable table by default and JSON with `--json`.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde_json::json;

use crate::backend::{select_backend, Storage};
use crate::config::Config;
use crate::models::{Category, Record};
use crate::report::{daily_totals, price_stats, DailySummary, Period, ReportEngine};

/// Render a daily summary as the text the bot sends for its stats command.
pub fn format_summary(summary: &DailySummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Summary for {}\n", summary.date));
    out.push_str("==========================\n\n");
    out.push_str(&format!("  Total:     ${:.2}\n", summary.total));
    out.push_str(&format!("  Products:  {}\n\n", summary.count));
    out.push_str("  By category:\n");

    if summary.by_category.is_empty() {
        out.push_str("  - no records for this date\n");
    } else {
        for (category, totals) in &summary.by_category {
            out.push_str(&format!(
                "  - {:<20} {:>4} products  (${:.2})\n",
                category.as_str(),
                totals.count,
                totals.total
            ));
        }
    }

    if !summary.recent.is_empty() {
        out.push_str("\n  Latest:\n");
        for record in &summary.recent {
            out.push_str(&format!("  - {} - ${:.2}\n", record.description, record.price));
        }
    }

    out
}

fn print_records(records: &[Record]) {
    println!(
        "  {:<17} {:<28} {:>10}  {:<18} {:<12} {}",
        "DATE", "PRODUCT", "PRICE", "CATEGORY", "CODE", "REPORTED BY"
    );
    println!("  {}", "-".repeat(100));
    for r in records {
        println!(
            "  {:<17} {:<28} {:>10}  {:<18} {:<12} {}",
            r.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&r.description, 28),
            format!("${:.2}", r.price),
            r.category.as_str(),
            truncate(r.code.as_deref().unwrap_or("-"), 12),
            r.reporter_name.as_deref().unwrap_or("-")
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn print_backend(storage: &Storage) {
    println!("  Backend:   {} ({})", storage.descriptor(), storage.kind());
}

/// Run `ledger stats`: summary for `date` (default: today, UTC).
pub async fn run_stats(config: &Config, date: Option<NaiveDate>, as_json: bool) -> Result<()> {
    let storage = select_backend(config).await?;
    let engine = ReportEngine::new(&storage, &config.reporting);
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = engine.daily_summary(date).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print!("{}", format_summary(&summary));
    println!();
    print_backend(&storage);
    Ok(())
}

/// Run `ledger list`: records in a period, with price statistics.
pub async fn run_list(
    config: &Config,
    period: Period,
    category: Option<Category>,
    as_json: bool,
) -> Result<()> {
    let storage = select_backend(config).await?;
    let engine = ReportEngine::new(&storage, &config.reporting);
    let records = engine.list(period, category, Utc::now()).await;
    let stats = price_stats(&records);

    if as_json {
        let body = json!({
            "records": records,
            "stats": stats,
            "daily": daily_totals(&records),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records for the selected period.");
        return Ok(());
    }

    print_records(&records);

    if let Some(s) = stats {
        println!();
        println!("  Records:   {}", s.count);
        println!("  Total:     ${:.2}", s.total);
        println!("  Min:       ${:.2}", s.min);
        println!("  Max:       ${:.2}", s.max);
        println!("  Mean:      ${:.2}", s.mean);
        println!("  Median:    ${:.2}", s.median);
    }
    println!();
    print_backend(&storage);

    Ok(())
}
