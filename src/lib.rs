//! # Label Ledger
//!
//! **Shelf-label ingestion and reporting for a hardware store.**
//!
//! A vision model reads a photo of a product label and answers in loosely
//! structured text. Label Ledger turns that text into a validated record,
//! stores it in PostgreSQL (or, when PostgreSQL is unreachable at startup, in
//! a local SQLite file), and answers date-scoped reporting queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌─────────────────────┐
//! │ vision text  │──▶│ parse → category │──▶│ Storage (pinned)    │
//! │ (transport)  │   │ → validate       │   │ PgStore | SqliteStore│
//! └──────────────┘   └──────────────────┘   └──────────┬──────────┘
//!                                                      │
//!                                                      ▼
//!                                              ┌──────────────┐
//!                                              │ ReportEngine │
//!                                              └──────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The transport hands a response to [`ingest::ingest_label`].
//! 2. [`parse`] splits the labeled lines and extracts the price;
//!    [`category`] maps the colour text to one of four categories.
//! 3. [`validate`] rejects candidates without a positive price.
//! 4. The [`backend::Storage`] chosen once by [`backend::select_backend`]
//!    inserts through the [`store::RecordStore`] trait.
//! 5. [`report::ReportEngine`] reads totals, counts, and breakdowns back.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | `Record`, `NewRecord`, `Category` |
//! | [`parse`] | Price extraction and labeled-response parsing |
//! | [`category`] | Label colour → category normalization |
//! | [`validate`] | Candidate acceptance before persistence |
//! | [`store`] | `RecordStore` trait with SQLite and PostgreSQL engines |
//! | [`db`] | Connection options, probing, and pools |
//! | [`backend`] | Startup backend selection with one-time fallback |
//! | [`ingest`] | End-to-end ingestion of one submission |
//! | [`report`] | Aggregation, period filters, price statistics, snapshot cache |
//! | [`stats`] | Console rendering for `ledger stats` and `ledger list` |

pub mod backend;
pub mod category;
pub mod config;
pub mod db;
pub mod ingest;
pub mod models;
pub mod parse;
pub mod report;
pub mod stats;
pub mod store;
pub mod validate;

pub use backend::{select_backend, BackendKind, Storage};
pub use models::{Category, NewRecord, Record};
pub use store::RecordStore;
