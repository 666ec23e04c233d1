//! Fetcher Library
//!
//! Concurrently downloads a list of documents, each from a primary URL with
//! a fallback URL, and reports one outcome per item in input order.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fetcher::{CancellationToken, FetchConfig, Fetcher, Item, NullProgressReporter};
//! use std::path::Path;
//!
//! # async fn example() -> fetcher::Result<()> {
//! let fetcher = Fetcher::new(FetchConfig::default())?;
//!
//! let items = vec![
//!     Item::new("BR001", "Annual report", "https://example.com/a.pdf", "https://mirror.example.com/a.pdf"),
//!     Item::new("BR002", "No links", "", ""),
//! ];
//!
//! let cancel = CancellationToken::new();
//! let results = fetcher
//!     .fetch_all(items, Path::new("downloads"), cancel, &NullProgressReporter)
//!     .await?;
//!
//! for result in &results {
//!     println!("{result}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Fallback**: the fallback URL is tried only after the primary fails
//! - **Cancellation**: one token stops every in-flight transfer at the next chunk
//! - **Ordered results**: one result per item, in input order, whatever the completion order
//! - **Validation**: downloaded files pass through a pluggable `Validator`
//! - **Bounded or unbounded**: optionally cap the number of concurrent fetches

pub mod batch;
pub mod config;
pub mod core;
pub mod report;
pub mod resolver;

// Re-export commonly used types for convenience
pub use batch::{Fetcher, ResultCollector};
pub use config::{FetchConfig, FetchConfigBuilder};
pub use self::core::{
    AcceptAll, ContentTypeCheck, ExactContentType, FetchError, FetchMetrics, FetchMetricsSnapshot, HttpClient, Item,
    ItemResult, LogProgressReporter, NullProgressReporter, Outcome, PdfValidator, ProgressReporter, ProgressSink,
    Result, ResultSet, ResultSummary, Stage, Validator,
};
pub use report::{Column, ColumnMapping, ReportError, ReportFormat};
pub use resolver::Resolver;
pub use tokio_util::sync::CancellationToken;
