//! Tabular input and output
//!
//! Thin adapters around the engine: rows in, one report row per result out.

pub mod reader;
pub mod writer;

pub use reader::{Column, ColumnMapping, is_workbook, read_items};
pub use writer::{ReportFormat, ReportRow, write_results};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed table '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unreadable workbook '{path}': {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Could not write workbook '{path}': {source}")]
    WorkbookWrite {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("Could not encode report '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{path}' is empty")]
    Empty { path: PathBuf },

    #[error("Column '{column}' not found in '{path}'")]
    MissingColumn { path: PathBuf, column: String },
}
