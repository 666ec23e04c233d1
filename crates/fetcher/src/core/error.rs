//! Error types for the fetch engine with enough context to tell stages apart

use std::path::PathBuf;
use thiserror::Error;

use super::Stage;

/// Errors produced while fetching a single item
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS or timeout failure while issuing the request
    #[error("HTTP GET request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The location could not be parsed as an absolute URL
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The connection broke while the body was being streamed
    #[error("Reading response body from '{url}' failed: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Status code from '{url}' was not OK: {status}")]
    UnacceptableStatus {
        url: String,
        status: u16,
    },

    #[error("Content-Type '{content_type}' from '{url}' is not accepted")]
    UnacceptableContentType {
        url: String,
        content_type: String,
    },

    /// The item has no location for this stage
    #[error("No {stage} URL available")]
    NoLocation {
        stage: Stage,
    },

    /// Destination file could not be created or written
    #[error("File operation failed on '{path}' while {operation}: {source}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// The batch-wide cancellation signal fired
    #[error("Download was cancelled")]
    Cancelled {
        url: Option<String>,
    },

    #[error("Could not validate '{file}': {reason}")]
    ValidationFailed {
        file: PathBuf,
        reason: String,
    },

    /// Both stages failed; the primary error is kept first
    #[error("all download links were broken:\n{primary}\n{fallback}")]
    AllSourcesFailed {
        primary: Box<FetchError>,
        fallback: Box<FetchError>,
    },

    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// A worker task ended without reporting an outcome
    #[error("Fetch task failed: {reason}")]
    TaskFailed {
        reason: String,
    },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Create,
    Write,
    Read,
    Delete,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Whether a failed primary attempt may still be rescued by the fallback
    ///
    /// Only network-side failures qualify. Local filesystem errors and
    /// cancellation are terminal for the item.
    pub fn allows_fallback(&self) -> bool {
        match self {
            FetchError::Transport { .. }
            | FetchError::InvalidUrl { .. }
            | FetchError::BodyRead { .. }
            | FetchError::UnacceptableStatus { .. }
            | FetchError::UnacceptableContentType { .. }
            | FetchError::NoLocation { .. } => true,
            FetchError::FileSystem { .. }
            | FetchError::Cancelled { .. }
            | FetchError::ValidationFailed { .. }
            | FetchError::AllSourcesFailed { .. }
            | FetchError::Configuration { .. }
            | FetchError::TaskFailed { .. } => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::InvalidUrl { .. } => "invalid_url",
            FetchError::BodyRead { .. } => "body_read",
            FetchError::UnacceptableStatus { .. } => "unacceptable_status",
            FetchError::UnacceptableContentType { .. } => "unacceptable_content_type",
            FetchError::NoLocation { .. } => "no_location",
            FetchError::FileSystem { .. } => "file_system",
            FetchError::Cancelled { .. } => "cancelled",
            FetchError::ValidationFailed { .. } => "validation_failed",
            FetchError::AllSourcesFailed { .. } => "all_sources_failed",
            FetchError::Configuration { .. } => "configuration",
            FetchError::TaskFailed { .. } => "task_failed",
        }
    }
}
