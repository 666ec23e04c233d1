//! Post-download content validation
//!
//! Validation is a second, separate stage: `apply_validation` takes the
//! resolver's outcome and returns a new one. Only a `Succeeded` outcome is
//! ever inspected, and it can only move to `Failed`.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::Outcome;
use super::error::{FetchError, FileOperation, Result};

/// Checks a downloaded file's content
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, path: &Path) -> Result<()>;
}

/// Validator that accepts every file
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

#[async_trait]
impl Validator for AcceptAll {
    async fn validate(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

const PDF_HEADER: &[u8] = b"%PDF-";
const PDF_TRAILER: &[u8] = b"%%EOF";

/// Structural PDF check
///
/// Cheap rejections come first: the header must appear in the first
/// kilobyte and the end-of-file marker in the last kilobyte. A file that
/// passes both is then parsed in full with `lopdf`; it must load and have
/// at least one page.
#[derive(Debug, Clone)]
pub struct PdfValidator {
    window: usize,
}

impl Default for PdfValidator {
    fn default() -> Self {
        Self { window: 1024 }
    }
}

impl PdfValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn rejected(path: &Path, reason: &str) -> FetchError {
        FetchError::ValidationFailed {
            file: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Validator for PdfValidator {
    async fn validate(&self, path: &Path) -> Result<()> {
        let io_error = |source| FetchError::FileSystem {
            path: path.to_path_buf(),
            operation: FileOperation::Read,
            source,
        };

        let mut file = fs::File::open(path).await.map_err(io_error)?;
        let len = file.metadata().await.map_err(io_error)?.len();
        if len == 0 {
            return Err(Self::rejected(path, "file is empty"));
        }

        let window = (self.window as u64).min(len) as usize;
        let mut head = vec![0u8; window];
        file.read_exact(&mut head).await.map_err(io_error)?;
        if !contains(&head, PDF_HEADER) {
            return Err(Self::rejected(path, "missing %PDF- header"));
        }

        let mut tail = vec![0u8; window];
        file.seek(SeekFrom::Start(len - window as u64)).await.map_err(io_error)?;
        file.read_exact(&mut tail).await.map_err(io_error)?;
        if !contains(&tail, PDF_TRAILER) {
            return Err(Self::rejected(path, "missing %%EOF marker, file may be truncated"));
        }

        drop(file);
        let owned = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || {
            lopdf::Document::load(&owned).map(|document| document.get_pages().len())
        })
        .await
        .map_err(|e| Self::rejected(path, &format!("PDF parser stopped: {e}")))?;

        match parsed {
            Ok(0) => Err(Self::rejected(path, "document has no pages")),
            Ok(pages) => {
                debug!("{} passed PDF validation ({} pages)", path.display(), pages);
                Ok(())
            }
            Err(e) => Err(Self::rejected(path, &format!("not a readable PDF document: {e}"))),
        }
    }
}

/// A small, well-formed one-page PDF carrying `marker` as an extra object
#[cfg(test)]
pub(crate) fn sample_pdf(marker: &str) -> Vec<u8> {
    use lopdf::{Document, Object, dictionary};

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let page_id = document.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.add_object(Object::string_literal(marker));
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).unwrap();
    bytes
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Run `validator` over a successful outcome, downgrading it on rejection
pub async fn apply_validation(outcome: Outcome, validator: &dyn Validator) -> Outcome {
    let written_path = match outcome {
        Outcome::Succeeded { written_path } => written_path,
        other => return other,
    };

    match validator.validate(&written_path).await {
        Ok(()) => Outcome::Succeeded { written_path },
        Err(error) => {
            warn!("Validation rejected {}: {}", written_path.display(), error);
            let error = match error {
                FetchError::ValidationFailed { .. } => error,
                other => FetchError::ValidationFailed {
                    file: written_path,
                    reason: other.to_string(),
                },
            };
            Outcome::failed(error)
        }
    }
}
