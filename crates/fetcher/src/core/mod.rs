//! Core types used throughout the fetch engine
//!
//! Every other module depends on these. Items come in, one `Outcome` per item
//! comes out, and the pair is reported back as an `ItemResult`.

pub mod copy;
pub mod error;
pub mod http;
pub mod metrics;
pub mod progress;
pub mod validation;

pub use copy::{CopyError, cancellable_copy};
pub use error::{FetchError, FileOperation, Result};
pub use http::{ContentTypeCheck, ExactContentType, HttpClient, assert_acceptable};
pub use metrics::{FetchMetrics, FetchMetricsSnapshot};
pub use progress::{LogProgressReporter, NullProgressReporter, NullSink, ProgressReporter, ProgressSink};
pub use validation::{AcceptAll, PdfValidator, Validator, apply_validation};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One input record naming a resource and its two candidate locations
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier, used as the output filename stem
    pub id: String,
    pub name: String,
    /// May be empty
    pub primary_url: String,
    /// May be empty
    pub fallback_url: String,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        primary_url: impl Into<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary_url: primary_url.into(),
            fallback_url: fallback_url.into(),
        }
    }

    pub fn has_no_locations(&self) -> bool {
        self.primary_url.is_empty() && self.fallback_url.is_empty()
    }

    /// Location for a stage, `None` when that column was left empty
    pub fn location(&self, stage: Stage) -> Option<&str> {
        let url = match stage {
            Stage::Primary => self.primary_url.as_str(),
            Stage::Fallback => self.fallback_url.as_str(),
        };
        (!url.is_empty()).then_some(url)
    }
}

/// Which of an item's two locations an attempt targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Fallback,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Primary => write!(f, "primary"),
            Stage::Fallback => write!(f, "fallback"),
        }
    }
}

/// Terminal state of one item's fetch
#[derive(Debug)]
pub enum Outcome {
    Succeeded { written_path: PathBuf },
    Failed { error: FetchError },
    /// Both locations were empty; no request was made
    MissingSource,
    Cancelled,
}

impl Outcome {
    pub fn failed(error: FetchError) -> Self {
        Outcome::Failed { error }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn written_path(&self) -> Option<&PathBuf> {
        match self {
            Outcome::Succeeded { written_path } => Some(written_path),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Human-readable rendering, may span several lines
    pub fn description(&self) -> String {
        match self {
            Outcome::Succeeded { .. } => "Done".to_string(),
            Outcome::Failed { error } => format!("Error: {error}"),
            Outcome::MissingSource => "Missing URLs".to_string(),
            Outcome::Cancelled => "Cancelled".to_string(),
        }
    }

    /// Rendering that fits in a single table cell
    pub fn single_line_description(&self) -> String {
        self.description()
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// An input item paired with its final outcome
#[derive(Debug)]
pub struct ItemResult {
    pub item: Item,
    pub outcome: Outcome,
}

impl std::fmt::Display for ItemResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} | {} | ({} | {})] = {}",
            self.item.id, self.item.name, self.item.primary_url, self.item.fallback_url, self.outcome
        )
    }
}

/// Per-outcome counts over a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub missing: usize,
    pub cancelled: usize,
}

/// Results in input order, exactly one per input item
#[derive(Debug, Default)]
pub struct ResultSet {
    results: Vec<ItemResult>,
}

impl ResultSet {
    pub(crate) fn from_results(results: Vec<ItemResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemResult> {
        self.results.iter()
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_succeeded()).count()
    }

    pub fn summary(&self) -> ResultSummary {
        self.results
            .iter()
            .fold(ResultSummary::default(), |mut summary, result| {
                match result.outcome {
                    Outcome::Succeeded { .. } => summary.succeeded += 1,
                    Outcome::Failed { .. } => summary.failed += 1,
                    Outcome::MissingSource => summary.missing += 1,
                    Outcome::Cancelled => summary.cancelled += 1,
                }
                summary
            })
    }
}

impl std::ops::Index<usize> for ResultSet {
    type Output = ItemResult;

    fn index(&self, index: usize) -> &Self::Output {
        &self.results[index]
    }
}

impl IntoIterator for ResultSet {
    type Item = ItemResult;
    type IntoIter = std::vec::IntoIter<ItemResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ItemResult;
    type IntoIter = std::slice::Iter<'a, ItemResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_locations() {
        let item = Item::new("1", "Report", "", "http://fallback/1.pdf");
        assert!(!item.has_no_locations());
        assert_eq!(item.location(Stage::Primary), None);
        assert_eq!(item.location(Stage::Fallback), Some("http://fallback/1.pdf"));
        assert!(Item::new("2", "Empty", "", "").has_no_locations());
    }

    #[test]
    fn outcome_descriptions() {
        let done = Outcome::Succeeded {
            written_path: PathBuf::from("out/1.pdf"),
        };
        assert_eq!(done.description(), "Done");
        assert_eq!(Outcome::MissingSource.description(), "Missing URLs");
        assert_eq!(Outcome::Cancelled.description(), "Cancelled");

        let failed = Outcome::failed(FetchError::NoLocation { stage: Stage::Fallback });
        assert_eq!(failed.description(), "Error: No fallback URL available");
    }

    #[test]
    fn single_line_description_collapses_newlines() {
        let failed = Outcome::failed(FetchError::AllSourcesFailed {
            primary: Box::new(FetchError::UnacceptableStatus {
                url: "http://a/1.pdf".into(),
                status: 404,
            }),
            fallback: Box::new(FetchError::NoLocation { stage: Stage::Fallback }),
        });

        assert!(failed.description().contains('\n'));
        let line = failed.single_line_description();
        assert!(!line.contains('\n'));
        assert_eq!(
            line,
            "Error: all download links were broken:, Status code from 'http://a/1.pdf' was not OK: 404, No fallback URL available"
        );
    }

    #[test]
    fn result_set_summary() {
        let results = ResultSet::from_results(vec![
            ItemResult {
                item: Item::new("a", "A", "http://a", ""),
                outcome: Outcome::Succeeded {
                    written_path: PathBuf::from("a.pdf"),
                },
            },
            ItemResult {
                item: Item::new("b", "B", "", ""),
                outcome: Outcome::MissingSource,
            },
            ItemResult {
                item: Item::new("c", "C", "http://c", ""),
                outcome: Outcome::Cancelled,
            },
        ]);

        assert_eq!(results.len(), 3);
        assert_eq!(results.succeeded_count(), 1);
        assert_eq!(
            results.summary(),
            ResultSummary {
                succeeded: 1,
                failed: 0,
                missing: 1,
                cancelled: 1,
            }
        );
        assert_eq!(results[1].item.id, "b");
        assert_eq!(results[2].to_string(), "[c | C | (http://c | )] = Cancelled");
    }
}
