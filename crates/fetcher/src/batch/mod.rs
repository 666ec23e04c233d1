//! Concurrent batch fetching
//!
//! Every item gets its own task. The tasks share one HTTP client, one
//! cancellation token and the metrics; everything else they touch is their
//! own. Each task hands back `(index, Outcome)` and the joining side drops it
//! into that index's slot.

pub mod collector;

pub use collector::ResultCollector;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::FetchConfig;
use crate::core::{
    ContentTypeCheck, ExactContentType, FetchError, FetchMetrics, FileOperation, HttpClient, Item, Outcome,
    PdfValidator, ProgressReporter, ProgressSink, Result, ResultSet, Validator, apply_validation,
};
use crate::resolver::Resolver;

/// Batch fetcher: the main entry point
///
/// Owns the shared transport plus the pluggable content check and
/// validator. One `Fetcher` can run any number of batches; each batch gets
/// its own cancellation token.
pub struct Fetcher {
    client: HttpClient,
    config: FetchConfig,
    content_check: Arc<dyn ContentTypeCheck>,
    validator: Arc<dyn Validator>,
    metrics: Arc<FetchMetrics>,
}

impl Fetcher {
    /// Create a fetcher with the default content check and PDF validation
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpClient::from_config(&config)?;
        let content_check = Arc::new(ExactContentType::new(config.expected_content_type.clone()));

        Ok(Self {
            client,
            config,
            content_check,
            validator: Arc::new(PdfValidator::new()),
            metrics: Arc::new(FetchMetrics::default()),
        })
    }

    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_content_check<C: ContentTypeCheck + 'static>(mut self, check: C) -> Self {
        self.content_check = Arc::new(check);
        self
    }

    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get access to built-in metrics
    pub fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }

    /// Where the item at `index` is written
    ///
    /// Path separators and other characters that are unsafe in file names
    /// are replaced; an unusable id falls back to the row number.
    pub fn destination_for(&self, output_dir: &Path, index: usize, item: &Item) -> PathBuf {
        let stem: String = item
            .id
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        let stem = match stem.as_str() {
            "" | "." | ".." => format!("row-{}", index + 1),
            _ => stem,
        };

        output_dir.join(format!("{}.{}", stem, self.config.file_extension))
    }

    /// Destinations for a whole batch, one distinct path per item
    ///
    /// Ids that sanitize to the same name (or repeat outright) would share a
    /// file; every later claimant gets `<stem>-<row>` instead. Names are
    /// compared case-insensitively.
    pub fn destinations_for(&self, output_dir: &Path, items: &[Item]) -> Vec<PathBuf> {
        let mut taken = HashSet::with_capacity(items.len());
        let mut claim = |path: &Path| taken.insert(path.to_string_lossy().to_lowercase());

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let preferred = self.destination_for(output_dir, index, item);
                if claim(&preferred) {
                    return preferred;
                }

                let stem = preferred
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut suffix = index + 1;
                loop {
                    let candidate = output_dir.join(format!("{}-{}.{}", stem, suffix, self.config.file_extension));
                    if claim(&candidate) {
                        debug!("{}: name taken, writing to {}", item.id, candidate.display());
                        return candidate;
                    }
                    suffix += items.len();
                }
            })
            .collect()
    }

    /// Fetch every item into `output_dir` and return one result per item, in input order
    ///
    /// Only a failure to create `output_dir` is returned as an error. Every
    /// per-item problem, cancellation included, is reported in the item's
    /// outcome instead.
    pub async fn fetch_all(
        &self,
        items: Vec<Item>,
        output_dir: &Path,
        cancel: CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<ResultSet> {
        fs::create_dir_all(output_dir)
            .await
            .map_err(|source| FetchError::FileSystem {
                path: output_dir.to_path_buf(),
                operation: FileOperation::CreateDir,
                source,
            })?;

        info!("Fetching {} items into {}", items.len(), output_dir.display());

        let resolver = Resolver::new(self.client.clone(), self.content_check.clone(), cancel, &self.config)
            .with_metrics(self.metrics.clone());
        let limiter = self.config.max_concurrent.map(|limit| Arc::new(Semaphore::new(limit)));

        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::with_capacity(items.len());

        let destinations = self.destinations_for(output_dir, &items);

        for ((index, item), destination) in items.iter().enumerate().zip(destinations) {
            // Sinks are created up front, in input order
            let sink = reporter.track(index, item);
            let resolver = resolver.clone();
            let validator = self.validator.clone();
            let metrics = self.metrics.clone();
            let limiter = limiter.clone();
            let item = item.clone();

            let handle = tasks.spawn(async move {
                metrics.record_started();
                let outcome = fetch_one(&resolver, validator.as_ref(), limiter, &item, &destination, sink.as_ref()).await;
                if let Some(error) = outcome.error() {
                    debug!(category = error.category(), "{}: {}", item.id, error);
                    if matches!(error, FetchError::ValidationFailed { .. }) {
                        metrics.record_validation_failed();
                    }
                }
                metrics.record_outcome(&outcome);
                (index, outcome)
            });
            task_slots.insert(handle.id(), index);
        }

        let mut collector = ResultCollector::new(items.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    collector.fill(index, outcome);
                }
                Err(join_error) => {
                    error!("Fetch task failed: {}", join_error);
                    if let Some(&index) = task_slots.get(&join_error.id()) {
                        let outcome = Outcome::failed(FetchError::TaskFailed {
                            reason: join_error.to_string(),
                        });
                        self.metrics.record_outcome(&outcome);
                        collector.fill(index, outcome);
                    }
                }
            }
        }

        debug!("All {} fetch tasks joined", collector.filled());
        Ok(collector.finish(items))
    }
}

/// Resolve then validate one item, waiting for a pool slot first when the batch is bounded
///
/// The sink is told how the item ended only once the validated outcome is known.
async fn fetch_one(
    resolver: &Resolver,
    validator: &dyn Validator,
    limiter: Option<Arc<Semaphore>>,
    item: &Item,
    destination: &Path,
    sink: &dyn ProgressSink,
) -> Outcome {
    let outcome = resolve_validated(resolver, validator, limiter, item, destination, sink).await;
    match outcome {
        Outcome::Succeeded { .. } => sink.finish(),
        _ => sink.abort(),
    }
    outcome
}

async fn resolve_validated(
    resolver: &Resolver,
    validator: &dyn Validator,
    limiter: Option<Arc<Semaphore>>,
    item: &Item,
    destination: &Path,
    sink: &dyn ProgressSink,
) -> Outcome {
    let _permit = match limiter {
        Some(limiter) if !item.has_no_locations() => {
            tokio::select! {
                biased;
                _ = resolver.cancellation_token().cancelled() => return Outcome::Cancelled,
                permit = limiter.acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(closed) => {
                        return Outcome::failed(FetchError::TaskFailed {
                            reason: closed.to_string(),
                        });
                    }
                },
            }
        }
        _ => None,
    };

    let outcome = resolver.resolve(item, destination, sink).await;
    apply_validation(outcome, validator).await
}
