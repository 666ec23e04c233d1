//! Per-item fetch with primary/fallback failover
//!
//! An item moves through `Start -> TryPrimary -> TryFallback` and stops at
//! the first terminal outcome. The primary location is always attempted
//! strictly before the fallback, never alongside it.

use futures::TryStreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::BufWriter;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::core::{
    ContentTypeCheck, CopyError, FetchError, FetchMetrics, FileOperation, HttpClient, Item, Outcome,
    ProgressSink, Result, Stage, assert_acceptable, cancellable_copy,
};

enum State {
    Start,
    TryPrimary,
    TryFallback { primary_error: FetchError },
    Done(Outcome),
}

/// Resolves one item to exactly one `Outcome`
///
/// Cloning is cheap; all clones share the transport, the content check,
/// the cancellation token and the metrics.
#[derive(Clone)]
pub struct Resolver {
    client: HttpClient,
    content_check: Arc<dyn ContentTypeCheck>,
    cancel: CancellationToken,
    metrics: Arc<FetchMetrics>,
    copy_buffer_size: usize,
    remove_partial_files: bool,
}

impl Resolver {
    pub fn new(
        client: HttpClient,
        content_check: Arc<dyn ContentTypeCheck>,
        cancel: CancellationToken,
        config: &FetchConfig,
    ) -> Self {
        Self {
            client,
            content_check,
            cancel,
            metrics: Arc::new(FetchMetrics::default()),
            copy_buffer_size: config.copy_buffer_size,
            remove_partial_files: config.remove_partial_files,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<FetchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetch `item` into `destination`, trying the fallback if the primary fails
    ///
    /// `sink` sees each attempt's size and bytes. Reporting the item as
    /// finished or aborted is left to the caller, which may still validate
    /// the written file.
    pub async fn resolve(&self, item: &Item, destination: &Path, sink: &dyn ProgressSink) -> Outcome {
        let mut state = State::Start;

        loop {
            state = match state {
                State::Start if item.has_no_locations() => {
                    debug!("{}: no URLs, skipping", item.id);
                    State::Done(Outcome::MissingSource)
                }
                State::Start => State::TryPrimary,
                State::TryPrimary => match self.attempt(Stage::Primary, item, destination, sink).await {
                    Ok(()) => State::Done(succeeded(destination)),
                    Err(error) if error.is_cancelled() => State::Done(Outcome::Cancelled),
                    Err(error) if error.allows_fallback() => {
                        warn!("{}: primary failed, trying fallback: {}", item.id, error);
                        State::TryFallback { primary_error: error }
                    }
                    Err(error) => State::Done(Outcome::failed(error)),
                },
                State::TryFallback { primary_error } => {
                    match self.attempt(Stage::Fallback, item, destination, sink).await {
                        Ok(()) => State::Done(succeeded(destination)),
                        Err(error) if error.is_cancelled() => State::Done(Outcome::Cancelled),
                        Err(error) => State::Done(Outcome::failed(FetchError::AllSourcesFailed {
                            primary: Box::new(primary_error),
                            fallback: Box::new(error),
                        })),
                    }
                }
                State::Done(outcome) => {
                    info!("{}: {}", item.id, outcome.single_line_description());
                    return outcome;
                }
            };
        }
    }

    async fn attempt(&self, stage: Stage, item: &Item, destination: &Path, sink: &dyn ProgressSink) -> Result<()> {
        let Some(url) = item.location(stage) else {
            return Err(FetchError::NoLocation { stage });
        };

        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: Some(url.to_string()),
            });
        }

        self.metrics.record_attempt(stage);
        debug!("{}: trying {} URL {}", item.id, stage, url);

        let written = self.fetch_to_file(url, destination, sink).await?;
        self.metrics.record_bytes(written);
        debug!("{}: wrote {} bytes from {} URL", item.id, written, stage);
        Ok(())
    }

    /// One GET, checked before the destination is created, then streamed to disk
    async fn fetch_to_file(&self, url: &str, destination: &Path, sink: &dyn ProgressSink) -> Result<u64> {
        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: Some(url.to_string()) });
            }
            response = self.client.get(url) => response?,
        };

        assert_acceptable(url, &response, self.content_check.as_ref())?;

        let file = fs::File::create(destination)
            .await
            .map_err(|source| FetchError::FileSystem {
                path: destination.to_path_buf(),
                operation: FileOperation::Create,
                source,
            })?;

        sink.set_total(response.content_length());

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(body);
        tokio::pin!(reader);
        let mut writer = BufWriter::new(file);

        let copied = cancellable_copy(&self.cancel, &mut reader, &mut writer, self.copy_buffer_size, sink).await;
        drop(writer);

        let error = match copied {
            Ok(written) => return Ok(written),
            Err(CopyError::Cancelled { written }) => {
                debug!("Cancelled {} after {} bytes", url, written);
                FetchError::Cancelled {
                    url: Some(url.to_string()),
                }
            }
            Err(CopyError::Read(source)) => FetchError::BodyRead {
                url: url.to_string(),
                source,
            },
            Err(CopyError::Write(source)) => FetchError::FileSystem {
                path: destination.to_path_buf(),
                operation: FileOperation::Write,
                source,
            },
        };

        if self.remove_partial_files {
            remove_partial(destination).await;
        }
        Err(error)
    }
}

fn succeeded(destination: &Path) -> Outcome {
    Outcome::Succeeded {
        written_path: destination.to_path_buf(),
    }
}

async fn remove_partial(destination: &Path) {
    match fs::remove_file(destination).await {
        Ok(()) => debug!("Removed partial file {}", destination.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => warn!(
            "{}",
            FetchError::FileSystem {
                path: destination.to_path_buf(),
                operation: FileOperation::Delete,
                source,
            }
        ),
    }
}
