//! Progress tracking for in-flight fetches
//!
//! Sinks are purely observational: nothing a sink does can change how a
//! fetch proceeds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::Item;

/// Receives progress for a single item
pub trait ProgressSink: Send + Sync {
    /// Called at the start of every attempt's body, `None` for chunked bodies
    ///
    /// Bytes reported before this call belong to an abandoned attempt and
    /// should no longer be counted.
    fn set_total(&self, _total: Option<u64>) {}
    fn on_bytes_transferred(&self, _bytes: u64) {}
    /// The item finished with a written file
    fn finish(&self) {}
    /// The item ended as failed, cancelled or missing
    fn abort(&self) {}
}

/// Creates one sink per item before the item's task is started
pub trait ProgressReporter: Send + Sync {
    fn track(&self, index: usize, item: &Item) -> Arc<dyn ProgressSink>;
}

/// Sink that does nothing
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn track(&self, _index: usize, _item: &Item) -> Arc<dyn ProgressSink> {
        Arc::new(NullSink)
    }
}

/// Reporter that turns progress into `tracing` events
#[derive(Debug, Default)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn track(&self, _index: usize, item: &Item) -> Arc<dyn ProgressSink> {
        Arc::new(LogSink {
            id: item.id.clone(),
            transferred: AtomicU64::new(0),
        })
    }
}

#[derive(Debug)]
struct LogSink {
    id: String,
    transferred: AtomicU64,
}

impl ProgressSink for LogSink {
    fn set_total(&self, total: Option<u64>) {
        self.transferred.store(0, Ordering::Relaxed);
        match total {
            Some(size) => debug!("{}: expecting {} bytes", self.id, size),
            None => debug!("{}: size unknown", self.id),
        }
    }

    fn on_bytes_transferred(&self, bytes: u64) {
        self.transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    fn finish(&self) {
        info!("{}: finished ({} bytes)", self.id, self.transferred.load(Ordering::Relaxed));
    }

    fn abort(&self) {
        info!("{}: stopped after {} bytes", self.id, self.transferred.load(Ordering::Relaxed));
    }
}
