//! Console progress bars

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use fetcher::{Item, ProgressReporter, ProgressSink};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const NAME_WIDTH: usize = 40;

fn overall_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn item_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.blue} {wide_msg} [{bar:30.white/dim}] {bytes}/{total_bytes} {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn truncate_name(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else {
        let head: String = name.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

struct Counters {
    done: AtomicUsize,
    stopped: AtomicUsize,
}

/// One overall bar plus a transient bar for every transfer in flight
pub struct ConsoleProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    counters: Arc<Counters>,
}

impl ConsoleProgress {
    pub fn new(total: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(overall_style());
        overall.enable_steady_tick(Duration::from_millis(100));
        overall.set_message("Starting downloads...");

        Self {
            multi,
            overall,
            counters: Arc::new(Counters {
                done: AtomicUsize::new(0),
                stopped: AtomicUsize::new(0),
            }),
        }
    }

    pub fn finish(&self) {
        self.overall.finish_and_clear();
    }
}

impl ProgressReporter for ConsoleProgress {
    fn track(&self, _index: usize, item: &Item) -> Arc<dyn ProgressSink> {
        let label = if item.name.is_empty() { &item.id } else { &item.name };
        Arc::new(ItemBar {
            multi: self.multi.clone(),
            overall: self.overall.clone(),
            counters: self.counters.clone(),
            label: truncate_name(label, NAME_WIDTH),
            bar: OnceLock::new(),
        })
    }
}

/// Bar for a single item; only shown once its response headers arrive
struct ItemBar {
    multi: MultiProgress,
    overall: ProgressBar,
    counters: Arc<Counters>,
    label: String,
    bar: OnceLock<ProgressBar>,
}

impl ItemBar {
    fn bar(&self) -> &ProgressBar {
        self.bar.get_or_init(|| {
            let bar = self.multi.insert_before(&self.overall, ProgressBar::new(0));
            bar.set_style(item_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar.set_message(self.label.clone());
            bar
        })
    }

    fn complete(&self, counter: &AtomicUsize) {
        if let Some(bar) = self.bar.get() {
            bar.finish_and_clear();
        }
        counter.fetch_add(1, Ordering::Relaxed);
        self.overall.inc(1);
        self.overall.set_message(format!(
            "{} done, {} not downloaded",
            self.counters.done.load(Ordering::Relaxed),
            self.counters.stopped.load(Ordering::Relaxed)
        ));
    }
}

impl ProgressSink for ItemBar {
    fn set_total(&self, total: Option<u64>) {
        let bar = self.bar();
        bar.set_position(0);
        bar.set_length(total.unwrap_or(0));
    }

    fn on_bytes_transferred(&self, bytes: u64) {
        self.bar().inc(bytes);
    }

    fn finish(&self) {
        self.complete(&self.counters.done);
    }

    fn abort(&self) {
        self.complete(&self.counters.stopped);
    }
}
