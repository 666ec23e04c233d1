use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use fetcher::report::{read_items, write_results};
use fetcher::{AcceptAll, CancellationToken, Fetcher, LogProgressReporter, ProgressReporter};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod ui;

use cli::CliArgs;
use ui::ConsoleProgress;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(&args)?;

    let started = Instant::now();
    let config = args.fetch_config().context("Invalid configuration")?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Could not create output directory {}", args.output_dir.display()))?;

    let mut items = read_items(&args.input, &args.column_mapping())
        .with_context(|| format!("Could not read items from {}", args.input.display()))?;
    if let Some(limit) = args.limit {
        debug!("Limiting run to the first {} of {} items", limit, items.len());
        items.truncate(limit);
    }

    let mut fetcher = Fetcher::new(config).context("Could not set up the downloader")?;
    if args.no_validate {
        fetcher = fetcher.with_validator(AcceptAll);
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping downloads");
            interrupt.cancel();
        }
    });

    info!("Downloading {} items into {}", items.len(), args.output_dir.display());
    let console = (!args.no_progress).then(|| ConsoleProgress::new(items.len()));
    let reporter: &dyn ProgressReporter = match &console {
        Some(console) => console,
        None => &LogProgressReporter,
    };
    let results = fetcher
        .fetch_all(items, &args.output_dir, cancel, reporter)
        .await
        .context("Could not start downloads")?;
    if let Some(console) = &console {
        console.finish();
    }

    let report = write_results(&results, &args.output_dir, args.report_format())
        .context("Could not write the download report")?;

    let summary = results.summary();
    debug!("Metrics: {:?}", fetcher.metrics().snapshot());
    println!("Downloaded {} documents.", summary.succeeded);
    if summary.failed + summary.missing + summary.cancelled > 0 {
        println!(
            "{} failed, {} without URLs, {} cancelled.",
            summary.failed, summary.missing, summary.cancelled
        );
    }
    println!("Report written to {}", report.display());
    println!("Took {:.2?}", started.elapsed());

    Ok(())
}

fn init_logging(args: &CliArgs) -> anyhow::Result<()> {
    let level_filter = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("FETCH_LOG")
        .from_env_lossy();

    match &args.log_file {
        // Progress bars own the terminal; logs go to the file untouched
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Could not create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .without_time()
                .init();
        }
    }

    Ok(())
}
