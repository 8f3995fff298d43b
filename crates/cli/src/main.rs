mod cli;
mod config;
mod provider;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use fontreq_core::{FontProvider, FontRequest, FontStyle, LoaderConfig};
use fontreq_loader::{FetchTimeout, LoadResult, Loader, LoopThread, Subscriber};

use crate::cli::{CliArgs, LoadMode};
use crate::provider::DirectoryProvider;

/// How long async mode waits for all callbacks before giving up.
const ASYNC_GRACE: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = config::load(args.config.as_deref()).context("failed to load configuration")?;
    config.log_summary();

    let provider: Arc<dyn FontProvider> = Arc::new(DirectoryProvider::new(&args.font_dir));
    let timeout = resolve_timeout(args.timeout_ms, &config);
    let loader = Loader::new(provider, config);
    info!(dir = %args.font_dir.display(), queries = args.queries.len(), "loading fonts");

    let requests: Vec<FontRequest> = args
        .queries
        .iter()
        .map(|q| FontRequest::new(&args.authority, &args.package, q))
        .collect();

    match args.mode {
        LoadMode::Blocking => run_blocking(&loader, &requests, args.style, timeout, args.repeat),
        LoadMode::Async => run_async(&loader, &requests, args.style, args.repeat)?,
    }

    let stats = loader.stats();
    println!(
        "cache: {} hits, {} misses, {}/{} entries ({:.0}% hit rate)",
        stats.hits,
        stats.misses,
        stats.len,
        stats.capacity,
        stats.hit_rate() * 100.0
    );
    Ok(())
}

fn resolve_timeout(timeout_ms: Option<u64>, config: &LoaderConfig) -> FetchTimeout {
    match timeout_ms {
        Some(0) => FetchTimeout::Infinite,
        Some(ms) => FetchTimeout::After(Duration::from_millis(ms)),
        None => FetchTimeout::After(config.default_timeout()),
    }
}

fn run_blocking(loader: &Loader, requests: &[FontRequest], style: FontStyle, timeout: FetchTimeout, repeat: usize) {
    for _ in 0..repeat {
        for request in requests {
            let result = loader.load_blocking(request, style, timeout);
            report(&request.query, &result);
        }
    }
}

fn run_async(loader: &Loader, requests: &[FontRequest], style: FontStyle, repeat: usize) -> Result<()> {
    let origin = LoopThread::spawn("fontreq-main").context("failed to start callback thread")?;
    let (done_tx, done_rx) = crossbeam_channel::unbounded();

    let mut expected = 0;
    for _ in 0..repeat {
        for request in requests {
            let query = request.query.clone();
            let done = done_tx.clone();
            let subscriber = Subscriber::new(origin.clone(), move |result: LoadResult| {
                report(&query, &result);
                let _ = done.send(());
            });
            // Submission failures are also delivered to the subscriber.
            let _ = loader.request_font(request, style, subscriber);
            expected += 1;
        }
    }

    for received in 0..expected {
        if done_rx.recv_timeout(ASYNC_GRACE).is_err() {
            bail!("only {received} of {expected} font loads completed");
        }
    }
    Ok(())
}

fn report(query: &str, result: &LoadResult) {
    match result {
        Ok(typeface) => println!(
            "{query}: ok ({}, {:?}, {} bytes)",
            typeface.sources().first().map(|s| s.uri.as_str()).unwrap_or("-"),
            typeface.style(),
            typeface.data().len()
        ),
        Err(e) => println!("{query}: failed [{}] {e}", e.code()),
    }
}
