//! Crawler module for fetching and archiving pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching without automatic redirects or decompression
//! - Resource extraction from HTML and CSS
//! - Request deduplication and per-host concurrency limits
//! - Overall crawl coordination

mod cache;
mod coordinator;
mod dedup;
mod extract;
mod fetcher;
mod scheduler;
mod task;

pub use cache::{CachedFetcher, DEFAULT_CACHE_DIR};
pub use coordinator::{Coordinator, DEFAULT_ACCEPT};
pub use dedup::{RequestFingerprint, RequestHistory};
pub use extract::{extract_css_urls, extract_resources, Resource, ResourceKind, ResourceOrigin};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use scheduler::{FetchPermit, HostLimiter, QueuedFetch, Scheduler};
pub use task::{CrawlTask, HandlerKind};

use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::url::parse_http_url;
use crate::warc::WarcWriter;
use crate::WarcrawlError;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Runs a complete archive operation
///
/// This is the main entry point for an archive run. It will:
/// 1. Check that at least one seed is an http(s) URL, then create the
///    output WARC and write its warcinfo record
/// 2. Build the HTTP client, wrapped in the response cache when configured
/// 3. Admit the seeds
/// 4. Crawl until the frontier drains or `cancel` fires
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `seeds` - Seed URLs, fetched at depth 0
/// * `output` - Path of the WARC file to create
/// * `cancel` - Stops the run when cancelled
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - The crawl ran to completion or was cancelled
/// * `Err(WarcrawlError)` - No usable seeds, or the archive could not be written
pub async fn crawl<S: AsRef<str>>(
    config: Config,
    seeds: &[S],
    output: &Path,
    cancel: CancellationToken,
) -> Result<CrawlStatistics, WarcrawlError> {
    // An existing archive is only truncated once there is something to crawl
    if !seeds.iter().any(|seed| parse_http_url(seed.as_ref()).is_ok()) {
        tracing::error!("None of the {} seed URL(s) is a valid http(s) URL", seeds.len());
        return Err(WarcrawlError::NoSeeds);
    }

    let writer = WarcWriter::create(output)?;
    tracing::info!("Writing archive to {}", output.display());

    let fetcher = HttpFetcher::new(&config.fetch)?;
    match config.fetch.cache_dir.clone() {
        Some(dir) => {
            let fingerprint_headers = config.crawler.fingerprint_headers.clone();
            let cached = CachedFetcher::new(fetcher, &dir, fingerprint_headers)?;
            tracing::info!("Using response cache in {}", dir);
            run_with(config, cached, writer, seeds, cancel).await
        }
        None => run_with(config, fetcher, writer, seeds, cancel).await,
    }
}

async fn run_with<F, S>(
    config: Config,
    fetcher: F,
    writer: WarcWriter<std::io::BufWriter<std::fs::File>>,
    seeds: &[S],
    cancel: CancellationToken,
) -> Result<CrawlStatistics, WarcrawlError>
where
    F: Fetcher + 'static,
    S: AsRef<str>,
{
    let mut coordinator =
        Coordinator::new(config, fetcher, Box::new(writer))?.with_cancellation(cancel);
    coordinator.add_seeds(seeds);
    coordinator.run().await
}
