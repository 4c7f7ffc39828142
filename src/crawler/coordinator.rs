//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns every piece of mutable crawl state: the frontier,
//! the request history, the archive sink and the run statistics. Fetches
//! run concurrently on the tokio runtime, but their results come back to
//! this one owner, which archives each exchange, extracts resources,
//! filters them and schedules the survivors. The crawl ends when the
//! frontier is empty and no fetch is in flight.

use crate::config::Config;
use crate::crawler::dedup::RequestHistory;
use crate::crawler::extract::{
    extract_css_urls, extract_resources, ResourceKind, ResourceOrigin,
};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::scheduler::{HostLimiter, QueuedFetch, Scheduler};
use crate::crawler::task::{CrawlTask, HandlerKind};
use crate::http::{Request, Response};
use crate::output::{CrawlStatistics, SkipReason};
use crate::state::TaskState;
use crate::url::{is_http, parse_http_url, resolve_reference, AllowList};
use crate::warc::{ArchiveSink, WarcError};
use crate::WarcrawlError;
use scraper::Html;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// `Accept` header sent with every request
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Result of one dispatched task, handed back to the coordinator
struct CompletedFetch {
    task: CrawlTask,
    request: Request,
    outcome: Result<Response, FetchError>,
    state: TaskState,
}

/// Main crawler coordinator structure
pub struct Coordinator<F: Fetcher + 'static> {
    config: Config,
    fetcher: Arc<F>,
    allow_list: AllowList,
    history: RequestHistory,
    scheduler: Scheduler,
    sink: Box<dyn ArchiveSink>,
    stats: CrawlStatistics,
    cancel: CancellationToken,
}

impl<F: Fetcher + 'static> Coordinator<F> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `fetcher` - Capability used for every HTTP exchange
    /// * `sink` - Destination for archived exchanges; the coordinator owns it
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to accept seeds
    /// * `Err(WarcrawlError)` - The allow-list could not be parsed
    pub fn new(
        config: Config,
        fetcher: F,
        sink: Box<dyn ArchiveSink>,
    ) -> Result<Self, WarcrawlError> {
        let allow_list = AllowList::from_patterns(&config.scope.allowed_uris)?;
        let history = RequestHistory::new(config.crawler.fingerprint_headers.clone());
        let scheduler = Scheduler::new(&config.crawler);

        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            allow_list,
            history,
            scheduler,
            sink,
            stats: CrawlStatistics::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the run's cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Admits seed URLs at depth 0
    ///
    /// Seeds are fragment-stripped and deduplicated but not checked against
    /// the allow-list. Unparsable or non-http seeds are skipped with a
    /// warning. Returns the number of seeds admitted.
    pub fn add_seeds<S: AsRef<str>>(&mut self, urls: &[S]) -> usize {
        let mut admitted = 0;
        for raw in urls {
            match parse_http_url(raw.as_ref()) {
                Ok(url) => {
                    if self.schedule(CrawlTask::seed(url)) {
                        admitted += 1;
                    }
                }
                Err(e) => tracing::warn!("Skipping seed {}: {}", raw.as_ref(), e),
            }
        }
        self.stats.seeds += admitted as u64;
        admitted
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    pub fn frontier_size(&self) -> usize {
        self.scheduler.frontier_size()
    }

    /// Runs the crawl to completion
    ///
    /// Returns the run statistics once the frontier is empty and every
    /// fetch has finished, or after cancellation once in-flight fetches
    /// have drained. The sink is closed in both cases. A failed archive
    /// write aborts the run and is returned as an error.
    pub async fn run(mut self) -> Result<CrawlStatistics, WarcrawlError> {
        if self.scheduler.is_empty() {
            self.sink.close()?;
            return Err(WarcrawlError::NoSeeds);
        }

        tracing::info!(
            "Starting crawl with {} seed(s), max depth {}",
            self.stats.seeds,
            self.config.crawler.max_depth
        );

        let cancel = self.cancel.clone();
        let mut cancel_seen = false;
        let mut in_flight: JoinSet<CompletedFetch> = JoinSet::new();

        loop {
            if cancel.is_cancelled() {
                let dropped = self.scheduler.drain().count() as u64;
                self.stats.cancelled += dropped;
            } else {
                while let Some(queued) = self.scheduler.pop() {
                    self.dispatch(&mut in_flight, queued);
                }
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                joined = in_flight.join_next() => joined,
                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    tracing::info!(
                        "Cancellation requested, waiting for {} in-flight fetch(es)",
                        in_flight.len()
                    );
                    continue;
                }
            };

            match joined {
                Some(Ok(completed)) => {
                    if let Err(e) = self.handle_completion(completed) {
                        tracing::error!("Archive write failed, aborting crawl: {}", e);
                        cancel.cancel();
                        in_flight.abort_all();
                        while in_flight.join_next().await.is_some() {}
                        if let Err(close_error) = self.sink.close() {
                            tracing::warn!("Failed to close archive: {}", close_error);
                        }
                        return Err(e.into());
                    }
                }
                Some(Err(join_error)) => {
                    tracing::warn!("Fetch task ended abnormally: {}", join_error);
                    self.stats.record_outcome(TaskState::Failed);
                }
                None => break,
            }
        }

        self.sink.close()?;
        tracing::info!(
            "Crawl finished: {} exchange(s) archived, {} failure(s), {} skipped reference(s)",
            self.stats.archived,
            self.stats.total_failures(),
            self.stats.total_skipped()
        );
        Ok(self.stats)
    }

    fn dispatch(&self, in_flight: &mut JoinSet<CompletedFetch>, queued: QueuedFetch) {
        let fetcher = Arc::clone(&self.fetcher);
        let limiter = self.scheduler.limiter().clone();
        let cancel = self.cancel.clone();
        in_flight.spawn(execute(fetcher, limiter, cancel, queued));
    }

    /// Builds the request sent for `url`, with the default crawl headers
    fn build_request(&self, url: &Url) -> Request {
        Request::get(url.clone())
            .with_header("User-Agent", &self.config.fetch.user_agent)
            .with_header("Accept", DEFAULT_ACCEPT)
            .with_header("Accept-Language", &self.config.fetch.accept_language)
    }

    /// Admits `task` through the request history and queues it
    ///
    /// Returns false when an equivalent request was already scheduled.
    fn schedule(&mut self, task: CrawlTask) -> bool {
        let request = self.build_request(&task.url);
        if !self.history.admit(&request) {
            tracing::trace!("[{}] Already scheduled: {}", task.depth, task.url);
            self.stats.record_skip(SkipReason::Duplicate);
            return false;
        }
        self.stats.scheduled += 1;
        self.scheduler.push(task, request);
        true
    }

    fn handle_completion(&mut self, completed: CompletedFetch) -> Result<(), WarcError> {
        let CompletedFetch {
            task,
            request,
            outcome,
            state,
        } = completed;

        let response = match outcome {
            Ok(response) => response,
            Err(FetchError::Cancelled) => {
                self.stats.cancelled += 1;
                return Ok(());
            }
            Err(error) => {
                tracing::debug!(
                    "[{}] {} {} ({}): {}",
                    task.depth,
                    state,
                    task.url,
                    task.handler,
                    error
                );
                self.stats.record_outcome(state);
                return Ok(());
            }
        };
        self.stats.record_outcome(state);

        self.sink.write_exchange(&request, &response)?;
        self.stats.record_archived(response.body.len());
        tracing::debug!(
            "[{}] Saved {} {} ({})",
            task.depth,
            task.handler,
            task.url,
            response.status
        );

        let redirect_target = response
            .redirect_location()
            .and_then(|location| resolve_reference(&task.url, location));
        if let Some(target) = &redirect_target {
            self.follow_redirect(&task, target.clone());
        }

        match task.handler {
            HandlerKind::Page => self.process_page(&task, &response, redirect_target.as_ref()),
            HandlerKind::Css => {
                let css = String::from_utf8_lossy(&response.body);
                self.collect_css(&task, &css, redirect_target.as_ref());
            }
            HandlerKind::Js | HandlerKind::Media => {}
        }
        Ok(())
    }

    fn follow_redirect(&mut self, task: &CrawlTask, target: Url) {
        if !is_http(&target) {
            tracing::debug!("[{}] Not following non-http redirect to {}", task.depth, target);
            self.stats.record_skip(SkipReason::NotHttp);
            return;
        }
        if task.redirect_hops >= self.config.crawler.max_redirects {
            tracing::warn!(
                "Dropping redirect from {} to {}: more than {} hops",
                task.url,
                target,
                self.config.crawler.max_redirects
            );
            self.stats.redirects_dropped += 1;
            return;
        }

        tracing::debug!("[{}] Following redirect {} -> {}", task.depth, task.url, target);
        if self.schedule(task.redirect_to(target)) {
            self.stats.redirects_followed += 1;
        }
    }

    /// Parses an HTML response and schedules what it references
    ///
    /// Responses without a `text/html` content type are left as archived
    /// media.
    fn process_page(&mut self, task: &CrawlTask, response: &Response, suppress: Option<&Url>) {
        match response.media_type() {
            Some(media_type) if media_type == "text/html" => {}
            other => {
                tracing::debug!(
                    "[{}] {} is {}, treating as media",
                    task.depth,
                    task.url,
                    other.as_deref().unwrap_or("untyped")
                );
                return;
            }
        }

        let html = String::from_utf8_lossy(&response.body);
        let document = Html::parse_document(&html);
        for resource in extract_resources(&document) {
            match resource.origin {
                ResourceOrigin::Link => {
                    let depth = match resource.kind {
                        ResourceKind::Page => task.depth + 1,
                        _ => task.depth,
                    };
                    let handler = HandlerKind::for_resource(resource.kind);
                    self.admit_link(task, &resource.value, depth, handler, suppress);
                }
                ResourceOrigin::InlineCode => {
                    if resource.kind == ResourceKind::Css {
                        self.collect_css(task, &resource.value, suppress);
                    }
                }
            }
        }
    }

    /// Schedules the `url(...)` references of CSS text at the task's depth
    fn collect_css(&mut self, task: &CrawlTask, css: &str, suppress: Option<&Url>) {
        for resource in extract_css_urls(css) {
            self.admit_link(task, &resource.value, task.depth, HandlerKind::Media, suppress);
        }
    }

    /// Applies the link filters in order: depth, scheme, redirect
    /// suppression, scope, then deduplication
    fn admit_link(
        &mut self,
        parent: &CrawlTask,
        reference: &str,
        depth: u32,
        handler: HandlerKind,
        suppress: Option<&Url>,
    ) {
        let Some(url) = resolve_reference(&parent.url, reference) else {
            self.stats.record_skip(SkipReason::Unresolvable);
            return;
        };

        if depth > self.config.crawler.max_depth {
            tracing::debug!("[{}] Ignoring (depth exceeded) {} {}", depth, handler, url);
            self.stats.record_skip(SkipReason::DepthExceeded);
            return;
        }
        if !is_http(&url) {
            tracing::debug!("[{}] Ignoring (not http) {} {}", depth, handler, url);
            self.stats.record_skip(SkipReason::NotHttp);
            return;
        }
        if suppress == Some(&url) {
            tracing::trace!("[{}] Ignoring (redirect target) {}", depth, url);
            self.stats.record_skip(SkipReason::RedirectTarget);
            return;
        }
        if !self.allow_list.allows(&url) {
            tracing::debug!("[{}] Ignoring (out of scope) {} {}", depth, handler, url);
            self.stats.record_skip(SkipReason::OutOfScope);
            return;
        }

        self.schedule(parent.discovered(url, depth, handler));
    }
}

/// Runs one task: waits for its permits, then fetches
///
/// Cancellation while waiting ends the task as `Failed` without touching
/// the network. Once dispatched, a fetch runs until it completes or hits
/// its own timeout.
async fn execute<F: Fetcher>(
    fetcher: Arc<F>,
    limiter: HostLimiter,
    cancel: CancellationToken,
    queued: QueuedFetch,
) -> CompletedFetch {
    let QueuedFetch { task, request } = queued;
    let host = task.host_key();

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = limiter.acquire(&host) => permit.ok(),
    };
    let Some(_permit) = permit else {
        return CompletedFetch {
            task,
            request,
            outcome: Err(FetchError::Cancelled),
            state: advance(TaskState::Pending, TaskState::Failed),
        };
    };

    let state = advance(TaskState::Pending, TaskState::Fetching);
    tracing::trace!("[{}] Fetching {} {}", task.depth, task.handler, task.url);
    let outcome = fetcher.fetch(&request).await;
    let state = match &outcome {
        Ok(_) => advance(state, TaskState::Succeeded),
        Err(error) => advance(state, error.task_state()),
    };

    CompletedFetch {
        task,
        request,
        outcome,
        state,
    }
}

fn advance(state: TaskState, next: TaskState) -> TaskState {
    match state.transition(next) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!("{}", e);
            state
        }
    }
}
