//! Frontier queue and fetch concurrency limits
//!
//! This module handles:
//! - The FIFO frontier of admitted tasks awaiting dispatch
//! - A global ceiling on fetches in flight
//! - A per-host ceiling so one origin is never flooded

use crate::config::CrawlerConfig;
use crate::crawler::task::CrawlTask;
use crate::http::Request;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A task admitted to the frontier together with the request it will send
#[derive(Debug, Clone)]
pub struct QueuedFetch {
    pub task: CrawlTask,
    pub request: Request,
}

/// Permits held for the duration of one fetch
pub struct FetchPermit {
    _host: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Global and per-host concurrency ceilings
///
/// Cloning is cheap; clones share the same semaphores.
#[derive(Debug, Clone)]
pub struct HostLimiter {
    global: Arc<Semaphore>,
    hosts: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
    per_host: usize,
}

impl HostLimiter {
    pub fn new(global: usize, per_host: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global)),
            hosts: Arc::new(Mutex::new(HashMap::new())),
            per_host,
        }
    }

    /// Waits for a slot on `host` and then a global slot
    ///
    /// The host slot is taken first so tasks queued behind a busy host do
    /// not sit on global slots other hosts could use.
    pub async fn acquire(&self, host: &str) -> Result<FetchPermit, AcquireError> {
        let host_semaphore = {
            let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                hosts
                    .entry(host.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(self.per_host))),
            )
        };

        let host_permit = host_semaphore.acquire_owned().await?;
        let global_permit = Arc::clone(&self.global).acquire_owned().await?;
        Ok(FetchPermit {
            _host: host_permit,
            _global: global_permit,
        })
    }

    /// Global slots currently free
    pub fn available(&self) -> usize {
        self.global.available_permits()
    }

    /// Slots currently free for `host`
    pub fn available_for(&self, host: &str) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .map_or(self.per_host, |semaphore| semaphore.available_permits())
    }
}

/// Scheduler owns the frontier and the concurrency limits
pub struct Scheduler {
    frontier: VecDeque<QueuedFetch>,
    limiter: HostLimiter,
    total_queued: u64,
}

impl Scheduler {
    /// Creates an empty scheduler sized from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            frontier: VecDeque::new(),
            limiter: HostLimiter::new(
                config.max_concurrent_requests as usize,
                config.max_requests_per_host as usize,
            ),
            total_queued: 0,
        }
    }

    /// Adds an admitted task to the back of the frontier
    pub fn push(&mut self, task: CrawlTask, request: Request) {
        self.total_queued += 1;
        self.frontier.push_back(QueuedFetch { task, request });
    }

    /// Takes the oldest task off the frontier
    pub fn pop(&mut self) -> Option<QueuedFetch> {
        self.frontier.pop_front()
    }

    /// Removes every queued task without dispatching it
    pub fn drain(&mut self) -> impl Iterator<Item = QueuedFetch> + '_ {
        self.frontier.drain(..)
    }

    pub fn limiter(&self) -> &HostLimiter {
        &self.limiter
    }

    /// Returns the number of tasks in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Tasks ever pushed, including those already dispatched
    pub fn total_queued(&self) -> u64 {
        self.total_queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    fn create_test_config() -> CrawlerConfig {
        CrawlerConfig {
            max_concurrent_requests: 4,
            max_requests_per_host: 2,
            ..CrawlerConfig::default()
        }
    }

    fn queued(path: &str) -> (CrawlTask, Request) {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        (CrawlTask::seed(url.clone()), Request::get(url))
    }

    #[test]
    fn test_new_scheduler() {
        let scheduler = Scheduler::new(&create_test_config());
        assert_eq!(scheduler.frontier_size(), 0);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.limiter().available(), 4);
    }

    #[test]
    fn test_fifo_order() {
        let mut scheduler = Scheduler::new(&create_test_config());
        for path in ["/a", "/b", "/c"] {
            let (task, request) = queued(path);
            scheduler.push(task, request);
        }

        let order: Vec<String> = std::iter::from_fn(|| scheduler.pop())
            .map(|q| q.task.url.path().to_string())
            .collect();
        assert_eq!(order, vec!["/a", "/b", "/c"]);
        assert_eq!(scheduler.total_queued(), 3);
    }

    #[test]
    fn test_drain() {
        let mut scheduler = Scheduler::new(&create_test_config());
        let (task, request) = queued("/a");
        scheduler.push(task, request);
        assert_eq!(scheduler.drain().count(), 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_per_host_limit() {
        let limiter = HostLimiter::new(4, 2);
        let first = limiter.acquire("example.com").await.unwrap();
        let _second = limiter.acquire("example.com").await.unwrap();
        assert_eq!(limiter.available_for("example.com"), 0);

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire("example.com")).await;
        assert!(blocked.is_err());

        let other = limiter.acquire("other.org").await;
        assert!(other.is_ok());
        assert_eq!(limiter.available(), 1);

        drop(first);
        let unblocked =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire("example.com")).await;
        assert!(unblocked.is_ok());
    }

    #[tokio::test]
    async fn test_global_limit() {
        let limiter = HostLimiter::new(2, 2);
        let _a = limiter.acquire("a.com").await.unwrap();
        let _b = limiter.acquire("b.com").await.unwrap();
        assert_eq!(limiter.available(), 0);

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire("c.com")).await;
        assert!(blocked.is_err());
        assert_eq!(limiter.available_for("c.com"), 2);
    }
}
