//! Statistics collected during a crawl run
//!
//! The coordinator updates one [`CrawlStatistics`] as tasks finish and
//! links are filtered; the binary prints it when the run ends.

use crate::state::TaskState;
use std::collections::HashMap;
use std::fmt;

/// Why a discovered reference was not scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Could not be resolved to a URL
    Unresolvable,
    /// Would exceed the maximum depth
    DepthExceeded,
    /// Not an http(s) URL
    NotHttp,
    /// Equal to the redirect target of the same response
    RedirectTarget,
    /// Outside the allow-list
    OutOfScope,
    /// An equivalent request was already scheduled
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolvable => "unresolvable",
            Self::DepthExceeded => "depth exceeded",
            Self::NotHttp => "not http",
            Self::RedirectTarget => "redirect target",
            Self::OutOfScope => "out of scope",
            Self::Duplicate => "duplicate",
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::Unresolvable,
            Self::DepthExceeded,
            Self::NotHttp,
            Self::RedirectTarget,
            Self::OutOfScope,
            Self::Duplicate,
        ]
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Seeds admitted to the frontier
    pub seeds: u64,

    /// Tasks admitted to the frontier, seeds included
    pub scheduled: u64,

    /// Exchanges written to the archive
    pub archived: u64,

    /// Response body bytes written to the archive
    pub archived_bytes: u64,

    /// Finished fetches by terminal state
    pub tasks_by_state: HashMap<TaskState, u64>,

    /// Tasks dropped because the run was cancelled
    pub cancelled: u64,

    /// Discovered references not scheduled, by reason
    pub skipped: HashMap<SkipReason, u64>,

    /// Redirect follow-ups scheduled
    pub redirects_followed: u64,

    /// Redirects dropped at the hop ceiling
    pub redirects_dropped: u64,
}

impl CrawlStatistics {
    pub fn record_outcome(&mut self, state: TaskState) {
        *self.tasks_by_state.entry(state).or_insert(0) += 1;
    }

    pub fn record_archived(&mut self, body_bytes: usize) {
        self.archived += 1;
        self.archived_bytes += body_bytes as u64;
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    /// Fetches that ended in `state`
    pub fn finished(&self, state: TaskState) -> u64 {
        self.tasks_by_state.get(&state).copied().unwrap_or(0)
    }

    pub fn skipped(&self, reason: SkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    /// Fetches that ended without a response
    pub fn total_failures(&self) -> u64 {
        self.finished(TaskState::Failed) + self.finished(TaskState::TimedOut)
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seeds: {}", stats.seeds);
    println!("  Requests scheduled: {}", stats.scheduled);
    println!(
        "  Exchanges archived: {} ({} body bytes)",
        stats.archived, stats.archived_bytes
    );
    println!();

    println!("Fetches by State:");
    for state in [TaskState::Succeeded, TaskState::Failed, TaskState::TimedOut] {
        println!("  {}: {}", state, stats.finished(state));
    }
    if stats.cancelled > 0 {
        println!("  cancelled: {}", stats.cancelled);
    }
    println!();

    if stats.redirects_followed > 0 || stats.redirects_dropped > 0 {
        println!("Redirects:");
        println!("  followed: {}", stats.redirects_followed);
        println!("  dropped at hop limit: {}", stats.redirects_dropped);
        println!();
    }

    if stats.total_skipped() > 0 {
        println!("Skipped References:");
        for reason in SkipReason::all() {
            let count = stats.skipped(reason);
            if count > 0 {
                println!("  {}: {}", reason, count);
            }
        }
        println!();
    }

    let finished: u64 = stats.tasks_by_state.values().sum();
    let success_rate = if finished > 0 {
        (stats.finished(TaskState::Succeeded) as f64 / finished as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} fetches)",
        success_rate,
        stats.finished(TaskState::Succeeded),
        finished
    );
}
