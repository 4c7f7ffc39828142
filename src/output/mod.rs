//! Output module for crawl summaries
//!
//! Run statistics are collected by the coordinator and printed by the
//! binary once an archive run ends.

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics, SkipReason};
