//! State module for tracking crawl progress
//!
//! `TaskState` follows a single crawl task from queueing to its terminal
//! outcome.

mod task_state;

pub use task_state::TaskState;
