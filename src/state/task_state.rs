/// Task state definitions for tracking a single fetch attempt
///
/// A crawl task lives exactly as long as one fetch: it is pending while it
/// waits for a dispatch slot, fetching while the request is on the wire, and
/// ends in one of three terminal states.
use crate::WarcrawlError;
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is queued, waiting for a global and per-host slot
    Pending,

    /// Request has been sent and the response is being read
    Fetching,

    // ===== Terminal States =====
    /// A response was received in full
    Succeeded,

    /// Network error, oversize body, or cancellation before dispatch
    Failed,

    /// The per-request timeout elapsed
    TimedOut,
}

impl TaskState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the task may still make progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Fetching)
    }

    /// Returns true if the fetch produced a response
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Checks whether moving from `self` to `next` is allowed
    ///
    /// `Pending` may go to `Fetching`, or straight to `Failed` when the run
    /// is cancelled before dispatch. `Fetching` may end in any terminal
    /// state. Terminal states never change.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Pending, Self::Failed)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetching, Self::TimedOut)
        )
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(self, next: TaskState) -> Result<TaskState, WarcrawlError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(WarcrawlError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Stable lowercase name, used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Parses the name produced by [`TaskState::as_str`]
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fetching" => Some(Self::Fetching),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "timed_out" => Some(Self::TimedOut),
            _ => None,
        }
    }

    /// Returns all possible task states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Succeeded,
            Self::Failed,
            Self::TimedOut,
        ]
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Fetching.is_terminal());

        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::TimedOut.is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(TaskState::Succeeded.is_success());
        assert!(!TaskState::Failed.is_success());
        assert!(!TaskState::TimedOut.is_success());
        assert!(!TaskState::Pending.is_success());
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = TaskState::Pending;
        let state = state.transition(TaskState::Fetching).unwrap();
        let state = state.transition(TaskState::Succeeded).unwrap();
        assert_eq!(state, TaskState::Succeeded);
    }

    #[test]
    fn test_failure_transitions() {
        assert!(TaskState::Fetching.can_transition_to(TaskState::Failed));
        assert!(TaskState::Fetching.can_transition_to(TaskState::TimedOut));
        assert!(TaskState::Pending.can_transition_to(TaskState::Failed));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!TaskState::Pending.can_transition_to(TaskState::Succeeded));
        assert!(!TaskState::Pending.can_transition_to(TaskState::TimedOut));
        assert!(!TaskState::Succeeded.can_transition_to(TaskState::Fetching));
        assert!(!TaskState::Failed.can_transition_to(TaskState::Pending));

        let err = TaskState::TimedOut
            .transition(TaskState::Fetching)
            .unwrap_err();
        assert!(matches!(
            err,
            WarcrawlError::InvalidTransition {
                from: TaskState::TimedOut,
                to: TaskState::Fetching
            }
        ));
    }

    #[test]
    fn test_roundtrip_name() {
        for state in TaskState::all_states() {
            assert_eq!(TaskState::from_name(state.as_str()), Some(state));
        }
        assert_eq!(TaskState::from_name("invalid"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TaskState::Pending), "pending");
        assert_eq!(format!("{}", TaskState::TimedOut), "timed_out");
    }
}
