//! Concurrent endpoint discovery engine
//!
//! Drives a deduplicated wordlist through a fixed pool of probing
//! workers against a single target, classifies every response against
//! an accepted-status set, and collects the paths that matched in the
//! order they were discovered.

mod collect;
mod dispatch;
mod session;
mod target;
mod words;

#[cfg(test)]
mod testserver;

pub use session::FuzzSession;
pub use target::{Method, StatusSet, TargetSpec};
pub use words::{WordSource, COMMON_PATHS};

use chrono::{DateTime, Utc};

/// Lifecycle of a fuzzing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Created but not yet started
    Idle,
    /// Workers are pulling candidates and probing
    Running,
    /// Cancellation requested, in-flight probes draining
    Cancelling,
    /// Stopped early; every dispatched probe was recorded
    Cancelled,
    /// Every candidate was dispatched and recorded
    Completed,
    /// A probe worker aborted; partial results remain valid
    Failed,
}

impl SessionStatus {
    /// Terminal states never transition again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Cancelled | SessionStatus::Completed | SessionStatus::Failed
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Cancelling => "cancelling",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of a session's progress counters
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Distinct candidates the session will probe
    pub total_candidates: usize,
    /// Probes that have fully resolved (response or transport error)
    pub dispatched: usize,
    /// Probes whose status matched the accepted set
    pub matched: usize,
    /// Probes that failed at the transport layer
    pub errors: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            total_candidates: 0,
            dispatched: 0,
            matched: 0,
            errors: 0,
            started_at: None,
            finished_at: None,
        }
    }
}

impl SessionState {
    /// Fraction of candidates dispatched so far
    pub fn progress(&self) -> f64 {
        if self.total_candidates == 0 {
            return 0.0;
        }
        self.dispatched as f64 / self.total_candidates as f64
    }

    /// Wall-clock runtime, live until the session reaches a terminal state
    pub fn runtime(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some(end - started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        let state = SessionState::default();
        assert_eq!(state.status, SessionStatus::Idle);
        assert_eq!(state.total_candidates, 0);
        assert_eq!(state.dispatched, 0);
        assert!(state.started_at.is_none());
        assert_eq!(state.progress(), 0.0);
        assert!(state.runtime().is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Idle.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(!SessionStatus::Cancelling.is_terminal());
    }

    #[test]
    fn test_progress_fraction() {
        let state = SessionState {
            total_candidates: 8,
            dispatched: 2,
            ..Default::default()
        };
        assert_eq!(state.progress(), 0.25);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Completed.to_string(), "completed");
        assert_eq!(SessionStatus::Cancelling.to_string(), "cancelling");
    }
}
