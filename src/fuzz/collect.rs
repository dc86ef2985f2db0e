//! Probe results and the finding collector
//!
//! Every resolved probe becomes a `ProbeResult`; the ones that matched
//! the accepted-status set are kept as `Finding`s in the order they
//! were recorded. Persistence replaces the results file atomically so
//! an interrupted run never leaves a truncated file behind.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::fuzz::words::Candidate;

/// Classification of one resolved probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Response status was in the accepted set
    Matched,
    /// Got a response, status not accepted
    NotMatched,
    /// Timeout, refused connection, DNS failure and the like
    TransportError,
}

/// Full record of one dispatched probe
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub url: String,
    /// Response status, `None` for transport errors
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub outcome: Outcome,
    /// Transport error description, when there was no response
    pub error: Option<String>,
}

impl ProbeResult {
    /// Projects a matched probe into a [`Finding`]
    pub fn finding(&self) -> Option<Finding> {
        if self.outcome != Outcome::Matched {
            return None;
        }
        Some(Finding {
            candidate: self.candidate.clone(),
            url: self.url.clone(),
            status: self.status?,
            elapsed: self.elapsed,
        })
    }
}

/// A discovered endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub candidate: Candidate,
    pub url: String,
    pub status: u16,
    pub elapsed: Duration,
}

impl Finding {
    /// One-line record written to the results file
    pub fn to_line(&self) -> String {
        format!("{} [{}]", self.url, self.status)
    }
}

/// Collects probe results and retains the findings.
///
/// `record` is idempotent per candidate: a second result for the same
/// candidate is ignored and counted, since the dispatcher promises to
/// resolve each candidate exactly once.
#[derive(Debug, Default)]
pub struct ResultCollector {
    inner: Mutex<CollectorInner>,
    // serializes snapshot+write+rename across overlapping persist calls
    persist_lock: Mutex<()>,
}

#[derive(Debug, Default)]
struct CollectorInner {
    recorded: HashSet<Candidate>,
    findings: Vec<Finding>,
    duplicates: usize,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one resolved probe
    pub fn record(&self, result: ProbeResult) {
        let finding = result.finding();
        let mut inner = self.inner.lock();
        if !inner.recorded.insert(result.candidate.clone()) {
            inner.duplicates += 1;
            tracing::warn!(candidate = %result.candidate, "duplicate probe result ignored");
            return;
        }
        if result.outcome == Outcome::TransportError {
            tracing::debug!(
                url = %result.url,
                error = result.error.as_deref().unwrap_or("unknown"),
                "probe failed in transit"
            );
        }
        if let Some(finding) = finding {
            inner.findings.push(finding);
        }
    }

    /// Findings so far, in the order they were recorded
    pub fn snapshot(&self) -> Vec<Finding> {
        self.inner.lock().findings.clone()
    }

    /// Distinct candidates recorded so far
    pub fn recorded(&self) -> usize {
        self.inner.lock().recorded.len()
    }

    /// Duplicate results that were ignored
    pub fn duplicates(&self) -> usize {
        self.inner.lock().duplicates
    }

    /// Drops all recorded results and findings
    #[allow(dead_code)]
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.recorded.clear();
        inner.findings.clear();
        inner.duplicates = 0;
    }

    /// Writes the current findings to `path`, one `<url> [<status>]`
    /// line per endpoint.
    ///
    /// The file is written to a temporary sibling and renamed into
    /// place, so readers only ever see a complete file. Concurrent
    /// calls are serialized, with the snapshot taken under the same
    /// guard, so the freshest set always lands last. Safe to call
    /// repeatedly while the session is still running.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let findings = self.snapshot();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }

        let mut contents = String::with_capacity(findings.len() * 64);
        for finding in &findings {
            contents.push_str(&finding.to_line());
            contents.push('\n');
        }

        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move results into {}", path.display()))?;

        tracing::debug!(path = %path.display(), findings = findings.len(), "results persisted");
        Ok(())
    }
}
