//! Session orchestration
//!
//! A `FuzzSession` owns one word source, one dispatcher and one
//! collector, and runs them to a terminal state. Sessions are
//! single-shot: build a new one to probe again.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::error::ConfigError;
use crate::fuzz::collect::{Finding, ResultCollector};
use crate::fuzz::dispatch::RequestDispatcher;
use crate::fuzz::target::TargetSpec;
use crate::fuzz::words::WordSource;
use crate::fuzz::SessionState;

/// One endpoint-discovery run against one target
pub struct FuzzSession {
    dispatcher: Arc<RequestDispatcher>,
    words: Arc<WordSource>,
    collector: Arc<ResultCollector>,
    started: AtomicBool,
}

impl FuzzSession {
    pub fn new(
        target: TargetSpec,
        words: WordSource,
        concurrency: usize,
    ) -> Result<Self, ConfigError> {
        let dispatcher = Arc::new(RequestDispatcher::new(Arc::new(target), concurrency)?);
        Ok(Self {
            dispatcher,
            words: Arc::new(words),
            collector: Arc::new(ResultCollector::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Probes every candidate and returns the terminal state.
    ///
    /// Errors only if the session was already started; probe failures
    /// and cancellation are reported through the returned state, with
    /// the findings collected either way.
    pub async fn run(&self) -> Result<SessionState> {
        if self.started.swap(true, Ordering::SeqCst) {
            bail!("Session already started");
        }

        tracing::info!(candidates = self.words.total(), "fuzzing session started");
        let collector = self.collector.clone();
        let state = self
            .dispatcher
            .run(self.words.clone(), move |result| collector.record(result))
            .await;
        if self.collector.recorded() != state.dispatched {
            // every dispatched probe must have reached the collector
            tracing::warn!(
                dispatched = state.dispatched,
                recorded = self.collector.recorded(),
                "dispatched and recorded counts disagree"
            );
        }
        tracing::info!(
            status = %state.status,
            dispatched = state.dispatched,
            matched = state.matched,
            errors = state.errors,
            duplicates = self.collector.duplicates(),
            "fuzzing session finished"
        );
        Ok(state)
    }

    /// Live progress snapshot, callable from any task
    pub fn status(&self) -> SessionState {
        self.dispatcher.state()
    }

    /// Requests cancellation; in-flight probes drain first.
    /// Idempotent, and a no-op once the session is terminal.
    pub fn cancel(&self) {
        self.dispatcher.cancel();
    }

    /// Findings recorded so far, in discovery order
    pub fn findings(&self) -> Vec<Finding> {
        self.collector.snapshot()
    }

    /// Writes the findings file; safe to call mid-run
    pub fn persist(&self, path: &Path) -> Result<()> {
        self.collector.persist(path)
    }
}
