//! Bounded-concurrency request dispatch
//!
//! A fixed pool of workers pulls candidates from the shared word
//! source, probes each one, and reports every resolved probe through a
//! caller-supplied callback. Admission control is the pool size itself:
//! at most `concurrency` requests are ever in flight, with no retries
//! and no pacing beyond that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::ConfigError;
use crate::fuzz::collect::{Outcome, ProbeResult};
use crate::fuzz::target::TargetSpec;
use crate::fuzz::words::{Candidate, WordSource};
use crate::fuzz::{SessionState, SessionStatus};

/// The probing engine for one target
pub struct RequestDispatcher {
    target: Arc<TargetSpec>,
    concurrency: usize,
    client: reqwest::Client,
    state: Arc<RwLock<SessionState>>,
    cancel: Arc<AtomicBool>,
}

impl RequestDispatcher {
    /// Builds the dispatcher and its HTTP client.
    ///
    /// Redirects are never followed, so 301/302 responses classify as
    /// themselves instead of as their destination.
    pub fn new(target: Arc<TargetSpec>, concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        let client = reqwest::Client::builder()
            .timeout(target.timeout())
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("alcove/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            target,
            concurrency,
            client,
            state: Arc::new(RwLock::new(SessionState::default())),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Snapshot of the live session state
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Requests cooperative cancellation.
    ///
    /// Workers stop pulling new candidates; probes already in flight
    /// drain and are recorded normally. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        let mut state = self.state.write();
        if state.status == SessionStatus::Running {
            state.status = SessionStatus::Cancelling;
        }
    }

    /// Probes every candidate and drives the session to a terminal
    /// state. `on_result` is invoked once per resolved probe, from
    /// worker context.
    pub async fn run<F>(&self, words: Arc<WordSource>, on_result: F) -> SessionState
    where
        F: Fn(ProbeResult) + Send + Sync + 'static,
    {
        {
            let mut state = self.state.write();
            state.status = SessionStatus::Running;
            state.total_candidates = words.total();
            state.started_at = Some(Utc::now());
        }
        tracing::debug!(
            host = self.target.host(),
            workers = self.concurrency,
            candidates = words.total(),
            "dispatch started"
        );

        let on_result = Arc::new(on_result);
        let mut workers = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let words = words.clone();
            let target = self.target.clone();
            let client = self.client.clone();
            let state = self.state.clone();
            let cancel = self.cancel.clone();
            let on_result = on_result.clone();

            workers.push(tokio::spawn(async move {
                while !cancel.load(Ordering::SeqCst) {
                    let Some(candidate) = words.next_candidate() else {
                        break;
                    };
                    let result = probe(&client, &target, candidate).await;
                    {
                        let mut state = state.write();
                        state.dispatched += 1;
                        match result.outcome {
                            Outcome::Matched => state.matched += 1,
                            Outcome::TransportError => state.errors += 1,
                            Outcome::NotMatched => {}
                        }
                    }
                    on_result(result);
                }
            }));
        }

        let mut failed = false;
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "probe worker aborted");
                failed = true;
            }
        }

        let mut state = self.state.write();
        state.status = if failed {
            SessionStatus::Failed
        } else if self.cancel.load(Ordering::SeqCst) {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        state.finished_at = Some(Utc::now());
        state.clone()
    }
}

/// Issues one request and classifies the response
async fn probe(client: &reqwest::Client, target: &TargetSpec, candidate: Candidate) -> ProbeResult {
    let url = target.url_for(&candidate);
    let mut request = client.request(target.method().to_reqwest(), url.as_str());
    for (name, value) in target.headers() {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(cookie) = target.cookie_header() {
        request = request.header(reqwest::header::COOKIE, cookie);
    }

    let started = Instant::now();
    match request.send().await {
        Ok(response) => {
            let elapsed = started.elapsed();
            let status = response.status().as_u16();
            let outcome = if target.accepted().contains(status) {
                Outcome::Matched
            } else {
                Outcome::NotMatched
            };
            match outcome {
                Outcome::Matched => {
                    tracing::info!(%url, status, elapsed_ms = elapsed.as_millis() as u64, "endpoint found");
                }
                _ => {
                    tracing::debug!(%url, status, "no match");
                }
            }
            ProbeResult {
                candidate,
                url,
                status: Some(status),
                elapsed,
                outcome,
                error: None,
            }
        }
        Err(e) => {
            let elapsed = started.elapsed();
            ProbeResult {
                candidate,
                url,
                status: None,
                elapsed,
                outcome: Outcome::TransportError,
                error: Some(e.to_string()),
            }
        }
    }
}
