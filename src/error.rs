//! Custom error types for alcove
//!
//! Configuration problems caught before a session starts are the only
//! fatal errors. Once probing begins, per-request failures (timeouts,
//! refused connections, DNS) are recorded as data and never abort the
//! run.

use thiserror::Error;

/// Errors that prevent a fuzzing session from being configured or started
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid status code spec '{spec}': {reason}")]
    InvalidStatusSpec { spec: String, reason: String },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Concurrency must be greater than zero")]
    InvalidConcurrency,

    #[error("Request timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Wordlist has no usable entries")]
    EmptyWordlist,

    #[error("Failed to read wordlist: {path}")]
    WordlistRead { path: String, source: std::io::Error },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
