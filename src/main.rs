//! alcove - Concurrent HTTP Endpoint Discovery
//!
//! Probes a target web application with paths from a wordlist through a
//! bounded pool of workers and records which ones respond like real
//! endpoints.

mod config;
mod error;
mod fuzz;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::fuzz::{
    FuzzSession, Method, SessionStatus, StatusSet, TargetSpec, WordSource, COMMON_PATHS,
};

/// Concurrent HTTP Endpoint Discovery
#[derive(Parser, Debug)]
#[command(name = "alcove")]
#[command(author, version, about = "Concurrent HTTP endpoint discovery", long_about = None)]
struct Cli {
    /// Target base URL
    #[arg(short, long, env = "ALCOVE_URL")]
    url: Option<String>,

    /// Wordlist file, one path per line
    #[arg(short, long, env = "ALCOVE_WORDLIST")]
    wordlist: Option<PathBuf>,

    /// Results file
    #[arg(short, long, env = "ALCOVE_OUTPUT")]
    output: Option<PathBuf>,

    /// HTTP method for probes
    #[arg(short, long, env = "ALCOVE_METHOD")]
    method: Option<String>,

    /// Accepted status codes, comma separated ("200,204,301-302")
    #[arg(short, long, env = "ALCOVE_STATUS_CODES")]
    status_codes: Option<String>,

    /// Maximum simultaneous in-flight requests
    #[arg(short, long, env = "ALCOVE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(short, long, env = "ALCOVE_TIMEOUT")]
    timeout: Option<u64>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Cookie sent with every probe, "name=value" (repeatable)
    #[arg(long = "cookie")]
    cookies: Vec<String>,

    /// Probe only the wordlist, skip the built-in common paths
    #[arg(long, env = "ALCOVE_NO_COMMON_PATHS")]
    no_common_paths: bool,

    /// Configuration file path
    #[arg(long, env = "ALCOVE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "ALCOVE_LOG_LEVEL")]
    log_level: String,

    /// Generate default configuration and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return generate_default_config();
    }

    // Initialize logging
    init_logging(&cli)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting alcove");

    // Load and validate configuration
    let config = load_config(&cli)?;
    let session = Arc::new(build_session(&config)?);

    // Spawn signal handler
    let signal_session = session.clone();
    tokio::spawn(async move {
        handle_signals(signal_session).await;
    });

    let result = run_session(session, config.output.results_file.clone()).await;

    tracing::info!("alcove shutting down");

    result
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Load configuration with CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(url) = &cli.url {
        config.target.base_url = Some(url.clone());
    }
    if let Some(method) = &cli.method {
        config.target.method = method.clone();
    }
    if let Some(codes) = &cli.status_codes {
        // the comma grammar is handled by StatusSet::parse_list
        config.target.accepted_statuses = vec![codes.clone()];
    }
    if let Some(timeout) = cli.timeout {
        config.target.timeout_secs = timeout;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fuzz.concurrency = concurrency;
    }
    if let Some(wordlist) = &cli.wordlist {
        config.fuzz.wordlist = Some(wordlist.clone());
    }
    if let Some(output) = &cli.output {
        config.output.results_file = output.clone();
    }
    if cli.no_common_paths {
        config.fuzz.include_common_paths = false;
    }

    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Invalid header '{}', expected 'Name: value'", header))?;
        config
            .target
            .headers
            .insert(name.trim().to_string(), value.trim().to_string());
    }
    for cookie in &cli.cookies {
        let (name, value) = cookie
            .split_once('=')
            .with_context(|| format!("Invalid cookie '{}', expected 'name=value'", cookie))?;
        config
            .target
            .cookies
            .insert(name.trim().to_string(), value.trim().to_string());
    }

    Ok(config)
}

/// Build the session from validated configuration
fn build_session(config: &Config) -> Result<FuzzSession> {
    let base_url = config
        .target
        .base_url
        .as_deref()
        .context("No target URL given; pass --url or set target.base_url in the config")?;
    let method: Method = config.target.method.parse()?;
    let accepted = StatusSet::parse_list(&config.target.accepted_statuses.join(","))?;

    let mut builder = TargetSpec::builder(base_url)
        .method(method)
        .accepted(accepted)
        .timeout(Duration::from_secs(config.target.timeout_secs));
    for (name, value) in &config.target.headers {
        builder = builder.header(name, value);
    }
    for (name, value) in &config.target.cookies {
        builder = builder.cookie(name, value);
    }
    let target = builder.build()?;

    let common: &[&str] = if config.fuzz.include_common_paths {
        COMMON_PATHS
    } else {
        &[]
    };
    let words = match &config.fuzz.wordlist {
        Some(path) => WordSource::from_file(path, common)?,
        None => WordSource::new(std::iter::empty::<&str>(), common)?,
    };

    tracing::info!(
        url = base_url,
        method = %target.method(),
        candidates = words.total(),
        concurrency = config.fuzz.concurrency,
        "Session configured"
    );

    Ok(FuzzSession::new(target, words, config.fuzz.concurrency)?)
}

/// Drive the session to completion and write the results file
async fn run_session(session: Arc<FuzzSession>, results_file: PathBuf) -> Result<()> {
    // Periodic progress reports, checkpointing findings as they appear
    let ticker_session = session.clone();
    let ticker_file = results_file.clone();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            let state = ticker_session.status();
            if state.status.is_terminal() {
                break;
            }
            tracing::info!(
                dispatched = state.dispatched,
                total = state.total_candidates,
                matched = state.matched,
                errors = state.errors,
                "{:.0}% probed",
                state.progress() * 100.0
            );
            if state.matched > 0 {
                if let Err(e) = ticker_session.persist(&ticker_file) {
                    tracing::warn!(error = %e, "Checkpoint write failed");
                }
            }
        }
    });

    let state = session.run().await?;
    ticker.abort();

    session
        .persist(&results_file)
        .with_context(|| format!("Failed to write results to {:?}", results_file))?;

    let findings = session.findings();
    println!();
    println!(
        "Session {}: {}/{} paths probed, {} endpoints found, {} transport errors",
        state.status,
        state.dispatched,
        state.total_candidates,
        findings.len(),
        state.errors
    );
    for finding in &findings {
        println!("  {}", finding.to_line());
    }
    if let Some(runtime) = state.runtime() {
        println!(
            "Elapsed: {}.{:03}s",
            runtime.num_seconds(),
            runtime.num_milliseconds() % 1000
        );
    }
    println!("Results written to {}", results_file.display());

    if state.status == SessionStatus::Failed {
        anyhow::bail!("Session failed before resolving every candidate");
    }
    Ok(())
}

/// Generate default configuration file
fn generate_default_config() -> Result<()> {
    println!("{}", Config::default_toml()?);
    Ok(())
}

/// Handle shutdown signals
async fn handle_signals(session: Arc<FuzzSession>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, draining in-flight probes");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, draining in-flight probes");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to register Ctrl+C handler");
        tracing::info!("Received Ctrl+C, draining in-flight probes");
    }

    session.cancel();
}
