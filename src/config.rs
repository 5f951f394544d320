use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::models::Tier;

// Network operation timeouts
/// Per-request HTTP timeout in seconds (covers the whole request,
/// including body download)
pub const HTTP_TIMEOUT_SECS: u64 = 10;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// TLS handshake timeout in seconds
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 5;
/// DNS query timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 10;

// Redirect handling
/// Maximum number of redirects followed per request
pub const MAX_REDIRECTS: usize = 5;

// Response and body size limits
/// Maximum response body size in bytes (10MB)
/// Bodies are read in chunks and truncated at this cap.
pub const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

// Content validation
/// Minimum decoded body length in bytes; anything shorter is treated as
/// an empty page
pub const MIN_CONTENT_BYTES: usize = 200;

// Page classification
/// Pages longer than this (in characters) with real text structure are
/// considered content-rich
pub const CONTENT_RICH_MIN_CHARS: usize = 3000;

// Detection cache
/// How long an auto-detected tier is trusted before re-detection
pub const DETECTION_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// Certificate expiry
/// Warn when the certificate expires within this many days
pub const SSL_EXPIRY_WARNING_DAYS: i64 = 30;

// DNS latency
/// Resolution slower than this (milliseconds) produces a warning
pub const SLOW_DNS_THRESHOLD_MS: u64 = 2000;

// Queue pacing
/// Pause between low-priority tasks while more remain queued
pub const DRAIN_PAUSE: Duration = Duration::from_secs(2);

/// Default User-Agent string for HTTP requests.
///
/// Can be overridden via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str = "site-patrol/0.1";

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: human-readable format (default)
/// - `Json`: one JSON object per line for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Which execution lane a patrol run submits its checks to.
///
/// `High` mimics interactive callers (unthrottled, concurrent); `Low`
/// mimics scheduled patrol work (strictly serial, paced).
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Lane {
    High,
    Low,
}

/// Command-line options and configuration.
///
/// All options have defaults and can be overridden via flags.
///
/// # Examples
///
/// ```bash
/// # Patrol a list of URLs with auto-detected tiers
/// site_patrol urls.txt
///
/// # Force the standard tier and require a keyword on every page
/// site_patrol urls.txt --tier standard --keyword "Add to cart"
///
/// # Run as interactive (unqueued) checks
/// site_patrol urls.txt --lane high
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "site_patrol",
    about = "Checks a list of URLs for availability, performance, and content correctness."
)]
pub struct Config {
    /// File with one URL per line (blank lines and # comments skipped)
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Declared check tier for every URL in the file
    #[arg(long, value_enum, default_value_t = Tier::Auto)]
    pub tier: Tier,

    /// Required substring on checked pages; repeat for several keywords
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// Execution lane: high (interactive, concurrent) or low (serial batch)
    #[arg(long, value_enum, default_value_t = Lane::Low)]
    pub lane: Lane,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}
