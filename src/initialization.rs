//! Process-level wiring: logger, crypto provider, HTTP client, resolver.

use std::io::Write;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::config::{
    LogFormat, DNS_TIMEOUT_SECS, HTTP_TIMEOUT_SECS, MAX_REDIRECTS, TCP_CONNECT_TIMEOUT_SECS,
};

/// Initializes the logger at the given level and format.
///
/// The JSON format writes one object per line with timestamp, level,
/// target, and message, for downstream log collectors.
///
/// # Errors
///
/// Returns an error if a logger is already installed.
pub fn init_logger_with(
    level: log::LevelFilter,
    format: LogFormat,
) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    if let LogFormat::Json = format {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "ts": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    }

    builder.try_init()
}

/// Installs the process-wide rustls crypto provider.
///
/// Safe to call more than once; repeat installs are ignored.
pub fn init_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Builds the HTTP client used by every probe and by tier detection.
///
/// Carries the request timeout, a separate TCP connect timeout, the
/// redirect limit, and the User-Agent. Cheap to clone; all clones share
/// one connection pool.
///
/// # Errors
///
/// Returns an error if the client cannot be constructed.
pub fn init_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(user_agent)
        .build()
}

/// Builds the DNS resolver from the system configuration, falling back
/// to public defaults when the system configuration is unreadable.
pub fn init_resolver() -> TokioAsyncResolver {
    match TokioAsyncResolver::tokio_from_system_conf() {
        Ok(resolver) => resolver,
        Err(e) => {
            log::warn!("Failed to read system resolver configuration, using defaults: {e}");
            let mut opts = ResolverOpts::default();
            opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
            TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
        }
    }
}
