use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::models::ErrorCategory;

/// Programmer-error conditions that a probe refuses to evaluate.
///
/// Everything else (unreachable hosts, bad certificates, broken pages)
/// is a normal failed check and lands inside the returned `CheckResult`
/// instead.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The target string is not a URL at all.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The URL parsed but is not an http(s) target.
    #[error("unsupported URL scheme {scheme:?} for {url}")]
    UnsupportedScheme { url: String, scheme: String },

    /// The URL has no host component to probe.
    #[error("URL has no host: {url}")]
    MissingHost { url: String },
}

/// Classifies a failed `reqwest` request into an `ErrorCategory`.
///
/// Status-bearing errors map to server/client classes. For network-level
/// errors the category is recovered from the error's source chain:
/// reqwest wraps hyper and io errors several layers deep, so the chain is
/// walked looking for `io::ErrorKind` values and the resolver/TLS wording
/// the underlying stack produces.
pub fn categorize_transport_error(error: &reqwest::Error) -> ErrorCategory {
    if let Some(status) = error.status() {
        if status.is_server_error() {
            return ErrorCategory::ServerError;
        }
        if status.is_client_error() {
            return ErrorCategory::ClientError;
        }
    }

    if error.is_timeout() {
        return ErrorCategory::Timeout;
    }

    categorize_source_chain(error).unwrap_or(ErrorCategory::UnknownError)
}

/// Walks an error's source chain for a recognizable failure cause.
///
/// Separate from `categorize_transport_error` so the chain logic is
/// testable with hand-built errors.
pub(crate) fn categorize_source_chain(
    error: &(dyn StdError + 'static),
) -> Option<ErrorCategory> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            match io_error.kind() {
                io::ErrorKind::ConnectionRefused => return Some(ErrorCategory::ConnectionRefused),
                io::ErrorKind::TimedOut => return Some(ErrorCategory::Timeout),
                _ => {}
            }
        }

        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
        {
            return Some(ErrorCategory::DnsError);
        }
        if text.contains("connection refused") {
            return Some(ErrorCategory::ConnectionRefused);
        }
        if text.contains("certificate") {
            if text.contains("expired") {
                return Some(ErrorCategory::SslExpired);
            }
            return Some(ErrorCategory::SslInvalid);
        }

        source = cause.source();
    }
    None
}
