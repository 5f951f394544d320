//! Fast HTTP-only health check: latency, status code, and minimal
//! content sanity. No TLS or DNS extras, no browser.

use std::time::Instant;

use log::warn;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use crate::config::{MAX_RESPONSE_BODY_SIZE, MIN_CONTENT_BYTES};
use crate::error_handling::{categorize_transport_error, ProbeError};
use crate::models::{CheckResult, ErrorCategory, Status};

const ACCEPT_HEADER: &str =
    "text/html,application/json,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP-only probe.
///
/// A failed check is data, not an error: transport failures come back as
/// `status = Down` with a populated `error_category`, content problems
/// as `status = Degraded`. `check` returns `Err` only for
/// programmer-error inputs (malformed URL, unsupported scheme).
pub struct LightweightProbe {
    client: reqwest::Client,
}

impl LightweightProbe {
    /// The client is expected to carry the request timeout, redirect
    /// limit, and User-Agent (see `initialization::init_client`).
    pub fn new(client: reqwest::Client) -> Self {
        LightweightProbe { client }
    }

    /// Issues a GET and evaluates the response.
    ///
    /// Any status below 500 counts as a reachable response (4xx pages
    /// still answer); 5xx is rejected as a server failure. The body is
    /// truncated at `MAX_RESPONSE_BODY_SIZE` to bound memory.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` only for inputs that can never be probed.
    pub async fn check(&self, url: &str) -> Result<CheckResult, ProbeError> {
        let target = parse_target(url)?;
        let start = Instant::now();

        let response = match self
            .client
            .get(target)
            .header(ACCEPT, ACCEPT_HEADER)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return Ok(transport_failure(&error, start)),
        };

        let status_code = response.status();
        if status_code.is_server_error() {
            warn!("{url} answered with server error {status_code}");
            let mut result = CheckResult::new(Status::Down, elapsed_ms(start));
            result.error_message = Some(format!(
                "HTTP {} {}",
                status_code.as_u16(),
                status_code.canonical_reason().unwrap_or("Unknown Status Code")
            ));
            result.error_category = Some(ErrorCategory::ServerError);
            return Ok(result);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match read_capped_body(response).await {
            Ok(body) => body,
            Err(error) => return Ok(transport_failure(&error, start)),
        };

        let mut result = CheckResult::new(Status::Up, elapsed_ms(start));
        result.status_code = Some(status_code.as_u16());
        result.content_length_bytes = Some(body.len());

        if let Some(reason) = validate_content(status_code, &content_type, &body) {
            warn!("{url} failed content validation: {reason}");
            result.downgrade(Status::Degraded);
            result.warning = Some(reason);
        }

        Ok(result)
    }
}

/// Validates a URL before probing. Only http(s) targets with a host are
/// accepted; anything else is a caller bug, not a failed check.
pub(crate) fn parse_target(url: &str) -> Result<Url, ProbeError> {
    let parsed = Url::parse(url).map_err(|source| ProbeError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ProbeError::UnsupportedScheme {
                url: url.to_string(),
                scheme: scheme.to_string(),
            })
        }
    }
    if parsed.host_str().is_none() {
        return Err(ProbeError::MissingHost {
            url: url.to_string(),
        });
    }
    Ok(parsed)
}

/// Reads the response body in chunks, truncating at the configured cap.
pub(crate) async fn read_capped_body(
    mut response: reqwest::Response,
) -> Result<Vec<u8>, reqwest::Error> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_RESPONSE_BODY_SIZE - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn transport_failure(error: &reqwest::Error, start: Instant) -> CheckResult {
    let mut result = CheckResult::new(Status::Down, elapsed_ms(start));
    result.error_message = Some(error.to_string());
    result.error_category = Some(categorize_transport_error(error));
    result
}

/// Returns the first failed validation rule, if any.
///
/// Rules, in order: a 4xx status disallows Up; a body under 200 bytes is
/// treated as an empty page; HTML without a title or body tag is broken.
fn validate_content(status_code: StatusCode, content_type: &str, body: &[u8]) -> Option<String> {
    if status_code.as_u16() >= 400 {
        return Some(format!("HTTP {} status code", status_code.as_u16()));
    }

    let text = String::from_utf8_lossy(body);
    if text.len() < MIN_CONTENT_BYTES {
        return Some(format!("Content too short: {} bytes", text.len()));
    }

    if content_type.contains("html") && !text.contains("<title") && !text.contains("<body") {
        return Some("Missing basic HTML structure".to_string());
    }

    None
}
