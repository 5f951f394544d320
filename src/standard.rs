//! Enhanced probe: the lightweight HTTP check plus optional keyword,
//! TLS-certificate, and DNS-latency verification.

use anyhow::Result;
use hickory_resolver::TokioAsyncResolver;
use log::warn;

use crate::config::{SLOW_DNS_THRESHOLD_MS, SSL_EXPIRY_WARNING_DAYS};
use crate::dns;
use crate::error_handling::ProbeError;
use crate::lightweight::{parse_target, read_capped_body, LightweightProbe};
use crate::models::{CheckResult, DnsInfo, SslInfo, Status};
use crate::tls;

/// Which enhancements to layer onto the base check.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Substrings that must all be present in the page body.
    pub keywords: Vec<String>,
    /// Inspect the TLS certificate (HTTPS targets only).
    pub check_ssl: bool,
    /// Measure DNS resolution latency.
    pub check_dns: bool,
}

/// Probe composing the lightweight check with optional enhancements.
///
/// The base check runs first and a hard failure short-circuits: no
/// enhancement can rescue a target that is Down. Each enhancement is
/// fault-isolated; its own failure becomes a warning (or a downgrade)
/// and never aborts the remaining enhancements. The one exception is an
/// expired certificate, which forces the status to Down.
pub struct StandardProbe {
    base: LightweightProbe,
    client: reqwest::Client,
    resolver: TokioAsyncResolver,
}

impl StandardProbe {
    pub fn new(client: reqwest::Client, resolver: TokioAsyncResolver) -> Self {
        StandardProbe {
            base: LightweightProbe::new(client.clone()),
            client,
            resolver,
        }
    }

    /// Runs the base check and the requested enhancements.
    ///
    /// Each enhancement step may overwrite `warning`; only the most
    /// recently evaluated warning survives in the result.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` only for inputs that can never be probed.
    pub async fn check(&self, url: &str, options: &CheckOptions) -> Result<CheckResult, ProbeError> {
        let parsed = parse_target(url)?;
        // parse_target guarantees a host
        let host = parsed.host_str().unwrap_or_default().to_string();

        let mut result = self.base.check(url).await?;
        if result.status == Status::Down {
            return Ok(result);
        }

        if !options.keywords.is_empty() && result.status == Status::Up {
            match self.missing_keywords(url, &options.keywords).await {
                Ok(missing) if missing.is_empty() => {}
                Ok(missing) => {
                    warn!("{url} is missing required keywords: {}", missing.join(", "));
                    result.downgrade(Status::Degraded);
                    result.warning = Some(format!("Missing keywords: {}", missing.join(", ")));
                }
                Err(e) => {
                    warn!("Keyword check failed for {url}: {e}");
                    result.downgrade(Status::Degraded);
                    result.warning = Some(format!("Failed to check keywords: {e}"));
                }
            }
        }

        if options.check_ssl && parsed.scheme() == "https" {
            let port = parsed.port().unwrap_or(443);
            match tls::certificate_info(&host, port).await {
                Ok(ssl) => apply_ssl_info(&mut result, ssl),
                Err(e) => {
                    warn!("SSL check failed for {url}: {e}");
                    result.warning = Some(format!("SSL check failed: {e}"));
                }
            }
        }

        if options.check_dns {
            match dns::resolve_with_timing(&host, &self.resolver).await {
                Ok(info) => apply_dns_info(&mut result, info),
                Err(e) => {
                    warn!("DNS check failed for {url}: {e}");
                    result.warning = Some(format!("DNS check failed: {e}"));
                }
            }
        }

        Ok(result)
    }

    /// Re-fetches the page and returns the required substrings it lacks.
    async fn missing_keywords(&self, url: &str, keywords: &[String]) -> Result<Vec<String>> {
        let response = self.client.get(url).send().await?;
        let body = read_capped_body(response).await?;
        let text = String::from_utf8_lossy(&body);
        Ok(keywords
            .iter()
            .filter(|keyword| !text.contains(keyword.as_str()))
            .cloned()
            .collect())
    }
}

/// Folds certificate details into the result.
///
/// Near expiry (under 30 days) is a warning; past expiry forces Down
/// with an explicit error. This is the only enhancement allowed to
/// change the status to Down.
fn apply_ssl_info(result: &mut CheckResult, ssl: SslInfo) {
    let days_left = ssl.days_left;
    result.ssl_info = Some(ssl);

    if days_left < SSL_EXPIRY_WARNING_DAYS {
        result.warning = Some(format!("SSL certificate expires in {days_left} days"));
    }
    if days_left < 0 {
        result.downgrade(Status::Down);
        result.error_message = Some("SSL certificate has expired".to_string());
    }
}

/// Folds resolution details into the result, warning on slow lookups.
fn apply_dns_info(result: &mut CheckResult, info: DnsInfo) {
    let resolve_time_ms = info.resolve_time_ms;
    result.dns_info = Some(info);

    if resolve_time_ms > SLOW_DNS_THRESHOLD_MS {
        result.warning = Some(format!("Slow DNS resolution: {resolve_time_ms}ms"));
    }
}
