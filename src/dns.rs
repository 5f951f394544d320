//! Timed forward DNS resolution.

use std::time::Instant;

use anyhow::{Error, Result};
use hickory_resolver::TokioAsyncResolver;

use crate::models::DnsInfo;

/// Resolves a hostname's address records and measures how long the
/// lookup took.
///
/// # Arguments
///
/// * `host` - The hostname to resolve
/// * `resolver` - The DNS resolver instance
///
/// # Errors
///
/// Returns an error if resolution fails or yields no addresses.
pub async fn resolve_with_timing(host: &str, resolver: &TokioAsyncResolver) -> Result<DnsInfo> {
    let start = Instant::now();
    let response = resolver.lookup_ip(host).await.map_err(Error::new)?;
    let resolve_time_ms = start.elapsed().as_millis() as u64;

    let addresses: Vec<String> = response.iter().map(|ip| ip.to_string()).collect();
    if addresses.is_empty() {
        return Err(Error::msg(format!("No addresses found for {host}")));
    }

    log::debug!(
        "Resolved {host} to {} address(es) in {resolve_time_ms}ms",
        addresses.len()
    );

    Ok(DnsInfo {
        resolve_time_ms,
        addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::init_resolver;

    #[tokio::test]
    async fn test_ip_literal_resolves_locally() {
        let resolver = init_resolver();
        let info = resolve_with_timing("127.0.0.1", &resolver)
            .await
            .expect("IP literal lookup failed");
        assert_eq!(info.addresses, vec!["127.0.0.1".to_string()]);
    }

    /// Network test; run with: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_real_hostname_resolves() {
        let resolver = init_resolver();
        let info = resolve_with_timing("example.com", &resolver)
            .await
            .expect("lookup failed");
        assert!(!info.addresses.is_empty());
    }
}
