//! Tier resolution and probe dispatch.
//!
//! Resolves a target's effective tier (declared, or auto-detected via
//! the classification cache) and routes it to the cheapest sufficient
//! probe. Targets needing full browser rendering produce an escalation
//! signal; the browser collaborator is never invoked from here.

use anyhow::Result;
use hickory_resolver::TokioAsyncResolver;
use log::{debug, info, warn};

use crate::classify::classify;
use crate::detection_cache::{CacheStats, DetectionCache};
use crate::error_handling::ProbeError;
use crate::lightweight::{read_capped_body, LightweightProbe};
use crate::models::{CheckTarget, EscalationSignal, CheckResult, Tier};
use crate::standard::{CheckOptions, StandardProbe};

/// Outcome of routing a target: either a completed check or the signal
/// that the caller must hand the target to the browser collaborator.
#[derive(Debug)]
pub enum Routed {
    Checked(CheckResult),
    Escalate(EscalationSignal),
}

impl Routed {
    /// Collapses the outcome into a result, substituting the
    /// escalation placeholder where no check ran.
    pub fn into_result(self) -> CheckResult {
        match self {
            Routed::Checked(result) => result,
            Routed::Escalate(signal) => signal.into_result(),
        }
    }
}

/// Routes check targets to the matching probe.
pub struct MonitorRouter {
    cache: DetectionCache,
    lightweight: LightweightProbe,
    standard: StandardProbe,
    client: reqwest::Client,
}

impl MonitorRouter {
    pub fn new(client: reqwest::Client, resolver: TokioAsyncResolver) -> Self {
        Self::with_cache(client, resolver, DetectionCache::new())
    }

    /// Router with a caller-supplied cache (custom TTL).
    pub fn with_cache(
        client: reqwest::Client,
        resolver: TokioAsyncResolver,
        cache: DetectionCache,
    ) -> Self {
        MonitorRouter {
            cache,
            lightweight: LightweightProbe::new(client.clone()),
            standard: StandardProbe::new(client.clone(), resolver),
            client,
        }
    }

    /// Resolves the effective tier and dispatches to the matching probe.
    ///
    /// Standard checks get the certificate enhancement iff the target is
    /// HTTPS, the DNS enhancement always, and the target's keywords.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` only for targets that can never be probed.
    pub async fn route(&self, target: &CheckTarget) -> Result<Routed, ProbeError> {
        let tier = match target.declared_tier {
            Tier::Auto => self.resolve_tier(&target.url).await,
            tier => tier,
        };

        match tier {
            Tier::Lightweight => {
                debug!("Executing lightweight check for {}", target.url);
                Ok(Routed::Checked(self.lightweight.check(&target.url).await?))
            }
            Tier::Standard => {
                debug!("Executing standard check for {}", target.url);
                let options = CheckOptions {
                    keywords: target.keywords.clone(),
                    check_ssl: target.url.starts_with("https://"),
                    check_dns: true,
                };
                Ok(Routed::Checked(
                    self.standard.check(&target.url, &options).await?,
                ))
            }
            Tier::Browser => {
                info!("{} requires full browser rendering, escalating", target.url);
                Ok(Routed::Escalate(EscalationSignal::new(&target.url)))
            }
            Tier::Auto => unreachable!("auto always resolves to a concrete tier"),
        }
    }

    /// Resolves AUTO to a concrete tier.
    ///
    /// A fresh cache entry wins. Otherwise the page is fetched once and
    /// classified; the result is cached. A detection failure is never
    /// propagated: the target falls back to the lightweight tier (and is
    /// not cached) so the probe itself can report what is wrong.
    pub async fn resolve_tier(&self, url: &str) -> Tier {
        if let Some(tier) = self.cache.get(url).await {
            debug!("Detection cache hit for {url}: {}", tier.as_str());
            return tier;
        }

        match self.fetch_for_detection(url).await {
            Ok(html) => {
                let tier = classify(&html, url);
                self.cache.insert(url, tier).await;
                info!("Auto-detected tier for {url}: {}", tier.as_str());
                tier
            }
            Err(e) => {
                warn!("Tier detection failed for {url}, defaulting to lightweight: {e}");
                Tier::Lightweight
            }
        }
    }

    async fn fetch_for_detection(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = read_capped_body(response).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Clears all cached detections, forcing re-detection.
    pub async fn invalidate_detections(&self) {
        self.cache.invalidate_all().await;
    }

    /// Snapshot of the detection cache contents.
    pub async fn detection_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
