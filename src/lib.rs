//! site_patrol library: adaptive website health checks.
//!
//! A check target is routed to the cheapest sufficient probe tier:
//! a fast HTTP-only check, an enhanced check layering TLS-certificate,
//! DNS-latency, and keyword verification on top, or an escalation
//! signal when only a full browser render can evaluate the page.
//! Auto-detection classifies a page's rendering model once and caches
//! the verdict. Work runs through a dual-priority queue so interactive
//! checks never wait behind scheduled patrol batches.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use site_patrol::{run_patrol, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::parse_from(["site_patrol", "urls.txt"]);
//! let report = run_patrol(config).await?;
//! println!(
//!     "{} up, {} degraded, {} down, {} escalated",
//!     report.up, report.degraded, report.down, report.escalated
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call library functions within an async context.

mod classify;
pub mod config;
mod detection_cache;
mod dns;
mod error_handling;
pub mod initialization;
mod lightweight;
mod models;
mod queue;
mod router;
mod standard;
mod tls;

// Re-export public API
pub use classify::classify;
pub use config::{Config, Lane, LogFormat, LogLevel};
pub use detection_cache::{CacheStats, DetectionCache};
pub use dns::resolve_with_timing;
pub use error_handling::{categorize_transport_error, ProbeError};
pub use lightweight::LightweightProbe;
pub use models::{
    CheckResult, CheckTarget, DnsInfo, ErrorCategory, EscalationSignal, SslInfo, Status, Tier,
};
pub use queue::{ExecutionQueue, ExecutionTask, QueueStats, QueuedTaskInfo};
pub use router::{MonitorRouter, Routed};
pub use run::{run_patrol, PatrolReport};
pub use standard::{CheckOptions, StandardProbe};
pub use tls::certificate_info;

// Internal run module (contains the batch patrol logic)
mod run {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::info;
    use serde::Serialize;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use crate::config::{Config, Lane};
    use crate::initialization::{init_client, init_resolver};
    use crate::models::{CheckTarget, Status};
    use crate::queue::{ExecutionQueue, ExecutionTask};
    use crate::router::{MonitorRouter, Routed};

    /// Results of a patrol run.
    #[derive(Debug, Clone)]
    pub struct PatrolReport {
        /// URLs submitted for checking
        pub total: usize,
        /// Checks that came back Up
        pub up: usize,
        /// Checks that came back Degraded
        pub degraded: usize,
        /// Checks that came back Down
        pub down: usize,
        /// Targets escalated to the browser tier
        pub escalated: usize,
        /// Targets that could not be checked at all
        pub failed: usize,
        /// Elapsed wall-clock time in seconds
        pub elapsed_seconds: f64,
    }

    #[derive(Serialize)]
    struct UrlReport {
        url: String,
        #[serde(flatten)]
        result: crate::models::CheckResult,
    }

    struct Counters {
        up: AtomicUsize,
        degraded: AtomicUsize,
        down: AtomicUsize,
        escalated: AtomicUsize,
        failed: AtomicUsize,
    }

    /// Runs a patrol over the URL file in `config`.
    ///
    /// Builds the service objects once, submits one task per URL through
    /// the configured lane, prints one JSON line per completed check,
    /// and returns aggregate counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file cannot be opened or the HTTP
    /// client cannot be initialized. Individual check failures never
    /// fail the run; they are counted in the report.
    pub async fn run_patrol(config: Config) -> Result<PatrolReport> {
        let client = init_client(&config.user_agent).context("Failed to initialize HTTP client")?;
        let resolver = init_resolver();
        let router = Arc::new(MonitorRouter::new(client, resolver));
        let queue = ExecutionQueue::new();

        let counters = Arc::new(Counters {
            up: AtomicUsize::new(0),
            degraded: AtomicUsize::new(0),
            down: AtomicUsize::new(0),
            escalated: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        });

        let file = tokio::fs::File::open(&config.file)
            .await
            .context("Failed to open input file")?;
        let mut lines = BufReader::new(file).lines();

        let start = std::time::Instant::now();
        let mut tasks = FuturesUnordered::new();
        let mut total = 0usize;

        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            total += 1;
            let target = CheckTarget::new(trimmed, config.tier)
                .with_keywords(config.keywords.clone());
            let url = target.url.clone();

            let router_for_task = Arc::clone(&router);
            let counters_for_task = Arc::clone(&counters);
            let task = ExecutionTask::new(format!("check-{total}"), format!("patrol {url}"), {
                move || async move {
                    check_one(&router_for_task, &counters_for_task, target).await
                }
            });

            match config.lane {
                Lane::High => {
                    let queue_for_task = Arc::clone(&queue);
                    tasks.push(tokio::spawn(async move {
                        // Failures are already counted; nothing to do here
                        let _ = queue_for_task.run_high(task).await;
                    }));
                }
                Lane::Low => {
                    queue.enqueue_low(task).await;
                }
            }
        }

        match config.lane {
            Lane::High => {
                while let Some(joined) = tasks.next().await {
                    if let Err(join_error) = joined {
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                        log::warn!("Check task panicked: {join_error:?}");
                    }
                }
            }
            Lane::Low => {
                queue.wait_until_idle().await;
            }
        }
        queue.shutdown();

        let elapsed_seconds = start.elapsed().as_secs_f64();
        let report = PatrolReport {
            total,
            up: counters.up.load(Ordering::SeqCst),
            degraded: counters.degraded.load(Ordering::SeqCst),
            down: counters.down.load(Ordering::SeqCst),
            escalated: counters.escalated.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            elapsed_seconds,
        };
        info!(
            "Patrol finished: {} checked in {:.1}s ({} up, {} degraded, {} down, {} escalated, {} failed)",
            report.total,
            report.elapsed_seconds,
            report.up,
            report.degraded,
            report.down,
            report.escalated,
            report.failed
        );
        Ok(report)
    }

    async fn check_one(
        router: &MonitorRouter,
        counters: &Counters,
        target: CheckTarget,
    ) -> Result<()> {
        let routed = match router.route(&target).await {
            Ok(routed) => routed,
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        match &routed {
            Routed::Checked(result) => {
                let counter = match result.status {
                    Status::Up => &counters.up,
                    Status::Degraded => &counters.degraded,
                    Status::Down => &counters.down,
                };
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Routed::Escalate(_) => {
                counters.escalated.fetch_add(1, Ordering::SeqCst);
            }
        }

        let record = UrlReport {
            url: target.url,
            result: routed.into_result(),
        };
        let line = serde_json::to_string(&record).context("Failed to serialize check result")?;
        println!("{line}");
        Ok(())
    }
}
