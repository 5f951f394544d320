use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

/// Check strategy for a target URL.
///
/// `Auto` is a meta-value: the router resolves it to one of the three
/// concrete tiers before dispatching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, EnumIterMacro, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Lightweight,
    Standard,
    Browser,
    Auto,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Lightweight => "lightweight",
            Tier::Standard => "standard",
            Tier::Browser => "browser",
            Tier::Auto => "auto",
        }
    }
}

/// A URL submitted for checking, with its declared tier.
///
/// Immutable once submitted. `keywords` are required substrings verified
/// by the standard probe when the target is dispatched to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTarget {
    pub url: String,
    pub declared_tier: Tier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl CheckTarget {
    pub fn new(url: impl Into<String>, declared_tier: Tier) -> Self {
        CheckTarget {
            url: url.into(),
            declared_tier,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Health verdict for a single evaluation.
///
/// Ordered from best to worst so that an evaluation can only move the
/// status toward a worse state, never back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Degraded,
    Down,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "up",
            Status::Degraded => "degraded",
            Status::Down => "down",
        }
    }
}

/// Classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    DnsError,
    ConnectionRefused,
    Timeout,
    SslExpired,
    SslInvalid,
    ServerError,
    ClientError,
    UnknownError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::DnsError => "dns_error",
            ErrorCategory::ConnectionRefused => "connection_refused",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::SslExpired => "ssl_expired",
            ErrorCategory::SslInvalid => "ssl_invalid",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::UnknownError => "unknown_error",
        }
    }

    /// Infrastructure errors (DNS, timeouts, refused connections) are
    /// likely transient and should not by themselves trigger alerting.
    /// This only classifies; alerting policy lives with the caller.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ErrorCategory::DnsError | ErrorCategory::Timeout | ErrorCategory::ConnectionRefused
        )
    }
}

/// TLS certificate details read from the peer during inspection.
///
/// `valid` means the clock falls inside the certificate's validity
/// window; chain verification is not performed by the inspection
/// connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslInfo {
    pub valid: bool,
    pub days_left: i64,
    pub issuer: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

/// DNS resolution details for a hostname.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsInfo {
    pub resolve_time_ms: u64,
    pub addresses: Vec<String>,
}

/// Outcome of a single probe evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: Status,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_info: Option<SslInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_info: Option<DnsInfo>,
}

impl CheckResult {
    /// Result with only a status and timing; detail fields start empty.
    pub fn new(status: Status, response_time_ms: u64) -> Self {
        CheckResult {
            status,
            response_time_ms,
            status_code: None,
            content_length_bytes: None,
            error_message: None,
            error_category: None,
            warning: None,
            ssl_info: None,
            dns_info: None,
        }
    }

    /// Moves the status toward a worse state. A better candidate leaves
    /// the current status untouched.
    pub fn downgrade(&mut self, candidate: Status) {
        self.status = self.status.max(candidate);
    }
}

/// Signal that a target needs full browser rendering to evaluate.
///
/// The router never launches a browser itself; callers hand this signal
/// to the browser-automation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationSignal {
    pub url: String,
}

impl EscalationSignal {
    pub fn new(url: impl Into<String>) -> Self {
        EscalationSignal { url: url.into() }
    }

    /// Placeholder result reported for an escalated target.
    pub fn into_result(self) -> CheckResult {
        let mut result = CheckResult::new(Status::Degraded, 0);
        result.warning = Some("Requires full browser test".to_string());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_worsens() {
        let mut result = CheckResult::new(Status::Up, 10);
        result.downgrade(Status::Degraded);
        assert_eq!(result.status, Status::Degraded);

        // A better candidate must not improve the status mid-evaluation
        result.downgrade(Status::Up);
        assert_eq!(result.status, Status::Degraded);

        result.downgrade(Status::Down);
        assert_eq!(result.status, Status::Down);
        result.downgrade(Status::Degraded);
        assert_eq!(result.status, Status::Down);
    }

    #[test]
    fn test_infrastructure_error_categories() {
        assert!(ErrorCategory::DnsError.is_infrastructure());
        assert!(ErrorCategory::Timeout.is_infrastructure());
        assert!(ErrorCategory::ConnectionRefused.is_infrastructure());

        assert!(!ErrorCategory::ServerError.is_infrastructure());
        assert!(!ErrorCategory::ClientError.is_infrastructure());
        assert!(!ErrorCategory::SslExpired.is_infrastructure());
        assert!(!ErrorCategory::SslInvalid.is_infrastructure());
        assert!(!ErrorCategory::UnknownError.is_infrastructure());
    }

    #[test]
    fn test_escalation_signal_result() {
        let result = EscalationSignal::new("https://spa.example.com").into_result();
        assert_eq!(result.status, Status::Degraded);
        assert_eq!(result.response_time_ms, 0);
        assert_eq!(result.warning.as_deref(), Some("Requires full browser test"));
        assert!(result.status_code.is_none());
    }

    #[test]
    fn test_check_result_serialization_skips_empty_fields() {
        let result = CheckResult::new(Status::Up, 123);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"up\""));
        assert!(!json.contains("ssl_info"));
        assert!(!json.contains("error_category"));
    }

    #[test]
    fn test_error_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::DnsError).unwrap();
        assert_eq!(json, "\"dns_error\"");
    }
}
