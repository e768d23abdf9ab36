//! Probe module for endpoint monitoring.
//!
//! A probe issues one request to an endpoint and classifies the answer as up
//! or down. Probes never fail: every failure mode resolves to a down outcome.

mod http;

pub use http::*;

use async_trait::async_trait;

/// The classified result of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub is_up: bool,
    /// Elapsed time in milliseconds. None when the request was never sent.
    pub latency_ms: Option<f64>,
    /// Final HTTP status code, if a response arrived.
    pub status_code: Option<u16>,
    /// Human-readable failure reason for down outcomes without a response.
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn response(status_code: u16, latency_ms: f64) -> Self {
        Self {
            is_up: is_up_status(status_code),
            latency_ms: Some(latency_ms),
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn failure(latency_ms: Option<f64>, error: impl Into<String>) -> Self {
        Self {
            is_up: false,
            latency_ms,
            status_code: None,
            error: Some(error.into()),
        }
    }
}

/// Something that can check whether a URL is reachable.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Reachability policy: any status in [200, 500) counts as up.
///
/// Client errors are up because the server answered. Only 5xx, and the
/// failure modes that produce no response at all, count as down.
pub fn is_up_status(status_code: u16) -> bool {
    (200..500).contains(&status_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        for code in [200, 204, 301, 404, 499] {
            assert!(is_up_status(code), "{} should be up", code);
        }
        for code in [100, 199, 500, 503, 599] {
            assert!(!is_up_status(code), "{} should be down", code);
        }
    }

    #[test]
    fn test_failure_outcome_is_down() {
        let outcome = ProbeOutcome::failure(Some(12.0), "connection refused");
        assert!(!outcome.is_up);
        assert_eq!(outcome.latency_ms, Some(12.0));
        assert!(outcome.status_code.is_none());
    }
}
