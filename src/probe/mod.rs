//! Probe module for endpoint monitoring.
//!
//! Every failure is folded into a down [`ProbeResult`]; nothing here returns
//! an error to the scheduler.

mod http;

pub use http::*;

use crate::config::MonitorTarget;
use crate::db::ProbeResult;

use chrono::Utc;
use std::time::Duration;
use thiserror::Error;

/// Total time budget for a single check.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// How a single check ended.
#[derive(Debug)]
pub enum ProbeOutcome {
    Responded(HttpResponse),
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// Turn the outcome into the result recorded for `target`.
    pub fn into_result(self, target: &MonitorTarget) -> ProbeResult {
        let now = Utc::now();
        match self {
            ProbeOutcome::Responded(resp) => {
                let secs = resp.elapsed.as_secs_f64();
                let is_up = target.accepts(resp.status_code);
                tracing::info!(
                    "{}: {} ({:.2}s) - {}",
                    target.name,
                    resp.status_code,
                    secs,
                    if is_up { "UP" } else { "DOWN" }
                );
                ProbeResult::responded(&target.name, now, resp.status_code, secs, is_up)
            }
            ProbeOutcome::Failed(ProbeError::Timeout(_)) => {
                tracing::warn!("{}: TIMEOUT - DOWN", target.name);
                ProbeResult::failed(&target.name, now)
            }
            ProbeOutcome::Failed(e) => {
                tracing::error!("{}: ERROR - {}", target.name, e);
                ProbeResult::failed(&target.name, now)
            }
        }
    }
}

/// Runs checks against monitor targets.
///
/// Holds one client per TLS policy so connections are pooled across cycles.
#[derive(Clone)]
pub struct Prober {
    verified: reqwest::Client,
    unverified: reqwest::Client,
    timeout: Duration,
}

impl Prober {
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ProbeError> {
        let verified = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        let unverified = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self {
            verified,
            unverified,
            timeout,
        })
    }

    /// The client matching the target's TLS policy.
    fn client_for(&self, target: &MonitorTarget) -> &reqwest::Client {
        if target.verify_tls {
            &self.verified
        } else {
            &self.unverified
        }
    }

    /// Perform one check against `target`.
    pub async fn probe(&self, target: &MonitorTarget) -> ProbeOutcome {
        match run_http_probe(self.client_for(target), &target.url, self.timeout).await {
            Ok(resp) => ProbeOutcome::Responded(resp),
            Err(e) => ProbeOutcome::Failed(e),
        }
    }

    /// Perform one check and classify it into a result.
    pub async fn check(&self, target: &MonitorTarget) -> ProbeResult {
        self.probe(target).await.into_result(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_returning(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_accepted_status_is_up() {
        let server = server_returning(200).await;
        let target = MonitorTarget::new("api", &format!("{}/health", server.uri()));

        let result = Prober::new().unwrap().check(&target).await;
        assert_eq!(result.target_name, "api");
        assert!(result.is_up);
        assert_eq!(result.status_code, Some(200));
        assert!(result.response_time.is_some());
    }

    #[tokio::test]
    async fn test_unaccepted_status_is_down_with_code() {
        let server = server_returning(503).await;
        let target = MonitorTarget::new("api", &format!("{}/health", server.uri()));

        let result = Prober::new().unwrap().check(&target).await;
        assert!(!result.is_up);
        assert_eq!(result.status_code, Some(503));
        assert!(result.response_time.is_some());
    }

    #[tokio::test]
    async fn test_custom_accepted_codes() {
        let server = server_returning(204).await;
        let mut target = MonitorTarget::new("api", &format!("{}/health", server.uri()));

        let prober = Prober::new().unwrap();
        assert!(!prober.check(&target).await.is_up);

        target.accepted_status_codes = HashSet::from([200, 204]);
        assert!(prober.check(&target).await.is_up);
    }

    #[tokio::test]
    async fn test_client_follows_tls_policy() {
        let server = server_returning(200).await;
        let mut target = MonitorTarget::new("api", &format!("{}/health", server.uri()));
        let prober = Prober::new().unwrap();

        assert!(std::ptr::eq(prober.client_for(&target), &prober.verified));

        target.verify_tls = false;
        assert!(std::ptr::eq(prober.client_for(&target), &prober.unverified));

        let result = prober.check(&target).await;
        assert!(result.is_up);
        assert_eq!(result.status_code, Some(200));
    }

    #[tokio::test]
    async fn test_timeout_is_down_without_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;
        let target = MonitorTarget::new("slow", &server.uri());

        let prober = Prober::with_timeout(Duration::from_millis(50)).unwrap();
        let outcome = prober.probe(&target).await;
        assert!(matches!(outcome, ProbeOutcome::Failed(ProbeError::Timeout(_))));

        let result = outcome.into_result(&target);
        assert!(!result.is_up);
        assert_eq!(result.status_code, None);
        assert_eq!(result.response_time, None);
    }

    #[tokio::test]
    async fn test_connection_failure_is_down_without_code() {
        // Bind then drop a listener so the port is closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = MonitorTarget::new("gone", &format!("http://{}", addr));
        let result = Prober::new().unwrap().check(&target).await;
        assert!(!result.is_up);
        assert_eq!(result.status_code, None);
        assert_eq!(result.response_time, None);
    }
}
