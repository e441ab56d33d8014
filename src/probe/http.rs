//! HTTP probe implementation.

use std::time::{Duration, Instant};
use super::ProbeError;

/// A completed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub elapsed: Duration,
}

/// Issue one GET against `address` with the given client.
///
/// The client carries the total timeout and TLS policy. Timing stops once the
/// response head has arrived; the body is not read.
pub async fn run_http_probe(
    client: &reqwest::Client,
    address: &str,
    timeout: Duration,
) -> Result<HttpResponse, ProbeError> {
    let url = normalize_url(address);

    let start = Instant::now();

    let response = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout)
            } else if e.is_builder() {
                ProbeError::Config(e.to_string())
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

    Ok(HttpResponse {
        status_code: response.status().as_u16(),
        elapsed: start.elapsed(),
    })
}

fn normalize_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_probe_invalid_url() {
        let client = reqwest::Client::new();
        let result = run_http_probe(&client, "http://256.256.256.256", Duration::from_millis(100)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com/health"), "https://example.com/health");
    }
}
