//! Discord-style webhook notifier.

use super::{Notifier, NotifyError};
use crate::config::MonitorTarget;
use crate::db::ProbeResult;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const COLOR_UP: u32 = 3066993;
pub const COLOR_DOWN: u32 = 15158332;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: String, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value,
            inline,
        }
    }
}

/// Build the embed posted for a transition.
///
/// Fields are always URL, Status Code, Response Time, Timestamp.
pub fn build_payload(target: &MonitorTarget, result: &ProbeResult) -> WebhookPayload {
    let (status_text, color) = if result.is_up {
        ("UP", COLOR_UP)
    } else {
        ("DOWN", COLOR_DOWN)
    };

    let status_code = result
        .status_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let response_time = result
        .response_time
        .map(|t| format!("{:.2}s", t))
        .unwrap_or_else(|| "N/A".to_string());

    WebhookPayload {
        embeds: vec![Embed {
            title: format!("{} - {}", target.name, status_text),
            color,
            fields: vec![
                EmbedField::new("URL", target.url.clone(), false),
                EmbedField::new("Status Code", status_code, true),
                EmbedField::new("Response Time", response_time, true),
                EmbedField::new("Timestamp", result.timestamp.to_rfc3339(), false),
            ],
        }],
    }
}

/// Posts transitions to each monitor's configured webhook URL.
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new() -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, target: &MonitorTarget, result: &ProbeResult) -> Result<(), NotifyError> {
        let Some(url) = target.webhook_url() else {
            return Ok(());
        };

        let payload = build_payload(target, result);

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscordIntegration;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target_with_hook(url: Option<String>) -> MonitorTarget {
        let mut target = MonitorTarget::new("api", "https://api.example.com/health");
        target.discord_integration = Some(DiscordIntegration { webhook_url: url });
        target
    }

    #[test]
    fn test_payload_for_up() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let result = ProbeResult::responded("api", ts, 200, 0.1234, true);
        let payload = build_payload(&target_with_hook(None), &result);

        let json = serde_json::to_value(&payload).unwrap();
        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "api - UP");
        assert_eq!(embed["color"], COLOR_UP);

        let fields = embed["fields"].as_array().unwrap();
        let names: Vec<_> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["URL", "Status Code", "Response Time", "Timestamp"]);
        assert_eq!(fields[0]["value"], "https://api.example.com/health");
        assert_eq!(fields[0]["inline"], false);
        assert_eq!(fields[1]["value"], "200");
        assert_eq!(fields[2]["value"], "0.12s");
        assert_eq!(fields[3]["value"], "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_payload_for_failure() {
        let result = ProbeResult::failed("api", Utc::now());
        let payload = build_payload(&target_with_hook(None), &result);

        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "api - DOWN");
        assert_eq!(embed.color, COLOR_DOWN);
        assert_eq!(embed.fields[1].value, "N/A");
        assert_eq!(embed.fields[2].value, "N/A");
    }

    #[tokio::test]
    async fn test_posts_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "embeds": [{ "title": "api - DOWN", "color": COLOR_DOWN }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let target = target_with_hook(Some(format!("{}/hook", server.uri())));
        let notifier = WebhookNotifier::new().unwrap();
        let result = ProbeResult::failed("api", Utc::now());

        tokio_test::assert_ok!(notifier.notify(&target, &result).await);
    }

    #[tokio::test]
    async fn test_non_success_reply_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let target = target_with_hook(Some(server.uri()));
        let notifier = WebhookNotifier::new().unwrap();
        let result = ProbeResult::failed("api", Utc::now());

        let err = notifier.notify(&target, &result).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(500)));
    }

    #[tokio::test]
    async fn test_missing_webhook_is_noop() {
        let notifier = WebhookNotifier::new().unwrap();
        let result = ProbeResult::failed("api", Utc::now());
        tokio_test::assert_ok!(notifier.notify(&target_with_hook(None), &result).await);
    }
}
