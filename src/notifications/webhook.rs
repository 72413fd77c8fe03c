//! Chat webhook notifier.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use super::{NotificationSink, NotifyError};
use crate::analysis::{MetricKind, MetricName};
use crate::suggestions::Suggestion;

const MAX_URL_LENGTH: usize = 2048;
const MAX_ATTEMPTS: u32 = 3;

/// Posts a `{"text": ...}` message to an HTTPS chat webhook.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
    initial_backoff: Duration,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        validate_webhook_url(webhook_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NotifyError::Client(err.to_string()))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Override the delay before the first retry; doubles after each attempt.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }
}

/// HTTPS only, at most 2048 characters.
fn validate_webhook_url(webhook_url: &str) -> Result<(), NotifyError> {
    if webhook_url.len() > MAX_URL_LENGTH {
        return Err(NotifyError::InvalidTarget(format!(
            "{} exceeds {MAX_URL_LENGTH} characters",
            redacted_target(webhook_url)
        )));
    }
    if !webhook_url.to_lowercase().starts_with("https://") {
        return Err(NotifyError::InvalidTarget(format!(
            "{} is not HTTPS",
            redacted_target(webhook_url)
        )));
    }
    Ok(())
}

/// `scheme://host` of the target; paths often embed secrets.
fn redacted_target(webhook_url: &str) -> String {
    Url::parse(webhook_url)
        .ok()
        .map(|parsed| {
            let host = parsed.host_str().unwrap_or("unknown");
            format!("{}://{}", parsed.scheme(), host)
        })
        .unwrap_or_else(|| "[invalid-url]".to_string())
}

fn render_message(suggestions: &[Suggestion]) -> String {
    let mut text = format!("{} new scale suggestion(s) awaiting review", suggestions.len());

    for suggestion in suggestions {
        let _ = write!(
            text,
            "\n- {} {} ({}): {:.2} -> {:.2} (+{}%)",
            suggestion.target_type,
            suggestion.target_name,
            suggestion.target_id,
            suggestion.budget,
            suggestion.budget_after_scale,
            suggestion.scale_percent
        );
        for metric in &suggestion.metrics {
            let op = match MetricName::parse(&metric.name).map(MetricName::kind) {
                Some(MetricKind::Cost) => "<",
                _ => ">",
            };
            let _ = write!(
                text,
                " [{} {:.4} {op} {:.4}]",
                metric.name, metric.value, metric.threshold
            );
        }
    }

    text
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, suggestions: &[Suggestion]) -> Result<(), NotifyError> {
        let target = redacted_target(&self.webhook_url);
        let payload = json!({ "text": render_message(suggestions) });
        let mut delay = self.initial_backoff;
        let mut last_failure = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!(target = %target, count = suggestions.len(), attempt, "Sent suggestion notification");
                    return Ok(());
                }
                Ok(response) => {
                    last_failure = format!("HTTP {}", response.status().as_u16());
                    warn!(target = %target, attempt, status = %response.status(), "Webhook rejected notification");
                }
                Err(err) => {
                    last_failure = err.without_url().to_string();
                    warn!(target = %target, attempt, error = %last_failure, "Webhook request failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(NotifyError::Delivery {
            attempts: MAX_ATTEMPTS,
            reason: last_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::QualifyingMetric;
    use crate::models::{SuggestionStatus, TargetType};
    use chrono::Utc;
    use uuid::Uuid;

    fn suggestion() -> Suggestion {
        let now = Utc::now();
        Suggestion {
            id: Uuid::new_v4(),
            account_id: "act_1".into(),
            target_type: TargetType::Adset,
            target_id: "as-1".into(),
            target_name: "Prospecting".into(),
            campaign_id: Some("c-1".into()),
            budget: 100.0,
            budget_after_scale: 120.0,
            scale_percent: 20.0,
            metrics: vec![
                QualifyingMetric {
                    name: "ctr".into(),
                    value: 0.03,
                    threshold: 0.02,
                },
                QualifyingMetric {
                    name: "cpc".into(),
                    value: 0.5,
                    threshold: 1.0,
                },
            ],
            metrics_exceeded_count: 2,
            status: SuggestionStatus::Pending,
            note: None,
            recent_scale_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_rejects_plain_http_and_long_urls() {
        assert!(matches!(
            WebhookNotifier::new("http://chat.example.com/hook", Duration::from_secs(1)),
            Err(NotifyError::InvalidTarget(_))
        ));

        let long = format!("https://chat.example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(
            WebhookNotifier::new(&long, Duration::from_secs(1)),
            Err(NotifyError::InvalidTarget(_))
        ));

        assert!(WebhookNotifier::new("https://chat.example.com/hook", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_redacted_target_hides_path() {
        assert_eq!(
            redacted_target("https://chat.example.com/v1/spaces/AAA/messages?key=secret"),
            "https://chat.example.com"
        );
        assert_eq!(redacted_target("not a url"), "[invalid-url]");
    }

    #[test]
    fn test_message_lists_targets_and_metrics() {
        let text = render_message(&[suggestion()]);

        assert!(text.starts_with("1 new scale suggestion(s)"));
        assert!(text.contains("adset Prospecting (as-1): 100.00 -> 120.00 (+20%)"));
        assert!(text.contains("[ctr 0.0300 > 0.0200]"));
        assert!(text.contains("[cpc 0.5000 < 1.0000]"));
    }

    // The mock server speaks plain HTTP, so bypass the HTTPS check.
    fn notifier_for(server: &wiremock::MockServer) -> WebhookNotifier {
        WebhookNotifier {
            client: Client::new(),
            webhook_url: format!("{}/hook", server.uri()),
            initial_backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_retries_until_delivered() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        notifier_for(&server).notify(&[suggestion()]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert!(body["text"].as_str().unwrap().contains("Prospecting"));
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = notifier_for(&server)
            .notify(&[suggestion()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotifyError::Delivery { attempts: 3, ref reason } if reason == "HTTP 503"
        ));
    }
}
