use super::traits::{AlertChannel, Notification, host_label};
use crate::engine::AlertLevel;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;

/// Slack-compatible incoming-webhook channel.
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { url, client }
    }
}

fn color(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Green => "good",
        AlertLevel::Yellow => "warning",
        AlertLevel::Red => "danger",
    }
}

fn field(title: &str, value: String) -> Value {
    json!({ "title": title, "value": value, "short": true })
}

pub fn slack_payload(notification: &Notification) -> Value {
    json!({
        "attachments": [{
            "color": color(notification.alert_level),
            "title": format!("Recovery Watchdog Alert: {}", notification.alert_level),
            "text": notification.message,
            "fields": [
                field("Coherence", format!("{:.3}", notification.coherence)),
                field("Recovery Margin", format!("{:.3}", notification.recovery_margin)),
                field("CPU Usage", format!("{:.1}%", notification.snapshot.cpu_usage)),
                field("Memory Usage", format!("{:.1}%", notification.snapshot.mem_usage)),
            ],
            "footer": format!(
                "Recovery Watchdog v{} - {} on {}",
                env!("CARGO_PKG_VERSION"),
                notification.entity,
                host_label()
            ),
            "ts": notification.timestamp.timestamp(),
        }]
    })
}

impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.url)
                .json(&slack_payload(notification))
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
                anyhow::bail!("webhook delivery failed ({status}): {body}");
            }
            Ok(())
        })
    }
}
