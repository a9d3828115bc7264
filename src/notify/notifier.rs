use super::traits::{AlertChannel, Notification};
use super::webhook::WebhookChannel;
use crate::config::AlertsConfig;
use crate::error::TransportError;
use crate::escalation::AlertCooldown;
use crate::util::http_client::build_http_client;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// The per-level cooldown swallowed the notification.
    pub suppressed: bool,
    pub delivered: Vec<String>,
    /// `(channel, reason)` pairs.
    pub failed: Vec<(String, String)>,
}

/// Fans a notification out to every configured channel behind the per-level
/// cooldown. Channel failures are isolated and reported, never raised.
pub struct Notifier {
    channels: Vec<Box<dyn AlertChannel>>,
    cooldown: AlertCooldown,
    delivery_timeout: Duration,
}

impl Notifier {
    pub fn new(
        channels: Vec<Box<dyn AlertChannel>>,
        cooldown: AlertCooldown,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            channels,
            cooldown,
            delivery_timeout,
        }
    }

    pub fn from_config(config: &AlertsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.delivery_timeout_secs.max(1));
        let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();

        if config.webhook.enabled {
            let url = config
                .webhook
                .url
                .clone()
                .context("alerts.webhook.enabled requires alerts.webhook.url")?;
            channels.push(Box::new(WebhookChannel::new(url, build_http_client(timeout))));
        }

        if config.email.enabled {
            #[cfg(feature = "email")]
            channels.push(Box::new(super::email::EmailChannel::from_config(
                &config.email,
                timeout,
            )));
            #[cfg(not(feature = "email"))]
            tracing::warn!("alerts.email is enabled but this build lacks the `email` feature");
        }

        Ok(Self::new(
            channels,
            AlertCooldown::from_secs(config.cooldown_seconds),
            timeout,
        ))
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn cooldown(&self) -> &AlertCooldown {
        &self.cooldown
    }

    pub async fn dispatch(
        &mut self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let level = notification.alert_level;
        if !self.cooldown.try_acquire(level, now) {
            tracing::debug!(alert = %level, "notification suppressed by cooldown");
            return DispatchReport {
                suppressed: true,
                ..DispatchReport::default()
            };
        }

        let mut report = DispatchReport::default();
        for channel in &self.channels {
            let name = channel.name().to_string();
            let outcome =
                match tokio::time::timeout(self.delivery_timeout, channel.send(notification)).await
                {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(error)) => Err(TransportError::Delivery {
                        channel: name.clone(),
                        message: format!("{error:#}"),
                    }),
                    Err(_) => Err(TransportError::Timeout {
                        channel: name.clone(),
                        timeout_secs: self.delivery_timeout.as_secs(),
                    }),
                };

            match outcome {
                Ok(()) => {
                    tracing::info!(channel = %name, alert = %level, "alert delivered");
                    report.delivered.push(name);
                }
                Err(error) => {
                    tracing::warn!(channel = %name, error = %error, "alert delivery failed");
                    report.failed.push((name, error.to_string()));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AlertLevel, MetricSnapshot};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Ok,
        Fail,
        Hang,
    }

    struct StubChannel {
        name: &'static str,
        behaviour: Behaviour,
        sends: Arc<AtomicUsize>,
    }

    impl AlertChannel for StubChannel {
        fn name(&self) -> &str {
            self.name
        }

        fn send<'a>(
            &'a self,
            _notification: &'a Notification,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.sends.fetch_add(1, Ordering::SeqCst);
                match self.behaviour {
                    Behaviour::Ok => Ok(()),
                    Behaviour::Fail => anyhow::bail!("smtp refused"),
                    Behaviour::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(())
                    }
                }
            })
        }
    }

    fn stub(name: &'static str, behaviour: Behaviour) -> (Box<dyn AlertChannel>, Arc<AtomicUsize>) {
        let sends = Arc::new(AtomicUsize::new(0));
        let channel = StubChannel {
            name,
            behaviour,
            sends: Arc::clone(&sends),
        };
        (Box::new(channel), sends)
    }

    fn notification(level: AlertLevel) -> Notification {
        Notification {
            alert_level: level,
            message: "margin exhausted".into(),
            entity: "localhost".into(),
            coherence: 0.3,
            recovery_margin: 0.0,
            snapshot: MetricSnapshot::new(90.0, 90.0, 1.0),
            timestamp: Utc::now(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn cooldown_allows_one_send_per_window() {
        let (channel, sends) = stub("webhook", Behaviour::Ok);
        let mut notifier = Notifier::new(
            vec![channel],
            AlertCooldown::from_secs(300),
            Duration::from_secs(1),
        );

        let first = notifier.dispatch(&notification(AlertLevel::Red), at(0)).await;
        let second = notifier.dispatch(&notification(AlertLevel::Red), at(60)).await;
        let third = notifier.dispatch(&notification(AlertLevel::Red), at(400)).await;

        assert_eq!(first.delivered, vec!["webhook".to_string()]);
        assert!(second.suppressed);
        assert!(!third.suppressed);
        assert_eq!(sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn red_does_not_suppress_yellow() {
        let (channel, sends) = stub("webhook", Behaviour::Ok);
        let mut notifier = Notifier::new(
            vec![channel],
            AlertCooldown::from_secs(300),
            Duration::from_secs(1),
        );
        notifier.dispatch(&notification(AlertLevel::Red), at(0)).await;
        let yellow = notifier.dispatch(&notification(AlertLevel::Yellow), at(5)).await;
        assert!(!yellow.suppressed);
        assert_eq!(sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let (failing, _) = stub("email", Behaviour::Fail);
        let (working, sends) = stub("webhook", Behaviour::Ok);
        let mut notifier = Notifier::new(
            vec![failing, working],
            AlertCooldown::default(),
            Duration::from_secs(1),
        );

        let report = notifier.dispatch(&notification(AlertLevel::Red), at(0)).await;
        assert_eq!(report.delivered, vec!["webhook".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "email");
        assert!(report.failed[0].1.contains("smtp refused"));
        assert_eq!(sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_channel_times_out() {
        let (hanging, _) = stub("webhook", Behaviour::Hang);
        let (working, _) = stub("email", Behaviour::Ok);
        let mut notifier = Notifier::new(
            vec![hanging, working],
            AlertCooldown::default(),
            Duration::from_millis(50),
        );

        let report = notifier.dispatch(&notification(AlertLevel::Red), at(0)).await;
        assert_eq!(report.delivered, vec!["email".to_string()]);
        assert!(report.failed[0].1.contains("timed out"));
    }

    #[test]
    fn config_without_channels_builds_empty_notifier() {
        let notifier = Notifier::from_config(&AlertsConfig::default()).unwrap();
        assert!(notifier.channel_names().is_empty());
    }

    #[test]
    fn config_with_webhook_registers_channel() {
        let mut config = AlertsConfig::default();
        config.webhook.enabled = true;
        config.webhook.url = Some("https://hooks.example.com/T0".into());
        let notifier = Notifier::from_config(&config).unwrap();
        assert_eq!(notifier.channel_names(), vec!["webhook"]);
    }
}
