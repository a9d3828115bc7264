use super::traits::{AlertChannel, Notification, host_label};
use crate::config::EmailAlertConfig;
use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use zeroize::Zeroizing;

/// SMTP (STARTTLS) alert channel.
pub struct EmailChannel {
    smtp_server: String,
    smtp_port: u16,
    sender: String,
    password: Option<Zeroizing<String>>,
    recipients: Vec<String>,
    timeout: Duration,
}

impl EmailChannel {
    pub fn from_config(config: &EmailAlertConfig, timeout: Duration) -> Self {
        Self {
            smtp_server: config.smtp_server.clone(),
            smtp_port: config.smtp_port,
            sender: config.sender.clone(),
            password: config.password.clone().map(Zeroizing::new),
            recipients: config.recipients.clone(),
            timeout,
        }
    }

    pub fn subject(notification: &Notification) -> String {
        format!("[{}] Recovery Watchdog Alert", notification.alert_level)
    }

    pub fn body(notification: &Notification) -> String {
        format!(
            "Recovery Watchdog Alert\n\n\
             Status: {level}\n\
             Time: {time}\n\
             Entity: {entity} ({host})\n\n\
             Message: {message}\n\n\
             System Metrics:\n\
             - Coherence: {c:.3}\n\
             - Recovery Margin: {margin:.3}\n\
             - CPU: {cpu:.1}%\n\
             - Memory: {mem:.1}%\n\n\
             ---\n\
             Recovery Watchdog v{version}\n",
            level = notification.alert_level,
            time = notification.timestamp.to_rfc3339(),
            entity = notification.entity,
            host = host_label(),
            message = notification.message,
            c = notification.coherence,
            margin = notification.recovery_margin,
            cpu = notification.snapshot.cpu_usage,
            mem = notification.snapshot.mem_usage,
            version = env!("CARGO_PKG_VERSION"),
        )
    }

    fn build_message(&self, notification: &Notification) -> Result<Message> {
        let from: Mailbox = self
            .sender
            .parse()
            .with_context(|| format!("invalid sender address '{}'", self.sender))?;
        let mut builder = Message::builder()
            .from(from)
            .subject(Self::subject(notification));
        for recipient in &self.recipients {
            let to: Mailbox = recipient
                .parse()
                .with_context(|| format!("invalid recipient address '{recipient}'"))?;
            builder = builder.to(to);
        }
        builder
            .body(Self::body(notification))
            .context("failed to build alert email")
    }

    fn build_transport(&self) -> Result<SmtpTransport> {
        let mut builder = SmtpTransport::starttls_relay(&self.smtp_server)
            .with_context(|| format!("invalid SMTP server '{}'", self.smtp_server))?
            .port(self.smtp_port)
            .timeout(Some(self.timeout));
        if let Some(password) = &self.password {
            builder = builder.credentials(Credentials::new(
                self.sender.clone(),
                password.as_str().to_string(),
            ));
        }
        Ok(builder.build())
    }
}

impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let message = self.build_message(notification)?;
            let transport = self.build_transport()?;
            tokio::task::spawn_blocking(move || transport.send(&message))
                .await
                .context("email delivery task panicked")?
                .context("SMTP delivery failed")?;
            Ok(())
        })
    }
}
