use super::Config;
use crate::config::ActionKind;
use crate::error::ConfigError;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let detector = &self.detector;
        if !detector.c_baseline.is_finite() || detector.c_baseline <= 0.0 {
            return Err(invalid("detector.c_baseline must be > 0"));
        }
        if !detector.beta_base.is_finite() {
            return Err(invalid("detector.beta_base must be finite"));
        }
        if !detector.red_epsilon.is_finite() || detector.red_epsilon < 0.0 {
            return Err(invalid("detector.red_epsilon must be >= 0"));
        }

        if self.escalation.sustained_window == 0 {
            return Err(invalid("escalation.sustained_window must be >= 1"));
        }
        if self.escalation.action == ActionKind::Signal && self.escalation.target_pid.is_none() {
            return Err(invalid(
                "escalation.action = \"signal\" requires escalation.target_pid",
            ));
        }

        let interval = self.watch.poll_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(invalid("watch.poll_interval_secs must be > 0"));
        }

        if self.alerts.delivery_timeout_secs == 0 {
            return Err(invalid("alerts.delivery_timeout_secs must be >= 1"));
        }
        let webhook = &self.alerts.webhook;
        if webhook.enabled {
            let raw = webhook.url.as_deref().unwrap_or_default();
            let parsed = url::Url::parse(raw).map_err(|e| {
                invalid(&format!("alerts.webhook.url '{raw}' is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid("alerts.webhook.url must be http or https"));
            }
        }
        let email = &self.alerts.email;
        if email.enabled {
            if email.recipients.is_empty() {
                return Err(invalid("alerts.email.recipients must not be empty"));
            }
            if email.sender.is_empty() {
                return Err(invalid("alerts.email.sender must be set"));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}
