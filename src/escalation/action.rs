use crate::engine::AlertLevel;
use anyhow::{Context, Result, bail};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const ALLOWED_SIGNALS: &[&str] = &["TERM", "INT", "HUP", "QUIT", "KILL", "USR1", "USR2"];

/// What was true when the phase trigger fired.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerContext {
    pub entity: String,
    pub recovery_margin: f64,
    pub alert_level: AlertLevel,
    pub consecutive_breaches: u32,
}

/// Side effect executed once when a sustained breach is confirmed.
pub trait TriggerAction: Send + Sync {
    fn name(&self) -> &str;

    fn execute<'a>(
        &'a self,
        context: &'a TriggerContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Records the trigger and does nothing else.
pub struct LogOnlyAction;

impl TriggerAction for LogOnlyAction {
    fn name(&self) -> &str {
        "log"
    }

    fn execute<'a>(
        &'a self,
        context: &'a TriggerContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            tracing::warn!(
                entity = %context.entity,
                margin = context.recovery_margin,
                breaches = context.consecutive_breaches,
                "phase trigger fired (log-only action)"
            );
            Ok(())
        })
    }
}

/// Sends a signal to a supervised process after a grace period.
#[derive(Debug, Clone)]
pub struct SignalAction {
    pid: u32,
    signal: String,
    grace: Duration,
}

impl SignalAction {
    pub fn new(pid: u32, signal: &str, grace: Duration) -> Result<Self> {
        let signal = normalize_signal(signal)?;
        if pid == 0 {
            bail!("refusing to signal pid 0");
        }
        Ok(Self { pid, signal, grace })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }
}

impl TriggerAction for SignalAction {
    fn name(&self) -> &str {
        "signal"
    }

    fn execute<'a>(
        &'a self,
        context: &'a TriggerContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            tracing::warn!(
                entity = %context.entity,
                pid = self.pid,
                signal = %self.signal,
                grace_ms = u64::try_from(self.grace.as_millis()).unwrap_or(u64::MAX),
                "phase trigger fired, signalling supervised process"
            );
            tokio::time::sleep(self.grace).await;

            let status = tokio::process::Command::new("kill")
                .arg("-s")
                .arg(&self.signal)
                .arg(self.pid.to_string())
                .status()
                .await
                .context("failed to run kill")?;
            if !status.success() {
                bail!("kill -s {} {} exited with {status}", self.signal, self.pid);
            }
            Ok(())
        })
    }
}

/// Accepts `TERM`, `term` or `SIGTERM`; anything outside the allow-list is rejected.
fn normalize_signal(raw: &str) -> Result<String> {
    let upper = raw.trim().to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    if ALLOWED_SIGNALS.contains(&name) {
        Ok(name.to_string())
    } else {
        bail!("unsupported signal '{raw}' (expected one of {})", ALLOWED_SIGNALS.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TriggerContext {
        TriggerContext {
            entity: "localhost".into(),
            recovery_margin: 0.0,
            alert_level: AlertLevel::Red,
            consecutive_breaches: 5,
        }
    }

    #[test]
    fn signal_names_are_normalized() {
        assert_eq!(normalize_signal("sigterm").unwrap(), "TERM");
        assert_eq!(normalize_signal(" HUP ").unwrap(), "HUP");
        assert!(normalize_signal("TERM; rm -rf /").is_err());
        assert!(normalize_signal("").is_err());
    }

    #[test]
    fn pid_zero_is_rejected() {
        assert!(SignalAction::new(0, "TERM", Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn log_only_action_succeeds() {
        let ctx = context();
        assert!(LogOnlyAction.execute(&ctx).await.is_ok());
        assert_eq!(LogOnlyAction.name(), "log");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_action_terminates_target() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        let action = SignalAction::new(pid, "TERM", Duration::ZERO).unwrap();

        action.execute(&context()).await.unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}
