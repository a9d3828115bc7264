use crate::config::Config;
use crate::engine::{
    AlertLevel, CoherenceReading, Detection, DetectorSettings, MetricSnapshot,
    RecoveryDebtDetector, RecoveryMetrics, Run, StepFields, StepRecord, TrendTracker, reduce,
};
use crate::escalation::{
    AlertLedgerState, EscalationPolicy, Escalator, TriggerOutcome, create_action,
};
use crate::export::{CsvLedger, CsvRow};
use crate::notify::{DispatchReport, Notification, Notifier};
use crate::runtime::observability::{
    NoopObserver, Observer, ObserverEvent, ObserverMetric, create_observer,
};
use crate::sources::{MetricSource, create_source};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything one recorded tick produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub entity: String,
    pub snapshot: MetricSnapshot,
    pub reading: CoherenceReading,
    pub detection: Detection,
    pub step: StepRecord,
    pub trend: Option<RecoveryMetrics>,
    pub dispatch: Option<DispatchReport>,
    pub trigger: Option<TriggerOutcome>,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    Recorded(Box<TickReport>),
    /// Nothing was appended this tick.
    Skipped { reason: String },
}

/// Fixed-interval monitoring loop for a single entity. All state (ledger,
/// trend history, escalation, cooldowns) is owned here, so independent
/// entities run as independent loops.
pub struct WatchLoop {
    entity: String,
    source: Box<dyn MetricSource>,
    detector: RecoveryDebtDetector,
    run: Run,
    trend: TrendTracker,
    escalator: Escalator,
    notifier: Notifier,
    min_level: AlertLevel,
    csv: Option<CsvLedger>,
    observer: Box<dyn Observer>,
    poll_interval: Duration,
    run_path: Option<PathBuf>,
    reports: Option<mpsc::Sender<TickReport>>,
    next_t: u64,
}

impl WatchLoop {
    pub fn new(
        entity: impl Into<String>,
        source: Box<dyn MetricSource>,
        detector: DetectorSettings,
        escalator: Escalator,
        notifier: Notifier,
    ) -> Self {
        Self {
            entity: entity.into(),
            source,
            detector: RecoveryDebtDetector::new(detector),
            run: Run::new(),
            trend: TrendTracker::default(),
            escalator,
            notifier,
            min_level: AlertLevel::Yellow,
            csv: None,
            observer: Box::new(NoopObserver),
            poll_interval: Duration::from_secs(1),
            run_path: None,
            reports: None,
            next_t: 0,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let escalator = Escalator::new(
            EscalationPolicy::new(config.escalation.settings()),
            create_action(&config.escalation)?,
        );
        let notifier = Notifier::from_config(&config.alerts)?;
        let csv = CsvLedger::open(
            &crate::security::key_files::expand_path(&config.watch.csv_path),
            config.watch.include_raw_metrics,
        )?;
        let poll_interval = Duration::try_from_secs_f64(config.watch.poll_interval_secs)
            .context("watch.poll_interval_secs is out of range")?;

        let mut watch = Self::new(
            config.watch.entity.clone(),
            create_source(&config.source),
            config.detector.settings(),
            escalator,
            notifier,
        )
        .with_csv(csv)
        .with_observer(create_observer(&config.observability))
        .with_trend_window(config.detector.trend_window)
        .with_min_level(config.alerts.min_level)
        .with_poll_interval(poll_interval);
        if let Some(path) = &config.watch.run_path {
            watch = watch.with_run_path(crate::security::key_files::expand_path(path));
        }
        Ok(watch)
    }

    pub fn with_csv(mut self, csv: CsvLedger) -> Self {
        self.csv = Some(csv);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_trend_window(mut self, window: usize) -> Self {
        self.trend = TrendTracker::new(window);
        self
    }

    pub fn with_min_level(mut self, level: AlertLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_run_path(mut self, path: PathBuf) -> Self {
        self.run_path = Some(path);
        self
    }

    pub fn with_report_sink(mut self, sink: mpsc::Sender<TickReport>) -> Self {
        self.reports = Some(sink);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn current_run(&self) -> &Run {
        &self.run
    }

    pub fn state(&self) -> AlertLedgerState {
        let policy = self.escalator.policy();
        AlertLedgerState {
            last_alert_time: self.notifier.cooldown().snapshot(),
            consecutive_breach_count: policy.consecutive_breach_count(),
            phase_triggered: policy.phase_triggered(),
        }
    }

    /// Run one tick as of `now`: collect, reduce, detect, append, notify,
    /// escalate. Unavailable metrics skip the tick without touching the ledger.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let started = Instant::now();

        let snapshot = match self.source.sample().await {
            Ok(snapshot) => snapshot,
            Err(error) => return self.skip(error.to_string()),
        };
        if let Err(error) = snapshot.validate() {
            return self.skip(error.to_string());
        }

        let reading = reduce(&snapshot);
        let detection = self.detector.update(reading.c, reading.beta);
        let fields = StepFields::new(self.next_t, reading.c, reading.beta, detection);
        let step = match self.run.append(fields) {
            Ok(step) => step.clone(),
            Err(error) => return self.skip(error.to_string()),
        };
        self.next_t += 1;

        self.trend.push(detection.recovery_margin);
        let trend = self.trend.snapshot();
        tracing::debug!(
            entity = %self.entity,
            c = reading.c,
            beta = reading.beta,
            margin = detection.recovery_margin,
            alert = %detection.alert_level,
            "tick recorded"
        );

        self.export_row(now, reading, detection, snapshot);
        self.observer
            .record_metric(&ObserverMetric::Coherence(reading.c));
        self.observer
            .record_metric(&ObserverMetric::RecoveryMargin(detection.recovery_margin));

        let dispatch = if detection.alert_level >= self.min_level {
            Some(self.notify(now, reading, detection, snapshot).await)
        } else {
            None
        };

        let trigger = self.escalator.observe(&self.entity, detection).await;
        if trigger.is_some() {
            self.observer.record_event(&ObserverEvent::PhaseTriggered {
                entity: self.entity.clone(),
                consecutive_breaches: self.escalator.policy().consecutive_breach_count(),
                read_only: self.escalator.policy().read_only(),
            });
        }

        let elapsed = started.elapsed();
        self.observer
            .record_metric(&ObserverMetric::TickLatency(elapsed));
        self.observer.record_event(&ObserverEvent::TickCompleted {
            entity: self.entity.clone(),
            alert_level: detection.alert_level,
            duration: elapsed,
        });

        let report = TickReport {
            entity: self.entity.clone(),
            snapshot,
            reading,
            detection,
            step,
            trend,
            dispatch,
            trigger,
        };
        if let Some(sink) = &self.reports
            && let Err(mpsc::error::TrySendError::Full(_)) = sink.try_send(report.clone())
        {
            tracing::warn!(entity = %self.entity, "report sink full; dropping tick report");
        }
        TickOutcome::Recorded(Box::new(report))
    }

    fn skip(&self, reason: String) -> TickOutcome {
        tracing::warn!(entity = %self.entity, reason = %reason, "tick skipped");
        self.observer.record_event(&ObserverEvent::TickSkipped {
            entity: self.entity.clone(),
            reason: reason.clone(),
        });
        TickOutcome::Skipped { reason }
    }

    fn export_row(
        &mut self,
        now: DateTime<Utc>,
        reading: CoherenceReading,
        detection: Detection,
        snapshot: MetricSnapshot,
    ) {
        let Some(csv) = self.csv.as_mut() else {
            return;
        };
        let row = CsvRow {
            timestamp: now,
            coherence: reading.c,
            recovery_margin: detection.recovery_margin,
            alert_level: detection.alert_level,
            snapshot,
        };
        if let Err(error) = csv.append(&row) {
            tracing::warn!(path = %csv.path().display(), error = %error, "CSV export failed");
            self.observer.record_event(&ObserverEvent::Error {
                component: "csv".into(),
                message: format!("{error:#}"),
            });
        }
    }

    async fn notify(
        &mut self,
        now: DateTime<Utc>,
        reading: CoherenceReading,
        detection: Detection,
        snapshot: MetricSnapshot,
    ) -> DispatchReport {
        self.observer.record_event(&ObserverEvent::AlertRaised {
            entity: self.entity.clone(),
            alert_level: detection.alert_level,
            recovery_margin: detection.recovery_margin,
        });

        let notification = Notification {
            alert_level: detection.alert_level,
            message: alert_message(reading, detection, self.detector.settings()),
            entity: self.entity.clone(),
            coherence: reading.c,
            recovery_margin: detection.recovery_margin,
            snapshot,
            timestamp: now,
        };
        let report = self.notifier.dispatch(&notification, now).await;

        if report.suppressed {
            self.observer
                .record_event(&ObserverEvent::NotificationSuppressed {
                    alert_level: detection.alert_level,
                });
        }
        for channel in &report.delivered {
            self.observer.record_event(&ObserverEvent::NotificationSent {
                channel: channel.clone(),
                alert_level: detection.alert_level,
            });
        }
        for (channel, message) in &report.failed {
            self.observer
                .record_event(&ObserverEvent::NotificationFailed {
                    channel: channel.clone(),
                    message: message.clone(),
                });
        }
        report
    }

    /// Tick until `cancel` fires, then persist the run if a path is set.
    /// Cancellation is checked before each tick and raced against the sleep;
    /// an in-flight tick always completes.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<Run> {
        tracing::info!(
            entity = %self.entity,
            source = self.source.name(),
            interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            action = self.escalator.action_name(),
            read_only = self.escalator.policy().read_only(),
            "watch loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.tick_at(Utc::now()).await;

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.finish()
    }

    fn finish(self) -> Result<Run> {
        tracing::info!(entity = %self.entity, steps = self.run.len(), "watch loop stopped");
        if let Some(path) = &self.run_path {
            self.run
                .to_run_file()
                .write_atomic(path)
                .with_context(|| format!("failed to persist run to {}", path.display()))?;
            tracing::info!(path = %path.display(), run_hash = %self.run.run_hash(), "run written");
        }
        self.observer.flush();
        Ok(self.run)
    }
}

fn alert_message(reading: CoherenceReading, detection: Detection, settings: DetectorSettings) -> String {
    match detection.alert_level {
        AlertLevel::Red => format!(
            "Recovery margin exhausted: C={:.3} is at or below baseline {:.3}",
            reading.c, settings.c_baseline
        ),
        AlertLevel::Yellow => format!(
            "Stress above baseline: beta={:.3} exceeds {:.3} (margin {:.3})",
            reading.beta, settings.beta_base, detection.recovery_margin
        ),
        AlertLevel::Green => format!("System healthy (margin {:.3})", detection.recovery_margin),
    }
}
