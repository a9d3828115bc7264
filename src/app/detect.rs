use anyhow::{Context, Result};
use recovery_watchdog::engine::{AlertLevel, DetectorSettings, RunFile, detect};
use recovery_watchdog::error::InputError;
use recovery_watchdog::export::write_detector_report;
use serde_json::Value;
use std::path::Path;

/// One replayed step: `(t, alert, recovery_margin)`.
pub type ReportRow = (String, AlertLevel, f64);

/// Replay recorded steps through the detector. `beta` falls back to
/// `beta_eff`, then to the configured `beta_base`; `t` falls back to `step`.
pub fn replay(steps: &[Value], settings: &DetectorSettings) -> Result<Vec<ReportRow>, InputError> {
    if steps.is_empty() {
        return Err(InputError::MissingSteps);
    }

    steps
        .iter()
        .enumerate()
        .map(|(index, step)| -> Result<ReportRow, InputError> {
            let c = step
                .get("C")
                .and_then(Value::as_f64)
                .ok_or_else(|| InputError::MissingStepField {
                    index,
                    key: "C".into(),
                })?;
            let beta = step
                .get("beta")
                .or_else(|| step.get("beta_eff"))
                .and_then(Value::as_f64)
                .unwrap_or(settings.beta_base);
            let t = match step.get("t").or_else(|| step.get("step")) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };

            let detection = detect(c, beta, settings);
            Ok((t, detection.alert_level, detection.recovery_margin))
        })
        .collect()
}

pub fn run(run_path: &Path, settings: &DetectorSettings, output: &Path, quiet: bool) -> Result<()> {
    let file = RunFile::read(run_path)?;
    let rows = replay(file.steps()?, settings)
        .with_context(|| format!("cannot replay {}", run_path.display()))?;

    if !quiet {
        for (t, alert, margin) in &rows {
            println!("{t} {alert} {margin}");
        }
    }

    write_detector_report(output, &rows)?;
    println!("OK: wrote {} rows -> {}", rows.len(), output.display());
    Ok(())
}
