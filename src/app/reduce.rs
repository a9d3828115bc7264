use anyhow::{Context, Result};
use recovery_watchdog::Config;
use recovery_watchdog::engine::{MetricSnapshot, detect, reduce};
use std::io::Read;
use std::path::Path;

pub fn run(input: Option<&Path>, config: &Config) -> Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read snapshot from stdin")?;
            buf
        }
    };
    println!("{}", render(&raw, config)?);
    Ok(())
}

fn render(raw: &str, config: &Config) -> Result<String> {
    let snapshot = MetricSnapshot::from_json(raw)?;
    let reading = reduce(&snapshot);
    let detection = detect(reading.c, reading.beta, &config.detector.settings());
    Ok(format!(
        "C={:.6} beta={:.6} recovery_margin={:.6} alert={}",
        reading.c, reading.beta, detection.recovery_margin, detection.alert_level
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_healthy_snapshot() {
        let line = render(
            r#"{"cpu_usage": 10, "mem_usage": 20, "error_rate": 0}"#,
            &Config::default(),
        )
        .unwrap();
        assert!(line.starts_with("C="));
        assert!(line.ends_with("alert=GREEN"));
    }

    #[test]
    fn rejects_negative_metrics() {
        let err = render(
            r#"{"cpu_usage": -1, "mem_usage": 20, "error_rate": 0}"#,
            &Config::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("malformed metric snapshot"));
    }
}
