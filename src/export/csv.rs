//! Append-only CSV ledger export.
//!
//! The file gets its header on first use and one row per tick afterwards.
//! Timestamps are RFC 3339 UTC; numeric values are rounded to six decimals.

use crate::engine::{AlertLevel, MetricSnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const BASE_HEADER: &str = "timestamp,coherence_C,recovery_margin,alert_level";
const RAW_HEADER: &str = ",cpu_usage,mem_usage,error_rate";
const REPORT_HEADER: &str = "t,alert,recovery_margin";

#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub timestamp: DateTime<Utc>,
    pub coherence: f64,
    pub recovery_margin: f64,
    pub alert_level: AlertLevel,
    pub snapshot: MetricSnapshot,
}

pub struct CsvLedger {
    path: PathBuf,
    include_raw: bool,
    file: File,
}

impl CsvLedger {
    pub fn open(path: &Path, include_raw: bool) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let needs_header = fs::metadata(path).map_or(true, |m| m.len() == 0);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open CSV ledger {}", path.display()))?;

        if needs_header {
            let header = if include_raw {
                format!("{BASE_HEADER}{RAW_HEADER}")
            } else {
                BASE_HEADER.to_string()
            };
            writeln!(file, "{header}").context("failed to write CSV header")?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            include_raw,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, row: &CsvRow) -> Result<()> {
        let mut line = format!(
            "{},{},{},{}",
            row.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            round6(row.coherence),
            round6(row.recovery_margin),
            row.alert_level
        );
        if self.include_raw {
            line.push_str(&format!(
                ",{},{},{}",
                round6(row.snapshot.cpu_usage),
                round6(row.snapshot.mem_usage),
                round6(row.snapshot.error_rate)
            ));
        }
        writeln!(self.file, "{line}")
            .and_then(|()| self.file.flush())
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// `detect` output: one `(t, alert, recovery_margin)` row per replayed step.
pub fn write_detector_report(path: &Path, rows: &[(String, AlertLevel, f64)]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{REPORT_HEADER}")?;
    for (t, alert, margin) in rows {
        writeln!(out, "{t},{alert},{margin}")?;
    }
    out.flush()
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(margin: f64) -> CsvRow {
        CsvRow {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            coherence: 0.612_345_678,
            recovery_margin: margin,
            alert_level: AlertLevel::Green,
            snapshot: MetricSnapshot::new(12.5, 40.0, 0.0),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("pilot.csv");

        let mut ledger = CsvLedger::open(&path, false).unwrap();
        ledger.append(&row(0.02)).unwrap();
        drop(ledger);
        let mut ledger = CsvLedger::open(&path, false).unwrap();
        ledger.append(&row(0.03)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], BASE_HEADER);
        assert_eq!(
            lines[1],
            "2023-11-14T22:13:20.000000Z,0.612346,0.02,GREEN"
        );
    }

    #[test]
    fn raw_columns_are_optional() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        let mut ledger = CsvLedger::open(&path, true).unwrap();
        ledger.append(&row(0.0)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,coherence_C,recovery_margin,alert_level,cpu_usage,mem_usage,error_rate"
        );
        assert!(lines.next().unwrap().ends_with(",GREEN,12.5,40,0"));
    }

    #[test]
    fn detector_report_has_fixed_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        write_detector_report(
            &path,
            &[("0".into(), AlertLevel::Red, 0.0), ("1".into(), AlertLevel::Yellow, 0.25)],
        )
        .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "t,alert,recovery_margin\n0,RED,0\n1,YELLOW,0.25\n");
    }
}
