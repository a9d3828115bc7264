//! Runs: an ordered ledger plus an optional detached signature, and the JSON
//! run-file format they are exchanged in.

use super::ledger::{self, Ledger, StepFields, StepRecord};
use crate::error::{InputError, IntegrityError, SignatureError, WatchdogError};
use crate::security::signing::{self, RunSigner, RunVerifier};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSeal {
    pub run_hash: String,
    pub run_signature: String,
    pub signer_key: String,
}

/// A live run. Appending is refused once the run is sealed.
#[derive(Debug, Clone, Default)]
pub struct Run {
    ledger: Ledger,
    seal: Option<RunSeal>,
}

impl Run {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fields: StepFields) -> Result<&StepRecord, IntegrityError> {
        if self.seal.is_some() {
            return Err(IntegrityError::SignedRunSealed);
        }
        Ok(self.ledger.append(fields))
    }

    pub fn steps(&self) -> &[StepRecord] {
        self.ledger.steps()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    pub fn run_hash(&self) -> &str {
        self.ledger.run_hash()
    }

    pub fn seal(&self) -> Option<&RunSeal> {
        self.seal.as_ref()
    }

    /// Sign the current run hash. The chain is verified first.
    pub fn sign(&mut self, signer: &RunSigner, key_id: &str) -> Result<&RunSeal, WatchdogError> {
        self.ledger.verify()?;
        let run_hash = self.ledger.run_hash().to_string();
        let signature = signer.sign(run_hash.as_bytes());
        Ok(self.seal.insert(RunSeal {
            run_hash,
            run_signature: signing::encode_signature(&signature),
            signer_key: key_id.to_string(),
        }))
    }

    pub fn to_run_file(&self) -> RunFile {
        let step_logs = self
            .ledger
            .steps()
            .iter()
            .filter_map(|s| serde_json::to_value(s).ok())
            .collect();
        RunFile {
            step_logs: Some(step_logs),
            run_hash: self.seal.as_ref().map(|s| s.run_hash.clone()),
            run_signature: self.seal.as_ref().map(|s| s.run_signature.clone()),
            signer_key: self.seal.as_ref().map(|s| s.signer_key.clone()),
            extra: Map::new(),
        }
    }
}

/// On-disk run file. Steps are kept as raw JSON so that files written by
/// other producers hash exactly as stored; unknown top-level keys survive a
/// read/write cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(default, alias = "steps", skip_serializing_if = "Option::is_none")]
    pub step_logs: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of a successful audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub steps: usize,
    pub run_hash: String,
    pub signer_key: Option<String>,
}

impl RunFile {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        serde_json::from_str(raw.trim_start_matches('\u{feff}'))
            .map_err(|e| InputError::Json(e.to_string()))
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read run file {}", path.display()))?;
        Ok(Self::parse(&raw)?)
    }

    /// Write via a sibling temp file and rename, so a crash never leaves a
    /// half-written run file at `path`.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("failed to create run file directory")?;
        }
        let data = serde_json::to_vec_pretty(self).context("failed to serialize run file")?;

        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp_name);
        let written = fs::File::create(&tmp)
            .and_then(|mut f| f.write_all(&data).and_then(|()| f.sync_all()))
            .and_then(|()| fs::rename(&tmp, path));
        if let Err(error) = written {
            let _ = fs::remove_file(&tmp);
            return Err(error).with_context(|| format!("failed to write {}", path.display()));
        }
        Ok(())
    }

    pub fn steps(&self) -> Result<&[Value], InputError> {
        self.step_logs.as_deref().ok_or(InputError::MissingSteps)
    }

    pub fn computed_run_hash(&self) -> Result<String, WatchdogError> {
        let steps = self.steps()?;
        ledger::verify_chain(steps)?;
        Ok(ledger::run_hash_of_values(steps))
    }

    /// Verify the chain, then attach `run_hash`, `run_signature` and
    /// `signer_key`. Nothing is modified when verification fails.
    pub fn sign(&mut self, signer: &RunSigner, key_id: &str) -> Result<String, WatchdogError> {
        let run_hash = self.computed_run_hash()?;
        let signature = signer.sign(run_hash.as_bytes());
        self.run_hash = Some(run_hash.clone());
        self.run_signature = Some(signing::encode_signature(&signature));
        self.signer_key = Some(key_id.to_string());
        Ok(run_hash)
    }

    /// Chain, then stored run hash, then signature. The first failure wins.
    pub fn audit(&self, verifier: &RunVerifier) -> Result<AuditReport, WatchdogError> {
        let computed = self.computed_run_hash()?;
        let stored = self
            .run_hash
            .as_deref()
            .ok_or(IntegrityError::MissingRunHash)?;
        if stored != computed {
            return Err(IntegrityError::RunHashMismatch {
                stored: stored.to_string(),
                computed,
            }
            .into());
        }
        let encoded = self
            .run_signature
            .as_deref()
            .ok_or(SignatureError::Missing)?;
        let signature = signing::decode_signature(encoded)?;
        verifier.check(stored.as_bytes(), &signature)?;

        Ok(AuditReport {
            steps: self.steps()?.len(),
            run_hash: computed,
            signer_key: self.signer_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::detector::AlertLevel;
    use crate::security::signing::generate_keypair;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(t: u64, c: f64) -> StepFields {
        StepFields {
            t,
            c,
            beta: 1.0,
            recovery_margin: 0.0,
            alert_level: AlertLevel::Red,
        }
    }

    fn signed_pair() -> (RunSigner, RunVerifier) {
        let pair = generate_keypair().unwrap();
        (
            RunSigner::from_pem(&pair.private_pem).unwrap(),
            RunVerifier::from_pem(&pair.public_pem).unwrap(),
        )
    }

    #[test]
    fn sealed_run_rejects_appends() {
        let (signer, _) = signed_pair();
        let mut run = Run::new();
        run.append(fields(0, 0.5)).unwrap();
        run.sign(&signer, "ops").unwrap();
        assert_eq!(
            run.append(fields(1, 0.4)).unwrap_err(),
            IntegrityError::SignedRunSealed
        );
    }

    #[test]
    fn run_file_round_trip_audits() {
        let (signer, verifier) = signed_pair();
        let mut run = Run::new();
        for t in 0..4 {
            run.append(fields(t, 0.5)).unwrap();
        }
        let mut file = run.to_run_file();
        file.sign(&signer, "ops").unwrap();

        let report = file.audit(&verifier).unwrap();
        assert_eq!(report.steps, 4);
        assert_eq!(report.run_hash, run.run_hash());
        assert_eq!(report.signer_key.as_deref(), Some("ops"));
    }

    #[test]
    fn legacy_steps_alias_is_accepted() {
        let file = RunFile::parse(r#"{"steps": [], "note": "kept"}"#).unwrap();
        assert_eq!(file.steps().unwrap().len(), 0);
        assert_eq!(file.extra.get("note"), Some(&json!("kept")));
    }

    #[test]
    fn byte_order_mark_is_tolerated() {
        let file = RunFile::parse("\u{feff}{\"step_logs\": []}").unwrap();
        assert!(file.steps().is_ok());
    }

    #[test]
    fn missing_steps_is_an_input_error() {
        let file = RunFile::parse(r#"{"run_hash": "x"}"#).unwrap();
        assert!(matches!(file.steps(), Err(InputError::MissingSteps)));
    }

    #[test]
    fn signing_a_broken_chain_leaves_file_untouched() {
        let (signer, _) = signed_pair();
        let mut run = Run::new();
        run.append(fields(0, 0.5)).unwrap();
        let mut file = run.to_run_file();
        file.step_logs.as_mut().unwrap()[0]["C"] = json!(0.9);
        let before = file.clone();

        assert!(file.sign(&signer, "ops").is_err());
        assert_eq!(file, before);
    }

    #[test]
    fn audit_reports_tampered_run_hash() {
        let (signer, verifier) = signed_pair();
        let mut run = Run::new();
        run.append(fields(0, 0.5)).unwrap();
        let mut file = run.to_run_file();
        file.sign(&signer, "ops").unwrap();
        file.run_hash = Some("0".repeat(64));

        assert!(matches!(
            file.audit(&verifier),
            Err(WatchdogError::Integrity(IntegrityError::RunHashMismatch { .. }))
        ));
    }

    #[test]
    fn audit_rejects_foreign_signature() {
        let (signer, _) = signed_pair();
        let (_, other_verifier) = signed_pair();
        let mut run = Run::new();
        run.append(fields(0, 0.5)).unwrap();
        let mut file = run.to_run_file();
        file.sign(&signer, "ops").unwrap();

        assert!(matches!(
            file.audit(&other_verifier),
            Err(WatchdogError::Signature(SignatureError::Invalid))
        ));
    }

    #[test]
    fn full_precision_floats_survive_write_and_reread() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        let mut rng = StdRng::seed_from_u64(11);
        let mut run = Run::new();
        run.append(fields(0, 0.994_141_423_413_993_5)).unwrap();
        for t in 1..500 {
            let mut step = fields(t, rng.random::<f64>());
            step.beta = 0.5 + 1.5 * rng.random::<f64>();
            step.recovery_margin = rng.random::<f64>() - 0.5;
            run.append(step).unwrap();
        }
        run.to_run_file().write_atomic(&path).unwrap();

        let loaded = RunFile::read(&path).unwrap();
        assert_eq!(loaded.computed_run_hash().unwrap(), run.run_hash());
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("run.json");
        let mut run = Run::new();
        run.append(fields(0, 0.5)).unwrap();
        run.to_run_file().write_atomic(&path).unwrap();

        let loaded = RunFile::read(&path).unwrap();
        assert_eq!(loaded.steps().unwrap().len(), 1);
        assert!(!dir.path().join("out").join("run.json.tmp").exists());
        assert!(loaded.computed_run_hash().is_ok());
    }
}
