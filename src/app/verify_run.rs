use anyhow::Result;
use recovery_watchdog::engine::RunFile;
use recovery_watchdog::security::load_verifier;
use std::path::Path;

/// Chain, stored run hash, then signature. The first failure is returned
/// with its specific reason and the process exits non-zero.
pub fn run(run_path: &Path, key: &Path) -> Result<()> {
    let file = RunFile::read(run_path)?;
    let verifier = load_verifier(key)?;
    let report = file.audit(&verifier)?;

    tracing::info!(
        steps = report.steps,
        run_hash = %report.run_hash,
        signer = report.signer_key.as_deref().unwrap_or("-"),
        "run verified"
    );
    println!("Verification OK ({} steps, run hash {})", report.steps, report.run_hash);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recovery_watchdog::engine::{AlertLevel, Run, StepFields};
    use recovery_watchdog::security::{generate_keypair, load_signer, write_keypair};
    use tempfile::TempDir;

    fn signed_run(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let keys = write_keypair(&dir.join("ops"), &generate_keypair().unwrap()).unwrap();
        let mut run = Run::new();
        run.append(StepFields {
            t: 0,
            c: 0.4,
            beta: 1.3,
            recovery_margin: 0.0,
            alert_level: AlertLevel::Red,
        })
        .unwrap();
        let mut file = run.to_run_file();
        file.sign(&load_signer(&keys.private).unwrap(), "ops").unwrap();
        let path = dir.join("signed.json");
        file.write_atomic(&path).unwrap();
        (path, keys.public)
    }

    #[test]
    fn valid_run_verifies() {
        let dir = TempDir::new().unwrap();
        let (path, public) = signed_run(dir.path());
        run(&path, &public).unwrap();
    }

    #[test]
    fn edited_step_is_reported_as_chain_failure() {
        let dir = TempDir::new().unwrap();
        let (path, public) = signed_run(dir.path());
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replacen("0.4", "0.8", 1)).unwrap();

        let err = run(&path, &public).unwrap_err();
        assert!(err.to_string().contains("hash mismatch at step 0"));
    }

    #[test]
    fn unsigned_run_is_rejected() {
        let dir = TempDir::new().unwrap();
        let keys = write_keypair(&dir.path().join("ops"), &generate_keypair().unwrap()).unwrap();
        let path = dir.path().join("run.json");
        Run::new().to_run_file().write_atomic(&path).unwrap();

        let err = run(&path, &keys.public).unwrap_err();
        assert!(err.to_string().contains("run_hash"));
    }
}
