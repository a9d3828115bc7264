use anyhow::{Context, Result};
use recovery_watchdog::engine::RunFile;
use recovery_watchdog::security::{key_id_from_path, load_signer};
use std::path::Path;

/// Verify the chain, sign the run hash and write the augmented run file.
/// The output is only written after every check has passed.
pub fn run(run_path: &Path, key: &Path, output: &Path) -> Result<()> {
    let mut file = RunFile::read(run_path)?;
    let signer = load_signer(key)?;
    let steps = file.steps()?.len();

    let run_hash = file
        .sign(&signer, &key_id_from_path(key))
        .context("hash chain verification failed")?;
    println!("Hash chain verified ({steps} steps)");
    println!("Run hash: {run_hash}");

    file.write_atomic(output)?;
    tracing::info!(output = %output.display(), steps, "run signed");
    println!("Signed run saved to: {}", output.display());
    Ok(())
}
