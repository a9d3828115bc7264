use anyhow::Result;
use recovery_watchdog::security::{generate_keypair, write_keypair};
use std::path::Path;

pub fn run(output: &Path) -> Result<()> {
    let pair = generate_keypair()?;
    let paths = write_keypair(output, &pair)?;
    tracing::info!(private = %paths.private.display(), "signing key pair generated");

    println!("Keys generated:");
    println!("{}", paths.private.display());
    println!("{}", paths.public.display());
    Ok(())
}
