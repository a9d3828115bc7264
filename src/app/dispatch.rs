use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use recovery_watchdog::Config;

/// `config` is `Some` exactly when [`Commands::needs_config`] holds.
pub async fn dispatch(cli: Cli, config: Option<Config>) -> Result<()> {
    match cli.command {
        Commands::Detect {
            run,
            beta_base,
            c_baseline,
            output,
            quiet,
        } => {
            let mut settings = loaded(config)?.detector.settings();
            if let Some(beta_base) = beta_base {
                settings.beta_base = beta_base;
            }
            if let Some(c_baseline) = c_baseline {
                settings.c_baseline = c_baseline;
            }
            super::detect::run(&run, &settings, &output, quiet)
        }

        Commands::Keygen { output } => super::keygen::run(&output),

        Commands::SignRun { run, key, output } => super::sign_run::run(&run, &key, &output),

        Commands::VerifyRun { run, key } => super::verify_run::run(&run, &key),

        Commands::Reduce { input } => super::reduce::run(input.as_deref(), &loaded(config)?),

        Commands::Watch => super::watch::run(&loaded(config)?).await,
    }
}

fn loaded(config: Option<Config>) -> Result<Config> {
    config.context("configuration was not loaded for this command")
}
