use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `recovery-watchdog` - recovery-debt detection with a signed audit trail.
#[derive(Parser, Debug)]
#[command(name = "recovery-watchdog")]
#[command(version)]
#[command(
    about = "Detect recovery debt and produce tamper-evident, signed run records.",
    long_about = None
)]
pub struct Cli {
    /// Config file (default: ~/.recovery-watchdog/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a run file through the detector and write a CSV report
    Detect {
        /// Run file containing `step_logs` (or legacy `steps`)
        #[arg(long)]
        run: PathBuf,

        /// Stress threshold (default: detector.beta_base from config)
        #[arg(long)]
        beta_base: Option<f64>,

        /// Healthy coherence baseline (default: detector.c_baseline from config)
        #[arg(long)]
        c_baseline: Option<f64>,

        /// Report path
        #[arg(long, default_value = "detector_report.csv")]
        output: PathBuf,

        /// Do not print one line per step
        #[arg(long)]
        quiet: bool,
    },

    /// Generate an Ed25519 signing key pair
    Keygen {
        /// Key name; writes <name>.private.pem and <name>.public.pem
        #[arg(long)]
        output: PathBuf,
    },

    /// Verify a run's hash chain, then sign its run hash
    #[command(name = "sign-run", alias = "sign_run")]
    SignRun {
        #[arg(long)]
        run: PathBuf,

        /// Private key PEM
        #[arg(long)]
        key: PathBuf,

        /// Signed run file to write
        #[arg(long)]
        output: PathBuf,
    },

    /// Check chain, run hash and signature of a signed run
    #[command(name = "verify-run", alias = "verify_run")]
    VerifyRun {
        #[arg(long)]
        run: PathBuf,

        /// Public key PEM
        #[arg(long)]
        key: PathBuf,
    },

    /// Reduce one metric snapshot (JSON) and print C, beta, margin and alert
    Reduce {
        /// Snapshot file; reads stdin when omitted
        input: Option<PathBuf>,
    },

    /// Run the live monitoring loop until Ctrl-C
    Watch,
}

impl Commands {
    /// Key and run-file commands work offline and never touch the config file.
    pub fn needs_config(&self) -> bool {
        matches!(self, Self::Detect { .. } | Self::Reduce { .. } | Self::Watch)
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn underscore_aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "recovery-watchdog",
            "sign_run",
            "--run",
            "run.json",
            "--key",
            "ops.private.pem",
            "--output",
            "signed.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::SignRun { .. }));

        let cli = Cli::try_parse_from([
            "recovery-watchdog",
            "verify_run",
            "--run",
            "signed.json",
            "--key",
            "ops.public.pem",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::VerifyRun { .. }));
    }

    #[test]
    fn detect_defaults_output_path() {
        let cli = Cli::try_parse_from(["recovery-watchdog", "detect", "--run", "r.json"]).unwrap();
        match cli.command {
            Commands::Detect {
                output,
                quiet,
                beta_base,
                ..
            } => {
                assert_eq!(output.to_str(), Some("detector_report.csv"));
                assert!(!quiet);
                assert!(beta_base.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["recovery-watchdog", "watch", "--config", "/tmp/w.toml"]).unwrap();
        assert_eq!(cli.config.unwrap().to_str(), Some("/tmp/w.toml"));
    }

    #[test]
    fn offline_commands_skip_config() {
        let keygen = Cli::try_parse_from(["recovery-watchdog", "keygen"]).unwrap();
        assert!(!keygen.command.needs_config());

        let verify = Cli::try_parse_from([
            "recovery-watchdog",
            "verify-run",
            "--run",
            "signed.json",
            "--key",
            "ops.public.pem",
        ])
        .unwrap();
        assert!(!verify.command.needs_config());

        let watch = Cli::try_parse_from(["recovery-watchdog", "watch"]).unwrap();
        assert!(watch.command.needs_config());
    }
}
