use anyhow::Result;
use recovery_watchdog::Config;
use recovery_watchdog::platform::WatchLoop;
use tokio_util::sync::CancellationToken;

/// Run the live loop for the configured entity until Ctrl-C.
pub async fn run(config: &Config) -> Result<()> {
    let watch = WatchLoop::from_config(config)?;
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
            Err(error) => tracing::warn!(error = %error, "cannot listen for Ctrl-C"),
        }
    });

    let run = watch.run(cancel).await?;
    println!("Recorded {} steps, run hash {}", run.len(), run.run_hash());
    Ok(())
}
