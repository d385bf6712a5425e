use anyhow::Context;
use palwatch::{Config, Dispatcher, PollLoop, RconConnector, TokioClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Invalid settings are the one failure that ends the process.
    let config = Config::from_env().context("invalid configuration")?;
    let _log_guard = palwatch::logging::init_logging(&config)?;

    tracing::info!("start");
    tracing::info!("Configuration: {}", config);

    let dispatcher = Dispatcher::from_config(&config).context("building notification sinks")?;
    if dispatcher.sink_names().is_empty() {
        tracing::info!("No notification sinks configured, broadcasting in game only");
    } else {
        tracing::info!("Notification sinks: {}", dispatcher.sink_names().join(", "));
    }

    let mut poll_loop = PollLoop::new(&config, RconConnector::new(&config), dispatcher, TokioClock);
    poll_loop
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
