mod bms;
mod config;
mod models;
mod server;
mod state;
mod utils;

use log::{error, info};
use tokio::sync::watch;

use bms::{BmsMonitor, SerialSource};
use config::MonitorConfig;
use state::MonitorState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging, RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let state = MonitorState::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let source = SerialSource::new(config.serial_port.clone(), config.baud_rate);
    let monitor = BmsMonitor::new(source, state.clone(), config.link.clone());
    let monitor_task = tokio::spawn(monitor.run(shutdown_rx.clone()));

    let mut server_task = tokio::spawn(server::serve(
        config.http_bind,
        config.static_dir.clone(),
        state,
        shutdown_rx,
    ));

    // Run until the HTTP server dies or Ctrl+C is pressed
    let early_exit = tokio::select! {
        result = &mut server_task => Some(result),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Program terminated by user. Shutting down.");
            None
        }
    };

    shutdown_tx.send_replace(true);
    if let Err(e) = monitor_task.await {
        error!("BMS monitor task failed: {}", e);
    }

    let server_result = match early_exit {
        Some(result) => result,
        None => server_task.await,
    };

    match server_result {
        Ok(Ok(())) => {
            info!("Program completed successfully");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("HTTP server error: {}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("HTTP server task failed: {}", e);
            Err(e.into())
        }
    }
}
