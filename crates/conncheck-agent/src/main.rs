//! Connectivity agent binary

use conncheck_agent::{Config, ConnCheckAgent, setup_tracing_with_otel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is not initialized until the logging settings are known
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    let _telemetry_guard = setup_tracing_with_otel(
        &config.telemetry.service_name,
        &config.telemetry.otlp_endpoint,
        config.telemetry.enabled,
        config.logging.level(),
        config.logging.is_json(),
    )?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Connectivity agent starting");

    ConnCheckAgent::new(config).run().await?;

    Ok(())
}
