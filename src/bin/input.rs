//! Edge service entry point

use cep_weather::{
    InputConfig, ServiceError, ShutdownOutcome, Supervisor,
    input::{self, InputState},
    telemetry, web,
};
use tracing::info;

const SERVICE_NAME: &str = "input-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = InputConfig::load()?;
    let telemetry = telemetry::init(SERVICE_NAME, config.otel_exporter_url.as_deref())?;

    info!(
        version = cep_weather::VERSION,
        exporting = telemetry.is_exporting(),
        ?config,
        "Starting {}",
        SERVICE_NAME
    );

    let result = serve(&config).await;
    let outcome = telemetry.flush_after(result).await?;

    if outcome == ShutdownOutcome::DrainTimedOut {
        info!("Stopped with requests still in flight");
    }

    Ok(())
}

async fn serve(config: &InputConfig) -> cep_weather::Result<ShutdownOutcome> {
    let state = InputState::new(config.orchestrator_url.clone())
        .map_err(|e| ServiceError::config(format!("{e:#}")))?;

    let supervisor = Supervisor::new(SERVICE_NAME, config.drain_timeout());
    let listener = supervisor.bind(config.port).await?;
    supervisor
        .run(listener, input::router(state), web::shutdown_signal())
        .await
}
