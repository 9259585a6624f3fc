//! Orchestrator service entry point

use std::sync::Arc;

use cep_weather::{
    AwesomeApiResolver, OrchestratorConfig, ServiceError, ShutdownOutcome, Supervisor,
    WeatherApiResolver,
    orchestrator::{self, OrchestratorState},
    telemetry, web,
};
use tracing::info;

const SERVICE_NAME: &str = "orchestrator-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OrchestratorConfig::load()?;
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

async fn serve(config: &OrchestratorConfig) -> cep_weather::Result<ShutdownOutcome> {
    let locations = AwesomeApiResolver::new(config.cep_api_url.clone())
        .map_err(|e| ServiceError::config(format!("Failed to create CEP resolver: {e:#}")))?;
    let weather =
        WeatherApiResolver::new(config.weather_api_url.clone(), config.weather_apikey.clone())
            .map_err(|e| ServiceError::config(format!("Failed to create weather resolver: {e:#}")))?;
    let state = OrchestratorState::new(Arc::new(locations), Arc::new(weather));

    let supervisor = Supervisor::new(SERVICE_NAME, config.drain_timeout());
    let listener = supervisor.bind(config.port).await?;
    supervisor
        .run(listener, orchestrator::router(state), web::shutdown_signal())
        .await
}
