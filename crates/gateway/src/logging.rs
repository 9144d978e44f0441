use crate::config::GatewayConfig;
use common::TelemetryGuard;

/// Install logging, with OTLP export when an endpoint is configured.
///
/// The returned guard must be kept alive for as long as telemetry should
/// be exported.
pub fn init_observability(config: &GatewayConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => {
            let guard = TelemetryGuard::init("gateway", endpoint, config.environment.clone())?;
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(config.environment.clone());
            Ok(None)
        }
    }
}
