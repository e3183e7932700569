use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{LoggingConfig, TelemetryConfig};

/// Install the global subscriber for the gateway.
///
/// Denials are written on the `security` target, so they can be routed or
/// silenced separately, e.g. `RUST_LOG=info,security=off`.
pub fn init_tracing(
    logging: &LoggingConfig,
    telemetry: &TelemetryConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(logging.filter_directives(&telemetry.otel_log_level))
            .map_err(|e| format!("Invalid log level in [logging]: {e}"))?,
    };
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(logging.show_target);

    tracing::subscriber::set_global_default(Registry::default().with(env_filter).with(fmt_layer))
        .map_err(|e| format!("Failed to set global tracing subscriber: {e}"))?;
    Ok(())
}
