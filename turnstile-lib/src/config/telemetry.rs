use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelemetryConfig {
    /// Port of the observability server (`/metrics`, `/health`, `/ready`, `/live`).
    /// Unset disables both the server and metric collection.
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// Verbosity of the OpenTelemetry SDK's own diagnostics
    #[serde(default = "default_otel_log_level")]
    pub otel_log_level: String,
}

/// Log output settings; `RUST_LOG` replaces the whole filter when set
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Level of the `security` target that carries denial events.
    /// `"off"` silences them without touching the rest of the output
    #[serde(default = "default_security_level")]
    pub security_level: String,
    /// Print the log target (module path or `security`) with each line
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            security_level: default_security_level(),
            show_target: false,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directives for these settings plus the OpenTelemetry level
    pub fn filter_directives(&self, otel_log_level: &str) -> String {
        format!(
            "{},{}={},opentelemetry={otel_log_level}",
            self.level,
            crate::security::SECURITY_TARGET,
            self.security_level
        )
    }
}

fn default_otel_log_level() -> String {
    "warn".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_security_level() -> String {
    "warn".to_string()
}
