mod loader;
mod root;
mod routes;
mod security;
mod telemetry;
mod timeout;
mod validator;

pub use loader::{load_from_path, load_from_str};
pub use root::Config;
pub use routes::Route;
pub use security::{
    IdentityConfig, PolicyConfig, RateLimitConfig, SuspicionAction, SuspicionConfig, TrustMode,
};
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use timeout::{KeepAliveConfig, TimeoutConfig};
pub use validator::validate;
