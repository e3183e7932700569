pub mod health;
pub mod metrics;
pub mod server;
pub mod tracing;

pub use health::{health_check_response, live_check_response, ready_check_response};
pub use metrics::{init_metrics, Metrics};
pub use server::{metrics_response, serve_observability, start_observability_server, Readiness};
pub use tracing::init_tracing;
