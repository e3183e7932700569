//! HTTP front end: routes each request to a category, runs it through the
//! [`Guard`](crate::security::Guard) and forwards admitted requests upstream.

pub mod client_pool;
pub mod connection;
pub mod forwarding;
pub mod handler;
pub mod http_result;
pub mod routing;
pub mod server;
pub mod state;
pub mod synthetic_response;

pub use handler::handle_request;
pub use http_result::HttpError;
pub use routing::{pick_route, RouteMatch};
pub use server::{run, serve, shutdown_on_signals};
pub use state::GatewayState;
pub use synthetic_response::X_TURNSTILE_REASON;
