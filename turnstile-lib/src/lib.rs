#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod security;
pub mod telemetry;

pub use config::{load_from_path, load_from_str, Config, Route};
pub use error::{Result, TurnstileError};
pub use gateway::{run, serve, GatewayState};
pub use security::{Category, ClientRequest, Guard, GuardVerdict, RateLimitDecision};
