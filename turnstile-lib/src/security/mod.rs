//! Request guard: identity resolution, category quotas and abuse heuristics.
//!
//! One [`Guard`] is built from configuration at startup and shared by every
//! connection. Per request the data flows in one direction:
//!
//! ```text
//! IdentityResolver -> SuspicionDetector -> RateLimiter -> GuardVerdict -> rate limit headers
//! ```
//!
//! The window stores inside the limiter and the detector are the only mutable
//! shared state; the background sweeper reclaims their expired records.

pub mod events;
pub mod guard;
pub mod headers;
pub mod identity;
pub mod rate_limit;
pub mod request;
pub mod suspicion;
pub mod sweeper;
pub mod trusted_proxy;

pub use events::{EventType, SecurityEvent, Severity, SECURITY_TARGET};
pub use guard::{Guard, GuardVerdict, RateLimitCheck, SweepStats};
pub use headers::{apply_rate_limit_headers, rate_limit_headers};
pub use identity::IdentityResolver;
pub use rate_limit::{Category, Policy, PolicyTable, RateLimitDecision, RateLimiter};
pub use request::ClientRequest;
pub use suspicion::{SuspicionDetector, SuspicionReason, SuspicionVerdict};
pub use sweeper::{spawn_sweeper, sweep_once};
pub use trusted_proxy::is_trusted_proxy;
