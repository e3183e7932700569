//! Per-category, fixed-window rate limiting.
//!
//! # Architecture
//!
//! 1. **Category** (`category.rs`): the fixed set of traffic classes.
//!
//! 2. **PolicyTable** (`policy.rs`): `category → (max_requests, window)`, built
//!    once from configuration and read-only afterwards.
//!
//! 3. **WindowStore** (`store.rs`): `DashMap` of `(identity, category)` to
//!    `(count, reset_at)`. The only mutable shared state; every read, check
//!    and increment for one key happens under that key's shard lock.
//!
//! 4. **RateLimiter** (`limiter.rs`): evaluates a request against the store
//!    and the policy table and returns a [`RateLimitDecision`].
//!
//! # Example Usage
//!
//! ```ignore
//! use std::time::SystemTime;
//! use turnstile_lib::security::rate_limit::{Category, PolicyTable, RateLimitDecision, RateLimiter};
//!
//! let limiter = RateLimiter::new(PolicyTable::default());
//!
//! match limiter.evaluate("1.2.3.4|Mozilla/5.0", Category::Payment, SystemTime::now()) {
//!     RateLimitDecision::Allowed { remaining, .. } => {
//!         println!("Request allowed, {remaining} left in this window");
//!     }
//!     RateLimitDecision::Limited { reset_at } => {
//!         println!("Rate limited until {reset_at:?}");
//!     }
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [rate_limit]
//! sweep_interval_secs = 60
//!
//! [rate_limit.policies.auth]
//! max_requests = 5
//! window_secs = 900
//! ```

mod category;
mod limiter;
mod policy;
mod store;

pub use category::Category;
pub use limiter::{RateLimitDecision, RateLimiter, WindowKey, RATE_LIMIT_EXCEEDED};
pub use policy::{Policy, PolicyTable};
pub use store::{Admission, WindowRecord, WindowStore};
