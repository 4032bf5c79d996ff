//! Request pipeline stages, outermost first: logging, CORS, recovery, timeout,
//! rate limit, then per-route auth and role gate.

mod auth;
mod cors;
mod logging;
mod rate_limit;
mod recovery;
mod role;
mod timeout;

pub use auth::require_auth;
pub use cors::{cors_layer, short_circuit_options};
pub use logging::log_requests;
pub use rate_limit::{RateLimitError, RateLimiter, rate_limit};
pub use recovery::recover;
pub use role::require_role;
pub use timeout::{RequestCancellation, RequestDeadline, enforce_timeout};
