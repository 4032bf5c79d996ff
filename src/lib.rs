use std::sync::Arc;

use auth::TokenService;
use config::Config;
use middleware::RateLimiter;
use provisioning::ProvisioningService;

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod provisioning;
pub mod result;
pub mod router;
pub mod routes;
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub provisioning: Arc<ProvisioningService>,
    pub limiter: Arc<RateLimiter>,
}
