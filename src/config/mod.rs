use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub access_token_expiry_hours: u64,
    pub refresh_token_expiry_days: u64,
    pub request_timeout_secs: u64,
    pub rate_limit_per_second: u32,
    pub burst_size: u32,
    pub allowed_origin: String,
    pub server_host: String,
    pub server_port: u16,
    pub mailgun_domain: String,
    pub mailgun_api_key: String,
    pub verification_url: String,
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: String::new(),
            access_token_expiry_hours: 72,
            refresh_token_expiry_days: 30,
            request_timeout_secs: 10,
            rate_limit_per_second: 10,
            burst_size: 20,
            allowed_origin: "*".into(),
            server_host: "0.0.0.0".into(),
            server_port: 8080,
            mailgun_domain: String::new(),
            mailgun_api_key: String::new(),
            verification_url: "https://localhost/verify-email".into(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Reads an optional variable, keeping the default when it is unset or unparsable.
fn var_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparsable configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET_KEY")?,
            access_token_expiry_hours: var_or(
                "ACCESS_TOKEN_EXPIRY_HOURS",
                defaults.access_token_expiry_hours,
            ),
            refresh_token_expiry_days: var_or(
                "REFRESH_TOKEN_EXPIRY_DAYS",
                defaults.refresh_token_expiry_days,
            ),
            request_timeout_secs: var_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            rate_limit_per_second: var_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second),
            burst_size: var_or("BURST_SIZE", defaults.burst_size),
            allowed_origin: var_or("ALLOWED_ORIGIN", defaults.allowed_origin),
            server_host: var_or("SERVER_HOST", defaults.server_host),
            server_port: var_or("SERVER_PORT", defaults.server_port),
            mailgun_domain: var_or("MAILGUN_DOMAIN", defaults.mailgun_domain),
            mailgun_api_key: var_or("MAILGUN_API_KEY", defaults.mailgun_api_key),
            verification_url: var_or("VERIFICATION_URL", defaults.verification_url),
            bcrypt_cost: var_or("BCRYPT_COST", defaults.bcrypt_cost),
        })
    }

    pub fn access_token_expiry(&self) -> Duration {
        Duration::from_secs(self.access_token_expiry_hours * 3600)
    }

    pub fn refresh_token_expiry(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiry_days * 24 * 3600)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
