use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bank_portal::{
    AppState,
    auth::{BcryptHasher, TokenService},
    cache::{CacheLayer, RedisCache},
    config::Config,
    mail::MailgunMailer,
    middleware::RateLimiter,
    provisioning::ProvisioningService,
    router::build_router,
    store::PgStore,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'bank_portal';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");

    let store = Arc::new(PgStore::new(pool));
    let cache = CacheLayer::new(Arc::new(RedisCache::new(Arc::new(redis_client))), store.clone());
    let tokens = Arc::new(TokenService::from_config(&config));

    let provisioning = ProvisioningService::new(
        store,
        cache,
        Arc::clone(&tokens),
        Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        Arc::new(MailgunMailer::from_config(&config)),
        config.verification_url.clone(),
    )
    .expect("Failed to initialise provisioning service");

    let state = AppState {
        config: Arc::clone(&config),
        tokens,
        provisioning: Arc::new(provisioning),
        limiter: Arc::new(RateLimiter::from_config(&config)),
    };

    let app = build_router(state);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}
