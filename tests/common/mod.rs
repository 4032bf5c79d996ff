#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use bank_portal::{
    AppState,
    auth::{AuthContext, BcryptHasher, PasswordHasher, Role, TokenService},
    cache::{CacheLayer, MemoryCache},
    config::Config,
    mail::{MailError, Mailer},
    middleware::RateLimiter,
    provisioning::ProvisioningService,
    router::build_router,
    store::{Bank, MemoryStore},
};
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const VERIFICATION_URL: &str = "https://portal.test/verify-email";

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    /// Token from the most recent verification link sent to `email`.
    pub async fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|mail| mail.to == email)
            .and_then(|mail| mail.body.split("?token=").nth(1))
            .map(|token| token.trim().to_string())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(503));
        }
        self.sent.lock().await.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: "integration-test-secret".into(),
        verification_url: VERIFICATION_URL.into(),
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub struct Harness {
    pub config: Arc<Config>,
    pub store: MemoryStore,
    pub cache: MemoryCache,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: Arc<TokenService>,
    pub service: Arc<ProvisioningService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let cost = config.bcrypt_cost;
        Self::with_hasher(config, |_| Arc::new(BcryptHasher::new(cost)))
    }

    /// Builds the service around a hasher that may observe the store.
    pub fn with_hasher(
        config: Config,
        hasher: impl FnOnce(&MemoryStore) -> Arc<dyn PasswordHasher>,
    ) -> Self {
        let store = MemoryStore::new();
        let hasher = hasher(&store);
        let cache = MemoryCache::new();
        let mailer = Arc::new(RecordingMailer::default());
        let tokens = Arc::new(TokenService::from_config(&config));

        let layer = CacheLayer::new(Arc::new(cache.clone()), Arc::new(store.clone()));
        let service = ProvisioningService::new(
            Arc::new(store.clone()),
            layer,
            Arc::clone(&tokens),
            hasher,
            mailer.clone(),
            config.verification_url.clone(),
        )
        .expect("provisioning service");

        Self {
            config: Arc::new(config),
            store,
            cache,
            mailer,
            tokens,
            service: Arc::new(service),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::clone(&self.config),
            tokens: Arc::clone(&self.tokens),
            provisioning: Arc::clone(&self.service),
            limiter: Arc::new(RateLimiter::from_config(&self.config)),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state())
    }

    pub fn bearer(&self, user_id: i64, role: Role) -> String {
        let token = self
            .tokens
            .issue_access_token(user_id, role)
            .expect("access token");
        format!("Bearer {token}")
    }

    pub fn context(&self, user_id: i64, role: Role) -> AuthContext {
        AuthContext { user_id, role }
    }

    pub async fn seed_bank(&self, bank_id: i64, name: &str, peer_group: Option<&str>) {
        self.store
            .insert_bank(
                Bank {
                    bank_id,
                    cert: Some(bank_id * 100),
                    routing: Some(format!("{}", 21000000 + bank_id)),
                    name: Some(name.to_string()),
                    address: Some("1 MAIN ST".into()),
                    city: Some("COLUMBUS".into()),
                    state: Some("OH".into()),
                    zip: Some("43240".into()),
                },
                peer_group,
            )
            .await;
    }
}

pub async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.expect("infallible router")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}
