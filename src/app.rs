use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{Config, StorageConfig},
    credentials::CredentialCodec,
    notify::Notifier,
    rate_limit::{FixedWindowLimiter, InMemoryRateLimitStore, rate_limit_middleware},
    routes,
    store::{BlobStore, ContentStore, LocalFileStorage, MemoryBlobStore},
    web_pages,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub credentials: Arc<CredentialCodec>,
    pub notifier: Arc<Notifier>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let blobs: Arc<dyn BlobStore> = match &config.storage {
            StorageConfig::Filesystem { dir } => Arc::new(LocalFileStorage::new(dir.clone())),
            StorageConfig::Memory => Arc::new(MemoryBlobStore::new()),
        };
        let notifier = Notifier::new(config.notify.url.clone(), config.notify.token.clone())?;
        let limiter = FixedWindowLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            config.rate_limit.limit,
            config.rate_limit.window_ms,
        )
        .with_forwarded_headers(config.rate_limit.trust_forwarded_headers);
        Ok(Self {
            store: Arc::new(ContentStore::new(blobs)),
            credentials: Arc::new(CredentialCodec::new(
                config.auth.username.clone(),
                config.auth.password.clone(),
            )),
            notifier: Arc::new(notifier),
            limiter: Arc::new(limiter),
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/line/sendMessage", post(routes::line::send_message))
        .route("/file/upload", put(routes::file::upload_file))
        .route("/file/views/{key}", get(routes::file::view_file))
        .route("/auth/encodeKey", post(routes::auth::encode_key))
        .route("/auth/verifyCredentials", post(routes::auth::verify_credentials))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/", get(web_pages::index_page))
        .merge(api)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
