pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod index;
pub mod notifications;
pub mod registry;
pub mod store;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::FromRef,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};

use auth::JwtKeys;
use notifications::Notifier;
use registry::{Registry, SessionMode};
use store::Store;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Store,
    pub registry: Arc<Registry>,
    pub notifier: Notifier,
    pub keys: JwtKeys,
    #[from_ref(skip)]
    pub ping_interval: Duration,
}

impl AppState {
    pub fn new(store: Store, keys: JwtKeys, mode: SessionMode, ping_interval: Duration) -> Self {
        let registry = Arc::new(Registry::new(mode));
        Self {
            notifier: Notifier::new(store.clone(), registry.clone()),
            store,
            registry,
            keys,
            ping_interval,
        }
    }
}

/// The full HTTP surface. `cors_origin` is the single browser origin allowed
/// to call the API; `None` sends no CORS headers.
pub fn app(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new(),
    };

    Router::new()
        .route("/", get(index::index))
        .merge(chat::ws_router())
        .nest("/api/chat", chat::router())
        .nest("/api/notifications", notifications::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
