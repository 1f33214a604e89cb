//! FlagDraw REST Server
//!
//! Stores flag designs for authenticated users.
//!
//! ## Routes
//!
//! ```text
//! GET    /health
//! GET    /user
//! GET    /flags
//! POST   /flags        { "name": "...", "imageData": "data:image/png;base64,..." }
//! GET    /flags/{id}
//! PUT    /flags/{id}   { "name"?: "...", "imageData"?: "..." }
//! DELETE /flags/{id}
//! ```
//!
//! Requests authenticate with a session token in the `sid` cookie or an
//! `Authorization: Bearer` header.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use flagdraw_core::Storage;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::{ApiError, ApiResult};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/user", get(routes::current_user))
        .route("/flags", get(routes::list_flags).post(routes::create_flag))
        .route(
            "/flags/{id}",
            get(routes::get_flag)
                .put(routes::update_flag)
                .delete(routes::delete_flag),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
