//! HTTP surface: router, shared state, origin policy.

mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use landing_kit_deployer::firebase::{FirebaseAuth, HostingApi};
use landing_kit_deployer::netlify::NetlifyApi;
use landing_kit_generator::TextGenerator;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Generated documents are sent back whole, so allow large bodies.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared by every request. Read-only after startup except for the
/// set-once Firebase auth state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub netlify: Option<Arc<dyn NetlifyApi>>,
    pub hosting: Arc<dyn HostingApi>,
    pub firebase_auth: FirebaseAuth,
    pub firebase_project: Option<String>,
    pub allowed_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>, ApiError> {
        self.generator.clone().ok_or_else(|| {
            ApiError::Configuration(
                "Server is not configured for generation: GEMINI_API_KEY is not set".to_string(),
            )
        })
    }

    pub fn netlify(&self) -> Result<Arc<dyn NetlifyApi>, ApiError> {
        self.netlify.clone().ok_or_else(|| {
            ApiError::Configuration(
                "Server is not configured for Netlify deploys: NETLIFY_ACCESS_TOKEN is not set"
                    .to_string(),
            )
        })
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/generate", post(handlers::generate))
        .route("/api/edit", post(handlers::edit))
        .route("/api/deploy", post(handlers::deploy_netlify))
        .route("/api/deploy-firebase", post(handlers::deploy_firebase))
        // Enforced by the extractors, so oversize bodies surface as a
        // JsonRejection and get the usual error envelope.
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), enforce_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject requests from browsers on origins outside the allow-list.
/// Requests without an `Origin` header (curl, server-to-server) pass.
async fn enforce_origin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !state.is_allowed_origin(origin) {
            tracing::warn!(%origin, path = %request.uri().path(), "origin not allowed");
            return ApiError::Forbidden(format!("Origin {} is not allowed", origin)).into_response();
        }
    }
    next.run(request).await
}
