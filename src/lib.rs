use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod passwords;
pub mod repository;
pub mod session;
pub mod views;

// Routers grouped by access level (public, admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use passwords::PasswordService;
pub use repository::{RepositoryState, SqliteRepository};
pub use session::SessionManager;

/// AppState
///
/// The single, immutable container of shared services handed to every request.
/// Nothing in it changes after startup; per-request identity lives in
/// `session::Viewer`.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: database access behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Signs and checks session and flash cookies.
    pub sessions: SessionManager,
    pub passwords: PasswordService,
}

impl AppState {
    /// Builds the shared services from a loaded configuration.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let secure_cookies = config.env == crate::config::Env::Production;
        Self {
            repo,
            sessions: SessionManager::new(&config.secret_key, secure_cookies),
            passwords: PasswordService::new(config.password_rounds),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(app_state: &AppState) -> SessionManager {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the routes and their guards, then the per-request session layer
/// and the observability stack.
///
/// Layer order for an admin route, outermost first:
/// request id → trace → `load_viewer` → `require_login` → `require_admin` → handler.
/// Each guard short-circuits, so later ones never see a request an earlier one
/// rejected.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let admin_router = admin::admin_routes()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(admin_router)
        .fallback(handlers::not_found)
        // Resolves the session cookie into a `Viewer` for every route above.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::load_viewer,
        ))
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                MakeRequestUuid,
            ))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for `TraceLayer`, tagged with the request id so every log line of one
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
