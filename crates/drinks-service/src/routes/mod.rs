//! HTTP routes for the drinks service.
//!
//! Defines the Axum router and application state.

use crate::auth::AuthGate;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, PermissionGuard};
use crate::repositories::DrinkRepository;
use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Permission required to list drinks with full recipes.
pub const PERMISSION_GET_DRINKS_DETAIL: &str = "get:drinks-detail";
/// Permission required to create a drink.
pub const PERMISSION_POST_DRINKS: &str = "post:drinks";
/// Permission required to update a drink.
pub const PERMISSION_PATCH_DRINKS: &str = "patch:drinks";
/// Permission required to delete a drink.
pub const PERMISSION_DELETE_DRINKS: &str = "delete:drinks";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Drink storage.
    pub repository: Arc<dyn DrinkRepository>,

    /// Authorization gate shared by every protected route.
    pub auth_gate: AuthGate,
}

/// Wrap `route` so it only runs once `permission` is authorized.
fn guarded(
    route: MethodRouter<Arc<AppState>>,
    gate: &AuthGate,
    permission: &'static str,
) -> MethodRouter<Arc<AppState>> {
    route.route_layer(middleware::from_fn_with_state(
        PermissionGuard::new(gate.clone(), permission),
        require_permission,
    ))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `GET /drinks` - Short drink listing (public)
/// - `GET /drinks-detail` - Long drink listing (`get:drinks-detail`)
/// - `POST /drinks` - Create a drink (`post:drinks`)
/// - `PATCH /drinks/:id` - Update a drink (`patch:drinks`)
/// - `DELETE /drinks/:id` - Delete a drink (`delete:drinks`)
/// - `GET /health` - Database health (public)
/// - `GET /metrics` - Prometheus metrics (public)
/// - CORS, TraceLayer, 30 second timeout and HTTP metrics layers
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let gate = state.auth_gate.clone();

    let drink_routes = Router::new()
        .route(
            "/drinks",
            get(handlers::get_drinks).merge(guarded(
                post(handlers::create_drink),
                &gate,
                PERMISSION_POST_DRINKS,
            )),
        )
        .route(
            "/drinks-detail",
            guarded(
                get(handlers::get_drinks_detail),
                &gate,
                PERMISSION_GET_DRINKS_DETAIL,
            ),
        )
        .route(
            "/drinks/:id",
            guarded(
                patch(handlers::update_drink),
                &gate,
                PERMISSION_PATCH_DRINKS,
            )
            .merge(guarded(
                delete(handlers::delete_drink),
                &gate,
                PERMISSION_DELETE_DRINKS,
            )),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Layer order (bottom-to-top execution):
    // 1. CorsLayer - Answer preflight requests (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. TraceLayer - Log request details
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    drink_routes
        .merge(metrics_routes)
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
