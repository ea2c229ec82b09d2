//! Application routing
//!
//! This module defines all HTTP routes for the application.

use axum::{
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::api::{health, processes};
use crate::middleware::{log_request, resolve_caller, REQUEST_ID_HEADER, TRACE_ID_HEADER};
use crate::server::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Health check routes (no caller resolution)
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/liveness", get(health::liveness));

    // Every path is served with and without a trailing slash
    let monitor_routes = Router::new()
        .route("/processes", get(processes::list_processes))
        .route("/processes/", get(processes::list_processes))
        .route(
            "/processes/:user_id",
            get(processes::list_user_processes).delete(processes::delete_user_processes),
        )
        .route(
            "/processes/:user_id/",
            get(processes::list_user_processes).delete(processes::delete_user_processes),
        )
        .route("/process", post(processes::create_process))
        .route("/process/", post(processes::create_process))
        .route(
            "/process/:computation_id",
            get(processes::get_process).delete(processes::delete_process),
        )
        .route(
            "/process/:computation_id/",
            get(processes::get_process).delete(processes::delete_process),
        )
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            resolve_caller,
        ));

    let request_timeout = state.settings.request_timeout();

    Router::new()
        .nest("/api/monitor", monitor_routes)
        .merge(health_routes)
        // First added = outermost: logging sees timeouts and CORS responses
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(create_cors_layer()),
        )
        .with_state(state)
}

/// Create CORS layer with permissive settings
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(TRACE_ID_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}
