use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1", api_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/quizzes/{quiz_id}/screens",
            post(handlers::screens::mount_screen),
        )
        .route(
            "/screens/{id}",
            get(handlers::screens::get_screen).delete(handlers::screens::unmount_screen),
        )
        .route("/screens/{id}/attempts", post(handlers::screens::start_attempt))
        .route("/screens/{id}/answers", post(handlers::screens::select_option))
        .route(
            "/screens/{id}/flags/{question_id}",
            post(handlers::screens::toggle_flag),
        )
        .route("/screens/{id}/submit", post(handlers::screens::submit))
        .route(
            "/screens/{id}/submit/decline",
            post(handlers::screens::decline_submit),
        )
        .route("/screens/{id}/stream", get(handlers::sse::screen_stream))
}
