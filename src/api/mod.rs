pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::service::ServiceContext;
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>) -> Router {
    let app_state = AppState::new(service_context);

    Router::new()
        .route("/health", get(handlers::root::health_check))
        .route("/api", get(handlers::root::api_info))

        .nest("/api", api_routes())

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/system/notices", post(handlers::notices::create_system))
        .route("/institution/notices", post(handlers::notices::create_institution))
        .nest("/notices", notice_routes())
        .route_layer(axum::middleware::from_fn(middleware::actor::require_actor))
}

fn notice_routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(handlers::notices::feed))
        .route("/mine", get(handlers::notices::mine))
        .route(
            "/:id",
            get(handlers::notices::get)
                .put(handlers::notices::update)
                .delete(handlers::notices::delete),
        )
}
