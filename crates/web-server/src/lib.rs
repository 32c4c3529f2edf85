//! HTTP surface for the curator backend.
//!
//! Thin glue: route registration, shared state, and the translation of data
//! layer errors into status codes. All real work happens in the `database`
//! crate's `Repository`.

use axum::{Router, routing::get};
use database::Repository;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub repository: Repository,
}

/// Builds the application router over an existing repository.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/all_items", get(handlers::all_items))
        .route(
            "/display_item/:major/:minor",
            get(handlers::display_item_by_beacon),
        )
        .with_state(state)
        .layer(cors)
        // This middleware logs information about every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// Binds `addr` and serves the exhibit API until shutdown.
pub async fn run_server(addr: SocketAddr, repository: Repository) -> anyhow::Result<()> {
    let state = Arc::new(AppState { repository });
    let app = router(state);

    tracing::info!("Web server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
