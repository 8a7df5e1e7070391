pub mod auth;
pub mod casts;
pub mod films;
pub mod genres;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface, everything under `/api`.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/casts", casts::router())
        .nest("/genres", genres::router())
        .nest("/films", films::router());

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
