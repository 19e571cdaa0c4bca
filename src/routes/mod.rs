//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! REST endpoints serve and update canvas records; one websocket endpoint per
//! canvas relays live `sync` frames between its viewers.

pub mod canvases;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/canvas", get(canvases::find_canvas).patch(canvases::update_drawing))
        .route("/api/canvas/{id}", get(canvases::get_canvas))
        .route("/api/canvas/{id}/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
