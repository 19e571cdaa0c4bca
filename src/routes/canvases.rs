//! Canvas record routes.

#[cfg(test)]
#[path = "canvases_test.rs"]
mod canvases_test;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use canvas::grid::PixelMap;
use canvas::sync::{CanvasLookup, CanvasRecord};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::services::canvas::{self as canvas_service, CanvasError};
use crate::state::AppState;

pub(crate) fn canvas_error_to_status(err: CanvasError) -> StatusCode {
    match err {
        CanvasError::NotFound => StatusCode::NOT_FOUND,
        CanvasError::Drawing(e) => {
            error!(error = %e, "stored drawing failed to decode");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CanvasError::Database(e) => {
            error!(error = %e, "canvas query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CanvasQuery {
    pub owner: Option<Uuid>,
    pub code: Option<String>,
}

impl CanvasQuery {
    /// Owner wins when both are given.
    pub(crate) fn lookup(&self) -> Option<CanvasLookup> {
        if let Some(owner) = self.owner {
            return Some(CanvasLookup::Owner(owner));
        }
        self.code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| CanvasLookup::BackupCode(code.to_owned()))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDrawingBody {
    #[serde(rename = "canvasID")]
    pub canvas_id: Uuid,
    pub drawing: PixelMap,
}

/// `GET /api/canvas/{id}`: one canvas with its drawing.
pub async fn get_canvas(
    State(state): State<AppState>,
    Path(canvas_id): Path<Uuid>,
) -> Result<Json<CanvasRecord>, StatusCode> {
    canvas_service::fetch_canvas(&state.pool, &CanvasLookup::Id(canvas_id))
        .await
        .map(Json)
        .map_err(canvas_error_to_status)
}

/// `GET /api/canvas?owner=..` or `?code=..`: look a canvas up by owner or backup code.
pub async fn find_canvas(
    State(state): State<AppState>,
    Query(query): Query<CanvasQuery>,
) -> Result<Json<CanvasRecord>, StatusCode> {
    let lookup = query.lookup().ok_or(StatusCode::BAD_REQUEST)?;
    canvas_service::fetch_canvas(&state.pool, &lookup)
        .await
        .map(Json)
        .map_err(canvas_error_to_status)
}

/// `PATCH /api/canvas`: merge submitted cells into the stored drawing.
pub async fn update_drawing(State(state): State<AppState>, Json(body): Json<UpdateDrawingBody>) -> StatusCode {
    match canvas_service::merge_drawing(&state.pool, body.canvas_id, &body.drawing).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => canvas_error_to_status(e),
    }
}
