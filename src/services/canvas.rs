//! Canvas service: record lookup and drawing merges against Postgres.
//!
//! DESIGN
//! ======
//! The stored drawing is a JSONB object keyed by `"x,y"`. Updates merge the
//! submitted cells into it with `||`, so concurrent writers touching
//! different cells never erase each other and the last write to a cell wins.
//!
//! ERROR HANDLING
//! ==============
//! A missing row is `CanvasError::NotFound`. A stored drawing that no longer
//! decodes is reported rather than silently emptied.

#[cfg(test)]
#[path = "canvas_test.rs"]
mod canvas_test;

use canvas::grid::PixelMap;
use canvas::sync::{CanvasLookup, CanvasRecord};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas not found")]
    NotFound,
    #[error("stored drawing is malformed: {0}")]
    Drawing(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

type CanvasRow = (Uuid, Option<Uuid>, String, Option<String>, f64, f64, bool, Option<String>, serde_json::Value);

const SELECT_BY_ID: &str = "SELECT id, owner_id, title, loc_desc, latitude, longitude, is_archived, backup_code, drawing \
     FROM canvas WHERE id = $1";
const SELECT_BY_OWNER: &str = "SELECT id, owner_id, title, loc_desc, latitude, longitude, is_archived, backup_code, drawing \
     FROM canvas WHERE owner_id = $1 ORDER BY created_on DESC LIMIT 1";
const SELECT_BY_CODE: &str = "SELECT id, owner_id, title, loc_desc, latitude, longitude, is_archived, backup_code, drawing \
     FROM canvas WHERE backup_code = $1";

// =============================================================================
// QUERIES
// =============================================================================

/// Load one canvas. An owner lookup returns their most recent canvas.
///
/// # Errors
///
/// Returns [`CanvasError::NotFound`] if nothing matches.
pub async fn fetch_canvas(pool: &PgPool, lookup: &CanvasLookup) -> Result<CanvasRecord, CanvasError> {
    let row = match lookup {
        CanvasLookup::Id(id) => {
            sqlx::query_as::<_, CanvasRow>(SELECT_BY_ID)
                .bind(*id)
                .fetch_optional(pool)
                .await?
        }
        CanvasLookup::Owner(owner_id) => {
            sqlx::query_as::<_, CanvasRow>(SELECT_BY_OWNER)
                .bind(*owner_id)
                .fetch_optional(pool)
                .await?
        }
        CanvasLookup::BackupCode(code) => {
            sqlx::query_as::<_, CanvasRow>(SELECT_BY_CODE)
                .bind(code.as_str())
                .fetch_optional(pool)
                .await?
        }
    };

    let record = row_to_record(row.ok_or(CanvasError::NotFound)?)?;
    debug!(canvas_id = %record.id, cells = record.drawing.len(), "canvas loaded");
    Ok(record)
}

/// Merge `cells` into the stored drawing of `canvas_id`.
///
/// # Errors
///
/// Returns [`CanvasError::NotFound`] if the canvas does not exist.
pub async fn merge_drawing(pool: &PgPool, canvas_id: Uuid, cells: &PixelMap) -> Result<(), CanvasError> {
    let result = sqlx::query("UPDATE canvas SET drawing = drawing || $1 WHERE id = $2")
        .bind(Json(cells))
        .bind(canvas_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CanvasError::NotFound);
    }
    info!(%canvas_id, cells = cells.len(), "drawing merged");
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) fn row_to_record(row: CanvasRow) -> Result<CanvasRecord, CanvasError> {
    let (id, owner_id, title, loc_desc, latitude, longitude, is_archived, backup_code, drawing) = row;
    Ok(CanvasRecord {
        id,
        owner_id,
        title,
        loc_desc,
        latitude,
        longitude,
        is_archived,
        backup_code,
        drawing: serde_json::from_value(drawing)?,
    })
}
