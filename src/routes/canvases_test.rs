use super::*;
use crate::state::test_helpers;
use serde_json::json;

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[test]
fn not_found_maps_to_404() {
    assert_eq!(canvas_error_to_status(CanvasError::NotFound), StatusCode::NOT_FOUND);
}

#[test]
fn database_and_decode_errors_map_to_500() {
    let decode = serde_json::from_str::<PixelMap>("[]").unwrap_err();
    assert_eq!(canvas_error_to_status(CanvasError::Drawing(decode)), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        canvas_error_to_status(CanvasError::Database(sqlx::Error::PoolTimedOut)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// =============================================================================
// QUERY + BODY
// =============================================================================

#[test]
fn lookup_prefers_owner() {
    let owner = Uuid::new_v4();
    let query = CanvasQuery { owner: Some(owner), code: Some("ABCD".into()) };
    assert_eq!(query.lookup(), Some(CanvasLookup::Owner(owner)));
}

#[test]
fn lookup_by_code_trims() {
    let query = CanvasQuery { owner: None, code: Some("  ABCD ".into()) };
    assert_eq!(query.lookup(), Some(CanvasLookup::BackupCode("ABCD".into())));
}

#[test]
fn lookup_requires_a_key() {
    assert_eq!(CanvasQuery::default().lookup(), None);
    assert_eq!(CanvasQuery { owner: None, code: Some("   ".into()) }.lookup(), None);
}

#[test]
fn update_body_uses_wire_names() {
    let id = Uuid::new_v4();
    let body: UpdateDrawingBody = serde_json::from_value(json!({
        "canvasID": id,
        "drawing": {
            "0,0": { "color": "#E34545", "lastedEditedTime": "2024-05-01T12:00:00Z" }
        }
    }))
    .unwrap();
    assert_eq!(body.canvas_id, id);
    assert_eq!(body.drawing.len(), 1);
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn healthz_is_ok() {
    let addr = test_helpers::spawn_app(test_helpers::test_app_state()).await;
    let res = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn find_without_owner_or_code_is_bad_request() {
    let addr = test_helpers::spawn_app(test_helpers::test_app_state()).await;
    let res = reqwest::get(format!("http://{addr}/api/canvas")).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn get_with_malformed_id_is_bad_request() {
    let addr = test_helpers::spawn_app(test_helpers::test_app_state()).await;
    let res = reqwest::get(format!("http://{addr}/api/canvas/not-a-uuid")).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn get_with_database_down_is_server_error() {
    let addr = test_helpers::spawn_app(test_helpers::test_app_state()).await;
    let res = reqwest::get(format!("http://{addr}/api/canvas/{}", Uuid::new_v4())).await.unwrap();
    assert_eq!(res.status().as_u16(), 500);
}

#[tokio::test]
async fn patch_with_bad_cell_is_rejected_before_storage() {
    let addr = test_helpers::spawn_app(test_helpers::test_app_state()).await;
    let res = reqwest::Client::new()
        .patch(format!("http://{addr}/api/canvas"))
        .json(&json!({
            "canvasID": Uuid::new_v4(),
            "drawing": { "0,0": { "color": "#xyz", "lastedEditedTime": "2024-05-01T12:00:00Z" } }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 422);
}
