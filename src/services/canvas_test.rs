use super::*;
use crate::state::test_helpers;
use canvas::grid::CellAddr;
use serde_json::json;

fn row(drawing: serde_json::Value) -> CanvasRow {
    (
        Uuid::nil(),
        None,
        "Washington Square".into(),
        Some("by the arch".into()),
        40.7308,
        -73.9973,
        false,
        Some("ABCD".into()),
        drawing,
    )
}

#[test]
fn row_to_record_decodes_drawing() {
    let drawing = json!({
        "3,4": {
            "color": "#E34545",
            "lastedEditedUserID": null,
            "lastedEditedName": "ana",
            "lastedEditedTime": "2024-05-01T12:00:00Z"
        }
    });
    let record = row_to_record(row(drawing)).unwrap();
    assert_eq!(record.title, "Washington Square");
    assert_eq!(record.backup_code.as_deref(), Some("ABCD"));
    assert_eq!(record.drawing.len(), 1);
    let cell = &record.drawing[&CellAddr::new(3, 4)];
    assert_eq!(cell.color.as_str(), "#E34545");
    assert_eq!(cell.last_edited_name.as_deref(), Some("ana"));
}

#[test]
fn row_to_record_tolerates_missing_edit_times() {
    let drawing = json!({
        "0,0": { "color": "#000", "lastedEditedTime": null },
        "1,1": { "color": "#fff" }
    });
    let record = row_to_record(row(drawing)).unwrap();
    assert_eq!(record.drawing.len(), 2);
    assert_eq!(record.drawing[&CellAddr::new(1, 1)].color.as_str(), "#fff");
}

#[test]
fn row_to_record_accepts_empty_drawing() {
    let record = row_to_record(row(json!({}))).unwrap();
    assert!(record.drawing.is_empty());
}

#[test]
fn row_to_record_rejects_malformed_drawing() {
    let drawing = json!({ "not a cell": { "color": "#000000", "lastedEditedTime": "2024-05-01T12:00:00Z" } });
    assert!(matches!(row_to_record(row(drawing)), Err(CanvasError::Drawing(_))));
}

#[tokio::test]
async fn fetch_without_database_is_database_error() {
    let state = test_helpers::test_app_state();
    let result = fetch_canvas(&state.pool, &CanvasLookup::Id(Uuid::new_v4())).await;
    assert!(matches!(result, Err(CanvasError::Database(_))));
}

#[tokio::test]
async fn merge_without_database_is_database_error() {
    let state = test_helpers::test_app_state();
    let result = merge_drawing(&state.pool, Uuid::new_v4(), &PixelMap::new()).await;
    assert!(matches!(result, Err(CanvasError::Database(_))));
}
