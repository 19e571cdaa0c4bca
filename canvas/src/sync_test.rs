use serde_json::json;

use super::*;
use crate::grid::CellAddr;

fn stored_pixel() -> serde_json::Value {
    json!({"color": "#E34545", "lastedEditedUserID": null, "lastedEditedName": "ana",
           "lastedEditedTime": "2025-05-01T12:00:00Z"})
}

// =============================================================================
// SyncError
// =============================================================================

#[test]
fn retryable_errors() {
    assert!(SyncError::Publish("closed".into()).retryable());
    assert!(SyncError::Request("timeout".into()).retryable());
    assert!(SyncError::Response { status: 503, body: String::new() }.retryable());
    assert!(SyncError::Response { status: 429, body: String::new() }.retryable());
    assert!(!SyncError::Response { status: 400, body: String::new() }.retryable());
    assert!(!SyncError::NotFound.retryable());
    assert!(!SyncError::Payload("bad".into()).retryable());
}

// =============================================================================
// Envelopes
// =============================================================================

#[test]
fn envelope_wire_shape() {
    let text = json!({"event": "sync", "payload": {"pixels": {"0,0": stored_pixel()}}}).to_string();
    let env = SyncEnvelope::parse(&text).unwrap();
    assert_eq!(env.event, SYNC_EVENT);
    let payload = env.sync_payload().unwrap();
    assert_eq!(payload.pixels.len(), 1);
    let rec = &payload.pixels[&CellAddr::new(0, 0)];
    assert_eq!(rec.color.as_str(), "#E34545");
    assert_eq!(rec.last_edited_name.as_deref(), Some("ana"));
}

#[test]
fn envelope_round_trips_payload() {
    let text = json!({"event": "sync", "payload": {"pixels": {"-1,3": stored_pixel()}}}).to_string();
    let payload = SyncEnvelope::parse(&text).unwrap().sync_payload().unwrap();
    let env = SyncEnvelope::new(SYNC_EVENT, &payload).unwrap();
    assert_eq!(env.sync_payload().unwrap(), payload);
    assert!(env.payload["pixels"]["-1,3"].is_object());
}

#[test]
fn envelope_rejects_other_events() {
    let env = SyncEnvelope { event: "cursor".into(), payload: json!({"pixels": {}}) };
    assert!(matches!(env.sync_payload(), Err(SyncError::Payload(_))));
}

#[test]
fn envelope_rejects_malformed_cells() {
    for pixels in [
        json!({"0,0": {"color": "#xyz", "lastedEditedTime": "2025-05-01T12:00:00Z"}}),
        json!({"0;0": stored_pixel()}),
        json!({"0,0": {"color": "#fff"}}),
    ] {
        let env = SyncEnvelope { event: SYNC_EVENT.into(), payload: json!({ "pixels": pixels }) };
        assert!(env.sync_payload().is_err(), "{pixels}");
    }
}

#[test]
fn envelope_rejects_non_json() {
    assert!(SyncEnvelope::parse("not json").is_err());
    assert!(SyncEnvelope::parse(r#"{"payload": {}}"#).is_err());
}

// =============================================================================
// Storage wire types
// =============================================================================

#[test]
fn canvas_record_parses_with_defaults() {
    let id = Uuid::new_v4();
    let text = json!({
        "id": id, "title": "Quad", "latitude": 40.0, "longitude": -73.5,
        "drawing": {"1,1": stored_pixel()}
    })
    .to_string();
    let rec: CanvasRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(rec.id, id);
    assert!(!rec.is_archived);
    assert!(rec.backup_code.is_none());
    assert_eq!(rec.drawing.len(), 1);
}

#[test]
fn update_body_uses_canvas_id_key() {
    let id = Uuid::new_v4();
    let drawing = PixelMap::new();
    let v = serde_json::to_value(UpdateDrawing { canvas_id: id, drawing: &drawing }).unwrap();
    assert_eq!(v["canvasID"], json!(id));
    assert_eq!(v["drawing"], json!({}));
}

#[test]
fn lookup_paths() {
    let id = Uuid::new_v4();
    assert_eq!(lookup_request(&CanvasLookup::Id(id)), (format!("/api/canvas/{id}"), vec![]));
    assert_eq!(
        lookup_request(&CanvasLookup::Owner(id)),
        ("/api/canvas".to_owned(), vec![("owner", id.to_string())])
    );
    assert_eq!(
        lookup_request(&CanvasLookup::BackupCode("qwer-tyui".into())),
        ("/api/canvas".to_owned(), vec![("code", "qwer-tyui".to_owned())])
    );
}

#[test]
fn http_store_trims_trailing_slash() {
    let store = HttpCanvasStore::new("http://localhost:3000/").unwrap();
    assert_eq!(store.base_url(), "http://localhost:3000");
}

// =============================================================================
// MpscPeer
// =============================================================================

#[tokio::test]
async fn mpsc_peer_sends_envelope_text() {
    let (tx, mut rx) = mpsc::channel(4);
    let peer = MpscPeer::new(tx);
    let payload: SyncPayload = serde_json::from_value(json!({"pixels": {"0,0": stored_pixel()}})).unwrap();

    peer.publish(SYNC_EVENT, &payload).await.unwrap();

    let text = rx.recv().await.unwrap();
    let env = SyncEnvelope::parse(&text).unwrap();
    assert_eq!(env.sync_payload().unwrap(), payload);
}

#[tokio::test]
async fn mpsc_peer_fails_when_receiver_dropped() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let peer = MpscPeer::new(tx);
    let err = peer.publish(SYNC_EVENT, &SyncPayload::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Publish(_)));
}
