use super::*;
use crate::state::test_helpers;
use canvas::grid::CellAddr;
use canvas::sync::SyncEnvelope;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(addr: std::net::SocketAddr, canvas_id: Uuid) -> Client {
    let (stream, _) = connect_async(format!("ws://{addr}/api/canvas/{canvas_id}/ws"))
        .await
        .expect("ws connect");
    stream
}

/// Joining happens after the handshake completes, so wait for the room to fill.
async fn wait_for_room(state: &AppState, canvas_id: Uuid, size: usize) {
    timeout(Duration::from_secs(2), async {
        while test_helpers::room_size(state, canvas_id).await != size {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room never reached expected size");
}

async fn recv_text(client: &mut Client) -> String {
    loop {
        let msg = timeout(Duration::from_millis(500), client.next())
            .await
            .expect("ws receive timed out")
            .expect("ws stream ended")
            .expect("ws error");
        if let WsMessage::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    assert!(
        timeout(Duration::from_millis(100), client.next()).await.is_err(),
        "expected no frame"
    );
}

fn sync_text() -> String {
    json!({
        "event": "sync",
        "payload": {
            "pixels": {
                "2,3": {
                    "color": "#E34545",
                    "lastedEditedUserID": null,
                    "lastedEditedName": "ana",
                    "lastedEditedTime": "2024-05-01T12:00:00Z"
                }
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn sync_frame_reaches_peers_but_not_sender() {
    let state = test_helpers::test_app_state();
    let addr = test_helpers::spawn_app(state.clone()).await;
    let canvas_id = Uuid::new_v4();

    let mut author = connect(addr, canvas_id).await;
    let mut viewer = connect(addr, canvas_id).await;
    wait_for_room(&state, canvas_id, 2).await;

    let text = sync_text();
    author.send(WsMessage::Text(text.clone().into())).await.unwrap();

    let relayed = recv_text(&mut viewer).await;
    assert_eq!(relayed, text);
    let payload = SyncEnvelope::parse(&relayed).unwrap().sync_payload().unwrap();
    assert_eq!(payload.pixels[&CellAddr::new(2, 3)].color.as_str(), "#E34545");

    assert_silent(&mut author).await;
}

#[tokio::test]
async fn invalid_frames_are_not_relayed() {
    let state = test_helpers::test_app_state();
    let addr = test_helpers::spawn_app(state.clone()).await;
    let canvas_id = Uuid::new_v4();

    let mut author = connect(addr, canvas_id).await;
    let mut viewer = connect(addr, canvas_id).await;
    wait_for_room(&state, canvas_id, 2).await;

    let wrong_event = json!({ "event": "cursor", "payload": { "x": 1 } }).to_string();
    author.send(WsMessage::Text(wrong_event.into())).await.unwrap();
    author.send(WsMessage::Text("garbage".into())).await.unwrap();
    assert_silent(&mut viewer).await;

    // The connection survives a rejected frame.
    author.send(WsMessage::Text(sync_text().into())).await.unwrap();
    assert_eq!(recv_text(&mut viewer).await, sync_text());
}

#[tokio::test]
async fn canvases_are_isolated() {
    let state = test_helpers::test_app_state();
    let addr = test_helpers::spawn_app(state.clone()).await;
    let (here, elsewhere) = (Uuid::new_v4(), Uuid::new_v4());

    let mut author = connect(addr, here).await;
    let mut neighbor = connect(addr, here).await;
    let mut stranger = connect(addr, elsewhere).await;
    wait_for_room(&state, here, 2).await;
    wait_for_room(&state, elsewhere, 1).await;

    author.send(WsMessage::Text(sync_text().into())).await.unwrap();
    recv_text(&mut neighbor).await;
    assert_silent(&mut stranger).await;
}

#[tokio::test]
async fn closing_leaves_the_room() {
    let state = test_helpers::test_app_state();
    let addr = test_helpers::spawn_app(state.clone()).await;
    let canvas_id = Uuid::new_v4();

    let mut first = connect(addr, canvas_id).await;
    let _second = connect(addr, canvas_id).await;
    wait_for_room(&state, canvas_id, 2).await;

    first.close(None).await.unwrap();
    wait_for_room(&state, canvas_id, 1).await;
}
