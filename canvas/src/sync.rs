//! Collaborator seams: sync payloads, the peer channel, and canvas storage.
//!
//! The engine talks to two outside collaborators. Peers receive low-latency
//! `sync` broadcasts through a [`PeerChannel`]. Storage holds each canvas
//! record and its durable drawing behind a [`CanvasStore`]. Both are traits
//! so hosts can plug in their own transport; this module ships an HTTP store
//! ([`HttpCanvasStore`]) and an mpsc-backed peer channel ([`MpscPeer`]) that
//! hands serialized envelopes to a socket writer task.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is a [`SyncError`]. Callers decide whether to retry; the
//! propagation driver never does.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::grid::PixelMap;

/// Event name of a pixel broadcast.
pub const SYNC_EVENT: &str = "sync";

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by peer or storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The peer channel rejected or dropped the message.
    #[error("peer publish failed: {0}")]
    Publish(String),

    /// An inbound envelope or payload could not be decoded.
    #[error("invalid sync payload: {0}")]
    Payload(String),

    /// The HTTP request to storage failed.
    #[error("storage request failed: {0}")]
    Request(String),

    /// Storage returned a non-success HTTP status.
    #[error("storage response error: status {status}")]
    Response { status: u16, body: String },

    /// The storage response body could not be deserialized.
    #[error("storage response parse failed: {0}")]
    Parse(String),

    /// No canvas matches the lookup.
    #[error("canvas not found")]
    NotFound,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl SyncError {
    /// Whether repeating the same call could succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Publish(_) | Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Body of a `sync` broadcast: the coalesced cells being sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub pixels: PixelMap,
}

/// One message on the peer channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub event: String,
    pub payload: serde_json::Value,
}

impl SyncEnvelope {
    /// Wrap a payload under `event`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Payload`] if the payload cannot be serialized.
    pub fn new(event: &str, payload: &SyncPayload) -> Result<Self, SyncError> {
        let payload = serde_json::to_value(payload).map_err(|e| SyncError::Payload(e.to_string()))?;
        Ok(Self { event: event.to_owned(), payload })
    }

    /// Parse an envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Payload`] if the text is not a JSON envelope.
    pub fn parse(text: &str) -> Result<Self, SyncError> {
        serde_json::from_str(text).map_err(|e| SyncError::Payload(e.to_string()))
    }

    /// Decode the payload of a `sync` envelope.
    ///
    /// Cell keys and colors are validated here, so a payload carrying any
    /// malformed cell is rejected as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Payload`] if the event is not `sync` or the
    /// payload does not decode.
    pub fn sync_payload(&self) -> Result<SyncPayload, SyncError> {
        if self.event != SYNC_EVENT {
            return Err(SyncError::Payload(format!("unexpected event {:?}", self.event)));
        }
        SyncPayload::deserialize(&self.payload).map_err(|e| SyncError::Payload(e.to_string()))
    }
}

/// How to find a canvas in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasLookup {
    Id(Uuid),
    /// The canvas owned by this user.
    Owner(Uuid),
    /// The human-shareable backup code.
    BackupCode(String),
}

/// A canvas as held in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasRecord {
    pub id: Uuid,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub loc_desc: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub backup_code: Option<String>,
    #[serde(default)]
    pub drawing: PixelMap,
}

/// Body of a drawing update.
#[derive(Debug, Serialize)]
pub struct UpdateDrawing<'a> {
    #[serde(rename = "canvasID")]
    pub canvas_id: Uuid,
    pub drawing: &'a PixelMap,
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Low-latency broadcast to the other viewers of a canvas.
#[async_trait::async_trait]
pub trait PeerChannel: Send + Sync {
    async fn publish(&self, event: &str, payload: &SyncPayload) -> Result<(), SyncError>;
}

/// Durable canvas storage.
#[async_trait::async_trait]
pub trait CanvasStore: Send + Sync {
    async fn fetch_canvas(&self, lookup: &CanvasLookup) -> Result<CanvasRecord, SyncError>;

    /// Merge `drawing` into the stored drawing of `canvas_id`.
    async fn update_drawing(&self, canvas_id: Uuid, drawing: &PixelMap) -> Result<(), SyncError>;
}

/// Peer channel that queues serialized envelopes for a socket writer task.
#[derive(Debug, Clone)]
pub struct MpscPeer {
    tx: mpsc::Sender<String>,
}

impl MpscPeer {
    #[must_use]
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl PeerChannel for MpscPeer {
    async fn publish(&self, event: &str, payload: &SyncPayload) -> Result<(), SyncError> {
        let envelope = SyncEnvelope::new(event, payload)?;
        let text = serde_json::to_string(&envelope).map_err(|e| SyncError::Payload(e.to_string()))?;
        self.tx.send(text).await.map_err(|e| SyncError::Publish(e.to_string()))
    }
}

// =============================================================================
// HTTP STORE
// =============================================================================

/// [`CanvasStore`] backed by the canvas REST API.
pub struct HttpCanvasStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCanvasStore {
    /// Create a store for the API rooted at `base_url` (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Path and query pairs for a lookup, relative to the API root.
pub(crate) fn lookup_request(lookup: &CanvasLookup) -> (String, Vec<(&'static str, String)>) {
    match lookup {
        CanvasLookup::Id(id) => (format!("/api/canvas/{id}"), Vec::new()),
        CanvasLookup::Owner(owner) => ("/api/canvas".to_owned(), vec![("owner", owner.to_string())]),
        CanvasLookup::BackupCode(code) => ("/api/canvas".to_owned(), vec![("code", code.clone())]),
    }
}

async fn read_body(response: reqwest::Response) -> Result<(u16, String), SyncError> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| SyncError::Request(e.to_string()))?;
    Ok((status, text))
}

#[async_trait::async_trait]
impl CanvasStore for HttpCanvasStore {
    async fn fetch_canvas(&self, lookup: &CanvasLookup) -> Result<CanvasRecord, SyncError> {
        let (path, query) = lookup_request(lookup);
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&query)
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        match read_body(response).await? {
            (200, text) => serde_json::from_str(&text).map_err(|e| SyncError::Parse(e.to_string())),
            (404, _) => Err(SyncError::NotFound),
            (status, body) => Err(SyncError::Response { status, body }),
        }
    }

    async fn update_drawing(&self, canvas_id: Uuid, drawing: &PixelMap) -> Result<(), SyncError> {
        let response = self
            .http
            .patch(format!("{}/api/canvas", self.base_url))
            .json(&UpdateDrawing { canvas_id, drawing })
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        match read_body(response).await? {
            (200 | 204, _) => Ok(()),
            (404, _) => Err(SyncError::NotFound),
            (status, body) => Err(SyncError::Response { status, body }),
        }
    }
}
