//! Pixel-grid synchronization engine for collaborative, location-gated canvases.
//!
//! This crate owns one open canvas session: the sparse grid of painted cells,
//! the pan/zoom transform between screen and cell space, the pointer/touch
//! state machine that turns input into paints, the raster pipeline that turns
//! the grid into pixels, and the propagation protocol that pushes edits to
//! peers (broadcast) and then to storage (persist). The host is responsible
//! for wiring input events and network transports to the engine and for
//! presenting the rendered surface.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Session state ([`engine::EngineCore`]) and the [`engine::Action`]s it emits |
//! | [`grid`] | Cell addresses, pixel records, and the in-memory grid store |
//! | [`camera`] | Pan/zoom camera and screen/world/cell conversions |
//! | [`color`] | Hex color parsing and the brush palette |
//! | [`input`] | Pointer events, scene state, and the edit-intake state machine |
//! | [`render`] | Rasterization, nearest-neighbor blit, and scene objects |
//! | [`propagation`] | Broadcast/persist queues and the flush driver |
//! | [`sync`] | Wire payloads and the peer/storage collaborator traits |
//! | [`gate`] | Location-derived edit access |
//! | [`consts`] | Shared numeric constants |

pub mod camera;
pub mod color;
pub mod consts;
pub mod engine;
pub mod gate;
pub mod grid;
pub mod input;
pub mod propagation;
pub mod render;
pub mod sync;
