//! Grid model: cell addresses, pixel records, and the in-memory grid store.
//!
//! This module defines what is painted on a canvas: the centered integer
//! address of a cell (`CellAddr`), the per-cell record of who painted it with
//! which color and when (`PixelRecord`), a sparse-update type for merges
//! (`PixelPatch`), and the store that owns all painted cells (`Grid`).
//!
//! Data flows into this layer from storage (hydration), from peers (sync
//! payloads), and from the edit intake (local paints). The renderer reads
//! from `Grid` via `iter`.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::color::Color;
use crate::consts::{DEFAULT_CELL_SIZE, DEFAULT_GRID_DIMENSION};

/// A cell key string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("invalid cell key: {0:?}")]
    InvalidCellKey(String),
}

/// Address of one grid cell. `(0, 0)` is the cell just below-right of the grid center.
///
/// On the wire and in storage a cell is keyed by the string `"{x},{y}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddr {
    pub x: i32,
    pub y: i32,
}

impl CellAddr {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for CellAddr {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GridError::InvalidCellKey(s.to_owned());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        Ok(Self { x: parse_coord(x).ok_or_else(invalid)?, y: parse_coord(y).ok_or_else(invalid)? })
    }
}

/// Parse one signed decimal coordinate in canonical form: no `+`, no
/// whitespace, no leading zeros, no `-0`.
fn parse_coord(s: &str) -> Option<i32> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
        && !(s.starts_with('-') && digits == "0");
    if !canonical {
        return None;
    }
    match s.parse::<i32>() {
        Ok(v) => Some(v),
        Err(_) => None,
    }
}

impl TryFrom<String> for CellAddr {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellAddr> for String {
    fn from(cell: CellAddr) -> Self {
        cell.to_string()
    }
}

/// Everything known about one painted cell.
///
/// Field names on the wire match drawings already held in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelRecord {
    pub color: Color,
    #[serde(rename = "lastedEditedUserID", default)]
    pub last_edited_user_id: Option<Uuid>,
    #[serde(rename = "lastedEditedName", default)]
    pub last_edited_name: Option<String>,
    /// Older drawings may carry no time at all; those decode as now.
    #[serde(
        rename = "lastedEditedTime",
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "edit_time_or_now",
        default = "OffsetDateTime::now_utc"
    )]
    pub last_edited_time: OffsetDateTime,
}

fn edit_time_or_now<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parsed = time::serde::rfc3339::option::deserialize(deserializer)?;
    Ok(parsed.unwrap_or_else(OffsetDateTime::now_utc))
}

/// Sparse update for a cell. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelPatch {
    pub color: Option<Color>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
}

impl PixelPatch {
    /// Patch carrying every field of `record` except its edit time.
    #[must_use]
    pub fn from_record(record: &PixelRecord) -> Self {
        Self {
            color: Some(record.color.clone()),
            user_id: record.last_edited_user_id,
            user_name: record.last_edited_name.clone(),
        }
    }
}

/// Cell → record mapping as exchanged with peers and storage.
pub type PixelMap = HashMap<CellAddr, PixelRecord>;

/// Shape of a canvas grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Cells along each axis.
    pub dimension: u32,
    /// World units covered by one cell at zoom 1.
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { dimension: DEFAULT_GRID_DIMENSION, cell_size: DEFAULT_CELL_SIZE }
    }
}

impl GridConfig {
    /// Lowest valid coordinate on either axis.
    #[must_use]
    pub fn min_coord(&self) -> i64 {
        -i64::from(self.dimension / 2)
    }

    /// One past the highest valid coordinate on either axis.
    #[must_use]
    pub fn end_coord(&self) -> i64 {
        i64::from(self.dimension) - i64::from(self.dimension / 2)
    }

    /// Whether `cell` lies on the grid.
    #[must_use]
    pub fn contains(&self, cell: CellAddr) -> bool {
        let range = self.min_coord()..self.end_coord();
        range.contains(&i64::from(cell.x)) && range.contains(&i64::from(cell.y))
    }
}

/// In-memory store of painted cells for one canvas.
///
/// Not synchronized; callers apply merges one at a time.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    config: GridConfig,
    pixels: PixelMap,
}

impl Grid {
    /// Create an empty grid.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self { config, pixels: HashMap::new() }
    }

    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Return the record for a cell, if it has been painted.
    #[must_use]
    pub fn get(&self, cell: CellAddr) -> Option<&PixelRecord> {
        self.pixels.get(&cell)
    }

    /// Merge a patch into a cell, stamping `now` as the edit time.
    ///
    /// Present patch fields overwrite, absent fields keep their previous
    /// value. Cells off the grid are ignored, and an unpainted cell is only
    /// created when the patch carries a color. Returns whether the grid changed.
    pub fn merge(&mut self, cell: CellAddr, patch: PixelPatch, now: OffsetDateTime) -> bool {
        if !self.config.contains(cell) {
            return false;
        }
        if let Some(existing) = self.pixels.get_mut(&cell) {
            if let Some(color) = patch.color {
                existing.color = color;
            }
            if patch.user_id.is_some() {
                existing.last_edited_user_id = patch.user_id;
            }
            if patch.user_name.is_some() {
                existing.last_edited_name = patch.user_name;
            }
            existing.last_edited_time = now;
            return true;
        }
        let Some(color) = patch.color else {
            return false;
        };
        self.pixels.insert(
            cell,
            PixelRecord {
                color,
                last_edited_user_id: patch.user_id,
                last_edited_name: patch.user_name,
                last_edited_time: now,
            },
        );
        true
    }

    /// Replace every cell with a storage snapshot. Off-grid entries are dropped.
    pub fn hydrate(&mut self, snapshot: PixelMap) {
        let total = snapshot.len();
        let config = self.config;
        self.pixels = snapshot.into_iter().filter(|(cell, _)| config.contains(*cell)).collect();
        let dropped = total - self.pixels.len();
        if dropped > 0 {
            warn!(dropped, dimension = config.dimension, "dropped off-grid cells from snapshot");
        }
        info!(count = self.pixels.len(), "hydrated grid from snapshot");
    }

    /// Copy of every painted cell.
    #[must_use]
    pub fn snapshot(&self) -> PixelMap {
        self.pixels.clone()
    }

    /// Iterate painted cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellAddr, &PixelRecord)> {
        self.pixels.iter()
    }

    /// Number of painted cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns `true` if no cell is painted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
