//! Hex colors and the brush palette.
//!
//! Colors enter the engine as hex strings (brush selection, peer payloads,
//! stored drawings). They are parsed once at that boundary into [`Color`],
//! which keeps the original text for the wire and the decoded [`Rgba`] for
//! rendering. A malformed string is rejected there, before any cell is touched.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A hex string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("invalid hex color: {0:?}")]
    Malformed(String),
}

/// 8-bit RGBA. Alpha 255 is fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Alpha as a fraction in `[0, 1]`.
    #[must_use]
    pub fn alpha(self) -> f64 {
        f64::from(self.a) / 255.0
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Decode a 3, 4, 6, or 8 digit hex color, with or without a leading `#`.
///
/// Short forms double each digit (`abc` → `aabbcc`). Without an alpha pair
/// the color is fully opaque.
///
/// # Errors
///
/// Returns [`ColorError::Malformed`] for any other length or a non-hex digit.
pub fn hex_to_rgba(hex: &str) -> Result<Rgba, ColorError> {
    let malformed = || ColorError::Malformed(hex.to_owned());
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }

    let expanded: String = match digits.len() {
        3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => digits.to_owned(),
        _ => return Err(malformed()),
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| malformed());
    let a = if expanded.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba { r: channel(0)?, g: channel(2)?, b: channel(4)?, a })
}

/// A validated color that remembers how it was written.
///
/// Equality compares the decoded RGBA, so `#FFF` equals `#ffffff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    text: String,
    rgba: Rgba,
}

impl Color {
    /// # Errors
    ///
    /// Returns [`ColorError::Malformed`] if `hex` is not a valid hex color.
    pub fn parse(hex: &str) -> Result<Self, ColorError> {
        Ok(Self { rgba: hex_to_rgba(hex)?, text: hex.to_owned() })
    }

    #[must_use]
    pub fn rgba(&self) -> Rgba {
        self.rgba
    }

    /// The hex text as originally supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.rgba == other.rgba
    }
}

impl Eq for Color {}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self { rgba: hex_to_rgba(&value)?, text: value })
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.text
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================
// Palette
// =============================================================

/// A named brush color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub name: &'static str,
    pub hex: &'static str,
}

/// Brush colors offered to painters, in display order.
pub const PALETTE: [Swatch; 22] = [
    Swatch { name: "red", hex: "#E34545" },
    Swatch { name: "red_light", hex: "#EE8E8E" },
    Swatch { name: "orange", hex: "#F89941" },
    Swatch { name: "orange_light", hex: "#F9BE87" },
    Swatch { name: "yellow", hex: "#F4BC41" },
    Swatch { name: "yellow_light", hex: "#F8DCA0" },
    Swatch { name: "lime", hex: "#9FC10B" },
    Swatch { name: "lime_light", hex: "#DDF473" },
    Swatch { name: "green", hex: "#0DB515" },
    Swatch { name: "green_light", hex: "#76F17C" },
    Swatch { name: "teal", hex: "#1FA7DD" },
    Swatch { name: "teal_light", hex: "#75D1F5" },
    Swatch { name: "blue", hex: "#2C60D3" },
    Swatch { name: "blue_light", hex: "#86A8F4" },
    Swatch { name: "purple", hex: "#984CE3" },
    Swatch { name: "purple_light", hex: "#CEABF0" },
    Swatch { name: "pink", hex: "#E859C4" },
    Swatch { name: "pink_light", hex: "#F6BBE7" },
    Swatch { name: "white", hex: "#FFFFFF" },
    Swatch { name: "grey_light", hex: "#A8A8A8" },
    Swatch { name: "grey_dark", hex: "#545454" },
    Swatch { name: "black", hex: "#000000" },
];

/// Look up a palette entry by name.
#[must_use]
pub fn swatch(name: &str) -> Option<Swatch> {
    PALETTE.iter().copied().find(|s| s.name == name)
}

/// The brush color a new session starts with.
#[must_use]
pub fn default_brush_color() -> Color {
    Color { text: PALETTE[0].hex.to_owned(), rgba: Rgba::new(0xE3, 0x45, 0x45, 255) }
}
