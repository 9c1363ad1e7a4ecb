//! Tile coordinates, tile keys, and template anchors.

use std::fmt;
use std::str::FromStr;

use crate::error::{MarbleError, Result};

/// Absolute coordinate of one canvas tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Parse `"X,Y"` (whitespace around the parts is allowed).
    pub fn parse(s: &str) -> Result<Self> {
        let [x, y] = parse_ints::<2>(s, ',').ok_or_else(|| MarbleError::Parse {
            message: format!("Invalid tile coordinate '{}'", s),
            help: Some("Use X,Y, for example 1023,744".to_string()),
        })?;
        Ok(Self::new(x, y))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04},{:04}", self.x, self.y)
    }
}

/// Identifies one sliced region: the tile it lives in and the offset of its
/// top-left pixel within that tile.
///
/// Renders as `TTTT,TTTT,PPP,PPP`. The derived ordering matches the
/// ordering of the rendered strings, so a range over a `BTreeMap` keyed by
/// `TileKey` answers "which regions belong to this tile".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub tile: TileCoord,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl TileKey {
    pub const fn new(tile: TileCoord, offset_x: u32, offset_y: u32) -> Self {
        Self {
            tile,
            offset_x,
            offset_y,
        }
    }

    /// Smallest key belonging to `tile`.
    pub const fn first_in(tile: TileCoord) -> Self {
        Self::new(tile, 0, 0)
    }

    /// Largest key belonging to `tile`.
    pub const fn last_in(tile: TileCoord) -> Self {
        Self::new(tile, u32::MAX, u32::MAX)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{:03},{:03}", self.tile, self.offset_x, self.offset_y)
    }
}

impl FromStr for TileKey {
    type Err = MarbleError;

    fn from_str(s: &str) -> Result<Self> {
        let [tx, ty, px, py] = parse_ints::<4>(s, ',').ok_or_else(|| MarbleError::Parse {
            message: format!("Invalid tile key '{}'", s),
            help: Some("Tile keys look like 0012,0034,500,250".to_string()),
        })?;
        Ok(Self::new(TileCoord::new(tx, ty), px, py))
    }
}

/// Top-left corner of a template in tile + pixel coordinates.
///
/// Pixel offsets may exceed the tile size; they are normalized when the
/// template is sliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub tile_x: u32,
    pub tile_y: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

impl Anchor {
    pub const fn new(tile_x: u32, tile_y: u32, pixel_x: u32, pixel_y: u32) -> Self {
        Self {
            tile_x,
            tile_y,
            pixel_x,
            pixel_y,
        }
    }

    /// Parse the persisted `"tx, ty, px, py"` form.
    pub fn parse(s: &str) -> Result<Self> {
        let [tx, ty, px, py] = parse_ints::<4>(s, ',').ok_or_else(|| MarbleError::MalformedAnchor {
            message: format!("expected four non-negative integers, got '{}'", s),
        })?;
        Ok(Self::new(tx, ty, px, py))
    }

    /// Build an anchor from loosely-typed input such as form fields.
    /// Every part must be present and numeric.
    pub fn from_parts(parts: &[Option<&str>]) -> Result<Self> {
        if parts.len() != 4 {
            return Err(MarbleError::MalformedAnchor {
                message: format!("expected 4 coordinates, got {}", parts.len()),
            });
        }

        let mut values = [0u32; 4];
        for (i, part) in parts.iter().enumerate() {
            let raw = part.map(str::trim).filter(|p| !p.is_empty()).ok_or_else(|| {
                MarbleError::MalformedAnchor {
                    message: format!("coordinate {} is missing", i + 1),
                }
            })?;
            values[i] = raw.parse().map_err(|_| MarbleError::MalformedAnchor {
                message: format!("coordinate {} is not a number: '{}'", i + 1, raw),
            })?;
        }

        let [tx, ty, px, py] = values;
        Ok(Self::new(tx, ty, px, py))
    }

    /// Absolute canvas pixel of the anchor.
    pub fn absolute(&self, tile_size: u32) -> (u64, u64) {
        let ts = tile_size as u64;
        (
            self.tile_x as u64 * ts + self.pixel_x as u64,
            self.tile_y as u64 * ts + self.pixel_y as u64,
        )
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.tile_x, self.tile_y, self.pixel_x, self.pixel_y
        )
    }
}

fn parse_ints<const N: usize>(s: &str, sep: char) -> Option<[u32; N]> {
    let mut out = [0u32; N];
    let mut parts = s.split(sep);
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}
