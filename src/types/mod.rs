//! Core domain types for marble.
//!
//! - `Colour` - RGBA colour values
//! - `Palette` - the ordered paint palette and its nearest-colour search
//! - `TileCoord`, `TileKey`, `Anchor` - canvas addressing

mod colour;
mod palette;
mod tile;

pub use colour::Colour;
pub use palette::{Palette, PaletteEntry, PaletteEntryDef, TRANSPARENT_NAME};
pub use tile::{Anchor, TileCoord, TileKey};
