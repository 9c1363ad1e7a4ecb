//! Ordered paint palette with nearest-colour search.

use serde::{Deserialize, Serialize};

use crate::error::{MarbleError, Result};

use super::Colour;

/// Name of the entry that never takes part in colour search.
pub const TRANSPARENT_NAME: &str = "Transparent";

/// Indices are stored as `u8`.
pub const MAX_PALETTE_ENTRIES: usize = 256;

/// A named palette colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: String,
    pub colour: Colour,
}

impl PaletteEntry {
    pub fn new(name: impl Into<String>, colour: Colour) -> Self {
        Self {
            name: name.into(),
            colour,
        }
    }

    fn is_searchable(&self) -> bool {
        self.name != TRANSPARENT_NAME
    }
}

/// A palette entry as written in `marble.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntryDef {
    pub name: String,
    pub hex: String,
}

/// A fixed, ordered set of paint colours.
///
/// Index positions are stable: index 0 is "no paintable colour" by
/// convention and holds the `Transparent` entry in the built-in palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

/// The canvas palette, in the order the site numbers its colours.
const CANVAS_COLOURS: [(&str, [u8; 3]); 64] = [
    ("Transparent", [0, 0, 0]),
    ("Black", [0, 0, 0]),
    ("Dark Gray", [60, 60, 60]),
    ("Gray", [120, 120, 120]),
    ("Light Gray", [210, 210, 210]),
    ("White", [255, 255, 255]),
    ("Deep Red", [96, 0, 24]),
    ("Red", [237, 28, 36]),
    ("Orange", [255, 127, 39]),
    ("Gold", [246, 170, 9]),
    ("Yellow", [249, 221, 59]),
    ("Light Yellow", [255, 250, 188]),
    ("Dark Green", [14, 185, 104]),
    ("Green", [19, 230, 123]),
    ("Light Green", [135, 255, 94]),
    ("Dark Teal", [12, 129, 110]),
    ("Teal", [16, 174, 166]),
    ("Light Teal", [19, 225, 190]),
    ("Dark Blue", [40, 80, 158]),
    ("Blue", [64, 147, 228]),
    ("Cyan", [96, 247, 242]),
    ("Indigo", [107, 80, 246]),
    ("Light Indigo", [153, 177, 251]),
    ("Dark Purple", [120, 12, 153]),
    ("Purple", [170, 56, 185]),
    ("Light Purple", [224, 159, 249]),
    ("Dark Pink", [203, 0, 122]),
    ("Pink", [236, 31, 128]),
    ("Light Pink", [243, 141, 169]),
    ("Dark Brown", [104, 70, 52]),
    ("Brown", [149, 104, 42]),
    ("Beige", [248, 178, 119]),
    ("Medium Gray", [170, 170, 170]),
    ("Dark Red", [165, 14, 30]),
    ("Light Red", [250, 128, 114]),
    ("Dark Orange", [228, 92, 26]),
    ("Light Tan", [214, 181, 148]),
    ("Dark Goldenrod", [156, 132, 49]),
    ("Goldenrod", [197, 173, 49]),
    ("Light Goldenrod", [232, 212, 95]),
    ("Dark Olive", [74, 107, 58]),
    ("Olive", [90, 148, 74]),
    ("Light Olive", [132, 197, 115]),
    ("Dark Cyan", [15, 121, 159]),
    ("Light Cyan", [187, 250, 242]),
    ("Light Blue", [125, 199, 255]),
    ("Dark Indigo", [77, 49, 184]),
    ("Dark Slate Blue", [74, 66, 132]),
    ("Slate Blue", [122, 113, 196]),
    ("Light Slate Blue", [181, 174, 241]),
    ("Light Brown", [219, 164, 99]),
    ("Dark Beige", [209, 128, 81]),
    ("Light Beige", [255, 197, 165]),
    ("Dark Peach", [155, 82, 73]),
    ("Peach", [209, 128, 120]),
    ("Light Peach", [250, 182, 164]),
    ("Dark Tan", [123, 99, 82]),
    ("Tan", [156, 132, 107]),
    ("Dark Slate", [51, 57, 65]),
    ("Slate", [109, 117, 141]),
    ("Light Slate", [179, 185, 209]),
    ("Dark Stone", [109, 100, 63]),
    ("Stone", [148, 140, 107]),
    ("Light Stone", [205, 197, 158]),
];

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Self {
        Self { entries }
    }

    /// The built-in canvas palette.
    pub fn canvas() -> Self {
        let entries = CANVAS_COLOURS
            .iter()
            .map(|(name, [r, g, b])| PaletteEntry::new(*name, Colour::rgb(*r, *g, *b)))
            .collect();
        Self { entries }
    }

    /// Build a palette from manifest definitions, in the given order.
    pub fn from_defs(defs: &[PaletteEntryDef]) -> Result<Self> {
        if defs.len() > MAX_PALETTE_ENTRIES {
            return Err(MarbleError::Config {
                message: format!(
                    "Palette has {} entries, at most {} are supported",
                    defs.len(),
                    MAX_PALETTE_ENTRIES
                ),
                help: Some("Palette indices must fit in a byte".to_string()),
            });
        }

        let entries = defs
            .iter()
            .map(|def| {
                let colour = Colour::from_hex(&def.hex).map_err(|_| MarbleError::Config {
                    message: format!("Palette entry '{}' has invalid colour '{}'", def.name, def.hex),
                    help: Some("Palette colours use #RRGGBB".to_string()),
                })?;
                Ok(PaletteEntry::new(def.name.clone(), colour))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn get(&self, index: u8) -> Option<&PaletteEntry> {
        self.entries.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position and entry of the closest searchable colour.
    ///
    /// Ties go to the entry that appears first.
    fn nearest(&self, colour: Colour) -> Option<(usize, &PaletteEntry)> {
        let mut best: Option<(usize, &PaletteEntry, u32)> = None;

        for (i, entry) in self.entries.iter().enumerate().take(MAX_PALETTE_ENTRIES) {
            if !entry.is_searchable() {
                continue;
            }
            let dist = entry.colour.distance_sq(colour);
            if best.map_or(true, |(_, _, d)| dist < d) {
                best = Some((i, entry, dist));
            }
        }

        best.map(|(i, entry, _)| (i, entry))
    }

    /// Closest palette colour to an RGB triple. Returns the input unchanged
    /// when nothing is searchable.
    pub fn nearest_colour(&self, r: u8, g: u8, b: u8) -> (u8, u8, u8) {
        match self.nearest(Colour::rgb(r, g, b)) {
            Some((_, entry)) => (entry.colour.r, entry.colour.g, entry.colour.b),
            None => (r, g, b),
        }
    }

    /// Palette index of the closest colour. Falls back to the "Black" entry
    /// (or index 1) when nothing is searchable.
    pub fn nearest_index(&self, r: u8, g: u8, b: u8) -> u8 {
        match self.nearest(Colour::rgb(r, g, b)) {
            Some((i, _)) => i as u8,
            None => self.fallback_index(),
        }
    }

    fn fallback_index(&self) -> u8 {
        self.entries
            .iter()
            .position(|e| e.name == "Black")
            .map_or(1, |i| i as u8)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::canvas()
    }
}
