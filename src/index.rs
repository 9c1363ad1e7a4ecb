//! Per-template palette index grids.
//!
//! Each sliced region has a low-resolution grid (one entry per source
//! pixel) of palette indices. Grids are produced by the slicer, but
//! templates restored from storage only carry bitmaps, so the store can
//! rebuild a grid from the masked bitmap on first use.

use std::collections::BTreeMap;
use std::sync::RwLock;

use image::RgbaImage;

use crate::types::{Palette, TileCoord, TileKey};

/// Row-major palette indices for one region. Index 0 means "no colour".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGrid {
    width: u32,
    height: u32,
    indices: Vec<u8>,
}

impl IndexGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            indices: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Index at a grid position, or 0 outside the grid.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.indices[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, index: u8) {
        if x < self.width && y < self.height {
            self.indices[(y * self.width + x) as usize] = index;
        }
    }

    /// Rebuild a grid from an upscaled bitmap by sampling the centre pixel
    /// of every `factor` x `factor` block.
    ///
    /// Only fully opaque samples carry a colour; the translucent sentinel
    /// checkerboard and empty cells both read as 0, matching what the
    /// slicer records for them.
    pub fn from_bitmap(bitmap: &RgbaImage, factor: u32, palette: &Palette) -> Self {
        let factor = factor.max(1);
        let centre = factor / 2;
        let mut grid = Self::new(bitmap.width() / factor, bitmap.height() / factor);

        for y in 0..grid.height {
            for x in 0..grid.width {
                let p = bitmap.get_pixel(x * factor + centre, y * factor + centre);
                if p[3] == 255 {
                    grid.set(x, y, palette.nearest_index(p[0], p[1], p[2]));
                }
            }
        }

        grid
    }
}

/// Tile-keyed index grids for one template.
///
/// Interior locking lets lookups populate missing grids through a shared
/// reference to the owning template.
#[derive(Debug, Default)]
pub struct ColorIndexStore {
    grids: RwLock<BTreeMap<TileKey, IndexGrid>>,
}

impl ColorIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grids(grids: BTreeMap<TileKey, IndexGrid>) -> Self {
        Self {
            grids: RwLock::new(grids),
        }
    }

    pub fn len(&self) -> usize {
        self.read(|g| g.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.read(|g| g.contains_key(key))
    }

    /// Return the grid for `key`, building it from `bitmap` if it is missing.
    ///
    /// Building is idempotent: an existing grid is never replaced.
    pub fn get_or_build(
        &self,
        key: TileKey,
        bitmap: &RgbaImage,
        factor: u32,
        palette: &Palette,
    ) -> IndexGrid {
        if let Some(grid) = self.read(|g| g.get(&key).cloned()) {
            return grid;
        }

        let built = IndexGrid::from_bitmap(bitmap, factor, palette);
        let mut grids = match self.grids.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        grids.entry(key).or_insert(built).clone()
    }

    /// Make sure every bitmap chunk in `tile` has a grid.
    pub fn ensure_tile<'a>(
        &self,
        tile: TileCoord,
        bitmaps: impl Iterator<Item = (&'a TileKey, &'a RgbaImage)>,
        factor: u32,
        palette: &Palette,
    ) {
        for (key, bitmap) in bitmaps {
            if key.tile == tile && !self.contains(key) {
                self.get_or_build(*key, bitmap, factor, palette);
            }
        }
    }

    /// Palette index at tile-local pixel (`pixel_x`, `pixel_y`) of `tile`.
    /// Returns 0 when no stored region covers the pixel.
    pub fn index_at(&self, tile: TileCoord, pixel_x: u32, pixel_y: u32) -> u8 {
        self.read(|grids| {
            grids
                .range(TileKey::first_in(tile)..=TileKey::last_in(tile))
                .find(|(key, grid)| {
                    pixel_x >= key.offset_x
                        && pixel_y >= key.offset_y
                        && pixel_x - key.offset_x < grid.width
                        && pixel_y - key.offset_y < grid.height
                })
                .map_or(0, |(key, grid)| {
                    grid.get(pixel_x - key.offset_x, pixel_y - key.offset_y)
                })
        })
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<TileKey, IndexGrid>) -> T) -> T {
        match self.grids.read() {
            Ok(guard) => f(&*guard),
            Err(poisoned) => f(&*poisoned.into_inner()),
        }
    }
}

impl Clone for ColorIndexStore {
    fn clone(&self) -> Self {
        Self::from_grids(self.read(|g| g.clone()))
    }
}
