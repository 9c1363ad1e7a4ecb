//! Tile compositing.
//!
//! For each canvas tile request the compositor draws the chunks of every
//! enabled overlapping template onto the incoming tile, lowest sort id
//! first, and memoizes the encoded result in the registry's tile cache.

mod cache;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::Result;
use crate::manifest::Manifest;
use crate::registry::TemplateRegistry;
use crate::render::{decode_image, encode_png};
use crate::template::{ChunkStyle, ColourMode, Template};
use crate::types::TileCoord;

pub use cache::TileCache;

/// How close the viewer is to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ZoomMode {
    /// Close enough to see individual pixels: dot-masked chunks.
    ZoomedIn,
    /// Solid chunks at reduced opacity.
    #[default]
    ZoomedOut,
}

impl ZoomMode {
    /// Scales at or above `threshold` count as zoomed in.
    pub fn from_scale(scale: f32, threshold: f32) -> Self {
        if scale >= threshold {
            ZoomMode::ZoomedIn
        } else {
            ZoomMode::ZoomedOut
        }
    }

    fn chunk_style(self) -> ChunkStyle {
        match self {
            ZoomMode::ZoomedIn => ChunkStyle::Masked,
            ZoomMode::ZoomedOut => ChunkStyle::Full,
        }
    }
}

impl fmt::Display for ZoomMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomMode::ZoomedIn => write!(f, "in"),
            ZoomMode::ZoomedOut => write!(f, "out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorConfig {
    pub zoom_threshold: f32,
    /// Template opacity when zoomed out, 0.0 to 1.0.
    pub zoomed_out_opacity: f32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            zoom_threshold: 2.0,
            zoomed_out_opacity: 0.6,
        }
    }
}

impl CompositorConfig {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            zoom_threshold: manifest.zoom_threshold,
            zoomed_out_opacity: manifest.zoomed_out_opacity,
        }
    }
}

/// Composites template chunks over canvas tiles.
#[derive(Debug, Default)]
pub struct TileCompositor {
    config: CompositorConfig,
    zoom: ZoomMode,
    encodes: AtomicUsize,
}

/// `"{tile}|{colour}|{zoom}|v{version}"`.
pub fn cache_key(tile: TileCoord, colour: ColourMode, zoom: ZoomMode, version: u64) -> String {
    format!("{}|{}|{}|v{}", tile, colour, zoom, version)
}

impl TileCompositor {
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            zoom: ZoomMode::default(),
            encodes: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn zoom_mode(&self) -> ZoomMode {
        self.zoom
    }

    /// Feed the current viewport scale. A change of zoom mode invalidates
    /// the registry's cached tiles.
    pub fn set_zoom_signal(&mut self, registry: &TemplateRegistry, scale: f32) -> ZoomMode {
        let mode = ZoomMode::from_scale(scale, self.config.zoom_threshold);
        if mode != self.zoom {
            self.zoom = mode;
            registry.invalidate();
        }
        mode
    }

    /// Number of tiles this compositor has encoded.
    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::Relaxed)
    }

    /// Composite with the current zoom mode and the registry's colour mode.
    pub fn composite_current(
        &self,
        registry: &TemplateRegistry,
        base: &[u8],
        tile: TileCoord,
    ) -> Result<Vec<u8>> {
        self.composite_tile(registry, base, tile, self.zoom, registry.colour_mode())
    }

    /// Draw every enabled template overlapping `tile` onto the encoded
    /// `base` tile and return the encoded result.
    ///
    /// Tiles with no overlapping template come back unchanged and are not
    /// cached.
    pub fn composite_tile(
        &self,
        registry: &TemplateRegistry,
        base: &[u8],
        tile: TileCoord,
        zoom: ZoomMode,
        colour: ColourMode,
    ) -> Result<Vec<u8>> {
        let mut layers: Vec<&Template> = registry
            .templates()
            .iter()
            .filter(|t| t.is_enabled() && t.overlaps(tile))
            .collect();
        if layers.is_empty() {
            return Ok(base.to_vec());
        }

        let version = registry.cache_version();
        let key = cache_key(tile, colour, zoom, version);
        if let Some(hit) = registry.cached_tile(&key) {
            return Ok(hit);
        }

        layers.sort_by_key(|t| t.sort_id());

        let config = registry.config();
        let side = config.tile_size * config.factor.get();
        let mut canvas = decode_image(base)?;
        if canvas.dimensions() != (side, side) {
            canvas = imageops::resize(&canvas, side, side, FilterType::Nearest);
        }

        let opacity = match zoom {
            ZoomMode::ZoomedIn => 255,
            ZoomMode::ZoomedOut => (self.config.zoomed_out_opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
        };

        for template in layers {
            let k = template.meta().factor.get();
            for (chunk_key, chunk) in template.chunks_in_tile(tile, colour, zoom.chunk_style()) {
                draw_chunk(&mut canvas, chunk, chunk_key.offset_x * k, chunk_key.offset_y * k, opacity);
            }
        }

        let bytes = encode_png(&canvas)?;
        self.encodes.fetch_add(1, Ordering::Relaxed);
        registry.store_tile(key, version, bytes.clone());
        Ok(bytes)
    }
}

/// Palette index under a tile pixel, for auto-selecting a paint colour.
///
/// Enabled templates are consulted from the highest sort id down; the first
/// non-zero index wins.
pub fn pick_palette_index_at(
    registry: &TemplateRegistry,
    tile: TileCoord,
    pixel_x: u32,
    pixel_y: u32,
) -> u8 {
    let mut candidates: Vec<&Template> = registry
        .templates()
        .iter()
        .filter(|t| t.is_enabled())
        .collect();
    candidates.sort_by_key(|t| std::cmp::Reverse(t.sort_id()));

    candidates
        .into_iter()
        .map(|t| t.index_at(tile, pixel_x, pixel_y, registry.palette()))
        .find(|&index| index != 0)
        .unwrap_or(0)
}

/// Draw `chunk` onto `dest` at an offset, clipped to `dest`.
fn draw_chunk(dest: &mut RgbaImage, chunk: &RgbaImage, offset_x: u32, offset_y: u32, opacity: u8) {
    for (sx, sy, pixel) in chunk.enumerate_pixels() {
        let (dx, dy) = (offset_x + sx, offset_y + sy);
        if dx >= dest.width() || dy >= dest.height() {
            continue;
        }
        if pixel[3] > 0 {
            blend_over(dest.get_pixel_mut(dx, dy), *pixel, opacity);
        }
    }
}

/// Source-over in integer arithmetic, with the source alpha scaled by
/// `opacity`.
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: u8) {
    let sa = src[3] as u32 * opacity as u32 / 255;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        *dst = Rgba([src[0], src[1], src[2], 255]);
        return;
    }

    let da = dst[3] as u32;
    let keep = da * (255 - sa) / 255;
    let out_a = sa + keep;
    for c in 0..3 {
        let mixed = (src[c] as u32 * sa + dst[c] as u32 * keep) / out_a;
        dst[c] = mixed.min(255) as u8;
    }
    dst[3] = out_a as u8;
}
