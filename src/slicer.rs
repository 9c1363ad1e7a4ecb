//! Tile-aligned slicing of template images.
//!
//! A template image is cut along the canvas tile grid, starting from its
//! anchor. Each region gets an original-colour buffer, a palette-mapped
//! buffer, and a palette index grid. Regions are independent, so they are
//! classified in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{MarbleError, Result};
use crate::index::IndexGrid;
use crate::types::{Anchor, Colour, Palette, TileCoord, TileKey};

/// Shared flag used to abort an in-flight slice.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MarbleError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Where one region sits in the source image and on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
    pub key: TileKey,
    /// Top-left corner in source image pixels.
    pub src_x: u32,
    pub src_y: u32,
    pub width: u32,
    pub height: u32,
}

/// A classified region, ready for rendering.
#[derive(Debug, Clone)]
pub struct SlicedRegion {
    pub bounds: RegionBounds,
    pub original: RgbaImage,
    pub mapped: RgbaImage,
    pub indices: IndexGrid,
}

impl SlicedRegion {
    pub fn key(&self) -> TileKey {
        self.bounds.key
    }
}

/// Output of slicing a whole image.
#[derive(Debug, Clone)]
pub struct SliceResult {
    /// Regions in row-major tile order.
    pub regions: Vec<SlicedRegion>,
    /// Bounding-box area of the source image. Transparent pixels count too.
    pub pixel_count: u64,
}

/// Split one axis into tile-aligned spans: `(tile index, offset in tile,
/// source start, length)`.
fn axis_spans(start: u64, extent: u32, tile_size: u32) -> Vec<(u32, u32, u32, u32)> {
    let ts = tile_size as u64;
    let mut spans = Vec::new();
    let mut done: u32 = 0;

    while done < extent {
        let abs = start + done as u64;
        let offset = (abs % ts) as u32;
        let len = (tile_size - offset).min(extent - done);
        spans.push(((abs / ts) as u32, offset, done, len));
        done += len;
    }

    spans
}

/// Compute the regions an image of `width` x `height` covers when anchored
/// at `anchor`.
pub fn plan_regions(width: u32, height: u32, anchor: Anchor, tile_size: u32) -> Vec<RegionBounds> {
    let (abs_x, abs_y) = anchor.absolute(tile_size);
    let columns = axis_spans(abs_x, width, tile_size);
    let rows = axis_spans(abs_y, height, tile_size);

    rows.iter()
        .flat_map(|&(tile_y, offset_y, src_y, h)| {
            columns.iter().map(move |&(tile_x, offset_x, src_x, w)| RegionBounds {
                key: TileKey::new(TileCoord::new(tile_x, tile_y), offset_x, offset_y),
                src_x,
                src_y,
                width: w,
                height: h,
            })
        })
        .collect()
}

/// Slice `img` along the tile grid.
///
/// Returns `Cancelled` if the token fires before every region is done; no
/// partial result escapes.
pub fn slice_image(
    img: &RgbaImage,
    anchor: Anchor,
    tile_size: u32,
    palette: &Palette,
    cancel: &CancelToken,
) -> Result<SliceResult> {
    if tile_size == 0 {
        return Err(MarbleError::Config {
            message: "Tile size must be non-zero".to_string(),
            help: None,
        });
    }
    cancel.check()?;

    let plans = plan_regions(img.width(), img.height(), anchor, tile_size);

    let regions = plans
        .into_par_iter()
        .map(|bounds| {
            cancel.check()?;
            Ok(classify_region(img, bounds, palette))
        })
        .collect::<Result<Vec<_>>>()?;

    cancel.check()?;

    let pixel_count = regions
        .iter()
        .map(|r| r.bounds.width as u64 * r.bounds.height as u64)
        .sum();

    Ok(SliceResult {
        regions,
        pixel_count,
    })
}

/// Classify every pixel of one region.
fn classify_region(img: &RgbaImage, bounds: RegionBounds, palette: &Palette) -> SlicedRegion {
    let RegionBounds {
        src_x,
        src_y,
        width,
        height,
        ..
    } = bounds;

    let mut original = RgbaImage::new(width, height);
    let mut mapped = RgbaImage::new(width, height);
    let mut indices = IndexGrid::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let source = Colour::from(*img.get_pixel(src_x + x, src_y + y));

            if source.same_rgb(Colour::SENTINEL) {
                if (x + y) % 2 == 0 {
                    original.put_pixel(x, y, Colour::CHECKER.into());
                    mapped.put_pixel(x, y, Colour::CHECKER.into());
                }
                continue;
            }

            if source.is_transparent() {
                continue;
            }

            let (mr, mg, mb) = palette.nearest_colour(source.r, source.g, source.b);
            original.put_pixel(x, y, Rgba([source.r, source.g, source.b, 255]));
            mapped.put_pixel(x, y, Rgba([mr, mg, mb, 255]));
            indices.set(x, y, palette.nearest_index(source.r, source.g, source.b));
        }
    }

    SlicedRegion {
        bounds,
        original,
        mapped,
        indices,
    }
}
