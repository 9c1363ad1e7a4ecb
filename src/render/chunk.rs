//! Chunk bitmap variants.
//!
//! Every sliced region is drawn at `k` times its size. The "full" variant
//! fills each `k` x `k` block with the source pixel; the "masked" variant
//! keeps only the block's centre pixel, so the live canvas shows through
//! around a small dot.

use image::{Rgba, RgbaImage};

use crate::error::{MarbleError, Result};
use crate::slicer::SlicedRegion;

/// Odd integer upscale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderFactor(u32);

impl RenderFactor {
    pub const DEFAULT: Self = Self(3);

    /// Even factors have no centre pixel and are rejected.
    pub fn new(factor: u32) -> Result<Self> {
        if factor == 0 || factor % 2 == 0 {
            return Err(MarbleError::InvalidRenderFactor { factor });
        }
        Ok(Self(factor))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Offset of the centre pixel inside a block.
    pub fn centre(self) -> u32 {
        self.0 / 2
    }
}

impl Default for RenderFactor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The four stored renderings of one region.
#[derive(Debug, Clone)]
pub struct ChunkVariants {
    pub original_masked: RgbaImage,
    pub auto_masked: RgbaImage,
    pub original_full: RgbaImage,
    pub auto_full: RgbaImage,
}

impl ChunkVariants {
    /// Build all variants from a low-resolution original and its
    /// palette-mapped counterpart.
    pub fn from_buffers(original: &RgbaImage, mapped: &RgbaImage, factor: RenderFactor) -> Self {
        let original_full = upscale(original, factor.get());
        let auto_full = upscale(mapped, factor.get());
        Self {
            original_masked: apply_dot_mask(&original_full, factor),
            auto_masked: apply_dot_mask(&auto_full, factor),
            original_full,
            auto_full,
        }
    }
}

/// Render the four variants for a sliced region.
pub fn render_region(region: &SlicedRegion, factor: RenderFactor) -> ChunkVariants {
    ChunkVariants::from_buffers(&region.original, &region.mapped, factor)
}

/// Nearest-neighbour integer upscale.
pub fn upscale(img: &RgbaImage, factor: u32) -> RgbaImage {
    let factor = factor.max(1);
    if factor == 1 {
        return img.clone();
    }

    RgbaImage::from_fn(img.width() * factor, img.height() * factor, |x, y| {
        *img.get_pixel(x / factor, y / factor)
    })
}

/// Clear every pixel except the centre of each `k` x `k` block.
///
/// The mask depends only on `k`, so the same input always yields the same
/// output bytes.
pub fn apply_dot_mask(img: &RgbaImage, factor: RenderFactor) -> RgbaImage {
    let k = factor.get();
    let c = factor.centre();
    let mut out = img.clone();

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if x % k != c || y % k != c {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    out
}

/// Inverse of `upscale` for bitmaps drawn with a centre-pixel mask: one
/// sample per block, taken from the block centre.
pub fn downsample_centres(img: &RgbaImage, factor: RenderFactor) -> RgbaImage {
    let k = factor.get();
    let c = factor.centre();
    RgbaImage::from_fn(img.width() / k, img.height() / k, |x, y| {
        *img.get_pixel(x * k + c, y * k + c)
    })
}
