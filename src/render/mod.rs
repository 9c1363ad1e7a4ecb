//! Rendering module for marble.
//!
//! Turns sliced regions into the upscaled bitmaps the compositor draws,
//! and moves bitmaps in and out of PNG.

mod chunk;
mod png;

pub use chunk::{
    apply_dot_mask, downsample_centres, render_region, upscale, ChunkVariants, RenderFactor,
};
pub use png::{decode_image, encode_png};
