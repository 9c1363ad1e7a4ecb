//! PNG encoding and image decoding.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{MarbleError, Result};

/// Encode an RGBA bitmap as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| MarbleError::Encode {
            message: e.to_string(),
        })?;
    Ok(bytes.into_inner())
}

/// Decode any format the `image` crate understands into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(|e| MarbleError::Decode {
        message: e.to_string(),
        help: Some("Templates must be PNG, JPEG, WebP, GIF or BMP images".to_string()),
    })?;
    Ok(img.to_rgba8())
}
