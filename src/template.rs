//! Templates: sliced images anchored on the canvas.

use std::collections::BTreeMap;
use std::fmt;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::index::ColorIndexStore;
use crate::render::{downsample_centres, render_region, ChunkVariants, RenderFactor};
use crate::slicer::SliceResult;
use crate::types::{Anchor, Palette, TileCoord, TileKey};

/// Tile-keyed bitmaps for one variant.
pub type ChunkMap = BTreeMap<TileKey, RgbaImage>;

/// Which colours a chunk is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColourMode {
    /// The template's own colours.
    #[default]
    Original,
    /// Colours snapped to the nearest palette entry.
    Auto,
}

impl ColourMode {
    pub fn from_auto(auto: bool) -> Self {
        if auto {
            ColourMode::Auto
        } else {
            ColourMode::Original
        }
    }
}

impl fmt::Display for ColourMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColourMode::Original => write!(f, "original"),
            ColourMode::Auto => write!(f, "auto"),
        }
    }
}

/// Dot-per-pixel or solid blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkStyle {
    Masked,
    Full,
}

/// Identity and placement of a template, separate from its bitmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMeta {
    pub display_name: String,
    pub author_id: String,
    pub anchor: Anchor,
    pub tile_size: u32,
    pub factor: RenderFactor,
}

/// One image anchored on the canvas, pre-rendered per tile.
#[derive(Debug, Clone)]
pub struct Template {
    meta: TemplateMeta,
    sort_id: u32,
    pixel_count: u64,
    original_masked: ChunkMap,
    auto_masked: ChunkMap,
    original_full: ChunkMap,
    auto_full: ChunkMap,
    colour_index: ColorIndexStore,
    colour_mode: ColourMode,
    enabled: bool,
}

impl Template {
    /// Render a freshly sliced image into a template.
    pub fn from_slices(meta: TemplateMeta, slices: SliceResult, colour_mode: ColourMode) -> Self {
        let factor = meta.factor;
        let rendered: Vec<(TileKey, ChunkVariants)> = slices
            .regions
            .par_iter()
            .map(|region| (region.key(), render_region(region, factor)))
            .collect();

        let grids = slices
            .regions
            .into_iter()
            .map(|region| (region.key(), region.indices))
            .collect();

        let mut template = Self::empty(meta, slices.pixel_count, colour_mode);
        template.colour_index = ColorIndexStore::from_grids(grids);
        for (key, variants) in rendered {
            template.insert_variants(key, variants);
        }
        template
    }

    /// Rebuild a template from stored masked original-colour bitmaps.
    ///
    /// The other variants are regenerated from the block centres. Index
    /// grids are left empty and built on first lookup.
    pub fn from_masked_bitmaps(
        meta: TemplateMeta,
        bitmaps: ChunkMap,
        palette: &Palette,
        colour_mode: ColourMode,
    ) -> Self {
        let factor = meta.factor;
        let rendered: Vec<(TileKey, ChunkVariants)> = bitmaps
            .into_par_iter()
            .map(|(key, bitmap)| {
                let original = downsample_centres(&bitmap, factor);
                let mapped = palette_map(&original, palette);
                (key, ChunkVariants::from_buffers(&original, &mapped, factor))
            })
            .collect();

        let k = factor.get() as u64;
        let pixel_count = rendered
            .iter()
            .map(|(_, v)| {
                (v.original_masked.width() as u64 / k) * (v.original_masked.height() as u64 / k)
            })
            .sum();

        let mut template = Self::empty(meta, pixel_count, colour_mode);
        for (key, variants) in rendered {
            template.insert_variants(key, variants);
        }
        template
    }

    fn empty(meta: TemplateMeta, pixel_count: u64, colour_mode: ColourMode) -> Self {
        Self {
            meta,
            sort_id: 0,
            pixel_count,
            original_masked: ChunkMap::new(),
            auto_masked: ChunkMap::new(),
            original_full: ChunkMap::new(),
            auto_full: ChunkMap::new(),
            colour_index: ColorIndexStore::new(),
            colour_mode,
            enabled: true,
        }
    }

    fn insert_variants(&mut self, key: TileKey, variants: ChunkVariants) {
        self.original_masked.insert(key, variants.original_masked);
        self.auto_masked.insert(key, variants.auto_masked);
        self.original_full.insert(key, variants.original_full);
        self.auto_full.insert(key, variants.auto_full);
    }

    pub fn meta(&self) -> &TemplateMeta {
        &self.meta
    }

    pub fn display_name(&self) -> &str {
        &self.meta.display_name
    }

    pub fn author_id(&self) -> &str {
        &self.meta.author_id
    }

    pub fn anchor(&self) -> Anchor {
        self.meta.anchor
    }

    pub fn sort_id(&self) -> u32 {
        self.sort_id
    }

    pub(crate) fn set_sort_id(&mut self, sort_id: u32) {
        self.sort_id = sort_id;
    }

    /// `"{sort_id} {author_id}"`, unique within a registry.
    pub fn id_key(&self) -> String {
        format!("{} {}", self.sort_id, self.meta.author_id)
    }

    /// Bounding-box area of the source image.
    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn colour_mode(&self) -> ColourMode {
        self.colour_mode
    }

    /// Switch which masked map `chunked` returns.
    pub fn set_colour_mode(&mut self, mode: ColourMode) {
        self.colour_mode = mode;
    }

    pub fn chunks(&self, colour: ColourMode, style: ChunkStyle) -> &ChunkMap {
        match (colour, style) {
            (ColourMode::Original, ChunkStyle::Masked) => &self.original_masked,
            (ColourMode::Auto, ChunkStyle::Masked) => &self.auto_masked,
            (ColourMode::Original, ChunkStyle::Full) => &self.original_full,
            (ColourMode::Auto, ChunkStyle::Full) => &self.auto_full,
        }
    }

    /// The masked map for the template's current colour mode.
    pub fn chunked(&self) -> &ChunkMap {
        self.chunks(self.colour_mode, ChunkStyle::Masked)
    }

    /// Regions of one variant that fall in `tile`, in key order.
    pub fn chunks_in_tile(
        &self,
        tile: TileCoord,
        colour: ColourMode,
        style: ChunkStyle,
    ) -> impl Iterator<Item = (&TileKey, &RgbaImage)> {
        self.chunks(colour, style)
            .range(TileKey::first_in(tile)..=TileKey::last_in(tile))
    }

    pub fn overlaps(&self, tile: TileCoord) -> bool {
        self.chunks_in_tile(tile, ColourMode::Original, ChunkStyle::Masked)
            .next()
            .is_some()
    }

    pub fn colour_index(&self) -> &ColorIndexStore {
        &self.colour_index
    }

    /// Palette index under tile-local pixel (`pixel_x`, `pixel_y`).
    ///
    /// Missing grids for `tile` are rebuilt from the masked original
    /// bitmaps first.
    pub fn index_at(&self, tile: TileCoord, pixel_x: u32, pixel_y: u32, palette: &Palette) -> u8 {
        self.colour_index.ensure_tile(
            tile,
            self.chunks_in_tile(tile, ColourMode::Original, ChunkStyle::Masked),
            self.meta.factor.get(),
            palette,
        );
        self.colour_index.index_at(tile, pixel_x, pixel_y)
    }
}

/// Snap every fully opaque pixel to its nearest palette colour.
fn palette_map(img: &RgbaImage, palette: &Palette) -> RgbaImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        if pixel[3] == 255 {
            let (r, g, b) = palette.nearest_colour(pixel[0], pixel[1], pixel[2]);
            *pixel = Rgba([r, g, b, 255]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicer::{slice_image, CancelToken};
    use crate::types::Colour;

    fn meta(anchor: Anchor) -> TemplateMeta {
        TemplateMeta {
            display_name: "test".to_string(),
            author_id: "tester".to_string(),
            anchor,
            tile_size: 10,
            factor: RenderFactor::DEFAULT,
        }
    }

    fn build(img: &RgbaImage, anchor: Anchor, mode: ColourMode) -> Template {
        let palette = Palette::canvas();
        let slices = slice_image(img, anchor, 10, &palette, &CancelToken::new()).unwrap();
        Template::from_slices(meta(anchor), slices, mode)
    }

    #[test]
    fn test_from_slices_fills_all_maps() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([240, 30, 40, 255]));
        let template = build(&img, Anchor::new(0, 0, 8, 8), ColourMode::Original);

        for colour in [ColourMode::Original, ColourMode::Auto] {
            for style in [ChunkStyle::Masked, ChunkStyle::Full] {
                assert_eq!(template.chunks(colour, style).len(), 4);
            }
        }
        assert_eq!(template.colour_index().len(), 4);
        assert_eq!(template.pixel_count(), 16);
        assert!(template.is_enabled());
    }

    #[test]
    fn test_chunked_follows_colour_mode() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([240, 30, 40, 255]));
        let mut template = build(&img, Anchor::new(0, 0, 0, 0), ColourMode::Auto);
        let key = TileKey::new(TileCoord::new(0, 0), 0, 0);

        assert_eq!(template.chunked()[&key].get_pixel(1, 1).0, [237, 28, 36, 255]);
        template.set_colour_mode(ColourMode::Original);
        assert_eq!(template.chunked()[&key].get_pixel(1, 1).0, [240, 30, 40, 255]);
    }

    #[test]
    fn test_chunks_in_tile_and_overlap() {
        let img = RgbaImage::from_pixel(4, 1, Colour::BLACK.into());
        let template = build(&img, Anchor::new(3, 5, 8, 0), ColourMode::Original);

        assert!(template.overlaps(TileCoord::new(3, 5)));
        assert!(template.overlaps(TileCoord::new(4, 5)));
        assert!(!template.overlaps(TileCoord::new(5, 5)));

        let keys: Vec<String> = template
            .chunks_in_tile(TileCoord::new(4, 5), ColourMode::Original, ChunkStyle::Full)
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, vec!["0004,0005,000,000"]);
    }

    #[test]
    fn test_rebuild_from_masked_bitmaps() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([240, 30, 40, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let sliced = build(&img, Anchor::new(0, 0, 0, 0), ColourMode::Original);

        let restored = Template::from_masked_bitmaps(
            sliced.meta().clone(),
            sliced.chunks(ColourMode::Original, ChunkStyle::Masked).clone(),
            &Palette::canvas(),
            ColourMode::Original,
        );

        assert_eq!(restored.pixel_count(), 2);
        assert!(restored.colour_index().is_empty());
        for colour in [ColourMode::Original, ColourMode::Auto] {
            for style in [ChunkStyle::Masked, ChunkStyle::Full] {
                assert_eq!(restored.chunks(colour, style), sliced.chunks(colour, style));
            }
        }
    }

    #[test]
    fn test_index_at_rebuilds_lazily() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([240, 30, 40, 255]));
        let sliced = build(&img, Anchor::new(0, 0, 4, 4), ColourMode::Original);
        let palette = Palette::canvas();

        let restored = Template::from_masked_bitmaps(
            sliced.meta().clone(),
            sliced.chunked().clone(),
            &palette,
            ColourMode::Original,
        );

        let tile = TileCoord::new(0, 0);
        assert_eq!(restored.index_at(tile, 5, 5, &palette), 7);
        assert_eq!(restored.index_at(tile, 3, 5, &palette), 0);
        assert_eq!(restored.colour_index().len(), 1);
        assert_eq!(
            restored.index_at(tile, 4, 4, &palette),
            sliced.index_at(tile, 4, 4, &palette)
        );
    }

    #[test]
    fn test_id_key() {
        let img = RgbaImage::from_pixel(1, 1, Colour::BLACK.into());
        let mut template = build(&img, Anchor::new(0, 0, 0, 0), ColourMode::Original);
        template.set_sort_id(4);
        assert_eq!(template.id_key(), "4 tester");
    }
}
