//! marble - Template tiling and compositing engine
//!
//! Slices template images along a tiled canvas grid, pre-renders each
//! chunk in several display variants, and composites enabled templates over
//! canvas tiles on request, caching the results until the collection
//! changes.

pub mod cli;
pub mod compositor;
pub mod error;
pub mod index;
pub mod manifest;
pub mod output;
pub mod registry;
pub mod render;
pub mod slicer;
pub mod template;
pub mod types;

pub use compositor::{cache_key, pick_palette_index_at, CompositorConfig, TileCache, TileCompositor, ZoomMode};
pub use error::{MarbleError, Result};
pub use index::{ColorIndexStore, IndexGrid};
pub use manifest::Manifest;
pub use output::{Printer, Silent, StatusLevel, StatusSink};
pub use registry::{
    CreateRequest, Created, FileStore, MemoryStore, PersistPolicy, RegistryConfig, TemplateRecord,
    TemplateRegistry, TemplateStore, TemplateSummary,
};
pub use render::{ChunkVariants, RenderFactor};
pub use slicer::{slice_image, CancelToken, SliceResult, SlicedRegion};
pub use template::{ChunkMap, ChunkStyle, ColourMode, Template, TemplateMeta};
pub use types::{Anchor, Colour, Palette, PaletteEntry, TileCoord, TileKey};
