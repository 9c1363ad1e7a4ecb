//! Composite command implementation.

use std::path::PathBuf;

use clap::Args;

use super::{read_input, write_output, GlobalArgs};
use crate::compositor::{CompositorConfig, TileCompositor};
use crate::error::Result;
use crate::output::{display_path, Printer};
use crate::types::TileCoord;

/// Draw templates over a canvas tile
#[derive(Args, Debug)]
pub struct CompositeArgs {
    /// Canvas tile image
    #[arg(required = true)]
    pub base: PathBuf,

    /// Tile coordinate as X,Y
    #[arg(long)]
    pub tile: String,

    /// Viewport scale; at or above the manifest's zoom_threshold chunks are drawn as dots
    #[arg(long, default_value = "1.0")]
    pub scale: f32,

    /// Use palette-mapped colours
    #[arg(long)]
    pub auto_colour: bool,

    /// Output PNG
    #[arg(long, short)]
    pub output: PathBuf,
}

pub fn run(args: CompositeArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let tile = TileCoord::parse(&args.tile)?;
    let base = read_input(&args.base)?;

    let (manifest, mut registry) = global.open_registry(printer)?;
    registry.set_live_recolour(args.auto_colour);

    let mut compositor = TileCompositor::new(CompositorConfig::from_manifest(&manifest));
    let zoom = compositor.set_zoom_signal(&registry, args.scale);
    let bytes = compositor.composite_current(&registry, &base, tile)?;
    write_output(&args.output, &bytes)?;

    if compositor.encode_count() == 0 {
        printer.info("Unchanged", &format!("no enabled template covers tile {}", tile));
    }
    printer.status(
        "Composited",
        &format!(
            "tile {} (zoomed {}, {}) to {}",
            tile,
            zoom,
            registry.colour_mode(),
            display_path(&args.output)
        ),
    );
    Ok(())
}
