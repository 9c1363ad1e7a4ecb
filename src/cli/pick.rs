use clap::Args;

use super::{parse_pair, GlobalArgs};
use crate::compositor::pick_palette_index_at;
use crate::error::Result;
use crate::output::Printer;
use crate::types::TileCoord;

/// Print the palette colour templates expect at a pixel
#[derive(Args, Debug)]
pub struct PickArgs {
    /// Tile coordinate as X,Y
    #[arg(long)]
    pub tile: String,

    /// Pixel within the tile as X,Y
    #[arg(long)]
    pub pixel: String,
}

pub fn run(args: PickArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let tile = TileCoord::parse(&args.tile)?;
    let (px, py) = parse_pair(&args.pixel, "pixel")?;

    let (_, registry) = global.open_registry(printer)?;
    let index = pick_palette_index_at(&registry, tile, px, py);

    if index == 0 {
        printer.info("Empty", &format!("no template colour at {} / {},{}", tile, px, py));
    }
    match registry.palette().get(index) {
        Some(entry) => println!("{} {} {}", index, entry.name, entry.colour),
        None => println!("{}", index),
    }
    Ok(())
}
