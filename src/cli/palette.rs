use clap::Args;

use super::GlobalArgs;
use crate::error::Result;
use crate::output::{plural, Printer};
use crate::types::{Palette, PaletteEntry, TRANSPARENT_NAME};

/// Print the active palette
#[derive(Args, Debug)]
pub struct PaletteArgs {
    /// Include the Transparent entry
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: PaletteArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let manifest = global.manifest()?;
    let palette = manifest.effective_palette()?;
    let source = if manifest.palette.is_some() { "manifest" } else { "canvas" };

    printer.status(
        "Palette",
        &format!("{} ({})", plural(palette.len(), "colour", "colours"), source),
    );

    for (i, entry) in listed_entries(&palette, args.all) {
        println!("{:>2} {} {}", i, entry.colour, entry.name);
    }
    Ok(())
}

/// Entries to print with their palette index.
fn listed_entries(palette: &Palette, all: bool) -> Vec<(usize, &PaletteEntry)> {
    palette
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| all || entry.name != TRANSPARENT_NAME)
        .collect()
}
