//! Create command implementation.
//!
//! Slices an image into tile chunks and adds it to the collection.

use std::path::PathBuf;

use clap::Args;

use super::{read_input, GlobalArgs};
use crate::error::Result;
use crate::output::{display_path, plural, Printer};
use crate::registry::CreateRequest;
use crate::slicer::CancelToken;

/// Slice an image into a new template
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Image file (PNG, JPEG, WebP, GIF or BMP)
    #[arg(required = true)]
    pub image: PathBuf,

    /// Top-left corner as "tile X, tile Y, pixel X, pixel Y"
    #[arg(long, allow_hyphen_values = true)]
    pub coords: String,

    /// Display name (default: image file stem)
    #[arg(long)]
    pub name: Option<String>,

    /// Show palette-mapped colours instead of the image's own
    #[arg(long)]
    pub auto_colour: bool,
}

pub fn run(args: CreateArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let bytes = read_input(&args.image)?;
    let name = args.name.clone().unwrap_or_else(|| {
        args.image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string())
    });
    let request = CreateRequest::with_coords(bytes, name, &args.coords)?.auto_colour(args.auto_colour);

    let (_, mut registry) = global.open_registry(printer)?;
    let created = registry.create_template(request, &CancelToken::new())?;

    printer.status(
        "Created",
        &format!(
            "{} ({}) from {}",
            created.id_key,
            plural(created.record.tiles.len(), "chunk", "chunks"),
            display_path(&args.image)
        ),
    );
    println!("{}", created.id_key);
    Ok(())
}
