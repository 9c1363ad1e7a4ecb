//! Import and export of whole collections.

use std::path::PathBuf;

use clap::Args;

use super::{read_input, write_output, GlobalArgs};
use crate::error::{MarbleError, Result};
use crate::output::{display_path, plural, Printer};

/// Import templates from an exported collection
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Collection JSON file
    #[arg(required = true)]
    pub file: PathBuf,
}

/// Export the collection as JSON
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn import(args: ImportArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let bytes = read_input(&args.file)?;
    let json = String::from_utf8(bytes).map_err(|e| MarbleError::Parse {
        message: format!("{} is not UTF-8: {}", display_path(&args.file), e),
        help: None,
    })?;

    let (_, mut registry) = global.open_registry(printer)?;
    let count = registry.import_json(&json)?;
    if count > 0 {
        printer.status(
            "Imported",
            &format!("{} from {}", plural(count, "template", "templates"), display_path(&args.file)),
        );
    }
    Ok(())
}

pub fn export(args: ExportArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let (_, registry) = global.open_registry(printer)?;
    let json = registry.export_json()?;

    match &args.output {
        Some(path) => {
            write_output(path, json.as_bytes())?;
            printer.status(
                "Exported",
                &format!("{} to {}", plural(registry.len(), "template", "templates"), display_path(path)),
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
