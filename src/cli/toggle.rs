//! Enable, disable and remove commands.

use clap::Args;

use super::GlobalArgs;
use crate::error::Result;
use crate::output::Printer;

/// Select a template by id
#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Template id, e.g. "0 local"
    #[arg(required = true)]
    pub id: String,
}

pub fn enable(args: ToggleArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    set_enabled(args, global, printer, true)
}

pub fn disable(args: ToggleArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    set_enabled(args, global, printer, false)
}

fn set_enabled(args: ToggleArgs, global: &GlobalArgs, printer: &Printer, enabled: bool) -> Result<()> {
    let (_, mut registry) = global.open_registry(printer)?;
    if registry.set_enabled(&args.id, enabled)? {
        let verb = if enabled { "Enabled" } else { "Disabled" };
        printer.status(verb, &args.id);
    } else {
        printer.warning("Missing", &format!("no template '{}'", args.id));
    }
    Ok(())
}

pub fn remove(args: ToggleArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let (_, mut registry) = global.open_registry(printer)?;
    if registry.remove(&args.id)? {
        printer.status("Removed", &args.id);
    } else {
        printer.warning("Missing", &format!("no template '{}'", args.id));
    }
    Ok(())
}
