use clap::Parser;
use marble::cli::{Cli, Commands};
use marble::output::Printer;
use miette::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let printer = Printer::new();
    let global = &cli.global;

    match cli.command {
        Commands::Create(args) => marble::cli::create::run(args, global, &printer)?,
        Commands::Composite(args) => marble::cli::composite::run(args, global, &printer)?,
        Commands::Pick(args) => marble::cli::pick::run(args, global, &printer)?,
        Commands::List(args) => marble::cli::list::run(args, global, &printer)?,
        Commands::Enable(args) => marble::cli::toggle::enable(args, global, &printer)?,
        Commands::Disable(args) => marble::cli::toggle::disable(args, global, &printer)?,
        Commands::Remove(args) => marble::cli::toggle::remove(args, global, &printer)?,
        Commands::Import(args) => marble::cli::transfer::import(args, global, &printer)?,
        Commands::Export(args) => marble::cli::transfer::export(args, global, &printer)?,
        Commands::Palette(args) => marble::cli::palette::run(args, global, &printer)?,
        Commands::Completions(args) => marble::cli::completions::run(args)?,
    }

    Ok(())
}
