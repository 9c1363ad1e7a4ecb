//! List command implementation.
//!
//! Prints one tab-separated line per template to stdout.

use clap::Args;

use super::GlobalArgs;
use crate::error::Result;
use crate::output::{plural, Printer};
use crate::registry::TemplateSummary;

/// List templates in the collection
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show enabled templates
    #[arg(long)]
    pub enabled: bool,
}

pub fn run(args: ListArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let (manifest, registry) = global.open_registry(printer)?;

    let summaries: Vec<TemplateSummary> = registry
        .summaries()
        .into_iter()
        .filter(|s| s.enabled || !args.enabled)
        .collect();

    for summary in &summaries {
        println!("{}", format_summary(summary));
    }

    printer.status(
        "Listed",
        &format!(
            "{} {}",
            plural(summaries.len(), "template", "templates"),
            printer.dim(&format!("(limit {})", manifest.max_templates))
        ),
    );
    Ok(())
}

fn format_summary(summary: &TemplateSummary) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        summary.id_key,
        summary.name,
        if summary.enabled { "enabled" } else { "disabled" },
        summary.pixel_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_summary() {
        let summary = TemplateSummary {
            id_key: "2 local".to_string(),
            name: "castle".to_string(),
            enabled: false,
            pixel_count: 1200,
        };
        assert_eq!(format_summary(&summary), "2 local\tcastle\tdisabled\t1200");
    }
}
