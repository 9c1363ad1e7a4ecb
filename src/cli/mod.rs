pub mod completions;
pub mod composite;
pub mod create;
pub mod list;
pub mod palette;
pub mod pick;
pub mod toggle;
pub mod transfer;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::{MarbleError, Result};
use crate::manifest::Manifest;
use crate::output::{display_path, plural, Printer};
use crate::registry::{FileStore, PersistPolicy, RegistryConfig, TemplateRegistry};

/// marble - Template tiling and compositing for pixel canvases
#[derive(Parser, Debug)]
#[command(name = "marble")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Manifest file (default: ./marble.yaml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the template collection
    #[arg(long, global = true)]
    pub collection: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Slice an image into a new template
    Create(create::CreateArgs),

    /// Draw templates over a canvas tile
    Composite(composite::CompositeArgs),

    /// Print the palette colour templates expect at a pixel
    Pick(pick::PickArgs),

    /// List templates in the collection
    List(list::ListArgs),

    /// Enable a template
    Enable(toggle::ToggleArgs),

    /// Disable a template
    Disable(toggle::ToggleArgs),

    /// Remove a template from the collection
    Remove(toggle::ToggleArgs),

    /// Import templates from an exported collection
    Import(transfer::ImportArgs),

    /// Export the collection as JSON
    Export(transfer::ExportArgs),

    /// Print the active palette
    Palette(palette::PaletteArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

impl GlobalArgs {
    pub fn manifest(&self) -> Result<Manifest> {
        let mut manifest = Manifest::discover(self.config.as_deref())?;
        if let Some(collection) = &self.collection {
            manifest.collection = collection.clone();
        }
        Ok(manifest)
    }

    /// Open the file-backed registry and load the stored collection.
    pub fn open_registry(&self, printer: &Printer) -> Result<(Manifest, TemplateRegistry)> {
        let manifest = self.manifest()?;
        let store = FileStore::new(&manifest.collection);
        let mut registry = TemplateRegistry::new(RegistryConfig::from_manifest(&manifest)?)
            .with_store(store, PersistPolicy::Retry { attempts: 2 })
            .with_sink(printer.clone());

        let loaded = registry.load()?;
        if loaded > 0 {
            printer.info(
                "Loaded",
                &format!(
                    "{} from {}",
                    plural(loaded, "template", "templates"),
                    display_path(&manifest.collection)
                ),
            );
        }
        Ok((manifest, registry))
    }
}

/// Read a whole input file.
pub(crate) fn read_input(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| MarbleError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to read: {}", e),
    })
}

/// Write an output file, creating parent directories.
pub(crate) fn write_output(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MarbleError::Io {
            path: parent.to_path_buf(),
            message: format!("Failed to create output directory: {}", e),
        })?;
    }
    std::fs::write(path, bytes).map_err(|e| MarbleError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write: {}", e),
    })
}

/// Parse a `"X,Y"` pair of non-negative integers.
pub(crate) fn parse_pair(s: &str, what: &str) -> Result<(u32, u32)> {
    let invalid = || MarbleError::Parse {
        message: format!("Invalid {} '{}'", what, s),
        help: Some(format!("Use X,Y for the {}", what)),
    };
    let (x, y) = s.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("3, 4", "pixel").unwrap(), (3, 4));
        assert!(parse_pair("3", "pixel").is_err());
        assert!(parse_pair("-1,4", "pixel").is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["marble", "list", "--collection", "store"]).unwrap();
        assert_eq!(cli.global.collection, Some(PathBuf::from("store")));
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_collection_flag_overrides_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("marble.yaml");
        std::fs::write(&config, "collection: from-manifest\nmax_templates: 2").unwrap();

        let global = GlobalArgs {
            config: Some(config),
            collection: Some(dir.path().join("from-flag")),
        };
        let manifest = global.manifest().unwrap();
        assert_eq!(manifest.collection, dir.path().join("from-flag"));
        assert_eq!(manifest.max_templates, 2);
    }
}
