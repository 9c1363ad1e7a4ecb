//! Project manifest (marble.yaml) parsing.
//!
//! The manifest holds engine settings: canvas geometry, template limits,
//! compositing behaviour, and an optional palette override.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarbleError, Result};
use crate::render::RenderFactor;
use crate::types::{Palette, PaletteEntryDef};

/// Default manifest file name, looked up in the working directory.
pub const MANIFEST_FILE: &str = "marble.yaml";

/// Settings loaded from marble.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Canvas tile edge in pixels.
    pub tile_size: u32,

    /// Odd upscale factor for rendered chunks.
    pub render_factor: u32,

    /// Maximum number of templates in the collection.
    pub max_templates: usize,

    /// Viewport scale at or above which the canvas counts as zoomed in.
    pub zoom_threshold: f32,

    /// Template opacity when zoomed out, 0.0 to 1.0.
    pub zoomed_out_opacity: f32,

    /// Number of composited tiles kept in memory.
    pub cache_capacity: usize,

    /// Author id stamped on new templates.
    pub author: String,

    /// Directory for the persisted template collection.
    pub collection: PathBuf,

    /// Replaces the built-in canvas palette when present.
    pub palette: Option<Vec<PaletteEntryDef>>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            tile_size: 1000,
            render_factor: RenderFactor::DEFAULT.get(),
            max_templates: 10,
            zoom_threshold: 2.0,
            zoomed_out_opacity: 0.6,
            cache_capacity: 256,
            author: "local".to_string(),
            collection: PathBuf::from(".marble"),
            palette: None,
        }
    }
}

impl Manifest {
    /// Load manifest from a marble.yaml file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MarbleError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read manifest: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Load `path` if given, else marble.yaml in the working directory if it
    /// exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(MANIFEST_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse and validate a manifest from YAML.
    pub fn parse(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let manifest: Self = serde_yaml::from_str(content).map_err(|e| MarbleError::Parse {
            message: format!("Invalid manifest: {}", e),
            help: Some("Check marble.yaml syntax".to_string()),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        RenderFactor::new(self.render_factor)?;

        if self.tile_size == 0 || self.tile_size > 1000 {
            return Err(MarbleError::Config {
                message: format!("tile_size must be between 1 and 1000, got {}", self.tile_size),
                help: Some("Tile keys store in-tile offsets as three digits".to_string()),
            });
        }

        if !(0.0..=1.0).contains(&self.zoomed_out_opacity) {
            return Err(MarbleError::Config {
                message: format!(
                    "zoomed_out_opacity must be between 0 and 1, got {}",
                    self.zoomed_out_opacity
                ),
                help: None,
            });
        }

        if self.author.trim().is_empty() || self.author.contains(' ') {
            return Err(MarbleError::Config {
                message: format!("author '{}' must be a single non-empty word", self.author),
                help: Some("The author is half of the template id key".to_string()),
            });
        }

        Ok(())
    }

    pub fn render_factor(&self) -> Result<RenderFactor> {
        RenderFactor::new(self.render_factor)
    }

    /// The palette in effect: the override, or the canvas palette.
    pub fn effective_palette(&self) -> Result<Palette> {
        match &self.palette {
            Some(defs) => Palette::from_defs(defs),
            None => Ok(Palette::canvas()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_manifest() {
        assert_eq!(Manifest::parse("").unwrap(), Manifest::default());
    }

    #[test]
    fn test_parse_partial_manifest() {
        let manifest = Manifest::parse("tile_size: 500\nauthor: alice").unwrap();
        assert_eq!(manifest.tile_size, 500);
        assert_eq!(manifest.author, "alice");
        assert_eq!(manifest.render_factor, 3);
        assert_eq!(manifest.max_templates, 10);
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r##"
tile_size: 1000
render_factor: 5
max_templates: 3
zoom_threshold: 1.5
zoomed_out_opacity: 0.25
cache_capacity: 16
author: bob
collection: store
palette:
  - name: Transparent
    hex: "#000000"
  - name: Black
    hex: "#000000"
  - name: White
    hex: "#FFFFFF"
"##;
        let manifest = Manifest::parse(yaml).unwrap();
        assert_eq!(manifest.render_factor().unwrap().get(), 5);
        assert_eq!(manifest.max_templates, 3);
        assert_eq!(manifest.collection, PathBuf::from("store"));

        let palette = manifest.effective_palette().unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.nearest_index(250, 250, 250), 2);
    }

    #[test]
    fn test_even_render_factor_rejected() {
        let err = Manifest::parse("render_factor: 4").unwrap_err();
        assert!(matches!(err, MarbleError::InvalidRenderFactor { factor: 4 }));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(Manifest::parse("tile_size: 0").is_err());
        assert!(Manifest::parse("tile_size: 2000").is_err());
        assert!(Manifest::parse("zoomed_out_opacity: 1.5").is_err());
        assert!(Manifest::parse("author: two words").is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Manifest::parse("tile_size: [").unwrap_err();
        assert!(matches!(err, MarbleError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, "max_templates: 4").unwrap();

        let manifest = Manifest::discover(Some(&path)).unwrap();
        assert_eq!(manifest.max_templates, 4);

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Manifest::load(&missing),
            Err(MarbleError::Io { .. })
        ));
    }
}
