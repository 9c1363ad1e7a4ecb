//! Serialized form of the template collection.
//!
//! Each template is stored as its masked original-colour chunks, PNG
//! encoded and base64 wrapped. The other variants and the index grids are
//! derived again on load.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{MarbleError, Result};
use crate::render::{decode_image, encode_png, RenderFactor};
use crate::template::{ChunkMap, ChunkStyle, ColourMode, Template, TemplateMeta};
use crate::types::{Anchor, Palette, TileKey};

/// Marker identifying collections written by this engine.
pub const WHOAMI: &str = "BlueMarble";

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Store key the collection is saved under.
pub const COLLECTION_KEY: &str = "templates";

/// Top-level persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFile {
    pub whoami: String,
    pub script_version: String,
    pub schema_version: String,
    /// Keyed by `"{sort_id} {author_id}"`, in registry order.
    #[serde(with = "ordered_records")]
    pub templates: Vec<(String, TemplateRecord)>,
}

/// One persisted template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub name: String,
    /// Anchor in `"tx, ty, px, py"` form.
    pub coords: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Tile key to base64 PNG of the masked original-colour chunk.
    pub tiles: BTreeMap<String, String>,
}

fn enabled_default() -> bool {
    true
}

impl CollectionFile {
    pub fn new(templates: Vec<(String, TemplateRecord)>) -> Self {
        Self {
            whoami: WHOAMI.to_string(),
            script_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            templates,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MarbleError::Persistence {
            message: format!("Failed to serialize collection: {}", e),
        })
    }

    /// Parse a collection. Documents without our `whoami` marker yield
    /// `None`; a marked document that does not match the schema is an error.
    pub fn from_json(json: &str) -> Result<Option<Self>> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| MarbleError::Parse {
            message: format!("Collection is not valid JSON: {}", e),
            help: None,
        })?;

        if value.get("whoami").and_then(|w| w.as_str()) != Some(WHOAMI) {
            return Ok(None);
        }

        // Parsed again from the text: `Value` maps do not keep key order.
        serde_json::from_str(json)
            .map(Some)
            .map_err(|e| MarbleError::Parse {
                message: format!("Malformed {} collection: {}", WHOAMI, e),
                help: Some("The file may come from an incompatible version".to_string()),
            })
    }
}

/// A JSON object read and written in document order.
mod ordered_records {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::TemplateRecord;

    pub fn serialize<S: Serializer>(
        entries: &[(String, TemplateRecord)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (id_key, record) in entries {
            map.serialize_entry(id_key, record)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, TemplateRecord)>, D::Error> {
        struct RecordsVisitor;

        impl<'de> Visitor<'de> for RecordsVisitor {
            type Value = Vec<(String, TemplateRecord)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of template records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(RecordsVisitor)
    }
}

/// Split `"{sort_id} {author_id}"`.
pub fn split_id_key(id_key: &str) -> Option<(u32, &str)> {
    let (sort, author) = id_key.split_once(' ')?;
    let sort_id = sort.parse().ok()?;
    if author.is_empty() {
        return None;
    }
    Some((sort_id, author))
}

/// Encode a template's masked original chunks into a record.
pub fn record_for(template: &Template) -> Result<TemplateRecord> {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut tiles = BTreeMap::new();
    for (key, bitmap) in template.chunks(ColourMode::Original, ChunkStyle::Masked) {
        let png = encode_png(bitmap)?;
        tiles.insert(key.to_string(), engine.encode(png));
    }

    Ok(TemplateRecord {
        name: template.display_name().to_string(),
        coords: template.anchor().to_string(),
        enabled: template.is_enabled(),
        tiles,
    })
}

/// Rebuild a template from its record without re-slicing.
pub fn template_from_record(
    id_key: &str,
    record: &TemplateRecord,
    tile_size: u32,
    factor: RenderFactor,
    palette: &Palette,
    colour_mode: ColourMode,
) -> Result<Template> {
    let (sort_id, author) = split_id_key(id_key).ok_or_else(|| MarbleError::Parse {
        message: format!("Invalid template id '{}'", id_key),
        help: Some("Template ids look like '0 author'".to_string()),
    })?;
    let anchor = Anchor::parse(&record.coords)?;

    let engine = base64::engine::general_purpose::STANDARD;
    let mut bitmaps = ChunkMap::new();
    for (key, data) in &record.tiles {
        let tile_key: TileKey = key.parse()?;
        let bytes = engine.decode(data).map_err(|e| MarbleError::Decode {
            message: format!("tile {} of '{}' is not valid base64: {}", key, id_key, e),
            help: None,
        })?;
        bitmaps.insert(tile_key, decode_image(&bytes)?);
    }

    let meta = TemplateMeta {
        display_name: record.name.clone(),
        author_id: author.to_string(),
        anchor,
        tile_size,
        factor,
    };
    let mut template = Template::from_masked_bitmaps(meta, bitmaps, palette, colour_mode);
    template.set_sort_id(sort_id);
    template.set_enabled(record.enabled);
    Ok(template)
}
