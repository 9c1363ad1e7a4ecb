//! Template registry.
//!
//! The registry owns the ordered template collection, the cache version
//! that keys composited tiles, and the shared tile cache. Every mutation
//! bumps the version and writes the collection through the configured
//! `TemplateStore`.
//!
//! # Example
//!
//! ```ignore
//! use marble::registry::{CreateRequest, RegistryConfig, TemplateRegistry};
//!
//! let mut registry = TemplateRegistry::new(RegistryConfig::default());
//! let request = CreateRequest::new(png_bytes, "flag", Anchor::new(1023, 744, 10, 20));
//! let created = registry.create_template(request, &CancelToken::new())?;
//! ```

mod persist;
mod store;

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::compositor::TileCache;
use crate::error::{MarbleError, Result};
use crate::manifest::Manifest;
use crate::output::{plural, Silent, StatusLevel, StatusSink};
use crate::render::{decode_image, RenderFactor};
use crate::slicer::{slice_image, CancelToken};
use crate::template::{ColourMode, Template, TemplateMeta};
use crate::types::{Anchor, Palette};

pub use persist::{
    record_for, split_id_key, template_from_record, CollectionFile, TemplateRecord,
    COLLECTION_KEY, SCHEMA_VERSION, WHOAMI,
};
pub use store::{FileStore, MemoryStore, TemplateStore};

/// Registry limits and rendering parameters.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub max_templates: usize,
    pub tile_size: u32,
    pub factor: RenderFactor,
    /// Author id stamped on templates created here.
    pub author: String,
    pub palette: Palette,
    /// Composited tiles kept in the shared cache.
    pub cache_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_templates: 10,
            tile_size: 1000,
            factor: RenderFactor::DEFAULT,
            author: "local".to_string(),
            palette: Palette::canvas(),
            cache_capacity: 256,
        }
    }
}

impl RegistryConfig {
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        Ok(Self {
            max_templates: manifest.max_templates,
            tile_size: manifest.tile_size,
            factor: manifest.render_factor()?,
            author: manifest.author.clone(),
            palette: manifest.effective_palette()?,
            cache_capacity: manifest.cache_capacity,
        })
    }
}

/// What to do when writing the collection fails.
///
/// In-memory state is kept either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// Report the failure to the status sink and carry on.
    #[default]
    BestEffort,
    /// Try up to `attempts` times, then return the error.
    Retry { attempts: u32 },
}

/// One row of `TemplateRegistry::summaries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSummary {
    pub id_key: String,
    pub name: String,
    pub enabled: bool,
    pub pixel_count: u64,
}

/// Input for `TemplateRegistry::create_template`.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub image: Vec<u8>,
    pub name: String,
    pub anchor: Anchor,
    pub auto_colour: bool,
}

impl CreateRequest {
    pub fn new(image: Vec<u8>, name: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            image,
            name: name.into(),
            anchor,
            auto_colour: false,
        }
    }

    /// Build a request from the `"tx, ty, px, py"` coordinate form.
    pub fn with_coords(image: Vec<u8>, name: impl Into<String>, coords: &str) -> Result<Self> {
        Ok(Self::new(image, name, Anchor::parse(coords)?))
    }

    pub fn auto_colour(mut self, auto: bool) -> Self {
        self.auto_colour = auto;
        self
    }
}

/// A freshly registered template and the record written for it.
#[derive(Debug, Clone)]
pub struct Created {
    pub id_key: String,
    pub record: TemplateRecord,
}

/// Ordered template collection with a versioned tile cache.
pub struct TemplateRegistry {
    config: RegistryConfig,
    templates: Vec<Template>,
    version: AtomicU64,
    cache: Mutex<TileCache>,
    store: Option<Box<dyn TemplateStore>>,
    policy: PersistPolicy,
    sink: Box<dyn StatusSink>,
    colour_mode: ColourMode,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.templates.len())
            .field("version", &self.cache_version())
            .field("policy", &self.policy)
            .finish()
    }
}

impl TemplateRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let cache = TileCache::new(config.cache_capacity);
        Self {
            config,
            templates: Vec::new(),
            version: AtomicU64::new(0),
            cache: Mutex::new(cache),
            store: None,
            policy: PersistPolicy::default(),
            sink: Box::new(Silent),
            colour_mode: ColourMode::default(),
        }
    }

    /// Write the collection through `store` after every mutation.
    pub fn with_store(mut self, store: impl TemplateStore + 'static, policy: PersistPolicy) -> Self {
        self.store = Some(Box::new(store));
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.config.palette
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.templates.len() >= self.config.max_templates
    }

    /// Templates in insertion order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id_key: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id_key() == id_key)
    }

    pub fn colour_mode(&self) -> ColourMode {
        self.colour_mode
    }

    // -- Cache --

    pub fn cache_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Bump the cache version and drop every cached tile.
    pub fn invalidate(&self) {
        let cache = self.lock_cache();
        self.version.fetch_add(1, Ordering::AcqRel);
        cache.clear();
    }

    pub fn cached_tile_count(&self) -> usize {
        self.lock_cache().len()
    }

    pub(crate) fn cached_tile(&self, key: &str) -> Option<Vec<u8>> {
        self.lock_cache().get(key)
    }

    /// Store a composited tile computed at `version`. Dropped if the
    /// version has moved on since.
    pub(crate) fn store_tile(&self, key: String, version: u64, bytes: Vec<u8>) -> bool {
        let cache = self.lock_cache();
        if self.cache_version() != version {
            return false;
        }
        cache.insert(key, bytes);
        true
    }

    fn lock_cache(&self) -> MutexGuard<'_, TileCache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // -- Mutation --

    fn next_sort_id(&self) -> u32 {
        let used: HashSet<u32> = self.templates.iter().map(|t| t.sort_id()).collect();
        (0..).find(|id| !used.contains(id)).unwrap_or(0)
    }

    /// Add a template under the lowest unused sort id. Returns its id key.
    pub fn add(&mut self, mut template: Template) -> Result<String> {
        if self.is_full() {
            return Err(MarbleError::CapacityExceeded {
                max: self.config.max_templates,
            });
        }
        template.set_sort_id(self.next_sort_id());
        self.insert(template)
    }

    fn insert(&mut self, template: Template) -> Result<String> {
        let id_key = template.id_key();
        if self.get(&id_key).is_some() {
            return Err(MarbleError::DuplicateTemplate { id_key });
        }
        self.templates.push(template);
        self.invalidate();
        self.persist()?;
        Ok(id_key)
    }

    /// Remove a template. Returns whether one was removed.
    pub fn remove(&mut self, id_key: &str) -> Result<bool> {
        let Some(pos) = self.templates.iter().position(|t| t.id_key() == id_key) else {
            return Ok(false);
        };
        self.templates.remove(pos);
        self.invalidate();
        self.persist()?;
        Ok(true)
    }

    /// Toggle a template. The version is bumped even when nothing matched
    /// or the flag already had the requested value.
    pub fn set_enabled(&mut self, id_key: &str, enabled: bool) -> Result<bool> {
        let found = match self.templates.iter_mut().find(|t| t.id_key() == id_key) {
            Some(template) => {
                template.set_enabled(enabled);
                true
            }
            None => false,
        };
        self.invalidate();
        self.persist()?;
        Ok(found)
    }

    /// Switch every template's active masked map between original and
    /// palette-mapped colours.
    pub fn set_live_recolour(&mut self, auto: bool) {
        self.colour_mode = ColourMode::from_auto(auto);
        for template in &mut self.templates {
            template.set_colour_mode(self.colour_mode);
        }
    }

    pub fn summaries(&self) -> Vec<TemplateSummary> {
        self.templates
            .iter()
            .map(|t| TemplateSummary {
                id_key: t.id_key(),
                name: t.display_name().to_string(),
                enabled: t.is_enabled(),
                pixel_count: t.pixel_count(),
            })
            .collect()
    }

    // -- Creation --

    /// Decode, slice, render and register an image.
    ///
    /// Capacity is checked before the image is decoded. Nothing is
    /// registered unless every step succeeds.
    pub fn create_template(&mut self, request: CreateRequest, cancel: &CancelToken) -> Result<Created> {
        if self.is_full() {
            return Err(MarbleError::CapacityExceeded {
                max: self.config.max_templates,
            });
        }

        let image = decode_image(&request.image)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(MarbleError::Decode {
                message: "image has no pixels".to_string(),
                help: None,
            });
        }

        let slices = slice_image(
            &image,
            request.anchor,
            self.config.tile_size,
            &self.config.palette,
            cancel,
        )?;

        let meta = TemplateMeta {
            display_name: request.name,
            author_id: self.config.author.clone(),
            anchor: request.anchor,
            tile_size: self.config.tile_size,
            factor: self.config.factor,
        };
        let mode = ColourMode::from_auto(request.auto_colour);
        let mut template = Template::from_slices(meta, slices, mode);
        template.set_sort_id(self.next_sort_id());

        let record = record_for(&template)?;
        let id_key = self.insert(template)?;
        Ok(Created { id_key, record })
    }

    // -- Persistence --

    /// The collection in its persisted JSON form.
    pub fn export_json(&self) -> Result<String> {
        let records = self
            .templates
            .iter()
            .map(|t| -> Result<(String, TemplateRecord)> { Ok((t.id_key(), record_for(t)?)) })
            .collect::<Result<_>>()?;
        CollectionFile::new(records).to_json()
    }

    /// Write the collection to the store once, ignoring the policy.
    pub fn save(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let json = self.export_json()?;
        store.save(COLLECTION_KEY, &json)
    }

    fn persist(&self) -> Result<()> {
        if self.store.is_none() {
            return Ok(());
        }

        match self.policy {
            PersistPolicy::BestEffort => {
                if let Err(e) = self.save() {
                    self.sink.report(StatusLevel::Warning, "Unsaved", &e.to_string());
                }
                Ok(())
            }
            PersistPolicy::Retry { attempts } => {
                let attempts = attempts.max(1);
                let mut attempt = 1;
                loop {
                    match self.save() {
                        Ok(()) => return Ok(()),
                        Err(e) if attempt >= attempts => return Err(e),
                        Err(e) => {
                            self.sink.report(
                                StatusLevel::Warning,
                                "Retrying",
                                &format!("save attempt {} of {} failed: {}", attempt, attempts, e),
                            );
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }

    /// Load the collection from the store, if one is configured and holds
    /// a collection. Returns the number of templates loaded.
    pub fn load(&mut self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        match store.load(COLLECTION_KEY)? {
            Some(json) => self.import(&json, false),
            None => Ok(0),
        }
    }

    /// Import an exported collection and persist the result.
    ///
    /// Documents that are not marble collections are reported and ignored.
    /// Either every template is imported or none is.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        self.import(json, true)
    }

    fn import(&mut self, json: &str, persist: bool) -> Result<usize> {
        let Some(file) = CollectionFile::from_json(json)? else {
            self.sink.report(
                StatusLevel::Warning,
                "Ignored",
                &format!("not a {} collection", WHOAMI),
            );
            return Ok(0);
        };

        let mut incoming = file
            .templates
            .iter()
            .map(|(id_key, record)| {
                template_from_record(
                    id_key,
                    record,
                    self.config.tile_size,
                    self.config.factor,
                    &self.config.palette,
                    self.colour_mode,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        if self.templates.len() + incoming.len() > self.config.max_templates {
            return Err(MarbleError::CapacityExceeded {
                max: self.config.max_templates,
            });
        }

        let mut keys: HashSet<String> = self.templates.iter().map(|t| t.id_key()).collect();
        for template in &incoming {
            let id_key = template.id_key();
            if !keys.insert(id_key.clone()) {
                return Err(MarbleError::DuplicateTemplate { id_key });
            }
        }

        // Sort ids stay unique: a template whose id is already in use by
        // another author moves to the lowest free one.
        let mut used: BTreeSet<u32> = self.templates.iter().map(|t| t.sort_id()).collect();
        let mut moved = Vec::new();
        for (i, template) in incoming.iter().enumerate() {
            if !used.insert(template.sort_id()) {
                moved.push(i);
            }
        }
        for i in moved {
            let sort_id = (0..).find(|id| !used.contains(id)).unwrap_or(0);
            used.insert(sort_id);
            incoming[i].set_sort_id(sort_id);
        }

        let count = incoming.len();
        if count == 0 {
            return Ok(0);
        }

        self.templates.extend(incoming);
        self.invalidate();
        self.sink.report(
            StatusLevel::Info,
            "Imported",
            &plural(count, "template", "templates"),
        );
        if persist {
            self.persist()?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::encode_png;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    fn config(max: usize) -> RegistryConfig {
        RegistryConfig {
            max_templates: max,
            tile_size: 10,
            ..RegistryConfig::default()
        }
    }

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(width, height, Rgba(rgba))).unwrap()
    }

    fn create(registry: &mut TemplateRegistry, name: &str) -> Result<Created> {
        let request = CreateRequest::new(png(2, 2, [237, 28, 36, 255]), name, Anchor::new(0, 0, 1, 1));
        registry.create_template(request, &CancelToken::new())
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl StatusSink for Recorder {
        fn report(&self, _level: StatusLevel, verb: &str, message: &str) {
            self.0.lock().unwrap().push(format!("{} {}", verb, message));
        }
    }

    #[test]
    fn test_create_assigns_lowest_free_sort_id() {
        let mut registry = TemplateRegistry::new(config(10));
        assert_eq!(create(&mut registry, "a").unwrap().id_key, "0 local");
        assert_eq!(create(&mut registry, "b").unwrap().id_key, "1 local");
        assert_eq!(create(&mut registry, "c").unwrap().id_key, "2 local");

        registry.remove("1 local").unwrap();
        assert_eq!(create(&mut registry, "d").unwrap().id_key, "1 local");

        let names: Vec<String> = registry.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_add_enforces_capacity() {
        let palette = Palette::canvas();
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let build = || {
            let anchor = Anchor::new(0, 0, 0, 0);
            let slices = slice_image(&img, anchor, 10, &palette, &CancelToken::new()).unwrap();
            let meta = TemplateMeta {
                display_name: "t".to_string(),
                author_id: "local".to_string(),
                anchor,
                tile_size: 10,
                factor: RenderFactor::DEFAULT,
            };
            Template::from_slices(meta, slices, ColourMode::Original)
        };

        let mut registry = TemplateRegistry::new(config(2));
        assert_eq!(registry.add(build()).unwrap(), "0 local");
        assert_eq!(registry.add(build()).unwrap(), "1 local");
        assert!(registry.is_full());

        let version = registry.cache_version();
        let err = registry.add(build()).unwrap_err();
        assert!(matches!(err, MarbleError::CapacityExceeded { max: 2 }));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.cache_version(), version);
    }

    #[test]
    fn test_capacity_enforced_before_decode() {
        let mut registry = TemplateRegistry::new(config(1));
        create(&mut registry, "a").unwrap();
        let version = registry.cache_version();

        let request = CreateRequest::new(b"not an image".to_vec(), "b", Anchor::new(0, 0, 0, 0));
        let err = registry.create_template(request, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, MarbleError::CapacityExceeded { max: 1 }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.cache_version(), version);
    }

    #[test]
    fn test_undecodable_image_registers_nothing() {
        let mut registry = TemplateRegistry::new(config(4));
        let request = CreateRequest::new(b"garbage".to_vec(), "x", Anchor::new(0, 0, 0, 0));
        let err = registry.create_template(request, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, MarbleError::Decode { .. }));
        assert!(registry.is_empty());
        assert_eq!(registry.cache_version(), 0);
    }

    #[test]
    fn test_cancelled_creation_registers_nothing() {
        let mut registry = TemplateRegistry::new(config(4));
        let cancel = CancelToken::new();
        cancel.cancel();
        let request = CreateRequest::new(png(4, 4, [0, 0, 0, 255]), "x", Anchor::new(0, 0, 0, 0));
        let err = registry.create_template(request, &cancel).unwrap_err();
        assert!(matches!(err, MarbleError::Cancelled));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_coords_rejected() {
        let err = CreateRequest::with_coords(Vec::new(), "x", "1, 2, three").unwrap_err();
        assert!(matches!(err, MarbleError::MalformedAnchor { .. }));
    }

    #[test]
    fn test_created_record_matches_template() {
        let mut registry = TemplateRegistry::new(config(4));
        let created = create(&mut registry, "flag").unwrap();
        assert_eq!(created.record.name, "flag");
        assert_eq!(created.record.coords, "0, 0, 1, 1");
        assert_eq!(created.record.tiles.len(), 1);
        assert!(created.record.tiles.contains_key("0000,0000,001,001"));
    }

    #[test]
    fn test_version_bumps() {
        let mut registry = TemplateRegistry::new(config(4));
        create(&mut registry, "a").unwrap();
        let v1 = registry.cache_version();
        assert!(v1 > 0);

        registry.set_enabled("0 local", false).unwrap();
        let v2 = registry.cache_version();
        assert!(v2 > v1);
        assert!(!registry.get("0 local").unwrap().is_enabled());

        // Unconditional, even for unknown ids.
        assert!(!registry.set_enabled("9 nobody", true).unwrap());
        assert!(registry.cache_version() > v2);

        let v3 = registry.cache_version();
        assert!(!registry.remove("9 nobody").unwrap());
        assert_eq!(registry.cache_version(), v3);
        assert!(registry.remove("0 local").unwrap());
        assert!(registry.cache_version() > v3);
    }

    #[test]
    fn test_store_tile_rejects_stale_version() {
        let registry = TemplateRegistry::new(config(4));
        let version = registry.cache_version();
        assert!(registry.store_tile("a".to_string(), version, vec![1]));
        assert_eq!(registry.cached_tile("a"), Some(vec![1]));

        registry.invalidate();
        assert_eq!(registry.cached_tile_count(), 0);
        assert!(!registry.store_tile("b".to_string(), version, vec![2]));
        assert_eq!(registry.cached_tile("b"), None);
    }

    #[test]
    fn test_live_recolour_switches_chunked_map() {
        let mut registry = TemplateRegistry::new(config(4));
        let request = CreateRequest::new(png(1, 1, [240, 30, 40, 255]), "a", Anchor::new(0, 0, 0, 0));
        registry.create_template(request, &CancelToken::new()).unwrap();

        registry.set_live_recolour(true);
        let template = &registry.templates()[0];
        let chunk = template.chunked().values().next().unwrap();
        assert_eq!(chunk.get_pixel(1, 1).0, [237, 28, 36, 255]);
        assert_eq!(registry.colour_mode(), ColourMode::Auto);
    }

    #[test]
    fn test_persist_and_load() {
        let store = Arc::new(MemoryStore::new());
        let mut registry =
            TemplateRegistry::new(config(4)).with_store(store.clone(), PersistPolicy::BestEffort);
        create(&mut registry, "a").unwrap();
        create(&mut registry, "b").unwrap();
        registry.set_enabled("1 local", false).unwrap();

        let mut reloaded =
            TemplateRegistry::new(config(4)).with_store(store.clone(), PersistPolicy::BestEffort);
        assert_eq!(reloaded.load().unwrap(), 2);
        assert_eq!(reloaded.summaries(), registry.summaries());
        assert!(reloaded.get("0 local").unwrap().colour_index().is_empty());
    }

    #[test]
    fn test_best_effort_reports_and_keeps_state() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(Recorder::default());
        let mut registry = TemplateRegistry::new(config(4))
            .with_store(store.clone(), PersistPolicy::BestEffort)
            .with_sink(SinkRef(sink.clone()));

        store.fail_next(1);
        create(&mut registry, "a").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(store.get(COLLECTION_KEY), None);

        let messages = sink.0.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Unsaved"));
    }

    #[test]
    fn test_retry_policy() {
        let store = Arc::new(MemoryStore::new());
        let mut registry = TemplateRegistry::new(config(4))
            .with_store(store.clone(), PersistPolicy::Retry { attempts: 3 });

        store.fail_next(2);
        create(&mut registry, "a").unwrap();
        assert_eq!(store.write_attempts(), 3);
        assert!(store.get(COLLECTION_KEY).is_some());

        store.fail_next(5);
        let err = registry.set_enabled("0 local", false).unwrap_err();
        assert!(matches!(err, MarbleError::Persistence { .. }));
        assert!(!registry.get("0 local").unwrap().is_enabled());
    }

    #[test]
    fn test_import_foreign_document_ignored() {
        let sink = Arc::new(Recorder::default());
        let mut registry = TemplateRegistry::new(config(4)).with_sink(SinkRef(sink.clone()));
        assert_eq!(registry.import_json(r#"{"whoami": "SomethingElse"}"#).unwrap(), 0);
        assert_eq!(registry.cache_version(), 0);
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let mut source = TemplateRegistry::new(config(4));
        create(&mut source, "a").unwrap();
        create(&mut source, "b").unwrap();
        let json = source.export_json().unwrap();

        let mut small = TemplateRegistry::new(config(1));
        let err = small.import_json(&json).unwrap_err();
        assert!(matches!(err, MarbleError::CapacityExceeded { max: 1 }));
        assert!(small.is_empty());

        let mut target = TemplateRegistry::new(config(4));
        create(&mut target, "existing").unwrap();
        let err = target.import_json(&json).unwrap_err();
        assert!(matches!(err, MarbleError::DuplicateTemplate { .. }));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_import_preserves_sort_ids_with_single_bump() {
        let mut source = TemplateRegistry::new(config(4));
        create(&mut source, "a").unwrap();
        create(&mut source, "b").unwrap();
        source.remove("0 local").unwrap();
        let json = source.export_json().unwrap();

        let mut target = TemplateRegistry::new(config(4));
        assert_eq!(target.import_json(&json).unwrap(), 1);
        assert_eq!(target.cache_version(), 1);
        assert_eq!(target.templates()[0].id_key(), "1 local");

        assert_eq!(create(&mut target, "c").unwrap().id_key, "0 local");
    }

    #[test]
    fn test_import_moves_sort_id_taken_by_other_author() {
        let mut source = TemplateRegistry::new(RegistryConfig {
            author: "alice".to_string(),
            ..config(4)
        });
        create(&mut source, "theirs").unwrap();
        let json = source.export_json().unwrap();

        let mut target = TemplateRegistry::new(config(4));
        create(&mut target, "mine").unwrap();
        assert_eq!(target.import_json(&json).unwrap(), 1);

        let keys: Vec<String> = target.templates().iter().map(|t| t.id_key()).collect();
        assert_eq!(keys, vec!["0 local", "1 alice"]);
        assert_eq!(target.get("1 alice").unwrap().display_name(), "theirs");
        assert_eq!(create(&mut target, "next").unwrap().id_key, "2 local");
    }

    #[test]
    fn test_import_rejects_repeated_key_in_document() {
        let mut source = TemplateRegistry::new(config(4));
        create(&mut source, "a").unwrap();
        let record = record_for(&source.templates()[0]).unwrap();
        let json = CollectionFile::new(vec![
            ("0 local".to_string(), record.clone()),
            ("0 local".to_string(), record),
        ])
        .to_json()
        .unwrap();

        let mut target = TemplateRegistry::new(config(4));
        let err = target.import_json(&json).unwrap_err();
        assert!(matches!(err, MarbleError::DuplicateTemplate { ref id_key } if id_key == "0 local"));
        assert!(target.is_empty());
    }

    #[test]
    fn test_reload_keeps_registry_order() {
        let store = Arc::new(MemoryStore::new());
        let mut registry =
            TemplateRegistry::new(config(4)).with_store(store.clone(), PersistPolicy::BestEffort);
        create(&mut registry, "a").unwrap();
        create(&mut registry, "b").unwrap();
        registry.remove("0 local").unwrap();
        assert_eq!(create(&mut registry, "c").unwrap().id_key, "0 local");

        let mut reloaded =
            TemplateRegistry::new(config(4)).with_store(store, PersistPolicy::BestEffort);
        assert_eq!(reloaded.load().unwrap(), 2);
        let names: Vec<&str> = reloaded.templates().iter().map(|t| t.display_name()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(reloaded.summaries(), registry.summaries());
    }

    /// Lets a test keep a handle on the sink it installs.
    struct SinkRef(Arc<Recorder>);

    impl StatusSink for SinkRef {
        fn report(&self, level: StatusLevel, verb: &str, message: &str) {
            self.0.report(level, verb, message);
        }
    }
}
