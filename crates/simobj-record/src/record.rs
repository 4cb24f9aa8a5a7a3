//! The lazy, object-scoped field record.

use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, info};

use simobj_cache::{CacheEntry, CacheManager, CacheState, CancelHandle};
use simobj_core::source::fetch;
use simobj_core::{CoordClass, FieldError, FieldName, FieldSource, KeyType, Selector, Value};
use simobj_frame::rotation::{align_with_z, angular_momentum, axis_angle, is_orthonormal, transpose};
use simobj_frame::stack::apply_op;
use simobj_frame::{kernel, Matrix3, Offset, TransformOp, TransformStack};
use simobj_select::{fetch_selected, MaskRegistry};

use crate::config::{InitArgs, RecordConfig};
use crate::error::RecordError;

/// Largest deviation from `Mᵀ·M = I` accepted by [`Record::rotate`].
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-9;

/// The fields of one object, fetched from a snapshot on first access.
///
/// A `Record` owns its [`FieldSource`] and keeps every field it has
/// materialized. On a miss, [`get`](Self::get) resolves the field's
/// keytype and selector, reads only the selected rows, recenters and
/// box-wraps the result if configured, and replays the transform stack
/// so the field lands in the same frame as everything loaded earlier.
///
/// With caching enabled the record owns its fingerprint's lock for its
/// whole lifetime and persists after every change.
///
/// # Examples
///
/// ```no_run
/// # use simobj_record::{CacheConfig, InitArgs, Record, RecordConfig, RecordError};
/// # fn demo<S: simobj_core::FieldSource>(source: S) -> Result<(), RecordError> {
/// let init = InitArgs::default();
/// let config = RecordConfig {
///     cache: CacheConfig::disabled(),
///     ..RecordConfig::default()
/// };
/// let mut record = Record::open(source, init, config)?;
/// let masses = record.get("mass_g")?;
/// println!("{} particles", masses.rows());
/// # Ok(())
/// # }
/// ```
pub struct Record<S: FieldSource> {
    source: S,
    fields: IndexMap<FieldName, Value>,
    masks: MaskRegistry,
    transforms: TransformStack,
    config: RecordConfig,
    init: InitArgs,
    config_hash: u64,
    cache: Option<CacheManager>,
}

impl<S: FieldSource> Record<S> {
    // ── Construction ───────────────────────────────────────────────

    /// Open the record for `init` over `source`.
    ///
    /// Validates `config`, registers the masks selected by
    /// `init.mask_type`, and applies metadata edits to the source. With
    /// caching enabled the fingerprint lock is acquired (failing with
    /// [`CacheError::AlreadyLocked`](simobj_cache::CacheError::AlreadyLocked)
    /// if another owner holds it) and a current cache entry, if any, is
    /// restored. With `eager_masks`, every registered mask is then resolved.
    pub fn open(mut source: S, init: InitArgs, config: RecordConfig) -> Result<Self, RecordError> {
        config.validate()?;

        let mut masks = MaskRegistry::new(init.object.clone(), init.mask_args.clone());
        for (keytype, choice) in &config.masks {
            if let Some(spec) = choice.for_type(init.mask_type.as_deref()) {
                masks.register(keytype.clone(), spec.clone());
            }
        }
        apply_metadata_edits(&mut source, &config, &init);

        let config_hash = config.content_hash(&init);
        let mut record = Self {
            source,
            fields: IndexMap::new(),
            masks,
            transforms: TransformStack::new(),
            config,
            init,
            config_hash,
            cache: None,
        };

        let mut restored = false;
        if record.config.cache.enabled {
            let fingerprint = record.config.fingerprint_for(&record.init);
            let manager = CacheManager::open(
                record.config.cache.dir.clone(),
                fingerprint,
                record.config.cache.on_cancel,
            )?;
            if let Some(entry) = manager.load(config_hash)? {
                record.restore(entry);
                restored = true;
            }
            record.cache = Some(manager);
        }

        let mut resolved_now = false;
        if record.config.eager_masks {
            let pending: Vec<KeyType> = record
                .masks
                .keytypes()
                .filter(|k| record.masks.get(k).is_none())
                .map(str::to_string)
                .collect();
            for keytype in &pending {
                record.masks.resolve(keytype, &mut record.source)?;
            }
            resolved_now = !pending.is_empty();
        }
        if !restored || resolved_now {
            record.persist()?;
        }

        info!(
            object = %record.init.object,
            mask_type = record.init.mask_type.as_deref().unwrap_or("none"),
            restored,
            fields = record.fields.len(),
            "record opened"
        );
        Ok(record)
    }

    fn restore(&mut self, entry: CacheEntry) {
        debug!(
            fields = entry.fields.len(),
            selectors = entry.selectors.len(),
            transforms = entry.transforms.len(),
            "restoring record from cache"
        );
        self.fields = entry.fields;
        self.masks.restore(entry.selectors);
        self.transforms = entry.transforms;
    }

    // ── Field access ───────────────────────────────────────────────

    /// The value of `name`, materializing it on first access.
    ///
    /// Fails with [`FieldError::UnknownField`] if the source does not list
    /// the name, or with whatever selector resolution, reading, or
    /// transforming the field reports; nothing is stored then. A field that
    /// materialized but failed to persist stays stored.
    pub fn get(&mut self, name: &str) -> Result<&Value, RecordError> {
        let index = match self.fields.get_index_of(name) {
            Some(i) => i,
            None => {
                let value = self.materialize(name)?;
                let index = self.fields.insert_full(name.to_string(), value).0;
                self.persist()?;
                index
            }
        };
        Ok(&self.fields[index])
    }

    /// Attribute-style access: names starting with `_` are reserved and
    /// yield `Ok(None)` without touching the source.
    pub fn get_attr(&mut self, name: &str) -> Result<Option<&Value>, RecordError> {
        if name.starts_with('_') {
            return Ok(None);
        }
        self.get(name).map(Some)
    }

    /// Whether `name` is currently stored.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Stored field names, in load order.
    pub fn loaded_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every field name the source can load.
    pub fn available_fields(&self) -> Vec<String> {
        self.source.fields()
    }

    /// Drop a stored field; the next [`get`](Self::get) reads it again.
    ///
    /// The cache is not rewritten.
    pub fn evict(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    /// Store a value computed by the caller under `name`.
    ///
    /// The value is taken as-is: no selector or transform is applied, and
    /// later transforms reach it only if `name` has a coordinate class.
    pub fn insert(&mut self, name: impl Into<FieldName>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// The selector of `keytype`, resolving it on first use.
    pub fn selector(&mut self, keytype: &str) -> Result<&Selector, RecordError> {
        Ok(self.masks.resolve(keytype, &mut self.source)?)
    }

    fn materialize(&mut self, name: &str) -> Result<Value, FieldError> {
        if !self.source.contains(name) {
            return Err(FieldError::UnknownField {
                name: name.to_string(),
            });
        }
        let keytype = self.keytype_of(name)?;
        let selector = self.masks.resolve(&keytype, &mut self.source)?.clone();
        let ratio = self.config.grouping_ratio;
        let mut value = fetch_selected(&mut self.source, name, &selector, ratio)?;

        if let Some(centre_field) = self.config.recenter.get(name).cloned() {
            let centre_keytype = self.keytype_of(&centre_field)?;
            let centre_selector = self.masks.resolve(&centre_keytype, &mut self.source)?.clone();
            let centre = fetch_selected(&mut self.source, &centre_field, &centre_selector, ratio)?;
            value.subtract_row(&centre)?;
        }
        if let Some(box_field) = self.config.box_wrap.get(name).cloned() {
            let box_length = fetch(&mut self.source, &box_field, None)?;
            kernel::box_wrap(&mut value, &box_length)?;
        }
        if let Some(&class) = self.config.coord_class.get(name) {
            self.transforms.replay(&mut value, class)?;
        }

        debug!(
            field = name,
            keytype = %keytype,
            selector = %selector,
            rows = value.rows(),
            unit = %value.unit(),
            "field materialized"
        );
        Ok(value)
    }

    fn keytype_of(&self, name: &str) -> Result<KeyType, FieldError> {
        self.source
            .metadata(name)
            .map(|meta| meta.keytype)
            .ok_or_else(|| FieldError::UnknownField {
                name: name.to_string(),
            })
    }

    // ── Transforms ─────────────────────────────────────────────────

    /// Add `offset` to every field of coordinate class `class`, now and
    /// for fields loaded later.
    ///
    /// Every present field is checked before any is changed, so a unit or
    /// shape mismatch leaves the record untouched.
    pub fn translate(&mut self, class: CoordClass, offset: Offset) -> Result<(), RecordError> {
        self.apply_and_push(TransformOp::Translate { class, offset })
    }

    /// Move the origin of `class` coordinates to `centre`.
    pub fn recenter(&mut self, class: CoordClass, centre: &Offset) -> Result<(), RecordError> {
        self.translate(class, centre.negated())
    }

    /// Rotate every coordinate field by `matrix`, now and for fields
    /// loaded later.
    ///
    /// `matrix` must be orthonormal within [`ORTHONORMAL_TOLERANCE`].
    pub fn rotate(&mut self, matrix: Matrix3) -> Result<(), RecordError> {
        if !is_orthonormal(&matrix, ORTHONORMAL_TOLERANCE) {
            return Err(FieldError::InvalidTransform {
                reason: format!("matrix {matrix:?} is not orthonormal"),
            }
            .into());
        }
        self.apply_and_push(TransformOp::Rotate { matrix })
    }

    /// Rotate by `angle` radians about `axis` (right-handed).
    pub fn rotate_axis_angle(&mut self, axis: [f64; 3], angle: f64) -> Result<(), RecordError> {
        self.rotate(axis_angle(axis, angle)?)
    }

    /// Rotate so the angular momentum of the innermost `fraction` of the
    /// mass points along +z. Returns the applied matrix.
    ///
    /// The three fields are loaded through [`get`](Self::get), so they
    /// are read in the current frame.
    pub fn rotate_align(
        &mut self,
        position_field: &str,
        velocity_field: &str,
        mass_field: &str,
        fraction: f64,
    ) -> Result<Matrix3, RecordError> {
        let positions = self.get(position_field)?.clone();
        let velocities = self.get(velocity_field)?.clone();
        let masses = self.get(mass_field)?.clone();
        let l = angular_momentum(&positions, &velocities, &masses, fraction)?;
        let matrix = align_with_z(l)?;
        self.rotate(matrix)?;
        Ok(matrix)
    }

    /// Undo the most recent rotation.
    ///
    /// Fails with [`FieldError::NotARotation`] if the last transform is a
    /// translation or the stack is empty; the record is then unchanged.
    pub fn unrotate(&mut self) -> Result<(), RecordError> {
        let matrix = self.transforms.pop_rotation()?;
        let inverse = TransformOp::Rotate {
            matrix: transpose(&matrix),
        };
        if let Err(e) = self.apply_to_present(&inverse) {
            self.transforms.push(TransformOp::Rotate { matrix });
            return Err(e.into());
        }
        self.persist()
    }

    /// The transforms applied so far, oldest first.
    pub fn transforms(&self) -> &TransformStack {
        &self.transforms
    }

    fn apply_and_push(&mut self, op: TransformOp) -> Result<(), RecordError> {
        self.apply_to_present(&op)?;
        debug!(op = op.tag(), depth = self.transforms.len() + 1, "transform pushed");
        self.transforms.push(op);
        self.persist()
    }

    fn apply_to_present(&mut self, op: &TransformOp) -> Result<(), FieldError> {
        let mut updated = Vec::new();
        for (name, value) in &self.fields {
            let Some(&class) = self.config.coord_class.get(name) else {
                continue;
            };
            let mut value = value.clone();
            apply_op(op, &mut value, class)?;
            updated.push((name.clone(), value));
        }
        for (name, value) in updated {
            self.fields.insert(name, value);
        }
        Ok(())
    }

    // ── Cache ──────────────────────────────────────────────────────

    /// Write the current state to the cache. A no-op without caching.
    pub fn persist(&mut self) -> Result<(), RecordError> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(());
        };
        let entry = CacheEntry {
            fingerprint: cache.fingerprint().as_str().to_string(),
            config_hash: self.config_hash,
            fields: self.fields.clone(),
            selectors: self.masks.resolved().clone(),
            transforms: self.transforms.clone(),
        };
        cache.persist(&entry)?;
        Ok(())
    }

    /// Lifecycle state of the cache lock ([`CacheState::Unlocked`] without
    /// caching).
    pub fn cache_state(&self) -> CacheState {
        self.cache
            .as_ref()
            .map_or(CacheState::Unlocked, CacheManager::state)
    }

    /// A handle for requesting cancellation from another thread, if
    /// caching is enabled.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.cache.as_ref().map(CacheManager::cancel_handle)
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The field source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the field source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The arguments this record was opened with.
    pub fn init_args(&self) -> &InitArgs {
        &self.init
    }

    /// The configuration this record was opened with.
    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Close the record, releasing the cache lock, and return the source.
    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: FieldSource> fmt::Debug for Record<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("object", &self.init.object)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("masks", &self.masks)
            .field("transforms", &self.transforms.len())
            .field("cache_state", &self.cache_state())
            .finish_non_exhaustive()
    }
}

/// Push every matching [`MetadataEdit`](crate::MetadataEdit) into the
/// source. Edits apply in order, each seeing the result of the previous.
fn apply_metadata_edits<S: FieldSource>(source: &mut S, config: &RecordConfig, init: &InitArgs) {
    if config.metadata_edits.is_empty() {
        return;
    }
    for name in source.fields() {
        let Some(original) = source.metadata(&name) else {
            continue;
        };
        let mut meta = original.clone();
        for edit in &config.metadata_edits {
            if let Some(edited) = edit.apply(&name, &meta, init) {
                meta = edited;
            }
        }
        if meta != original {
            debug!(field = %name, keytype = %meta.keytype, filetype = %meta.filetype, "metadata edited");
            source.set_metadata(&name, meta);
        }
    }
}
