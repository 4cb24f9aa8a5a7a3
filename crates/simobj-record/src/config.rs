//! Record configuration, construction arguments, and validation.
//!
//! [`RecordConfig`] is the per-simulation configuration a [`Record`] is
//! built from: recentering and box-wrap tables, coordinate classes, mask
//! functions, metadata edits, and cache settings. It is plain data;
//! loading it from files is the caller's business.
//! [`validate()`](RecordConfig::validate) checks structural invariants
//! before any field is touched.
//!
//! [`Record`]: crate::Record

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use simobj_cache::{CancelAction, ConfigHasher, Fingerprint};
use simobj_core::{CoordClass, FieldMeta, FieldName, Identifier, KeyType, MaskArgs};
use simobj_select::MaskChoice;

// ── InitArgs ───────────────────────────────────────────────────────

/// What a record selects: which snapshot, which object, which mask.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InitArgs {
    /// Snapshot identifier (simulation, snapshot number, ...).
    pub snapshot: Identifier,
    /// Object identifier (e.g. `fof=1, sub=0`).
    pub object: Identifier,
    /// Mask type picking entries of per-type mask tables.
    pub mask_type: Option<String>,
    /// Extra arguments passed to every mask function.
    pub mask_args: MaskArgs,
}

impl InitArgs {
    /// Arguments for `object` in `snapshot`, with no mask type.
    pub fn new(snapshot: Identifier, object: Identifier) -> Self {
        Self {
            snapshot,
            object,
            ..Self::default()
        }
    }

    /// Set the mask type.
    pub fn with_mask_type(mut self, mask_type: impl Into<String>) -> Self {
        self.mask_type = Some(mask_type.into());
        self
    }

    /// Set the mask arguments.
    pub fn with_mask_args(mut self, args: MaskArgs) -> Self {
        self.mask_args = args;
        self
    }

    /// The default cache fingerprint for these arguments.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::derive(
            &self.snapshot,
            &self.object,
            self.mask_type.as_deref(),
            &self.mask_args,
        )
    }
}

// ── MetadataEdit ───────────────────────────────────────────────────

/// Predicate over `(field name, metadata, init args)`.
pub type MetadataCondition = dyn Fn(&str, &FieldMeta, &InitArgs) -> bool + Send + Sync;

/// The metadata attribute a [`MetadataEdit`] overwrites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataChange {
    /// Reclassify the field under another keytype.
    SetKeyType(KeyType),
    /// Change the file type the field is read from.
    SetFileType(String),
}

/// A conditional rewrite of source field metadata.
///
/// Applied to every source field when a record is opened, e.g. to move
/// particle fields onto a mask-type-specific keytype.
#[derive(Clone)]
pub struct MetadataEdit {
    condition: Arc<MetadataCondition>,
    change: MetadataChange,
}

impl MetadataEdit {
    /// Apply `change` to every field for which `condition` holds.
    pub fn new<F>(condition: F, change: MetadataChange) -> Self
    where
        F: Fn(&str, &FieldMeta, &InitArgs) -> bool + Send + Sync + 'static,
    {
        Self {
            condition: Arc::new(condition),
            change,
        }
    }

    /// The edited metadata, or `None` if the condition does not hold.
    pub fn apply(&self, name: &str, meta: &FieldMeta, init: &InitArgs) -> Option<FieldMeta> {
        if !(self.condition)(name, meta, init) {
            return None;
        }
        let mut edited = meta.clone();
        match &self.change {
            MetadataChange::SetKeyType(k) => edited.keytype = k.clone(),
            MetadataChange::SetFileType(t) => edited.filetype = t.clone(),
        }
        Some(edited)
    }

    /// The change this edit makes.
    pub fn change(&self) -> &MetadataChange {
        &self.change
    }
}

impl fmt::Debug for MetadataEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataEdit")
            .field("change", &self.change)
            .finish_non_exhaustive()
    }
}

// ── CacheConfig ────────────────────────────────────────────────────

/// Disk cache settings.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Whether to lock, load, and persist cache entries. Default: true.
    pub enabled: bool,
    /// Directory holding entries and lock markers. Default: `"."`.
    pub dir: PathBuf,
    /// What to do when cancellation is requested. Default: exit with 130.
    pub on_cancel: CancelAction,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
            on_cancel: CancelAction::default(),
        }
    }
}

impl CacheConfig {
    /// Caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Caching in `dir`, failing operations on cancellation instead of
    /// exiting.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            dir: dir.into(),
            on_cancel: CancelAction::ReturnError,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`RecordConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `grouping_ratio` is NaN or outside `[0, 1]`.
    InvalidGroupingRatio {
        /// The invalid value.
        value: f64,
    },
    /// A recenter or box-wrap entry names its own field as the reference.
    SelfReference {
        /// The offending field.
        field: FieldName,
    },
    /// A recenter target has no coordinate class, so later transforms
    /// would not reach it.
    UnclassifiedRecenter {
        /// The offending field.
        field: FieldName,
    },
    /// Caching is enabled with an empty directory path.
    EmptyCacheDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGroupingRatio { value } => {
                write!(f, "grouping_ratio must be in [0.0, 1.0], got {value}")
            }
            Self::SelfReference { field } => {
                write!(f, "'{field}' cannot be its own recenter or box-wrap reference")
            }
            Self::UnclassifiedRecenter { field } => {
                write!(f, "recenter target '{field}' has no coordinate class")
            }
            Self::EmptyCacheDir => write!(f, "cache directory must not be empty"),
        }
    }
}

impl Error for ConfigError {}

// ── RecordConfig ───────────────────────────────────────────────────

/// Custom cache-name builder.
pub type FingerprintFn = dyn Fn(&InitArgs) -> String + Send + Sync;

/// Complete configuration for opening a [`Record`](crate::Record).
#[derive(Clone)]
pub struct RecordConfig {
    /// Field → centroid field subtracted from it on load.
    pub recenter: IndexMap<FieldName, FieldName>,
    /// Field → scalar box-length field used to wrap it on load.
    pub box_wrap: IndexMap<FieldName, FieldName>,
    /// Coordinate class of each coordinate field.
    pub coord_class: IndexMap<FieldName, CoordClass>,
    /// Metadata rewrites applied to the source on open.
    pub metadata_edits: Vec<MetadataEdit>,
    /// Mask function per keytype.
    pub masks: IndexMap<KeyType, MaskChoice>,
    /// Gap fraction below which boolean-mask runs are read together.
    /// Default: 0.1.
    pub grouping_ratio: f64,
    /// Resolve every configured mask on open. Default: true.
    pub eager_masks: bool,
    /// Disk cache settings.
    pub cache: CacheConfig,
    /// Overrides [`InitArgs::fingerprint`] when set.
    pub fingerprint: Option<Arc<FingerprintFn>>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            recenter: IndexMap::new(),
            box_wrap: IndexMap::new(),
            coord_class: IndexMap::new(),
            metadata_edits: Vec::new(),
            masks: IndexMap::new(),
            grouping_ratio: 0.1,
            eager_masks: true,
            cache: CacheConfig::default(),
            fingerprint: None,
        }
    }
}

impl fmt::Debug for RecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordConfig")
            .field("recenter", &self.recenter)
            .field("box_wrap", &self.box_wrap)
            .field("coord_class", &self.coord_class)
            .field("metadata_edits", &self.metadata_edits)
            .field("masks", &self.masks.keys().collect::<Vec<_>>())
            .field("grouping_ratio", &self.grouping_ratio)
            .field("eager_masks", &self.eager_masks)
            .field("cache", &self.cache)
            .field("fingerprint", &self.fingerprint.is_some())
            .finish()
    }
}

impl RecordConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. grouping_ratio in [0, 1] (NaN fails the range check).
        if !(0.0..=1.0).contains(&self.grouping_ratio) {
            return Err(ConfigError::InvalidGroupingRatio {
                value: self.grouping_ratio,
            });
        }
        // 2. No field is its own reference.
        for (field, reference) in self.recenter.iter().chain(&self.box_wrap) {
            if field == reference {
                return Err(ConfigError::SelfReference {
                    field: field.clone(),
                });
            }
        }
        // 3. Recentered fields take part in transforms.
        if let Some(field) = self
            .recenter
            .keys()
            .find(|f| !self.coord_class.contains_key(*f))
        {
            return Err(ConfigError::UnclassifiedRecenter {
                field: field.clone(),
            });
        }
        // 4. Cache directory present when caching.
        if self.cache.enabled && self.cache.dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCacheDir);
        }
        Ok(())
    }

    /// The cache fingerprint for `init`.
    pub fn fingerprint_for(&self, init: &InitArgs) -> Fingerprint {
        match &self.fingerprint {
            Some(f) => Fingerprint::from_raw(&f(init)),
            None => init.fingerprint(),
        }
    }

    /// Hash of everything that shapes stored field contents.
    ///
    /// A cache entry written under a different hash is stale.
    pub fn content_hash(&self, init: &InitArgs) -> u64 {
        let mut h = ConfigHasher::new();
        h = h.u64(self.recenter.len() as u64);
        for (field, centre) in &self.recenter {
            h = h.str(field).str(centre);
        }
        h = h.u64(self.box_wrap.len() as u64);
        for (field, lbox) in &self.box_wrap {
            h = h.str(field).str(lbox);
        }
        h = h.u64(self.coord_class.len() as u64);
        for (field, class) in &self.coord_class {
            h = h.str(field).u8(class.tag());
        }
        h = h.u64(self.masks.len() as u64);
        for (keytype, choice) in &self.masks {
            h = h.str(keytype);
            match choice.for_type(init.mask_type.as_deref()) {
                Some(spec) => {
                    h = h.u8(1).u64(spec.used_fields().len() as u64);
                    for used in spec.used_fields() {
                        h = h.str(used);
                    }
                }
                None => h = h.u8(0),
            }
        }
        h = h.u64(self.metadata_edits.len() as u64);
        for edit in &self.metadata_edits {
            h = match edit.change() {
                MetadataChange::SetKeyType(k) => h.u8(0).str(k),
                MetadataChange::SetFileType(t) => h.u8(1).str(t),
            };
        }
        h.f64(self.grouping_ratio).finish()
    }
}
