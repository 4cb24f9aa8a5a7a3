//! simobj: lazy, object-scoped field access over simulation snapshots.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all simobj sub-crates. For most users, adding `simobj` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use simobj::prelude::*;
//!
//! // Wire a galaxy's particle mask to the catalogue columns holding its
//! // group and subgroup numbers.
//! let mut config = RecordConfig {
//!     cache: CacheConfig::disabled(),
//!     ..RecordConfig::default()
//! };
//! config.masks.insert(
//!     "particle_g".into(),
//!     MaskChoice::Fixed(simobj::select::masks::fields_equal(&[
//!         ("ng_g", "fof"),
//!         ("nsg_g", "sub"),
//!     ])),
//! );
//! config.recenter.insert("xyz_g".into(), "cops".into());
//! config.coord_class.insert("xyz_g".into(), CoordClass::Position);
//! assert!(config.validate().is_ok());
//!
//! let init = InitArgs::new(
//!     Identifier::new().with("sim", "box25"),
//!     Identifier::new().with("fof", 1).with("sub", 0),
//! );
//! assert!(init.fingerprint().as_str().starts_with("simobj_sim-box25_fof-1_sub-0_nomask_"));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `simobj-core` | values, units, selectors, identifiers, `FieldSource` |
//! | [`select`] | `simobj-select` | mask registry, interval grouping, mask builders |
//! | [`frame`] | `simobj-frame` | transform stack, coordinate kernels, rotations |
//! | [`cache`] | `simobj-cache` | fingerprints, lock markers, cache codec |
//! | [`record`] | `simobj-record` | `Record`, `RecordConfig`, `InitArgs` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the field source trait (`simobj-core`).
pub use simobj_core as types;

/// Row selection: masks, interval grouping, partial reads (`simobj-select`).
pub use simobj_select as select;

/// Coordinate frames: [`frame::TransformStack`] and the kernels it replays
/// (`simobj-frame`).
pub use simobj_frame as frame;

/// Disk cache with single-owner locking (`simobj-cache`).
pub use simobj_cache as cache;

/// The lazy [`record::Record`] and its configuration (`simobj-record`).
pub use simobj_record as record;

/// Common imports for typical simobj usage.
///
/// ```rust
/// use simobj::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use simobj_core::{
        CoordClass, FieldMeta, FieldSource, Identifier, Interval, MaskArgs, Param, Selector,
        Unit, Value,
    };

    // Errors
    pub use simobj_cache::CacheError;
    pub use simobj_core::FieldError;
    pub use simobj_record::{ConfigError, RecordError};

    // Masks
    pub use simobj_select::{MaskChoice, MaskContext, MaskSpec};

    // Frames
    pub use simobj_frame::{Matrix3, Offset};

    // Cache
    pub use simobj_cache::{CancelAction, CancelHandle};

    // Record
    pub use simobj_record::{
        CacheConfig, InitArgs, MetadataChange, MetadataEdit, Record, RecordConfig,
    };
}
