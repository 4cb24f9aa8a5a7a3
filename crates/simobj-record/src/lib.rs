//! Lazy, object-scoped field records over simulation snapshots.
//!
//! A [`Record`] presents the fields of one object (a galaxy, a halo) as a
//! map that fills itself on demand. Each field is read from the external
//! [`FieldSource`](simobj_core::FieldSource) through its keytype's
//! selector, brought into the object's frame, and optionally persisted to
//! a disk cache that one process at a time may own.
//!
//! Configuration is plain data: see [`RecordConfig`] and [`InitArgs`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod record;

pub use config::{
    CacheConfig, ConfigError, FingerprintFn, InitArgs, MetadataChange, MetadataCondition,
    MetadataEdit, RecordConfig,
};
pub use error::RecordError;
pub use record::{Record, ORTHONORMAL_TOLERANCE};
