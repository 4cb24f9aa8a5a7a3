//! The persisted form of a record.

use indexmap::IndexMap;

use simobj_core::{KeyType, Selector, Value};
use simobj_frame::TransformStack;

/// Everything needed to restore a record without touching the source.
///
/// Live handles (the field source, mask functions) are not part of the
/// entry; they are rebuilt from configuration on restore.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheEntry {
    /// Fingerprint the entry was written under.
    pub fingerprint: String,
    /// Hash of the configuration the entry was built with.
    pub config_hash: u64,
    /// Materialized fields, in insertion order.
    pub fields: IndexMap<String, Value>,
    /// Resolved selectors by keytype.
    pub selectors: IndexMap<KeyType, Selector>,
    /// Transforms applied so far.
    pub transforms: TransformStack,
}
