//! Test utilities and mock types for simobj development.
//!
//! Provides [`MockFieldSource`], an in-memory [`FieldSource`] that records
//! every load and release so tests can assert on I/O patterns, plus
//! snapshot fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use indexmap::IndexMap;

use simobj_core::{FieldError, FieldMeta, FieldSource, Interval, Value};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// One recorded call to [`FieldSource::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadCall {
    pub keys: Vec<String>,
    pub interval: Option<Interval>,
}

/// In-memory field source backed by a map of full arrays.
///
/// Register fields with [`add_field`](MockFieldSource::add_field), then
/// hand the source to code under test. Every `load` and `release` is
/// logged for later inspection.
#[derive(Clone, Debug, Default)]
pub struct MockFieldSource {
    catalogue: IndexMap<String, (Value, FieldMeta)>,
    working: IndexMap<String, Value>,
    share: bool,
    pub loads: Vec<LoadCall>,
    pub releases: Vec<String>,
}

impl MockFieldSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that keeps full arrays resident and shared.
    pub fn shared() -> Self {
        Self {
            share: true,
            ..Self::default()
        }
    }

    /// Register a field with its full (unmasked) value and keytype.
    pub fn add_field(&mut self, name: &str, keytype: &str, value: Value) {
        self.catalogue.insert(
            name.to_string(),
            (value, FieldMeta::new(keytype, "snapshot")),
        );
    }

    /// Builder form of [`add_field`](Self::add_field).
    pub fn with_field(mut self, name: &str, keytype: &str, value: Value) -> Self {
        self.add_field(name, keytype, value);
        self
    }

    /// The full registered value of a field, regardless of the working set.
    pub fn catalogue_value(&self, key: &str) -> Option<Value> {
        self.catalogue.get(key).map(|(v, _)| v.clone())
    }

    /// Names currently in the working set.
    pub fn working_set(&self) -> Vec<String> {
        self.working.keys().cloned().collect()
    }

    /// Number of `load` calls that requested `key`.
    pub fn load_count(&self, key: &str) -> usize {
        self.loads
            .iter()
            .filter(|c| c.keys.iter().any(|k| k == key))
            .count()
    }

    /// Intervals requested for `key`, in call order.
    pub fn intervals_for(&self, key: &str) -> Vec<Option<Interval>> {
        self.loads
            .iter()
            .filter(|c| c.keys.iter().any(|k| k == key))
            .map(|c| c.interval)
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_log(&mut self) {
        self.loads.clear();
        self.releases.clear();
    }
}

impl FieldSource for MockFieldSource {
    fn fields(&self) -> Vec<String> {
        self.catalogue.keys().cloned().collect()
    }

    fn contains(&self, key: &str) -> bool {
        self.catalogue.contains_key(key)
    }

    fn metadata(&self, key: &str) -> Option<FieldMeta> {
        self.catalogue.get(key).map(|(_, meta)| meta.clone())
    }

    fn set_metadata(&mut self, key: &str, meta: FieldMeta) {
        if let Some(entry) = self.catalogue.get_mut(key) {
            entry.1 = meta;
        }
    }

    fn rows(&self, key: &str) -> Option<usize> {
        self.catalogue.get(key).map(|(full, _)| full.rows())
    }

    fn load(&mut self, keys: &[&str], interval: Option<Interval>) -> Result<Vec<String>, FieldError> {
        self.loads.push(LoadCall {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            interval,
        });
        let mut fresh = Vec::new();
        for &key in keys {
            if self.working.contains_key(key) {
                continue;
            }
            let (full, _) = self
                .catalogue
                .get(key)
                .ok_or_else(|| FieldError::UnknownField {
                    name: key.to_string(),
                })?;
            let value = match interval {
                Some(iv) => full.slice_rows(iv)?,
                None => full.clone(),
            };
            self.working.insert(key.to_string(), value);
            fresh.push(key.to_string());
        }
        Ok(fresh)
    }

    fn value(&self, key: &str) -> Option<&Value> {
        self.working.get(key)
    }

    fn release(&mut self, key: &str) {
        self.releases.push(key.to_string());
        self.working.shift_remove(key);
    }

    fn share_mode(&self) -> bool {
        self.share
    }
}
