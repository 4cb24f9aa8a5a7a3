//! The interface external snapshot readers implement.

use crate::error::FieldError;
use crate::id::FieldMeta;
use crate::selector::Interval;
use crate::value::Value;

/// Read access to the fields of one simulation snapshot.
///
/// Implementations keep a working set of loaded fields. [`load`](Self::load)
/// adds to it, [`value`](Self::value) reads from it, and
/// [`release`](Self::release) drops from it. Parsing on-disk formats is the
/// implementation's business; callers only see unit-tagged [`Value`]s.
pub trait FieldSource {
    /// Every field name this source can load.
    fn fields(&self) -> Vec<String>;

    /// Whether `key` is a loadable field name.
    fn contains(&self, key: &str) -> bool {
        self.fields().iter().any(|f| f == key)
    }

    /// Keytype and filetype of a field, or `None` for unknown names.
    fn metadata(&self, key: &str) -> Option<FieldMeta>;

    /// Replace the metadata of a field (used for per-object metadata edits).
    fn set_metadata(&mut self, key: &str, meta: FieldMeta);

    /// Rows along the primary axis of `key`, or `None` for unknown names.
    ///
    /// Readers answer this from the dataset header without loading data.
    /// Partial reads use it to reject selectors sized for another field.
    fn rows(&self, key: &str) -> Option<usize>;

    /// Load `keys` into the working set.
    ///
    /// With `interval = Some(..)` only those rows along the primary axis
    /// are read. Returns the keys that were freshly loaded; keys already
    /// in the working set are left untouched and not reported.
    fn load(&mut self, keys: &[&str], interval: Option<Interval>) -> Result<Vec<String>, FieldError>;

    /// A field currently in the working set.
    fn value(&self, key: &str) -> Option<&Value>;

    /// Drop a field from the working set. Unknown keys are ignored.
    fn release(&mut self, key: &str);

    /// Whether the source holds full unmasked arrays shared by several
    /// consumers. In share mode, callers select rows after fetching the
    /// whole field and never release it.
    fn share_mode(&self) -> bool {
        false
    }
}

/// Load `key` (whole or one interval) and return a copy of its value.
///
/// If the key was already resident, the interval is cut from the resident
/// copy. The key is released again if this call loaded it and the source is not
/// in share mode, so the working set is left as it was found.
pub fn fetch(
    source: &mut dyn FieldSource,
    key: &str,
    interval: Option<Interval>,
) -> Result<Value, FieldError> {
    if !source.contains(key) {
        return Err(FieldError::UnknownField {
            name: key.to_string(),
        });
    }
    let fresh = source.load(&[key], interval)?;
    let resident = !fresh.iter().any(|k| k == key);
    let value = match source.value(key) {
        // A resident value holds every row; cut the interval out ourselves.
        Some(v) if resident => match interval {
            Some(iv) => v.slice_rows(iv),
            None => Ok(v.clone()),
        },
        Some(v) => Ok(v.clone()),
        None => Err(FieldError::Source {
            reason: format!("'{key}' missing from working set after load"),
        }),
    };
    if !source.share_mode() {
        for k in &fresh {
            source.release(k);
        }
    }
    value
}
