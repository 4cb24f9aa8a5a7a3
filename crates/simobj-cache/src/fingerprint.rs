//! Deterministic cache names.

use std::fmt;
use std::path::{Path, PathBuf};

use simobj_core::{Identifier, MaskArgs};

use crate::hash::ConfigHasher;

/// A filesystem-safe name for one object's cache entry.
///
/// Derived from the snapshot identifier, the object identifier, the mask
/// type, and every mask argument. Continuous arguments carry their unit,
/// so an aperture of `30kpc` and one of `30Mpc` get different entries.
///
/// The readable part of the name is lossy (unsafe characters become `~`),
/// so a derived name ends with a hash of the unsanitized parts. Two inputs
/// that differ anywhere get different names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint for one object.
    pub fn derive(
        snapshot: &Identifier,
        object: &Identifier,
        mask_type: Option<&str>,
        args: &MaskArgs,
    ) -> Self {
        let mut parts = vec!["simobj".to_string()];
        parts.extend(snapshot.iter().map(|(k, v)| format!("{k}-{v}")));
        parts.extend(object.iter().map(|(k, v)| format!("{k}-{v}")));
        parts.push(mask_type.unwrap_or("nomask").to_string());
        parts.extend(args.positional.iter().map(|p| p.to_string()));
        parts.extend(args.keyword.iter().map(|(k, v)| format!("{k}-{v}")));

        let mut h = ConfigHasher::new().u64(snapshot.len() as u64);
        for (k, v) in snapshot.iter() {
            h = h.str(k).str(&format!("{v:?}"));
        }
        h = h.u64(object.len() as u64);
        for (k, v) in object.iter() {
            h = h.str(k).str(&format!("{v:?}"));
        }
        h = match mask_type {
            Some(t) => h.u8(1).str(t),
            None => h.u8(0),
        };
        h = h.u64(args.positional.len() as u64);
        for p in &args.positional {
            h = h.str(&format!("{p:?}"));
        }
        h = h.u64(args.keyword.len() as u64);
        for (k, v) in &args.keyword {
            h = h.str(k).str(&format!("{v:?}"));
        }

        Self(format!("{}_{:016x}", sanitize(&parts.join("_")), h.finish()))
    }

    /// Use `raw` as the fingerprint.
    ///
    /// A name made only of ASCII alphanumerics and `-_.+` is used as-is.
    /// Otherwise unsafe characters are replaced with `~` and a hash of
    /// `raw` is appended, so distinct raw names stay distinct.
    pub fn from_raw(raw: &str) -> Self {
        let clean = sanitize(raw);
        if clean == raw {
            return Self(clean);
        }
        let hash = ConfigHasher::new().str(raw).finish();
        Self(format!("{clean}~{hash:016x}"))
    }

    /// The fingerprint string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<dir>/<fp>.lock`
    pub fn lock_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.lock", self.0))
    }

    /// `<dir>/<fp>.simobj`
    pub fn entry_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.simobj", self.0))
    }

    /// `<dir>/<fp>.simobj.tmp`
    pub fn tmp_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.simobj.tmp", self.0))
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if is_safe(c) {
                c
            } else {
                '~'
            }
        })
        .collect()
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+')
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
