//! The on-disk lock marker.
//!
//! Ownership of a fingerprint is the existence of `<fp>.lock`, created
//! with create-new semantics so exactly one of several racing creators
//! wins. Acquisition never blocks or retries.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::CacheError;

/// Create the marker at `path`, failing with
/// [`CacheError::AlreadyLocked`] if it exists.
///
/// The marker holds the owner's process id for diagnostics.
pub fn create_marker(path: &Path) -> Result<(), CacheError> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(CacheError::AlreadyLocked {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    write_owner(path, file)
}

/// Write the owner pid into a freshly created marker. On failure the
/// marker is removed so the fingerprint does not stay locked.
fn write_owner<W: Write>(path: &Path, mut out: W) -> Result<(), CacheError> {
    match writeln!(out, "{}", std::process::id()).and_then(|()| out.flush()) {
        Ok(()) => Ok(()),
        Err(e) => {
            drop(out);
            let _ = fs::remove_file(path);
            Err(e.into())
        }
    }
}

/// Remove the marker at `path`. A missing marker is not an error.
pub fn remove_marker(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
