//! Error types for the cache subsystem.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors from locking, persisting, or decoding a cache entry.
#[derive(Debug)]
pub enum CacheError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// Another owner holds the lock marker for this fingerprint.
    AlreadyLocked {
        /// Path of the existing lock marker.
        path: PathBuf,
    },
    /// `persist` was called without holding the lock.
    NotOwned,
    /// A cancellation request was honored; the lock has been released.
    Cancelled,
    /// The file does not start with the expected `b"SOBJ"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The entry could not be decoded (truncated or corrupt data).
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::AlreadyLocked { path } => {
                write!(f, "cache is locked by another owner ({})", path.display())
            }
            Self::NotOwned => write!(f, "cache lock is not held"),
            Self::Cancelled => write!(f, "cancelled; cache lock released"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"SOBJ\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::Malformed { detail } => write!(f, "malformed cache entry: {detail}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
