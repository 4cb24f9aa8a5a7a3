//! Disk cache for simobj records.
//!
//! Persists a record's materialized fields, resolved selectors, and
//! transform stack under a deterministic fingerprint, with cross-process
//! single-writer exclusion and abort-safe writes.
//!
//! # Architecture
//!
//! - [`Fingerprint`] names the entry and its lock marker
//! - [`CacheManager`] owns the lock (`<fp>.lock`, created exclusively) and
//!   reads/writes the entry (`<fp>.simobj`, replaced by atomic rename)
//! - [`CancelHandle`] lets another thread request cancellation; requests
//!   arriving mid-persist are deferred until the write is complete
//! - All I/O uses a custom binary codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "SOBJ"] [VERSION u8] [fingerprint str] [config hash u64]
//! [fields: name + value]* [selectors: keytype + selector]* [transforms]*
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod codec;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod lock;
pub mod manager;

pub use cancel::{CancelAction, CancelHandle, CancelOutcome};
pub use entry::CacheEntry;
pub use error::CacheError;
pub use fingerprint::Fingerprint;
pub use hash::ConfigHasher;
pub use manager::{CacheManager, CacheState};

/// Magic bytes at the start of every cache entry.
pub const MAGIC: [u8; 4] = *b"SOBJ";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
