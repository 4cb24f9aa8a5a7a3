//! Lock ownership and entry persistence for one fingerprint.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cancel::{CancelAction, CancelHandle};
use crate::codec;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::fingerprint::Fingerprint;
use crate::lock::create_marker;

/// Lifecycle of a [`CacheManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// No lock held.
    Unlocked,
    /// Lock held, nothing written yet by this owner.
    Locked,
    /// Lock held and at least one entry written.
    Persisted,
}

/// Owner of one fingerprint's lock marker and cache entry.
///
/// Dropping the manager releases the lock.
#[derive(Debug)]
pub struct CacheManager {
    dir: PathBuf,
    fingerprint: Fingerprint,
    state: CacheState,
    cancel: CancelHandle,
}

impl CacheManager {
    /// A manager for `fingerprint` under `dir`, not yet holding the lock.
    pub fn new(dir: impl Into<PathBuf>, fingerprint: Fingerprint, on_cancel: CancelAction) -> Self {
        Self {
            dir: dir.into(),
            fingerprint,
            state: CacheState::Unlocked,
            cancel: CancelHandle::new(on_cancel),
        }
    }

    /// Create a manager and acquire the lock.
    pub fn open(
        dir: impl Into<PathBuf>,
        fingerprint: Fingerprint,
        on_cancel: CancelAction,
    ) -> Result<Self, CacheError> {
        let mut manager = Self::new(dir, fingerprint, on_cancel);
        manager.acquire()?;
        Ok(manager)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// The fingerprint this manager owns.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the persisted entry.
    pub fn entry_path(&self) -> PathBuf {
        self.fingerprint.entry_path(&self.dir)
    }

    /// A handle other threads can use to request cancellation.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Take ownership of the fingerprint.
    ///
    /// Fails fast with [`CacheError::AlreadyLocked`] if another owner
    /// holds it. A no-op if this manager already holds it.
    pub fn acquire(&mut self) -> Result<(), CacheError> {
        self.check_cancelled()?;
        if self.state != CacheState::Unlocked {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.fingerprint.lock_path(&self.dir);
        create_marker(&path)?;
        debug!(path = %path.display(), "cache lock acquired");
        self.cancel.set_lock(path);
        self.state = CacheState::Locked;
        Ok(())
    }

    /// Read the persisted entry if it is present and current.
    ///
    /// An entry written under another fingerprint or configuration hash, or
    /// one that fails to decode, is logged and ignored. Leftover temporary
    /// files from an interrupted write are never read.
    pub fn load(&self, config_hash: u64) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match codec::decode_entry(&mut BufReader::new(file)) {
            Ok(entry) if entry.fingerprint != self.fingerprint.as_str() => {
                warn!(
                    path = %path.display(),
                    found = %entry.fingerprint,
                    "ignoring cache entry written under another fingerprint"
                );
                Ok(None)
            }
            Ok(entry) if entry.config_hash != config_hash => {
                warn!(
                    path = %path.display(),
                    recorded = entry.config_hash,
                    current = config_hash,
                    "ignoring stale cache entry"
                );
                Ok(None)
            }
            Ok(entry) => {
                info!(
                    path = %path.display(),
                    fields = entry.fields.len(),
                    selectors = entry.selectors.len(),
                    "cache entry loaded"
                );
                Ok(Some(entry))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Write `entry` as the fingerprint's cache entry.
    ///
    /// Requires the lock ([`CacheError::NotOwned`] otherwise). The entry is
    /// written to a temporary file, synced, and renamed into place inside
    /// [`with_deferred_cancellation`](Self::with_deferred_cancellation), so
    /// readers see either the previous entry or the complete new one.
    pub fn persist(&mut self, entry: &CacheEntry) -> Result<(), CacheError> {
        self.persist_with(entry, write_atomically)
    }

    fn persist_with(
        &mut self,
        entry: &CacheEntry,
        write: impl FnOnce(&Path, &Path, &CacheEntry) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        self.check_cancelled()?;
        if self.state == CacheState::Unlocked || !self.cancel.holds_lock() {
            return Err(CacheError::NotOwned);
        }
        let tmp = self.fingerprint.tmp_path(&self.dir);
        let dest = self.entry_path();
        self.with_deferred_cancellation(|| write(&tmp, &dest, entry))?;
        self.state = CacheState::Persisted;
        info!(
            path = %dest.display(),
            fields = entry.fields.len(),
            transforms = entry.transforms.len(),
            "cache entry persisted"
        );
        Ok(())
    }

    /// Run `f` with cancellation requests deferred until it returns.
    ///
    /// A request that arrived meanwhile is honored afterwards: the lock is
    /// released, then the [`CancelAction`] runs. With
    /// [`CancelAction::ReturnError`] the result of `f` is replaced by
    /// [`CacheError::Cancelled`].
    pub fn with_deferred_cancellation<T>(
        &mut self,
        f: impl FnOnce() -> Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        self.cancel.enter_critical();
        let result = f();
        if self.cancel.leave_critical() {
            self.state = CacheState::Unlocked;
            return Err(self.cancel.honor());
        }
        result
    }

    /// Give up ownership. Idempotent.
    pub fn release(&mut self) {
        if self.cancel.holds_lock() {
            debug!(fingerprint = %self.fingerprint, "cache lock released");
        }
        self.cancel.release_lock();
        self.state = CacheState::Unlocked;
    }

    fn check_cancelled(&mut self) -> Result<(), CacheError> {
        if self.cancel.is_requested() {
            self.cancel.release_lock();
            self.state = CacheState::Unlocked;
            return Err(CacheError::Cancelled);
        }
        Ok(())
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.release();
    }
}

fn write_atomically(tmp: &Path, dest: &Path, entry: &CacheEntry) -> Result<(), CacheError> {
    let result = (|| -> Result<(), CacheError> {
        let mut writer = BufWriter::new(File::create(tmp)?);
        codec::encode_entry(&mut writer, entry)?;
        let file = writer
            .into_inner()
            .map_err(|e| CacheError::Io(e.into_error()))?;
        file.sync_all()?;
        fs::rename(tmp, dest)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}
