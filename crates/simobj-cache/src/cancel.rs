//! Cooperative cancellation with a deferral window.
//!
//! A [`CancelHandle`] is shared between a [`CacheManager`] and whatever
//! observes termination requests (a signal-watching thread, a supervisor).
//! [`request`](CancelHandle::request) is honored at once, unless the
//! manager is inside
//! [`with_deferred_cancellation`](crate::CacheManager::with_deferred_cancellation),
//! in which case it is recorded and honored when the section ends. Honoring
//! always removes the lock marker first, then performs the configured
//! [`CancelAction`].
//!
//! [`CacheManager`]: crate::CacheManager

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::CacheError;
use crate::lock::remove_marker;

/// What happens once a cancellation request is honored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelAction {
    /// Terminate the process with this exit code.
    Exit {
        /// Process exit code.
        code: i32,
    },
    /// Fail the current and every later cache operation with
    /// [`CacheError::Cancelled`].
    ReturnError,
}

impl Default for CancelAction {
    fn default() -> Self {
        // 128 + SIGINT
        Self::Exit { code: 130 }
    }
}

/// Result of [`CancelHandle::request`] when the process keeps running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A persist is in progress; the request will be honored after it.
    Deferred,
    /// The lock was released and later operations fail.
    Honored,
}

#[derive(Debug, Default)]
struct Shared {
    in_critical: bool,
    requested: bool,
    lock: Option<PathBuf>,
}

/// Thread-safe handle for requesting cancellation.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    shared: Arc<Mutex<Shared>>,
    action: CancelAction,
}

impl CancelHandle {
    pub(crate) fn new(action: CancelAction) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            action,
        }
    }

    fn state(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request cancellation.
    ///
    /// With [`CancelAction::Exit`] and no persist in progress this does not
    /// return.
    pub fn request(&self) -> CancelOutcome {
        {
            let mut state = self.state();
            state.requested = true;
            if state.in_critical {
                warn!("cancellation requested during persist; deferring");
                return CancelOutcome::Deferred;
            }
        }
        let _ = self.honor();
        CancelOutcome::Honored
    }

    /// Whether cancellation has been requested.
    pub fn is_requested(&self) -> bool {
        self.state().requested
    }

    /// The configured action.
    pub fn action(&self) -> CancelAction {
        self.action
    }

    pub(crate) fn set_lock(&self, path: PathBuf) {
        self.state().lock = Some(path);
    }

    pub(crate) fn holds_lock(&self) -> bool {
        self.state().lock.is_some()
    }

    /// Remove the lock marker, if held. Idempotent.
    pub(crate) fn release_lock(&self) {
        let path = self.state().lock.take();
        if let Some(path) = path {
            if let Err(e) = remove_marker(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove lock marker");
            }
        }
    }

    pub(crate) fn enter_critical(&self) {
        self.state().in_critical = true;
    }

    /// Leave the deferral window; returns whether a request is pending.
    pub(crate) fn leave_critical(&self) -> bool {
        let mut state = self.state();
        state.in_critical = false;
        state.requested
    }

    /// Release the lock, then act. Returns the error to surface when the
    /// action is [`CancelAction::ReturnError`].
    pub(crate) fn honor(&self) -> CacheError {
        self.release_lock();
        if let CancelAction::Exit { code } = self.action {
            warn!(code, "cancellation honored; exiting");
            std::process::exit(code);
        }
        CacheError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_action_exits_with_sigint_code() {
        assert_eq!(CancelAction::default(), CancelAction::Exit { code: 130 });
    }

    #[test]
    fn request_inside_window_is_deferred() {
        let handle = CancelHandle::new(CancelAction::ReturnError);
        handle.enter_critical();
        assert_eq!(handle.request(), CancelOutcome::Deferred);
        assert!(handle.is_requested());
        assert!(handle.leave_critical());
    }

    #[test]
    fn request_outside_window_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.lock");
        crate::lock::create_marker(&path).unwrap();
        let handle = CancelHandle::new(CancelAction::ReturnError);
        handle.set_lock(path.clone());
        let remote = handle.clone();
        let outcome = std::thread::spawn(move || remote.request()).join().unwrap();
        assert_eq!(outcome, CancelOutcome::Honored);
        assert!(!path.exists());
        assert!(!handle.holds_lock());
    }
}
