//! Tracking of open sessions for bulk teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::session::{SharedState, lock};

/// Identity of a session within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// Live sessions, keyed by identity.
///
/// Sessions insert themselves when opened and remove themselves when
/// closed. [`close_all`](Self::close_all) is the shutdown sweep.
#[derive(Default)]
pub(crate) struct SessionRegistry {
    next_id: AtomicU64,
    open: Mutex<HashMap<SessionId, SharedState>>,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, state: SharedState) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions().insert(id, state);
        id
    }

    pub(crate) fn deregister(&self, id: SessionId) {
        self.sessions().remove(&id);
    }

    /// Number of sessions still open.
    pub(crate) fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Close every registered session, leaving the registry empty.
    ///
    /// Returns how many sessions were closed.
    pub(crate) fn close_all(&self) -> usize {
        // Drain first so no session lock is taken while the map is held
        let drained: Vec<_> = self.sessions().drain().collect();

        let mut closed = 0;
        for (id, state) in drained {
            if lock(&state).release() {
                debug!(?id, "closed archive during cleanup");
                closed += 1;
            }
        }
        closed
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SharedState>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
