use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

struct Liveness {
    alive: RwLock<bool>,
}

/// Owned by the server. Dropping or invalidating it tells every outstanding
/// asynchronous request that the server is gone.
pub struct LivenessToken {
    cell: Arc<Liveness>,
}

impl LivenessToken {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Liveness {
                alive: RwLock::new(true),
            }),
        }
    }

    pub fn witness(&self) -> LivenessWitness {
        LivenessWitness {
            cell: self.cell.clone(),
        }
    }

    /// Mark the server dead. Blocks until every [`AliveGuard`] currently held
    /// has been released; no guard can be obtained afterwards.
    pub fn invalidate(&self) {
        *self.cell.alive.write() = false;
    }
}

impl Default for LivenessToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LivenessToken {
    fn drop(&mut self) {
        self.invalidate();
    }
}

/// Weak observer of a [`LivenessToken`], carried by asynchronous requests.
/// Keeps the shared flag allocated, never the server itself.
#[derive(Clone)]
pub struct LivenessWitness {
    cell: Arc<Liveness>,
}

impl LivenessWitness {
    /// Returns a guard while the server is alive. Teardown waits for the
    /// guard to be dropped, so the server stays valid for its whole scope.
    pub fn enter(&self) -> Option<AliveGuard<'_>> {
        // Recursive so a completion fired from inside another completion
        // cannot deadlock against a waiting teardown.
        let guard = self.cell.alive.read_recursive();
        if *guard {
            Some(AliveGuard { _guard: guard })
        } else {
            None
        }
    }

    pub fn is_alive(&self) -> bool {
        *self.cell.alive.read_recursive()
    }
}

/// Proof that the server was alive when it was obtained, and remains so
/// until this guard is dropped.
pub struct AliveGuard<'a> {
    _guard: RwLockReadGuard<'a, bool>,
}
