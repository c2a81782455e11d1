//! Per-session turn locks.
//!
//! A turn holds its session's lock from load to save, so turns against the
//! same session apply one at a time and in arrival order. Different
//! sessions never contend. An entry lives only while some turn holds or
//! waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive access to one session. Dropping it releases the lock and
/// forgets the session if nobody else is waiting.
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    session_id: String,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Release first so the entry's count only reflects waiters.
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let idle = locks
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.session_id);
        }
    }
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        // Cloned under the map lock, so a concurrent drop sees this waiter.
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        SessionGuard {
            guard: Some(lock.lock_owned().await),
            session_id: session_id.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Sessions currently locked or waited on.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}
