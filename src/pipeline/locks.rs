use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// One async mutex per listing id, so the same id is never processed twice at once.
///
/// Entries live only while some task holds or waits on them.
#[derive(Default)]
pub struct IdLocks {
    locks: LockMap,
}

/// Held while a listing id is being processed
pub struct IdGuard<'a> {
    locks: &'a LockMap,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    pub async fn lock(&self, id: &str) -> IdGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(id.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;

        IdGuard {
            locks: &self.locks,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Waiters clone the Arc under this map lock, so the count is stable here
        self.guard.take();
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}
