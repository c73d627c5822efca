//! Shared lock guarding engine start-up and shutdown

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Handle to the lock that serializes engine `init` and `close`.
///
/// Engines are not safe to start concurrently, so every environment that may
/// run next to another must be given a clone of the same handle.
#[derive(Debug, Clone, Default)]
pub struct EngineLock {
    inner: Arc<Mutex<()>>,
}

impl EngineLock {
    /// Create a new, independent lock
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    /// Whether both handles guard the same lock
    #[must_use]
    pub fn is_shared_with(&self, other: &EngineLock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
