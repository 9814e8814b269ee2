//! single-writer handle for multi-threaded hosts
//!
//! the ledger assumes operations run one at a time. `SharedPool` puts the
//! whole pool behind one lock so concurrent callers only ever observe fully
//! applied operations.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::pool::{Pool, PoolStats};
use crate::vault::AssetBackend;

pub struct SharedPool<B> {
    inner: Arc<Mutex<Pool<B>>>,
}

impl<B> Clone for SharedPool<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AssetBackend> SharedPool<B> {
    pub fn new(pool: Pool<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// run one operation under the writer lock
    pub fn with<R>(&self, f: impl FnOnce(&mut Pool<B>) -> R) -> R {
        let mut pool = self.inner.lock();
        f(&mut pool)
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.lock().get_stats()
    }

    /// the pool back, if this is the last handle
    pub fn try_into_inner(self) -> Result<Pool<B>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
