//! Pre-allocated buffer pool with scoped release.
//!
//! `take()` never blocks: an exhausted pool falls back to a fresh
//! allocation (logged at DEBUG) so an undersized pool degrades to plain
//! heap churn instead of stalling a sample-rate-paced loop.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use crate::{PoolInner, Reusable, SharedPool};

/// A pool of pre-allocated, fixed-length buffers.
///
/// Cloning the pool is cheap and shares the same free list, so one pool
/// can serve a producer thread while a consumer thread drops guards back
/// into it.
pub struct BufferPool<B: Reusable> {
    inner: SharedPool<B>,
}

impl<B: Reusable> Clone for BufferPool<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Reusable> BufferPool<B> {
    /// Create a pool of `count` buffers, each holding `buffer_len` samples.
    pub fn new(count: usize, buffer_len: usize) -> Self {
        let free: Vec<B> = (0..count).map(|_| B::with_len(buffer_len)).collect();
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(free),
                buffer_len,
            }),
        }
    }

    /// Take a buffer from the pool, allocating a fresh one if the free
    /// list is empty. The returned guard puts the buffer back on drop.
    pub fn take(&self) -> PooledBuffer<B> {
        let buffer = {
            let mut free = self.inner.free.lock().expect("pool lock poisoned");
            free.pop()
        };
        let buffer = buffer.unwrap_or_else(|| {
            log::debug!(
                "buffer pool exhausted, allocating fresh buffer of {} samples",
                self.inner.buffer_len
            );
            B::with_len(self.inner.buffer_len)
        });
        PooledBuffer {
            buffer: Some(buffer),
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of buffers currently on the free list.
    pub fn available(&self) -> usize {
        self.inner.free.lock().expect("pool lock poisoned").len()
    }

    /// Sample length of the buffers this pool hands out.
    pub fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }
}

/// Guard over a pool buffer. Dereferences to the buffer; returns it to
/// the pool (zeroed) when dropped, on every exit path.
pub struct PooledBuffer<B: Reusable> {
    buffer: Option<B>,
    pool: SharedPool<B>,
}

impl<B: Reusable> Deref for PooledBuffer<B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.buffer.as_ref().expect("buffer present until drop")
    }
}

impl<B: Reusable> DerefMut for PooledBuffer<B> {
    fn deref_mut(&mut self) -> &mut B {
        self.buffer.as_mut().expect("buffer present until drop")
    }
}

impl<B: Reusable> Drop for PooledBuffer<B> {
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.recycle();
            if let Ok(mut free) = self.pool.free.lock() {
                free.push(buffer);
            }
        }
    }
}
