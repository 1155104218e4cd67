// src/bufpool.rs

//! Reusable scratch buffers.
//!
//! The pool is optional everywhere it is accepted: [`lend_from`] with `None`
//! hands out a plain, unpooled buffer so callers never branch on it.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Buffers retained while idle, at most.
const MAX_IDLE: usize = 64;

#[derive(Debug)]
struct PoolInner {
    initial_capacity: usize,
    max_retained_capacity: usize,
    idle: Mutex<Vec<Vec<u8>>>,
}

/// Pool of byte buffers shared by cloning the handle.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;
    pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

    /// `initial_capacity` sizes fresh buffers; buffers that grew beyond
    /// `max_retained_capacity` are dropped instead of returned.
    pub fn new(initial_capacity: usize, max_retained_capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                initial_capacity,
                max_retained_capacity,
                idle: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Borrow a buffer. It is empty, and goes back to the pool cleared when
    /// the guard drops.
    pub fn lend(&self) -> PooledBuffer {
        let reused = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let buf = reused.unwrap_or_else(|| Vec::with_capacity(self.inner.initial_capacity));
        PooledBuffer {
            buf,
            pool: Some(self.clone()),
        }
    }

    /// Number of buffers currently waiting to be reused.
    pub fn idle_count(&self) -> usize {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn give_back(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.inner.max_retained_capacity {
            return;
        }
        buf.clear();
        let mut idle = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE {
            idle.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INITIAL_CAPACITY,
            Self::DEFAULT_MAX_RETAINED_CAPACITY,
        )
    }
}

/// Borrow from `pool` if there is one, otherwise allocate.
pub fn lend_from(pool: Option<&BufferPool>) -> PooledBuffer {
    match pool {
        Some(pool) => pool.lend(),
        None => PooledBuffer::unpooled(),
    }
}

/// A lent buffer. Owned exclusively by one caller until dropped.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Option<BufferPool>,
}

impl PooledBuffer {
    pub fn unpooled() -> Self {
        Self {
            buf: Vec::new(),
            pool: None,
        }
    }

    /// Decode the contents as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.give_back(std::mem::take(&mut self.buf));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_buffers_are_cleared_and_reused() {
        let pool = BufferPool::new(16, 1024);
        {
            let mut buf = pool.lend();
            buf.extend_from_slice(b"leftover");
        }
        assert_eq!(pool.idle_count(), 1);

        let buf = pool.lend();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 16);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn oversized_buffers_are_not_retained() {
        let pool = BufferPool::new(4, 8);
        {
            let mut buf = pool.lend();
            buf.extend_from_slice(&[0u8; 64]);
        }
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn concurrent_loans_get_distinct_buffers() {
        let pool = BufferPool::default();
        let mut a = pool.lend();
        let mut b = pool.lend();
        a.push(1);
        b.push(2);
        assert_eq!(a.as_slice(), &[1]);
        assert_eq!(b.as_slice(), &[2]);
    }

    #[test]
    fn missing_pool_falls_back_to_plain_allocation() {
        let mut buf = lend_from(None);
        buf.extend_from_slice("héllo".as_bytes());
        assert_eq!(buf.to_string_lossy(), "héllo");
    }
}
