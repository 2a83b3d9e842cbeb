//! Per-thread pool of scratch buffers.
//!
//! Maps and unknown-length sequences have to be encoded before their header
//! can be written, and whole values are encoded before reaching a writer.
//! Both borrow a buffer from here instead of allocating a fresh one.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

/// Buffers grown past this are dropped instead of being returned.
const MAX_CAPACITY: usize = 64 * 1024;

/// How many idle buffers a thread keeps around.
const MAX_IDLE: usize = 16;

thread_local! {
    static POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}

/// A buffer borrowed from the pool. It is empty when taken and is cleared
/// again before going back to the pool, so contents never leak between
/// users. Output handed to callers must be copied out first.
#[derive(Debug)]
pub(super) struct PooledBuf {
    buf: Vec<u8>,
}

/// Takes an empty buffer from the current thread's pool.
pub(super) fn take() -> PooledBuf {
    let mut buf = POOL
        .try_with(|pool| pool.borrow_mut().pop())
        .ok()
        .flatten()
        .unwrap_or_default();

    buf.clear();
    PooledBuf { buf }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        if self.buf.capacity() > MAX_CAPACITY {
            return;
        }

        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();

        // the pool is gone during thread teardown, so just drop the buffer then
        _ = POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < MAX_IDLE {
                pool.push(buf);
            }
        });
    }
}

impl Deref for PooledBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> usize {
        POOL.with(|pool| pool.borrow().len())
    }

    #[test]
    fn reuses_cleared_buffers() {
        let mut buf = take();
        buf.extend_from_slice(b"s:5:\"hallo\";");
        let ptr = buf.as_ptr();
        drop(buf);

        let buf = take();
        assert!(buf.is_empty(), "pooled buffers must come back empty");
        assert_eq!(buf.as_ptr(), ptr, "buffer should be reused");
    }

    #[test]
    fn nested_takes_get_distinct_buffers() {
        let mut outer = take();
        let mut inner = take();
        outer.push(b'a');
        inner.push(b'b');
        assert_eq!(&outer[..], b"a");
        assert_eq!(&inner[..], b"b");
    }

    #[test]
    fn drops_oversized_buffers() {
        let before = idle();
        let mut buf = take();
        buf.reserve(MAX_CAPACITY * 2);
        drop(buf);
        assert!(idle() <= before, "oversized buffer must not be pooled");
    }

    #[test]
    fn keeps_limited_number() {
        let bufs: Vec<_> = (0..MAX_IDLE * 2).map(|_| take()).collect();
        drop(bufs);
        assert_eq!(idle(), MAX_IDLE, "pool is capped");
    }
}
