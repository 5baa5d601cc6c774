//! Pooled reuse of primitive readers, writers and raw byte buffers.
//!
//! Every acquisition hands out a scoped guard. Dropping the guard scrubs the
//! object (cursor, sticky error and contents) and returns it to its
//! free-list, so release happens on every exit path of a transaction,
//! including early returns and panics inside callbacks.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};

use object_pool::{Pool, ReusableOwned};

use crate::reader::Reader;
use crate::writer::Writer;

/// Default number of pre-allocated objects per kind.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

/// Default initial capacity of pooled byte buffers (4 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Buffers that grew past this size are not kept on release.
const MAX_RETAINED_BUFFER: usize = 1024 * 1024;

static GLOBAL: OnceLock<WirePool> = OnceLock::new();

/// Typed free-lists for [`Reader`], [`Writer`] and raw byte buffers.
///
/// Cloning is cheap and yields a handle to the same free-lists.
#[derive(Clone)]
pub struct WirePool {
    readers: Arc<Pool<Reader>>,
    writers: Arc<Pool<Writer>>,
    buffers: Arc<Pool<Vec<u8>>>,
    buffer_size: usize,
}

impl WirePool {
    /// Create a pool with default capacity and buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY, DEFAULT_BUFFER_SIZE)
    }

    /// Create a pool with `capacity` pre-allocated objects per kind and
    /// buffers of `buffer_size` initial capacity.
    pub fn with_capacity(capacity: usize, buffer_size: usize) -> Self {
        Self {
            readers: Arc::new(Pool::new(capacity, Reader::default)),
            writers: Arc::new(Pool::new(capacity, move || {
                Writer::from_buffer(Vec::with_capacity(buffer_size))
            })),
            buffers: Arc::new(Pool::new(capacity, move || {
                Vec::with_capacity(buffer_size)
            })),
            buffer_size,
        }
    }

    /// Process-wide pool shared by codecs that do not bring their own.
    pub fn global() -> Self {
        GLOBAL.get_or_init(WirePool::new).clone()
    }

    /// Acquire a reader positioned at the start of `data`.
    pub fn acquire_reader(&self, data: Vec<u8>) -> PooledReader {
        let mut inner = self.readers.pull_owned(Reader::default);
        inner.reset(data);
        PooledReader { inner }
    }

    /// Acquire an empty writer bounded by `limit` bytes.
    pub fn acquire_writer(&self, limit: usize) -> PooledWriter {
        let mut inner = self.writers.pull_owned(Writer::default);
        inner.reset(limit);
        PooledWriter {
            inner,
            buffer_size: self.buffer_size,
        }
    }

    /// Acquire an empty byte buffer.
    pub fn acquire_buffer(&self) -> PooledBuf {
        let buffer_size = self.buffer_size;
        let mut inner = self
            .buffers
            .pull_owned(move || Vec::with_capacity(buffer_size));
        inner.clear();
        PooledBuf { inner, buffer_size }
    }

    /// Initial capacity of pooled buffers.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of readers waiting in the free-list.
    pub fn idle_readers(&self) -> usize {
        self.readers.len()
    }

    /// Number of writers waiting in the free-list.
    pub fn idle_writers(&self) -> usize {
        self.writers.len()
    }

    /// Number of buffers waiting in the free-list.
    pub fn idle_buffers(&self) -> usize {
        self.buffers.len()
    }
}

impl Default for WirePool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WirePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WirePool")
            .field("idle_readers", &self.readers.len())
            .field("idle_writers", &self.writers.len())
            .field("idle_buffers", &self.buffers.len())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

/// A pooled [`Reader`], returned to its pool on drop.
pub struct PooledReader {
    inner: ReusableOwned<Reader>,
}

impl PooledReader {
    /// Release the reader and recover its payload allocation.
    pub fn into_data(mut self) -> Vec<u8> {
        self.inner.take_data()
    }
}

impl Deref for PooledReader {
    type Target = Reader;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PooledReader {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Drop for PooledReader {
    fn drop(&mut self) {
        drop(self.inner.take_data());
    }
}

/// A pooled [`Writer`], returned to its pool on drop.
pub struct PooledWriter {
    inner: ReusableOwned<Writer>,
    buffer_size: usize,
}

impl Deref for PooledWriter {
    type Target = Writer;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PooledWriter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Drop for PooledWriter {
    fn drop(&mut self) {
        let mut buf = self.inner.take_buffer();
        scrub(&mut buf, self.buffer_size);
        self.inner.restore_buffer(buf);
        self.inner.reset(usize::MAX);
    }
}

/// A pooled byte buffer, cleared and returned to its pool on drop.
pub struct PooledBuf {
    inner: ReusableOwned<Vec<u8>>,
    buffer_size: usize,
}

impl Deref for PooledBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl AsRef<[u8]> for PooledBuf {
    fn as_ref(&self) -> &[u8] {
        self.inner.as_slice()
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        scrub(&mut self.inner, self.buffer_size);
    }
}

impl std::fmt::Debug for PooledBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuf")
            .field("len", &self.inner.len())
            .field("capacity", &self.inner.capacity())
            .finish()
    }
}

fn scrub(buf: &mut Vec<u8>, buffer_size: usize) {
    if buf.capacity() > MAX_RETAINED_BUFFER {
        *buf = Vec::with_capacity(buffer_size);
    } else {
        buf.clear();
    }
}
