//! Lock-free pool of serialization contexts.
//!
//! A [`SerializationContext`] is one fixed-capacity buffer plus the
//! [`JsonWriter`] bound to it. Rendering an event borrows a context through
//! [`ContextPool::acquire`], which returns a [`PooledContext`] guard; dropping
//! the guard resets the context and hands it back, on every exit path
//! including errors and panics.
//!
//! The pool bounds reuse, not concurrency: when it is empty a fresh context is
//! created, and when it is full a returned context is dropped.
//!
//! ```rust
//! use jsonlayout::pool::ContextPool;
//! use jsonlayout::WriterOptions;
//!
//! let pool = ContextPool::new(2, 256, WriterOptions::default());
//! {
//!     let mut context = pool.acquire();
//!     context.writer_mut().write_string("hi").unwrap();
//!     assert_eq!(context.as_bytes(), b"\"hi\"");
//! }
//! assert_eq!(pool.available(), 1);
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;
use jsonlayout_writer::{JsonWriter, WriterOptions};

/// A reusable buffer and writer pair.
pub struct SerializationContext {
    writer: JsonWriter,
}

impl SerializationContext {
    pub fn new(capacity: usize, options: WriterOptions) -> Self {
        Self {
            writer: JsonWriter::new(capacity, options),
        }
    }

    pub fn writer(&self) -> &JsonWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut JsonWriter {
        &mut self.writer
    }

    /// The bytes written since the last reset.
    pub fn as_bytes(&self) -> &[u8] {
        self.writer.as_bytes()
    }

    /// True when the writer is at root and the buffer is empty.
    pub fn is_clean(&self) -> bool {
        self.writer.is_at_root() && self.writer.buffer().is_empty()
    }

    pub fn reset(&mut self) {
        self.writer.reset();
    }
}

/// Counters for pool monitoring.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Acquisitions served by a pooled context.
    pub hits: AtomicU64,

    /// Acquisitions that had to create a context.
    pub misses: AtomicU64,

    /// Contexts returned to the pool.
    pub returns: AtomicU64,

    /// Contexts dropped because the pool was full.
    pub drops: AtomicU64,
}

impl PoolMetrics {
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_return(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PoolMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub drops: u64,
}

impl MetricsSnapshot {
    /// Share of acquisitions served from the pool, 1.0 before any.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded, lock-free pool of [`SerializationContext`]s.
///
/// Contexts are created lazily on the first acquisitions and reused after.
pub struct ContextPool {
    queue: ArrayQueue<SerializationContext>,
    byte_capacity: usize,
    options: WriterOptions,
    metrics: PoolMetrics,
}

impl ContextPool {
    /// Creates an empty pool keeping at most `pool_size` idle contexts of
    /// `byte_capacity` bytes each.
    pub fn new(pool_size: usize, byte_capacity: usize, options: WriterOptions) -> Self {
        Self {
            queue: ArrayQueue::new(pool_size.max(1)),
            byte_capacity,
            options,
            metrics: PoolMetrics::new(),
        }
    }

    /// Takes a context out of the pool, or creates one if none is idle.
    ///
    /// The context is reset before it is handed out.
    pub fn acquire(&self) -> PooledContext<'_> {
        let context = match self.queue.pop() {
            Some(mut context) => {
                self.metrics.record_hit();
                context.reset();
                context
            }
            None => {
                self.metrics.record_miss();
                log::trace!(
                    "context pool empty, creating a {} byte context",
                    self.byte_capacity
                );
                SerializationContext::new(self.byte_capacity, self.options.clone())
            }
        };
        PooledContext {
            pool: self,
            context: Some(context),
        }
    }

    fn release(&self, mut context: SerializationContext) {
        context.reset();
        match self.queue.push(context) {
            Ok(()) => self.metrics.record_return(),
            Err(_) => {
                self.metrics.record_drop();
                log::trace!("context pool full, dropping a returned context");
            }
        }
    }

    /// Number of idle contexts.
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Maximum number of idle contexts kept.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn byte_capacity(&self) -> usize {
        self.byte_capacity
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

/// Exclusive use of one pooled context; returns it to the pool on drop.
pub struct PooledContext<'a> {
    pool: &'a ContextPool,
    context: Option<SerializationContext>,
}

impl Deref for PooledContext<'_> {
    type Target = SerializationContext;

    fn deref(&self) -> &SerializationContext {
        // only `drop` takes the context out
        match &self.context {
            Some(context) => context,
            None => unreachable!("pooled context used after release"),
        }
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut SerializationContext {
        match &mut self.context {
            Some(context) => context,
            None => unreachable!("pooled context used after release"),
        }
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool.release(context);
        }
    }
}
