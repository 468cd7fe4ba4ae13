//! A growable LIFO stack made of fixed-size segments.
//!
//! Growing never moves existing entries: when the current segment is full, it is parked in a
//! list of full segments and a new one is started (taken from a small cache of empty segments
//! if possible). While the stack shrinks, emptied segments go back to that cache, up to
//! `max_cache_size` of them.

use std::mem;

/// Default number of entries in a segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 1024;
/// Default number of empty segments kept for reuse. No caching by default, so a drained stack
/// does not hold on to memory.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 0;

pub struct SegmentedStack<T> {
    segment_size: usize,
    max_cache_size: usize,
    /// The segment being pushed to and popped from. It has no capacity until the first push.
    current: Vec<T>,
    /// Full segments below `current`, oldest first.
    full: Vec<Vec<T>>,
    /// Number of entries in `full`.
    full_len: usize,
    /// Empty segments kept for reuse.
    cache: Vec<Vec<T>>,
}

impl<T> SegmentedStack<T> {
    pub fn new(segment_size: usize, max_cache_size: usize) -> Self {
        assert!(segment_size > 0, "segment size must be positive");
        SegmentedStack {
            segment_size,
            max_cache_size,
            current: Vec::new(),
            full: Vec::new(),
            full_len: 0,
            cache: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.full_len + self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.full.is_empty()
    }

    /// Number of empty segments held for reuse.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn push(&mut self, item: T) {
        if self.current.len() == self.current.capacity() {
            self.push_segment();
        }
        self.current.push(item);
    }

    #[cold]
    fn push_segment(&mut self) {
        let next = self
            .cache
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.segment_size));
        let prev = mem::replace(&mut self.current, next);
        if !prev.is_empty() {
            self.full_len += prev.len();
            self.full.push(prev);
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.current.is_empty() {
            self.pop_segment()?;
        }
        self.current.pop()
    }

    #[cold]
    fn pop_segment(&mut self) -> Option<()> {
        let prev = self.full.pop()?;
        self.full_len -= prev.len();
        let emptied = mem::replace(&mut self.current, prev);
        self.cache_segment(emptied);
        Some(())
    }

    /// Visit every entry in insertion order without removing it. Each call starts over from the
    /// oldest entry.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.full
            .iter_mut()
            .flat_map(|segment| segment.iter_mut())
            .chain(self.current.iter_mut())
    }

    /// Drop every entry and free every segment, including the cached ones.
    pub fn clear(&mut self) {
        self.full_len = 0;
        self.current = Vec::new();
        self.full = Vec::new();
        self.cache = Vec::new();
    }

    fn cache_segment(&mut self, segment: Vec<T>) {
        debug_assert!(segment.is_empty());
        if segment.capacity() > 0 && self.cache.len() < self.max_cache_size {
            self.cache.push(segment);
        }
    }
}
