//! Bounded binary min-heap with a caller-supplied ordering.
//!
//! Used to rank results: insert candidates, then pull them out smallest
//! first. The heap never grows past the capacity it was created with;
//! inserts into a full heap are dropped.

use std::cmp::Ordering;
use std::fmt;

/// Fixed-capacity min-heap ordered by `cmp`.
pub struct Heap<T, F>
where
    F: FnMut(&T, &T) -> Ordering,
{
    entries: Vec<T>,
    capacity: usize,
    cmp: F,
}

impl<T, F> Heap<T, F>
where
    F: FnMut(&T, &T) -> Ordering,
{
    /// Create an empty heap holding at most `capacity` values.
    pub fn with_capacity(capacity: usize, cmp: F) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            cmp,
        }
    }

    /// Insert `value`, returning `false` (and dropping it) if the heap is
    /// already full.
    pub fn insert(&mut self, value: T) -> bool {
        if self.entries.len() == self.capacity {
            return false;
        }
        self.entries.push(value);
        self.sift_up(self.entries.len() - 1);
        true
    }

    /// Remove and return the smallest value, or `None` when empty.
    pub fn extract_min(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let min = self.entries.swap_remove(0);
        self.sift_down(0);
        Some(min)
    }

    /// The smallest value, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.entries.first()
    }

    /// Number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the heap holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of values the heap will hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn less(&mut self, a: usize, b: usize) -> bool {
        (self.cmp)(&self.entries[a], &self.entries[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.less(idx, parent) {
                break;
            }
            self.entries.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.entries.swap(idx, smallest);
            idx = smallest;
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for Heap<T, F>
where
    F: FnMut(&T, &T) -> Ordering,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("entries", &self.entries)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
