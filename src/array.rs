//! Growable vector with explicit capacity hysteresis.
//!
//! Capacity doubles when a push would overflow it and halves when occupancy drops below a
//! quarter, but never below the capacity the array was created with. The gap between the grow
//! and shrink thresholds keeps a length hovering around one boundary from resizing back and
//! forth.

use std::slice;

#[derive(Debug, Clone)]
pub struct DynArray<T> {
    items: Vec<T>,
    cap: usize,
    min_cap: usize,
    resizes: usize,
}

impl<T> DynArray<T> {
    /// Create an empty array whose capacity never shrinks below `min_cap`.
    pub fn with_capacity(min_cap: usize) -> Self {
        let min_cap = min_cap.max(1);
        DynArray {
            items: Vec::with_capacity(min_cap),
            cap: min_cap,
            min_cap,
            resizes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Logical capacity, as driven by the growth policy.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// How many times the backing storage was grown or shrunk.
    pub fn resizes(&self) -> usize {
        self.resizes
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() + 1 > self.cap {
            self.cap <<= 1;
            self.items.reserve_exact(self.cap - self.items.len());
            self.resizes += 1;
        }
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        let item = self.items.pop()?;
        self.shrink_if_sparse();
        Some(item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Remove the item at `index`, shifting everything after it down. Panics if out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        let item = self.items.remove(index);
        self.shrink_if_sparse();
        item
    }

    /// Remove the item at `index`, moving the last item into its place. Panics if out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> T {
        let item = self.items.swap_remove(index);
        self.shrink_if_sparse();
        item
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    fn shrink_if_sparse(&mut self) {
        if self.cap > self.min_cap && self.items.len() < self.cap >> 2 {
            self.cap >>= 1;
            self.items.shrink_to(self.cap);
            self.resizes += 1;
        }
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
