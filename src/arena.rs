//! Page-based bump allocation for a single document.
//!
//! String bytes are bumped into fixed-size pages; values live in a slab addressed by
//! [`ValueId`]. Nothing is ever freed individually. Dropping the [`Arena`] releases every page
//! and every value together.

use index_vec::IndexVec;
use tracing::*;

use crate::value::{Value, ValueId};

/// Size of each arena page. Bigger pages mean fewer page switches while parsing.
pub const DEFAULT_PAGE_SIZE: usize = 65536;

const INIT_PAGE_CAP: usize = 8;

/// Handle to a string stored in an [`Arena`]'s pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrRef {
    page: u32,
    start: u32,
    len: u32,
}

impl StrRef {
    const EMPTY: StrRef = StrRef {
        page: 0,
        start: 0,
        len: 0,
    };

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The byte pages of an arena.
///
/// Each page is a `String` whose capacity is reserved up front and never exceeded, so text
/// already handed out never moves.
#[derive(Debug)]
pub struct Pages {
    pages: Vec<String>,
    current: usize,
    page_size: usize,
    dedicated: usize,
}

impl Pages {
    fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let mut pages = Vec::with_capacity(INIT_PAGE_CAP);
        pages.push(String::with_capacity(page_size));
        Pages {
            pages,
            current: 0,
            page_size,
            dedicated: 0,
        }
    }

    /// Bytes used in the current page.
    pub fn used(&self) -> usize {
        self.pages[self.current].len()
    }

    /// Reserve `len` bytes and let `fill` append exactly that many bytes of text.
    fn alloc_with(&mut self, len: usize, fill: impl FnOnce(&mut String)) -> StrRef {
        if len == 0 {
            return StrRef::EMPTY;
        }

        let page = if len >= self.page_size {
            // too big for the common pool, give it a page of its own and keep bumping the
            // current page afterwards
            debug!(size = len, "allocating dedicated arena page");
            self.pages.push(String::with_capacity(len));
            self.dedicated += 1;
            self.pages.len() - 1
        } else {
            if self.used() + len > self.page_size {
                trace!(page = self.pages.len(), "allocating new arena page");
                self.pages.push(String::with_capacity(self.page_size));
                self.current = self.pages.len() - 1;
            }
            self.current
        };

        let buf = &mut self.pages[page];
        let start = buf.len();
        fill(buf);
        debug_assert_eq!(buf.len() - start, len, "fill wrote a different length");

        StrRef {
            page: narrow(page),
            start: narrow(start),
            len: narrow(buf.len() - start),
        }
    }

    /// Resolve a handle produced by this arena.
    pub fn get(&self, s: StrRef) -> &str {
        if s.is_empty() {
            return "";
        }
        let start = s.start as usize;
        &self.pages[s.page as usize][start..start + s.len as usize]
    }
}

/// Allocation statistics for an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Total pages, dedicated ones included.
    pub pages: usize,
    /// Pages created for a single oversized string.
    pub dedicated_pages: usize,
    /// Bytes used in the current page.
    pub used: usize,
    pub page_size: usize,
    /// Values allocated over the lifetime of the arena, detached ones included.
    pub values: usize,
}

/// Bump allocator backing every value and string of one document.
#[derive(Debug)]
pub struct Arena {
    pages: Pages,
    values: IndexVec<ValueId, Value>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Arena {
            pages: Pages::new(page_size),
            values: IndexVec::new(),
        }
    }

    pub fn alloc_str(&mut self, s: &str) -> StrRef {
        self.pages.alloc_with(s.len(), |buf| buf.push_str(s))
    }

    /// Reserve exactly `len` bytes and let `fill` write them. `fill` must append exactly `len`
    /// bytes of text to the buffer it is given.
    pub fn alloc_with(&mut self, len: usize, fill: impl FnOnce(&mut String)) -> StrRef {
        self.pages.alloc_with(len, fill)
    }

    pub fn str(&self, s: StrRef) -> &str {
        self.pages.get(s)
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    pub fn alloc(&mut self, value: Value) -> ValueId {
        self.values.push(value)
    }

    pub fn get(&self, id: ValueId) -> &Value {
        &self.values[id]
    }

    pub fn get_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id]
    }

    /// Mutable access to a value together with the pages its keys and strings live in.
    pub(crate) fn get_mut_with_pages(&mut self, id: ValueId) -> (&mut Value, &Pages) {
        (&mut self.values[id], &self.pages)
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            pages: self.pages.pages.len(),
            dedicated_pages: self.pages.dedicated,
            used: self.pages.used(),
            page_size: self.pages.page_size,
            values: self.values.len(),
        }
    }
}

/// Offsets in a [`StrRef`] are 32-bit.
///
/// # Panics
///
/// Panics if a page index, an offset into a page, or a string length exceeds `u32::MAX`.
fn narrow(n: usize) -> u32 {
    u32::try_from(n).expect("arena offsets must fit in 32 bits")
}
