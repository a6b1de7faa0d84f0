//! Open-addressing hash map backing JSON objects.
//!
//! Keys are hashed with FNV-1a and placed by linear probing into a flat slot table. The table
//! only stores positions; the keys and values themselves live in an ordered entry array, which
//! is what iteration walks. Rehashing scrambles slot order freely because of that.
//!
//! Keys are [`StrRef`]s into the owning document's [`Pages`], so every operation that has to
//! compare keys takes the pages as an argument.

use tracing::*;

use crate::arena::{Pages, StrRef};
use crate::array::DynArray;
use crate::value::ValueId;

#[cfg(target_pointer_width = "64")]
pub type Hash = u64;
#[cfg(target_pointer_width = "64")]
const FNV_PRIME: Hash = 0x0000_0100_0000_01b3;
#[cfg(target_pointer_width = "64")]
const FNV_BASIS: Hash = 0xcbf2_9ce4_8422_2325;

#[cfg(not(target_pointer_width = "64"))]
pub type Hash = u32;
#[cfg(not(target_pointer_width = "64"))]
const FNV_PRIME: Hash = 0x0100_0193;
#[cfg(not(target_pointer_width = "64"))]
const FNV_BASIS: Hash = 0x811c_9dc5;

/// FNV-1a (<http://isthe.com/chongo/tech/comp/fnv/>).
pub fn fnv1a(bytes: &[u8]) -> Hash {
    bytes.iter().fold(FNV_BASIS, |hash, b| (hash ^ Hash::from(*b)).wrapping_mul(FNV_PRIME))
}

/// One occupied position in the slot table.
#[derive(Debug, Clone, Copy)]
struct Slot {
    hash: Hash,
    /// Index into the ordered entry array.
    entry: usize,
    /// Where probing for this hash starts at the current capacity.
    home: usize,
    /// Distance from `home`, for diagnostics.
    steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub key: StrRef,
    pub value: ValueId,
}

#[derive(Debug, Clone)]
pub struct ObjectMap {
    entries: DynArray<Entry>,
    slots: Vec<Option<Slot>>,
    min_cap: usize,
    resizes: usize,
}

impl ObjectMap {
    /// Create an empty map whose table never shrinks below `min_cap` slots.
    pub fn with_capacity(min_cap: usize) -> Self {
        let min_cap = min_cap.max(1);
        ObjectMap {
            entries: DynArray::with_capacity(min_cap),
            slots: vec![None; min_cap],
            min_cap,
            resizes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots in the table.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// How many times the table was rehashed.
    pub fn resizes(&self) -> usize {
        self.resizes
    }

    /// Longest probe sequence currently in the table.
    pub fn max_probe_distance(&self) -> usize {
        self.slots.iter().flatten().map(|s| s.steps).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StrRef, ValueId)> + '_ {
        self.entries.iter().map(|e| (e.key, e.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = StrRef> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    pub fn values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.entries.iter().map(|e| e.value)
    }

    pub fn get(&self, pages: &Pages, key: &str) -> Option<ValueId> {
        let slot = self.find(pages, fnv1a(key.as_bytes()), key)?;
        Some(self.entry_at(slot).value)
    }

    pub fn contains_key(&self, pages: &Pages, key: &str) -> bool {
        self.find(pages, fnv1a(key.as_bytes()), key).is_some()
    }

    /// Insert `key`, or overwrite its value in place if it is already present. Returns the old
    /// value on overwrite; the key keeps its original position in iteration order.
    pub fn insert(&mut self, pages: &Pages, key: StrRef, value: ValueId) -> Option<ValueId> {
        let key_str = pages.get(key);
        let hash = fnv1a(key_str.as_bytes());

        if let Some(slot) = self.find(pages, hash, key_str) {
            let entry = self.slot(slot).entry;
            let old = self.entries.get_mut(entry).map(|e| std::mem::replace(&mut e.value, value));
            return old;
        }

        let entry = self.entries.len();
        self.entries.push(Entry { key, value });
        let home = self.home(hash);
        self.place(Slot {
            hash,
            entry,
            home,
            steps: 0,
        });

        if self.entries.len() > self.capacity() >> 1 {
            self.rehash(self.capacity() << 1);
        }
        None
    }

    /// Overwrite the value of an existing key without allocating. Returns the old value, or
    /// `None` if `key` is absent.
    pub fn replace(&mut self, pages: &Pages, key: &str, value: ValueId) -> Option<ValueId> {
        let slot = self.find(pages, fnv1a(key.as_bytes()), key)?;
        let entry = self.slot(slot).entry;
        self.entries
            .get_mut(entry)
            .map(|e| std::mem::replace(&mut e.value, value))
    }

    /// Remove `key` in O(1) by moving the last entry into its place. This perturbs iteration
    /// order.
    pub fn swap_remove(&mut self, pages: &Pages, key: &str) -> Option<ValueId> {
        let slot = self.find(pages, fnv1a(key.as_bytes()), key)?;
        let entry = self.slot(slot).entry;
        self.erase(slot);

        let last = self.entries.len() - 1;
        let removed = self.entries.swap_remove(entry);
        if entry != last {
            // the entry that used to be last now lives at `entry`, point its slot there
            let moved = pages.get(self.entry_at_index(entry).key);
            let mut i = self.home(fnv1a(moved.as_bytes()));
            while let Some(slot) = self.slots[i].as_mut() {
                if slot.entry == last {
                    slot.entry = entry;
                    break;
                }
                i = (i + 1) % self.slots.len();
            }
        }

        self.shrink_if_sparse();
        Some(removed.value)
    }

    /// Remove `key` in O(n), preserving the order of the remaining entries.
    pub fn shift_remove(&mut self, pages: &Pages, key: &str) -> Option<ValueId> {
        let slot = self.find(pages, fnv1a(key.as_bytes()), key)?;
        let entry = self.slot(slot).entry;
        self.erase(slot);

        let removed = self.entries.remove(entry);
        for slot in self.slots.iter_mut().flatten() {
            if slot.entry > entry {
                slot.entry -= 1;
            }
        }

        self.shrink_if_sparse();
        Some(removed.value)
    }

    fn home(&self, hash: Hash) -> usize {
        hash as usize % self.slots.len()
    }

    fn slot(&self, index: usize) -> Slot {
        self.slots[index].expect("infallible; probed slot is occupied")
    }

    fn entry_at(&self, slot: usize) -> Entry {
        self.entry_at_index(self.slot(slot).entry)
    }

    fn entry_at_index(&self, entry: usize) -> Entry {
        *self
            .entries
            .get(entry)
            .expect("infallible; slots only point at live entries")
    }

    /// Probe for `key`. Both the cached hash and the key text must match.
    fn find(&self, pages: &Pages, hash: Hash, key: &str) -> Option<usize> {
        let mut i = self.home(hash);
        while let Some(slot) = &self.slots[i] {
            if slot.hash == hash && pages.get(self.entry_at_index(slot.entry).key) == key {
                return Some(i);
            }
            i = (i + 1) % self.slots.len();
        }
        None
    }

    /// Put `slot` into the first free position at or after its home. Callers guarantee the key
    /// is not already present.
    fn place(&mut self, mut slot: Slot) {
        let mut i = slot.home;
        while self.slots[i].is_some() {
            i = (i + 1) % self.slots.len();
            slot.steps += 1;
        }
        self.slots[i] = Some(slot);
    }

    /// Empty position `hole`, shifting later members of its probe cluster back so that every
    /// remaining key is still reachable from its home.
    fn erase(&mut self, mut hole: usize) {
        let cap = self.slots.len();
        self.slots[hole] = None;

        let mut i = (hole + 1) % cap;
        while let Some(slot) = self.slots[i] {
            let dist_here = (i + cap - slot.home) % cap;
            let dist_hole = (hole + cap - slot.home) % cap;
            if dist_hole < dist_here {
                self.slots[hole] = Some(Slot {
                    steps: dist_hole,
                    ..slot
                });
                self.slots[i] = None;
                hole = i;
            }
            i = (i + 1) % cap;
        }
    }

    fn shrink_if_sparse(&mut self) {
        if self.entries.len() < self.capacity() >> 2 && self.capacity() > self.min_cap {
            self.rehash(self.capacity() >> 1);
        }
    }

    fn rehash(&mut self, new_cap: usize) {
        trace!(from = self.capacity(), to = new_cap, len = self.len(), "rehashing object map");

        let old = std::mem::replace(&mut self.slots, vec![None; new_cap]);
        for slot in old.into_iter().flatten() {
            let home = self.home(slot.hash);
            self.place(Slot {
                home,
                steps: 0,
                ..slot
            });
        }
        self.resizes += 1;
    }
}
