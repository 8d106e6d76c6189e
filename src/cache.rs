//! Computed table for BDD operations.
//!
//! A fixed table of `2^bits` slots, indexed by a pairing hash of the key. A new
//! entry simply overwrites whatever occupied its slot, so the memory footprint
//! never grows past the size chosen up front. Keys are stored in full, so a
//! collision costs a recomputation, never a wrong answer.

use crate::reference::Ref;

/// Keys of memoized manager operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OpKey {
    Ite(Ref, Ref, Ref),
}

/// Hash used to pick a cache slot.
pub trait MyHash {
    fn hash(&self) -> u64;
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        // Zigzag, so that complemented handles stay small.
        let x = self.get();
        ((x << 1) ^ (x >> 31)) as u32 as u64
    }
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        match self {
            OpKey::Ite(f, g, h) => pairing3(f.hash(), g.hash(), h.hash()),
        }
    }
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

/// [Szudzik pairing function](https://en.wikipedia.org/wiki/Pairing_function), wrapping on overflow.
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

pub struct Cache<K, V> {
    data: Vec<Option<(K, V)>>,
    bitmask: u64,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K, V> Cache<K, V> {
    /// Create a table of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1usize << bits;
        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask: (size - 1) as u64,
            hits: 0,
            misses: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.data.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|slot| slot.is_none())
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }

    fn index(&self, hash: u64) -> usize {
        (hash & self.bitmask) as usize
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash + Eq,
    V: Copy,
{
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        let index = self.index(key.hash());
        match &self.data[index] {
            Some((k, v)) if k == key => {
                self.hits += 1;
                Some(*v)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store `value`, evicting the previous occupant of the slot.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        let index = self.index(key.hash());
        self.data[index] = Some((key, value));
    }
}
