//! Markings of a 1-safe net.
//!
//! A marking is an immutable bit vector with one bit per place, stored in
//! 64-bit words. Firing a transition produces a new marking.

use std::fmt;

use crate::net::PlaceId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Marking {
    /// Bits beyond `len` are always clear.
    words: Vec<u64>,
    len: usize,
}

impl Marking {
    const BITS_PER_WORD: usize = 64;

    /// The marking with no tokens over `len` places.
    pub fn empty(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(Self::BITS_PER_WORD)],
            len,
        }
    }

    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut words: Vec<u64> = Vec::new();
        let mut len = 0;
        for bit in bits {
            let (word, offset) = Self::word_and_bit(len);
            if word == words.len() {
                words.push(0);
            }
            if bit {
                words[word] |= 1 << offset;
            }
            len += 1;
        }
        Self { words, len }
    }

    /// Unpack the low `len` bits of `mask`.
    ///
    /// # Panics
    ///
    /// Panics if `len > 64`.
    pub fn from_mask(mask: u64, len: usize) -> Self {
        assert!(len <= Self::BITS_PER_WORD, "Mask holds at most 64 places");
        let mut marking = Self::empty(len);
        if len > 0 {
            let keep = if len == Self::BITS_PER_WORD { u64::MAX } else { (1 << len) - 1 };
            marking.words[0] = mask & keep;
        }
        marking
    }

    /// Pack into one word, if the marking has at most 64 places.
    pub fn to_mask(&self) -> Option<u64> {
        if self.len > Self::BITS_PER_WORD {
            return None;
        }
        Some(self.words.first().copied().unwrap_or(0))
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    /// Number of places.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_marked(&self, place: PlaceId) -> bool {
        let index = place.index();
        assert!(index < self.len, "Place {:?} is out of bounds", place);
        let (word, bit) = Self::word_and_bit(index);
        (self.words[word] >> bit) & 1 == 1
    }

    /// A copy of this marking with `place` set to `marked`.
    #[must_use]
    pub fn with(&self, place: PlaceId, marked: bool) -> Self {
        let index = place.index();
        assert!(index < self.len, "Place {:?} is out of bounds", place);
        let (word, bit) = Self::word_and_bit(index);
        let mut next = self.clone();
        if marked {
            next.words[word] |= 1 << bit;
        } else {
            next.words[word] &= !(1 << bit);
        }
        next
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| {
            let (word, bit) = Self::word_and_bit(i);
            (self.words[word] >> bit) & 1 == 1
        })
    }

    /// Marked places in ascending order.
    pub fn marked_places(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.bits()
            .enumerate()
            .filter(|&(_, bit)| bit)
            .map(|(i, _)| PlaceId::from_index(i))
    }

    pub fn count_tokens(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl fmt::Display for Marking {
    /// Formats as a bit string, place 0 first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn p(i: usize) -> PlaceId {
        PlaceId::from_index(i)
    }

    #[test]
    fn test_mask_conversion() {
        let m = Marking::from_mask(0b101, 3);
        assert!(m.is_marked(p(0)));
        assert!(!m.is_marked(p(1)));
        assert!(m.is_marked(p(2)));
        assert_eq!(m.to_mask(), Some(0b101));
        assert_eq!(m.to_string(), "101");

        // Bits above the place count are dropped.
        assert_eq!(Marking::from_mask(0b1111, 2).to_mask(), Some(0b11));
        assert_eq!(Marking::from_mask(u64::MAX, 64).count_tokens(), 64);
    }

    #[test]
    fn test_with_is_persistent() {
        let m = Marking::empty(70);
        let m2 = m.with(p(65), true);
        assert_eq!(m.count_tokens(), 0);
        assert!(m2.is_marked(p(65)));
        assert_eq!(m2.marked_places().collect::<Vec<_>>(), vec![p(65)]);
        assert_eq!(m2.to_mask(), None);
        assert_eq!(m2.with(p(65), false), m);
    }

    #[test]
    fn test_from_bits_equals_from_mask() {
        let m = Marking::from_bits([false, true, true, false]);
        assert_eq!(m, Marking::from_mask(0b0110, 4));
        assert_eq!(m.len(), 4);
        assert_eq!(m.bits().collect::<Vec<_>>(), vec![false, true, true, false]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_bounds() {
        Marking::empty(2).is_marked(p(2));
    }
}
