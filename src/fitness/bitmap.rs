//! Sets of execution indices
//!
//! [`StateIds`] records which executions of the corpus an assertion
//! classifies correctly. Two assertions with equal sets behave the same on
//! the whole corpus, so the set doubles as a cache key and as the
//! equivalence used by minimization.

use std::fmt;

const BITS: usize = 64;

/// Bitmap over execution indices `0..len`
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateIds {
    words: Vec<u64>,
    len: usize,
}

impl StateIds {
    /// Empty set over `len` executions
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(BITS)],
            len,
        }
    }

    /// Copy of the first `prefix` bits of `other` into a set over `len` executions
    pub fn extend_from(other: &StateIds, prefix: usize, len: usize) -> Self {
        let mut ids = Self::new(len);
        for i in other.iter_ones().take_while(|i| *i < prefix.min(len)) {
            ids.insert(i);
        }
        ids
    }

    /// Number of executions covered
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, index: usize) {
        if index < self.len {
            self.words[index / BITS] |= 1u64 << (index % BITS);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.words[index / BITS] & (1u64 << (index % BITS)) != 0
    }

    /// Number of indices in the set
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of indices in `self` but not in `other`
    pub fn count_difference(&self, other: &StateIds) -> usize {
        self.words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let o = other.words.get(i).copied().unwrap_or(0);
                (w & !o).count_ones() as usize
            })
            .sum()
    }

    /// Indices in increasing order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |i| self.contains(*i))
    }
}

impl fmt::Debug for StateIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}
