/// Set of vertex-attribute slot indices.
///
/// Growable bitset: no maximum slot count is assumed, storage extends to the
/// highest slot inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SlotMask {
    words: Vec<u64>,
}

const WORD_BITS: u32 = u64::BITS;

impl SlotMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, slot: u32) -> bool {
        let (word, bit) = split(slot);
        self.word(word) & bit != 0
    }

    pub fn insert(&mut self, slot: u32) {
        let (word, bit) = split(slot);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Slots in ascending order.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(i, &w)| set_bits(i, w))
    }

    /// Slots in `self` but not in `other`, ascending.
    pub fn difference<'a>(&'a self, other: &'a SlotMask) -> impl Iterator<Item = u32> + 'a {
        self.words
            .iter()
            .enumerate()
            .flat_map(move |(i, &w)| set_bits(i, w & !other.word(i)))
    }

    fn word(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }
}

#[cfg(test)]
impl FromIterator<u32> for SlotMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut mask = SlotMask::new();
        for slot in iter {
            mask.insert(slot);
        }
        mask
    }
}

#[inline]
fn split(slot: u32) -> (usize, u64) {
    ((slot / WORD_BITS) as usize, 1u64 << (slot % WORD_BITS))
}

/// Lowest-set-bit walk over one word.
fn set_bits(word_index: usize, mut word: u64) -> impl Iterator<Item = u32> {
    std::iter::from_fn(move || {
        if word == 0 {
            return None;
        }
        let bit = word.trailing_zeros();
        word &= word - 1;
        Some(word_index as u32 * WORD_BITS + bit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut mask = SlotMask::new();
        assert!(mask.is_empty());
        mask.insert(3);
        mask.insert(0);
        assert!(mask.contains(0));
        assert!(mask.contains(3));
        assert!(!mask.contains(1));
        assert_eq!(mask.len(), 2);
    }

    #[test]
    fn iterates_ascending_across_words() {
        let mask: SlotMask = [130, 2, 64, 63].into_iter().collect();
        assert_eq!(mask.iter().collect::<Vec<_>>(), [2, 63, 64, 130]);
    }

    #[test]
    fn difference_with_shorter_and_longer_masks() {
        let before: SlotMask = [0, 1, 5, 70].into_iter().collect();
        let after: SlotMask = [1, 2].into_iter().collect();
        assert_eq!(before.difference(&after).collect::<Vec<_>>(), [0, 5, 70]);
        assert_eq!(after.difference(&before).collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn difference_of_equal_sets_is_empty() {
        let a: SlotMask = [4, 9].into_iter().collect();
        assert_eq!(a.difference(&a.clone()).count(), 0);
    }
}
