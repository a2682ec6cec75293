/*! Buffer that receives the boundaries of a match.

The buffer is a vector of `(start, end)` pairs, also known as the
"ovector". Pair 0 holds the boundaries of the whole match and pair `i` the
boundaries of capture group `i`. Each match call overwrites the buffer.
*/

use std::slice;

use crate::context::GeneralContext;
use crate::errors::{ResourceError, ResourceKind};
use crate::memory::{Block, Managed, Resource};
use crate::pattern::CompiledPattern;

/// Value of an offset that wasn't set by the last match.
pub const UNSET: usize = usize::MAX;

/// Reusable buffer for match results.
pub struct MatchData<'g> {
    ovector: Block<'g>,
    pairs: usize,
}

impl Resource for MatchData<'_> {
    const KIND: ResourceKind = ResourceKind::MatchData;
}

impl<'g> MatchData<'g> {
    /// Creates a buffer with room for the whole match plus every capture
    /// group in `pattern`.
    pub fn from_pattern(
        pattern: &CompiledPattern,
        general: &'g GeneralContext<'_>,
    ) -> Result<Managed<'g, MatchData<'g>>, ResourceError> {
        Self::new(pattern.capture_count() + 1, general)
    }

    /// Creates a buffer with `pairs` pairs. At least one pair is always
    /// allocated.
    pub fn new(
        pairs: usize,
        general: &'g GeneralContext<'_>,
    ) -> Result<Managed<'g, MatchData<'g>>, ResourceError> {
        let pairs = pairs.max(1);
        let memory = general.memory();

        let size = pairs
            .checked_mul(2 * std::mem::size_of::<usize>())
            .ok_or(ResourceError::OutOfMemory(ResourceKind::MatchData))?;

        let ovector = Block::allocate(memory, size)
            .ok_or(ResourceError::OutOfMemory(ResourceKind::MatchData))?;

        let mut match_data = MatchData { ovector, pairs };
        match_data.clear();

        Managed::new_in(match_data, memory)
    }

    /// Number of pairs in the buffer.
    #[inline]
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// Returns the boundaries stored in pair `i`, or `None` if the pair
    /// doesn't exist or was not set by the last match.
    pub fn pair(&self, i: usize) -> Option<(usize, usize)> {
        let ovector = self.ovector();
        let start = *ovector.get(2 * i)?;
        let end = *ovector.get(2 * i + 1)?;
        if start == UNSET || end == UNSET {
            None
        } else {
            Some((start, end))
        }
    }

    /// Iterator over every pair in the buffer.
    pub fn boundaries(&self) -> impl Iterator<Item = Option<(usize, usize)>> + '_ {
        (0..self.pairs).map(|i| self.pair(i))
    }

    /// Raw offsets, two per pair.
    pub fn ovector(&self) -> &[usize] {
        // SAFETY: the block holds `2 * pairs` initialized offsets and is
        // aligned to `MIN_ALIGN`.
        unsafe {
            slice::from_raw_parts(
                self.ovector.as_ptr() as *const usize,
                2 * self.pairs,
            )
        }
    }

    fn ovector_mut(&mut self) -> &mut [usize] {
        // SAFETY: same as `ovector`, and `self` is borrowed exclusively.
        unsafe {
            slice::from_raw_parts_mut(
                self.ovector.as_ptr() as *mut usize,
                2 * self.pairs,
            )
        }
    }

    /// Stores the boundaries of pair `i`. Pairs beyond the end of the buffer
    /// are ignored.
    pub(crate) fn set_pair(&mut self, i: usize, start: usize, end: usize) {
        if let Some(pair) = self.ovector_mut().get_mut(2 * i..2 * i + 2) {
            pair[0] = start;
            pair[1] = end;
        }
    }

    /// Marks every pair as unset.
    pub(crate) fn clear(&mut self) {
        self.ovector_mut().fill(UNSET);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::memory::InstrumentedAllocator;
    use crate::tests::FailAt;

    #[test]
    fn pairs() {
        let allocator = InstrumentedAllocator::new();
        let general = GeneralContext::new(&allocator).unwrap();
        let mut match_data = MatchData::new(2, &general).unwrap();

        assert_eq!(match_data.pairs(), 2);
        assert_eq!(match_data.ovector(), &[UNSET; 4]);
        assert_eq!(match_data.pair(0), None);

        match_data.set_pair(0, 1, 12);
        match_data.set_pair(1, 4, 11);
        match_data.set_pair(2, 0, 0);

        assert_eq!(match_data.pair(0), Some((1, 12)));
        assert_eq!(match_data.pair(1), Some((4, 11)));
        assert_eq!(match_data.pair(2), None);
        assert_eq!(
            match_data.boundaries().collect::<Vec<_>>(),
            vec![Some((1, 12)), Some((4, 11))]
        );

        match_data.clear();
        assert_eq!(match_data.pair(0), None);
    }

    #[test]
    fn at_least_one_pair() {
        let allocator = InstrumentedAllocator::new();
        let general = GeneralContext::new(&allocator).unwrap();
        let match_data = MatchData::new(0, &general).unwrap();
        assert_eq!(match_data.pairs(), 1);
    }

    #[test]
    fn released_on_failure() {
        // Allocations: general context, ovector, match data (fails).
        let allocator = InstrumentedAllocator::wrap(FailAt::new(3));
        {
            let general = GeneralContext::new(&allocator).unwrap();
            assert_eq!(
                MatchData::new(1, &general).err(),
                Some(ResourceError::OutOfMemory(ResourceKind::MatchData))
            );
        }
        assert!(allocator.stats().is_balanced());
    }
}
