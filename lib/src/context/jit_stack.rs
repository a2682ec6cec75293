use log::*;
use regex_automata::nfa::thompson::backtrack;

use crate::context::GeneralContext;
use crate::errors::{MatchErrorKind, ResourceError, ResourceKind};
use crate::memory::{Block, Managed, MemoryServices, Resource};

/// The stack grows in steps of this size.
pub const JIT_STACK_GRANULE: usize = 8 * 1024;

/// Size of the stack used by JIT matching when the match context doesn't
/// have one assigned.
pub const DEFAULT_JIT_STACK_SIZE: usize = 32 * 1024;

/// Working memory for JIT matching.
///
/// The stack starts with `min_size` bytes and grows on demand, up to
/// `max_size` bytes. Matches that need more than `max_size` bytes fail with
/// [`MatchErrorKind::JitStackLimit`].
pub struct JitStack<'g> {
    memory: &'g dyn MemoryServices,
    min_size: usize,
    max_size: usize,
    region: Block<'g>,
    cache: Option<backtrack::Cache>,
}

impl Resource for JitStack<'_> {
    const KIND: ResourceKind = ResourceKind::JitStack;
}

impl<'g> JitStack<'g> {
    /// Creates a JIT stack.
    ///
    /// Both sizes are rounded up to a multiple of [`JIT_STACK_GRANULE`]. If
    /// `min_size` is larger than `max_size` it's reduced to `max_size`.
    /// Zero sizes are rejected.
    pub fn new(
        min_size: usize,
        max_size: usize,
        general: &'g GeneralContext<'_>,
    ) -> Result<Managed<'g, JitStack<'g>>, ResourceError> {
        if min_size == 0 || max_size == 0 {
            return Err(ResourceError::InvalidJitStackSize {
                min: min_size,
                max: max_size,
            });
        }

        let max_size = round_up(max_size);
        let min_size = round_up(min_size.min(max_size));

        let memory = general.memory();

        // The region is created first. If the stack object itself can't be
        // allocated the region is dropped along with the value.
        let region = Block::allocate(memory, min_size)
            .ok_or(ResourceError::OutOfMemory(ResourceKind::JitStack))?;

        Managed::new_in(
            JitStack { memory, min_size, max_size, region, cache: None },
            memory,
        )
    }

    #[inline]
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of bytes currently reserved.
    #[inline]
    pub fn current_size(&self) -> usize {
        self.region.size()
    }

    /// Makes sure that at least `needed` bytes are reserved.
    pub(crate) fn reserve(&mut self, needed: usize) -> Result<(), MatchErrorKind> {
        if needed > self.max_size {
            return Err(MatchErrorKind::JitStackLimit);
        }
        if needed <= self.region.size() {
            return Ok(());
        }

        let new_size = round_up(needed).min(self.max_size);

        let region = Block::allocate(self.memory, new_size)
            .ok_or(MatchErrorKind::NoMemory)?;

        debug!(
            "jit stack grows from {} to {} bytes",
            self.region.size(),
            new_size
        );

        // The old region is released when replaced.
        self.region = region;
        Ok(())
    }

    /// Backtracker cache kept alive across matches.
    pub(crate) fn cache(&mut self) -> &mut Option<backtrack::Cache> {
        &mut self.cache
    }
}

fn round_up(size: usize) -> usize {
    size.div_ceil(JIT_STACK_GRANULE).saturating_mul(JIT_STACK_GRANULE)
}
