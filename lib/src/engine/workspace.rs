use std::mem;

use regex_automata::util::primitives::StateID;
use rustc_hash::FxHashMap;

/// Returned by [`StateSet::insert`] when the set is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Overflow;

/// A bounded set of (state, start offset) pairs.
///
/// Each automaton state appears at most once in the set. When a state is
/// inserted twice the pair with the lowest start offset is kept, as both
/// candidates will behave identically from now on and the earliest one wins.
/// Pairs can be iterated in insertion order.
#[derive(Debug, Default)]
pub(crate) struct StateSet {
    // Pairs in insertion order.
    items: Vec<(StateID, usize)>,
    // Maps each state to its position in `items`.
    index: FxHashMap<StateID, usize>,
    capacity: usize,
}

impl StateSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            index: FxHashMap::default(),
            capacity,
        }
    }

    /// Adds a (state, start) pair to the set.
    ///
    /// Returns `true` if the state didn't exist in the set, and `false` if it
    /// existed already, in which case its start offset is updated if `start`
    /// is lower. Fails if the state is new and the set is full.
    #[inline]
    pub fn insert(
        &mut self,
        state: StateID,
        start: usize,
    ) -> Result<bool, Overflow> {
        if let Some(&pos) = self.index.get(&state) {
            let item = &mut self.items[pos];
            item.1 = item.1.min(start);
            return Ok(false);
        }
        if self.items.len() >= self.capacity {
            return Err(Overflow);
        }
        self.index.insert(state, self.items.len());
        self.items.push((state, start));
        Ok(true)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Removes all pairs from the set.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Iterator over the pairs in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &(StateID, usize)> {
        self.items.iter()
    }
}

/// Session state of a restartable DFA scan.
///
/// The workspace holds up to `slots` live candidate matches and everything
/// that's needed for resuming the scan when the next chunk of input arrives.
/// Its contents are opaque. It's reset by a call to
/// [`crate::CompiledPattern::dfa_match`] without the `restart` option, and
/// updated by every call with it.
#[derive(Debug)]
pub struct Workspace {
    slots: usize,
    /// Live candidates, as of the end of the last chunk.
    pub(crate) current: StateSet,
    /// Candidates that will replace `current` after the next byte.
    pub(crate) next: StateSet,
    /// Bytes consumed since the start of the session.
    pub(crate) offset: usize,
    /// Last byte consumed, used as look-behind for new candidates.
    pub(crate) last_byte: Option<u8>,
    /// The match reported by the last call that returned a match.
    pub(crate) last_reported: Option<(usize, usize)>,
    /// Start offsets of the matches that the last call already completed at
    /// the end of its chunk. These matches are not considered again when
    /// the next byte confirms them.
    pub(crate) boundary_matches: Vec<usize>,
    /// DFA transitions performed since the start of the session.
    pub(crate) transitions: u64,
    initialized: bool,
}

impl Workspace {
    /// Creates a workspace with room for `slots` candidate matches.
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            current: StateSet::with_capacity(slots),
            next: StateSet::with_capacity(slots),
            offset: 0,
            last_byte: None,
            last_reported: None,
            boundary_matches: Vec::with_capacity(slots + 1),
            transitions: 0,
            initialized: false,
        }
    }

    /// Number of candidate slots.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Number of bytes consumed since the session started.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.offset
    }

    /// True if a session was started in this workspace.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Starts a new session.
    pub(crate) fn reset(&mut self) {
        self.current.clear();
        self.next.clear();
        self.offset = 0;
        self.last_byte = None;
        self.last_reported = None;
        self.boundary_matches.clear();
        self.transitions = 0;
        self.initialized = true;
    }

    /// Ends the session after an error. Restarting from here is rejected
    /// until a new session starts.
    pub(crate) fn invalidate(&mut self) {
        self.current.clear();
        self.next.clear();
        self.boundary_matches.clear();
        self.initialized = false;
    }

    /// Makes the candidates in `next` the current ones.
    #[inline]
    pub(crate) fn swap(&mut self) {
        mem::swap(&mut self.current, &mut self.next);
        self.next.clear();
    }
}
