/*! Execution of compiled patterns.

Patterns are executed in one of two modes:

* JIT mode ([`crate::CompiledPattern::jit_match`]) runs the JIT code of the
  pattern over a complete subject and resolves the boundaries of every
  capture group.

* DFA mode ([`crate::CompiledPattern::dfa_match`]) scans a subject that
  arrives in chunks. The state of the scan lives in a [`Workspace`] that is
  passed to every call, so scans can be resumed when the next chunk arrives.
  Only the overall boundaries of a match are reported in this mode.

Both modes report their result as a [`MatchStatus`] and write match
boundaries to a [`crate::MatchData`].
*/

use regex_automata::util::captures::Captures;

use crate::errors::MatchErrorKind;
use crate::match_data::MatchData;

pub use workspace::Workspace;

mod dfa;
mod jit;
mod workspace;


/// Result of a match or scan call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// A match was found. The value is one more than the highest numbered
    /// pair that was set, or 0 if the match data has too few pairs for
    /// holding every capture group. In the latter case only the pairs that
    /// fit were set.
    Success(usize),
    /// No match was found.
    NoMatch,
    /// The input ended in the middle of a possible match.
    Partial,
    /// The engine failed.
    Error(MatchErrorKind),
}

impl MatchStatus {
    /// Numeric code for this status, following the convention where
    /// non-negative values are successful matches.
    pub fn code(&self) -> i32 {
        match self {
            MatchStatus::Success(rc) => i32::try_from(*rc).unwrap_or(i32::MAX),
            MatchStatus::NoMatch => -1,
            MatchStatus::Partial => -2,
            MatchStatus::Error(kind) => kind.code(),
        }
    }
}

/// Options for [`crate::CompiledPattern::dfa_match`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DfaOptions {
    /// Report a partial match if the chunk ends in the middle of a possible
    /// match and no complete match was found.
    pub partial_soft: bool,
    /// Report a partial match if the chunk ends in the middle of a possible
    /// match, even if a complete match was found.
    pub partial_hard: bool,
    /// Continue the session in the workspace instead of starting a new one.
    pub restart: bool,
}

impl DfaOptions {
    /// Options for the first chunk of a soft-partial session.
    pub fn partial_soft() -> Self {
        Self { partial_soft: true, ..Default::default() }
    }

    /// Sets the `restart` option.
    pub fn restart(mut self, yes: bool) -> Self {
        self.restart = yes;
        self
    }
}

/// Copies the groups in `caps` to `match_data` and returns the result code
/// for [`MatchStatus::Success`].
fn fill_match_data(match_data: &mut MatchData<'_>, caps: &Captures) -> usize {
    match_data.clear();

    let mut highest = 0;

    for (i, span) in caps.iter().enumerate().take(match_data.pairs()) {
        if let Some(span) = span {
            match_data.set_pair(i, span.start, span.end);
            highest = i + 1;
        }
    }

    if caps.group_len() > match_data.pairs() {
        0
    } else {
        highest
    }
}
