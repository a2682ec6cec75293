use log::*;
use regex_automata::nfa::thompson::{backtrack, NFA};
use regex_automata::util::captures::Captures;
use regex_automata::{Anchored, Input, Span};

use super::{fill_match_data, MatchStatus};
use crate::context::{JitStack, MatchContext, DEFAULT_JIT_STACK_SIZE};
use crate::errors::MatchErrorKind;
use crate::match_data::MatchData;
use crate::pattern::CompiledPattern;

impl CompiledPattern {
    /// Finds the first match of the pattern in `subject`, starting at
    /// `start_offset`, using the JIT code of the pattern.
    ///
    /// The end of `subject` is the end of the input. The boundaries of the
    /// match and its capture groups are written to `match_data`. Offsets are
    /// relative to the start of `subject`.
    ///
    /// The capture groups are resolved with the JIT stack assigned to
    /// `mcontext`, which grows as needed up to its maximum size. Matches that
    /// need more memory fail with [`MatchErrorKind::JitStackLimit`]. Without
    /// a JIT stack a fixed budget of [`DEFAULT_JIT_STACK_SIZE`] bytes is
    /// used.
    ///
    /// Fails with [`MatchErrorKind::JitBadOption`] if the pattern was not
    /// JIT-compiled.
    pub fn jit_match(
        &self,
        subject: &[u8],
        start_offset: usize,
        match_data: &mut MatchData<'_>,
        mcontext: &mut MatchContext<'_, '_>,
    ) -> MatchStatus {
        let Some(regex) = self.jit() else {
            return MatchStatus::Error(MatchErrorKind::JitBadOption);
        };

        if start_offset > subject.len() {
            return MatchStatus::Error(MatchErrorKind::BadOffset);
        }

        let input = Input::new(subject).range(start_offset..);

        let m = match regex.try_search(&input) {
            Ok(Some(m)) => m,
            Ok(None) => return MatchStatus::NoMatch,
            Err(err) => {
                warn!("JIT search failed: {}", err);
                return MatchStatus::Error(MatchErrorKind::Internal);
            }
        };

        match resolve_captures(
            self.nfa(),
            subject,
            m.span(),
            mcontext.jit_stack_mut(),
        ) {
            Ok(caps) => MatchStatus::Success(fill_match_data(match_data, &caps)),
            Err(kind) => MatchStatus::Error(kind),
        }
    }
}

/// Resolves the capture groups of a match that spans `span`.
fn resolve_captures(
    nfa: &NFA,
    subject: &[u8],
    span: Span,
    stack: Option<&mut JitStack<'_>>,
) -> Result<Captures, MatchErrorKind> {
    let budget =
        stack.as_ref().map_or(DEFAULT_JIT_STACK_SIZE, |stack| stack.max_size());

    let backtracker = backtrack::Builder::new()
        .configure(backtrack::Config::new().visited_capacity(budget))
        .build_from_nfa(nfa.clone())
        .map_err(|err| {
            warn!("failed to build backtracker: {}", err);
            MatchErrorKind::Internal
        })?;

    if span.len() > backtracker.max_haystack_len() {
        return Err(MatchErrorKind::JitStackLimit);
    }

    // One bit per (state, position) pair.
    let needed =
        nfa.states().len().saturating_mul(span.len() + 1).div_ceil(8);

    let input = Input::new(subject).span(span).anchored(Anchored::Yes);
    let mut caps = backtracker.create_captures();

    let result = match stack {
        Some(stack) => {
            stack.reserve(needed)?;
            let cache = stack
                .cache()
                .get_or_insert_with(|| backtracker.create_cache());
            cache.reset(&backtracker);
            backtracker.try_search(cache, &input, &mut caps)
        }
        None => {
            if needed > DEFAULT_JIT_STACK_SIZE {
                return Err(MatchErrorKind::JitStackLimit);
            }
            let mut cache = backtracker.create_cache();
            backtracker.try_search(&mut cache, &input, &mut caps)
        }
    };

    if let Err(err) = result {
        debug!("backtracker gave up: {}", err);
        return Err(MatchErrorKind::JitStackLimit);
    }

    if !caps.is_match() {
        return Err(MatchErrorKind::Internal);
    }

    Ok(caps)
}
