/*! Compiled patterns.

A [`CompiledPattern`] is produced by [`CompiledPattern::compile`] from the
text of a pattern and the options in a [`CompileContext`]. The compiled form
can be used for incremental scans right away (see
[`CompiledPattern::dfa_match`]) and, after a successful call to
[`CompiledPattern::jit_compile`], for JIT matching too (see
[`CompiledPattern::jit_match`]).
*/

use log::*;
use regex_automata::dfa::{self, dense, StartKind};
use regex_automata::nfa::thompson::{self, NFA};
use regex_automata::util::syntax;
use regex_automata::{MatchKind, PatternID};

use crate::context::CompileContext;
use crate::errors::{
    CompileError, CompileErrorKind, JitCompileError, ResourceKind,
};
use crate::memory::{Managed, Resource};

use bsr::Expansion;
use parser::Parser;

mod bsr;
mod parser;


/// Maximum size in bytes of the automaton used by incremental scans.
pub const SCAN_DFA_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Kinds of JIT compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitMode {
    /// Code for complete matches, where the end of the subject is the end
    /// of the input.
    Complete,
}

/// An immutable, compiled pattern.
pub struct CompiledPattern {
    source: String,
    expanded: String,
    syntax: syntax::Config,
    nfa: NFA,
    dfa: dense::DFA<Vec<u32>>,
    jit: Option<dfa::regex::Regex>,
    jit_size_limit: Option<usize>,
    capture_count: usize,
}

impl Resource for CompiledPattern {
    const KIND: ResourceKind = ResourceKind::CompiledPattern;
}

impl CompiledPattern {
    /// Compiles `pattern` with the options in `ccontext`.
    ///
    /// The pattern object is allocated with the memory services bound to the
    /// compile context. If they fail the error is
    /// [`CompileErrorKind::NoMemory`] at offset 0.
    pub fn compile<'g>(
        pattern: &str,
        ccontext: &CompileContext<'g>,
    ) -> Result<Managed<'g, CompiledPattern>, CompileError> {
        if let Some(limit) = ccontext.max_pattern_length() {
            if pattern.len() > limit {
                return Err(CompileError::new(
                    CompileErrorKind::PatternTooLong,
                    0,
                ));
            }
        }

        let expansion = Expansion::new(pattern, ccontext.bsr());

        let hir = Parser::new()
            .nest_limit(ccontext.parens_nest_limit())
            .newline(ccontext.newline())
            .parse(expansion.as_str())
            .map_err(|err| {
                CompileError::new(err.kind, expansion.original_offset(err.offset))
            })?;

        let nfa = thompson::Compiler::new()
            .configure(thompson::Config::new().utf8(false))
            .build_from_hir(&hir)
            .map_err(|err| {
                debug!("NFA construction failed: {}", err);
                CompileError::new(CompileErrorKind::TooLarge, 0)
            })?;

        // The scan automaton is anchored, every candidate match is started
        // explicitly at the position where it begins.
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .start_kind(StartKind::Anchored)
                    .match_kind(MatchKind::All)
                    .dfa_size_limit(Some(SCAN_DFA_SIZE_LIMIT))
                    .determinize_size_limit(Some(SCAN_DFA_SIZE_LIMIT)),
            )
            .build_from_nfa(&nfa)
            .map_err(|err| {
                debug!("DFA construction failed: {}", err);
                CompileError::new(CompileErrorKind::TooLarge, 0)
            })?;

        let capture_count =
            nfa.group_info().group_len(PatternID::ZERO).saturating_sub(1);

        info!(
            "compiled pattern `{}` ({} capture groups, {} NFA states)",
            pattern,
            capture_count,
            nfa.states().len()
        );

        let compiled = CompiledPattern {
            source: pattern.to_string(),
            expanded: expansion.as_str().to_string(),
            syntax: ccontext.syntax_config(),
            nfa,
            dfa,
            jit: None,
            jit_size_limit: ccontext.jit_size_limit(),
            capture_count,
        };

        Managed::new_in(compiled, ccontext.memory())
            .map_err(|_| CompileError::new(CompileErrorKind::NoMemory, 0))
    }

    /// Augments the pattern with JIT code.
    ///
    /// A failure leaves the pattern as it was, it can still be used for
    /// incremental scans. Calling this function on a pattern that already
    /// has JIT code is a no-op.
    pub fn jit_compile(&mut self, mode: JitMode) -> Result<(), JitCompileError> {
        if self.jit.is_some() {
            return Ok(());
        }

        let regex = match mode {
            JitMode::Complete => dfa::regex::Builder::new()
                .syntax(self.syntax)
                .thompson(thompson::Config::new().utf8(false))
                .dense(
                    dense::Config::new()
                        .dfa_size_limit(self.jit_size_limit)
                        .determinize_size_limit(self.jit_size_limit),
                )
                .build(self.expanded.as_str())
                .map_err(|err| JitCompileError::Build(err.to_string()))?,
        };

        info!(
            "JIT compiled pattern `{}` ({} bytes)",
            self.source,
            regex.forward().memory_usage() + regex.reverse().memory_usage()
        );

        self.jit = Some(regex);
        Ok(())
    }

    /// The text of the pattern, as passed to [`CompiledPattern::compile`].
    #[inline]
    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    /// Number of capture groups in the pattern, not counting the implicit
    /// group for the whole match.
    #[inline]
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// True if [`CompiledPattern::jit_compile`] succeeded.
    #[inline]
    pub fn is_jit_compiled(&self) -> bool {
        self.jit.is_some()
    }

    #[inline]
    pub(crate) fn nfa(&self) -> &NFA {
        &self.nfa
    }

    #[inline]
    pub(crate) fn dfa(&self) -> &dense::DFA<Vec<u32>> {
        &self.dfa
    }

    #[inline]
    pub(crate) fn jit(&self) -> Option<&dfa::regex::Regex> {
        self.jit.as_ref()
    }
}
