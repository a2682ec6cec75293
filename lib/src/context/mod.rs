/*! Contexts that configure compilation and matching.

A [`GeneralContext`] is the first object created and the last one dropped.
It binds the [`MemoryServices`] used for creating every other object, which
borrow it through the lifetime `'g`:

```text
GeneralContext ──┬── CompileContext ──> CompiledPattern ──> MatchData
                 ├── JitStack <── (borrowed by) ── MatchContext
                 └── ...
```
*/

use regex_automata::util::syntax;
use serde::{Deserialize, Serialize};

use crate::errors::{ResourceError, ResourceKind};
use crate::memory::{Managed, MemoryServices, Resource};

pub use jit_stack::{JitStack, DEFAULT_JIT_STACK_SIZE, JIT_STACK_GRANULE};

mod jit_stack;


/// Default limit for the nesting depth of groups in a pattern.
pub const DEFAULT_PARENS_NEST_LIMIT: u32 = 250;

/// Default limit for the number of DFA transitions performed in a single
/// scan session.
pub const DEFAULT_MATCH_LIMIT: u64 = 10_000_000;

/// Binds the memory services to every object created from it.
pub struct GeneralContext<'m> {
    memory: &'m dyn MemoryServices,
}

impl Resource for GeneralContext<'_> {
    const KIND: ResourceKind = ResourceKind::GeneralContext;
}

impl<'m> GeneralContext<'m> {
    /// Creates a general context. The context itself is allocated with
    /// `memory`.
    pub fn new(
        memory: &'m dyn MemoryServices,
    ) -> Result<Managed<'m, GeneralContext<'m>>, ResourceError> {
        Managed::new_in(GeneralContext { memory }, memory)
    }

    /// Memory services bound to this context.
    #[inline]
    pub fn memory(&self) -> &dyn MemoryServices {
        self.memory
    }
}

/// Character classification tables used while compiling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterTables {
    /// Built-in ASCII tables (`\d` is `[0-9]`, `\w` is `[0-9A-Za-z_]`).
    #[default]
    Default,
}

/// Line endings recognized by `\R`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bsr {
    /// Any Unicode line ending.
    #[default]
    Unicode,
    /// Only CR, LF, or CRLF.
    AnyCrlf,
}

/// The newline convention, which affects `.`, `^` and `$`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    /// Carriage return only.
    Cr,
    /// Line feed only.
    #[default]
    Lf,
    /// CR followed by LF.
    CrLf,
    /// Any Unicode line ending.
    Any,
    /// Any of CR, LF, or CRLF.
    AnyCrlf,
    /// The NUL character.
    Nul,
}

/// Options for compiling patterns.
pub struct CompileContext<'g> {
    memory: &'g dyn MemoryServices,
    tables: CharacterTables,
    bsr: Bsr,
    newline: Newline,
    max_pattern_length: Option<usize>,
    parens_nest_limit: u32,
    jit_size_limit: Option<usize>,
}

impl Resource for CompileContext<'_> {
    const KIND: ResourceKind = ResourceKind::CompileContext;
}

impl<'g> CompileContext<'g> {
    /// Creates a compile context with default options.
    pub fn new(
        general: &'g GeneralContext<'_>,
    ) -> Result<Managed<'g, CompileContext<'g>>, ResourceError> {
        let memory = general.memory();
        Managed::new_in(
            CompileContext {
                memory,
                tables: CharacterTables::default(),
                bsr: Bsr::default(),
                newline: Newline::default(),
                max_pattern_length: None,
                parens_nest_limit: DEFAULT_PARENS_NEST_LIMIT,
                jit_size_limit: None,
            },
            memory,
        )
    }

    /// Sets the character tables.
    pub fn set_character_tables(&mut self, tables: CharacterTables) -> &mut Self {
        self.tables = tables;
        self
    }

    /// Sets the line endings matched by `\R`.
    pub fn set_bsr(&mut self, bsr: Bsr) -> &mut Self {
        self.bsr = bsr;
        self
    }

    /// Sets the newline convention.
    pub fn set_newline(&mut self, newline: Newline) -> &mut Self {
        self.newline = newline;
        self
    }

    /// Sets the maximum length in bytes of a pattern. `None` means that the
    /// length is not limited.
    pub fn set_max_pattern_length(&mut self, limit: Option<usize>) -> &mut Self {
        self.max_pattern_length = limit;
        self
    }

    /// Sets the maximum nesting depth of groups.
    pub fn set_parens_nest_limit(&mut self, limit: u32) -> &mut Self {
        self.parens_nest_limit = limit;
        self
    }

    /// Sets the maximum size in bytes of the JIT-compiled form of a pattern.
    /// `None` leaves the engine default in place.
    pub fn set_jit_size_limit(&mut self, limit: Option<usize>) -> &mut Self {
        self.jit_size_limit = limit;
        self
    }

    #[inline]
    pub fn character_tables(&self) -> CharacterTables {
        self.tables
    }

    #[inline]
    pub fn bsr(&self) -> Bsr {
        self.bsr
    }

    #[inline]
    pub fn newline(&self) -> Newline {
        self.newline
    }

    #[inline]
    pub fn max_pattern_length(&self) -> Option<usize> {
        self.max_pattern_length
    }

    #[inline]
    pub fn parens_nest_limit(&self) -> u32 {
        self.parens_nest_limit
    }

    #[inline]
    pub fn jit_size_limit(&self) -> Option<usize> {
        self.jit_size_limit
    }

    #[inline]
    pub(crate) fn memory(&self) -> &'g dyn MemoryServices {
        self.memory
    }

    /// Syntax configuration that implements the options in this context.
    pub(crate) fn syntax_config(&self) -> syntax::Config {
        let config = match self.tables {
            CharacterTables::Default => {
                syntax::Config::new().unicode(false).utf8(false)
            }
        };

        let config = match self.newline {
            Newline::Lf => config.line_terminator(b'\n'),
            Newline::Cr => config.line_terminator(b'\r'),
            Newline::Nul => config.line_terminator(b'\0'),
            // The engine has a single multi-byte line terminator mode, which
            // accepts CR, LF and CRLF.
            Newline::CrLf | Newline::AnyCrlf | Newline::Any => {
                config.crlf(true)
            }
        };

        config.nest_limit(self.parens_nest_limit)
    }
}

/// Options used while matching.
///
/// A match context holds an exclusive borrow of the [`JitStack`] assigned to
/// it, so the stack can't be dropped, or assigned to another context, while
/// this context is alive.
pub struct MatchContext<'s, 'g> {
    jit_stack: Option<&'s mut JitStack<'g>>,
    match_limit: u64,
}

impl Resource for MatchContext<'_, '_> {
    const KIND: ResourceKind = ResourceKind::MatchContext;
}

impl<'s, 'g> MatchContext<'s, 'g> {
    /// Creates a match context without a JIT stack.
    pub fn new(
        general: &'g GeneralContext<'_>,
    ) -> Result<Managed<'g, MatchContext<'s, 'g>>, ResourceError> {
        Managed::new_in(
            MatchContext { jit_stack: None, match_limit: DEFAULT_MATCH_LIMIT },
            general.memory(),
        )
    }

    /// Assigns the stack used by JIT matching. With `None` JIT matching uses
    /// a small internal stack.
    pub fn assign_jit_stack(
        &mut self,
        stack: Option<&'s mut JitStack<'g>>,
    ) -> &mut Self {
        self.jit_stack = stack;
        self
    }

    /// Sets the maximum number of DFA transitions in a scan session.
    pub fn set_match_limit(&mut self, limit: u64) -> &mut Self {
        self.match_limit = limit;
        self
    }

    #[inline]
    pub fn has_jit_stack(&self) -> bool {
        self.jit_stack.is_some()
    }

    #[inline]
    pub fn match_limit(&self) -> u64 {
        self.match_limit
    }

    #[inline]
    pub(crate) fn jit_stack_mut(&mut self) -> Option<&mut JitStack<'g>> {
        self.jit_stack.as_deref_mut()
    }
}
