//! Errors returned by the different components of the harness.
//!
//! Every error kind implements [`std::fmt::Display`], which renders the
//! human-readable message for it. Kinds that correspond to engine status
//! codes also expose the numeric code through a `code` method.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Identifies each kind of object created by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A [`crate::GeneralContext`].
    GeneralContext,
    /// A [`crate::CompileContext`].
    CompileContext,
    /// A [`crate::JitStack`].
    JitStack,
    /// A [`crate::MatchContext`].
    MatchContext,
    /// A [`crate::CompiledPattern`].
    CompiledPattern,
    /// A [`crate::MatchData`].
    MatchData,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::GeneralContext => "general context",
            ResourceKind::CompileContext => "compile context",
            ResourceKind::JitStack => "jit stack",
            ResourceKind::MatchContext => "match context",
            ResourceKind::CompiledPattern => "compiled pattern",
            ResourceKind::MatchData => "match data",
        };
        write!(f, "{}", name)
    }
}

/// Error returned when some object can't be created.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// The memory services returned a null block.
    #[error("failed to create {0}: out of memory")]
    OutOfMemory(ResourceKind),

    /// The bounds passed to [`crate::JitStack::new`] are not valid.
    #[error("failed to create jit stack: invalid size (min: {min}, max: {max})")]
    InvalidJitStackSize {
        /// Requested minimum size.
        min: usize,
        /// Requested maximum size.
        max: usize,
    },
}

impl ResourceError {
    /// Kind of the object that couldn't be created.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceError::OutOfMemory(kind) => *kind,
            ResourceError::InvalidJitStackSize { .. } => ResourceKind::JitStack,
        }
    }
}

/// Reason why a pattern failed to compile.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompileErrorKind {
    #[error("missing closing parenthesis")]
    UnclosedGroup,

    #[error("unmatched closing parenthesis")]
    UnopenedGroup,

    #[error("missing terminating ] for character class")]
    UnclosedClass,

    #[error("invalid range in character class")]
    InvalidClass,

    #[error("unrecognized character follows \\")]
    InvalidEscape,

    #[error("quantifier does not follow a repeatable item")]
    NothingToRepeat,

    #[error("malformed quantifier")]
    InvalidQuantifier,

    #[error("numbers out of order in {{}} quantifier")]
    QuantifierOutOfOrder,

    #[error("too many capturing groups")]
    TooManyCaptures,

    #[error("parentheses are too deeply nested")]
    NestTooDeep,

    #[error("pattern string is longer than the limit set by the application")]
    PatternTooLong,

    #[error("regular expression is too large")]
    TooLarge,

    #[error("failed to get memory")]
    NoMemory,

    #[error("unsupported construct in pattern")]
    Unsupported,
}

impl CompileErrorKind {
    /// Numeric code for this error. Compile error codes are positive.
    pub fn code(&self) -> i32 {
        match self {
            CompileErrorKind::UnclosedGroup => 114,
            CompileErrorKind::UnopenedGroup => 122,
            CompileErrorKind::UnclosedClass => 106,
            CompileErrorKind::InvalidClass => 108,
            CompileErrorKind::InvalidEscape => 103,
            CompileErrorKind::NothingToRepeat => 109,
            CompileErrorKind::InvalidQuantifier => 105,
            CompileErrorKind::QuantifierOutOfOrder => 104,
            CompileErrorKind::TooManyCaptures => 197,
            CompileErrorKind::NestTooDeep => 119,
            CompileErrorKind::PatternTooLong => 188,
            CompileErrorKind::TooLarge => 120,
            CompileErrorKind::NoMemory => 121,
            CompileErrorKind::Unsupported => 111,
        }
    }
}

/// Error returned by [`crate::CompiledPattern::compile`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("compilation failed at offset {offset}: {kind}")]
pub struct CompileError {
    /// What went wrong.
    pub kind: CompileErrorKind,
    /// Byte offset within the pattern where the error was detected.
    pub offset: usize,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Error returned by [`crate::CompiledPattern::jit_compile`].
///
/// JIT compilation errors are never fatal, the pattern can still be used in
/// DFA mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JitCompileError {
    /// The compiled form doesn't fit in the configured size limit, or the
    /// engine rejected the pattern for some other reason.
    #[error("JIT compilation failed: {0}")]
    Build(String),
}

/// Engine error returned by a match or scan call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchErrorKind {
    #[error("bad offset value")]
    BadOffset,

    #[error("invalid data in workspace for DFA restart")]
    DfaBadRestart,

    #[error("internal error in the matching engine")]
    Internal,

    #[error("workspace size exceeded in DFA matching")]
    DfaWorkspaceSize,

    #[error("bad JIT option: pattern was not JIT-compiled")]
    JitBadOption,

    #[error("JIT stack limit reached")]
    JitStackLimit,

    #[error("match limit exceeded")]
    MatchLimit,

    #[error("no more memory")]
    NoMemory,
}

impl MatchErrorKind {
    /// Numeric code for this error. Match error codes are negative.
    pub fn code(&self) -> i32 {
        match self {
            MatchErrorKind::BadOffset => -33,
            MatchErrorKind::DfaBadRestart => -38,
            MatchErrorKind::DfaWorkspaceSize => -43,
            MatchErrorKind::Internal => -44,
            MatchErrorKind::JitBadOption => -45,
            MatchErrorKind::JitStackLimit => -46,
            MatchErrorKind::MatchLimit => -47,
            MatchErrorKind::NoMemory => -48,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            CompileError::new(CompileErrorKind::UnclosedGroup, 3).to_string(),
            "compilation failed at offset 3: missing closing parenthesis"
        );
        assert_eq!(
            CompileErrorKind::QuantifierOutOfOrder.to_string(),
            "numbers out of order in {} quantifier"
        );
        assert_eq!(
            ResourceError::OutOfMemory(ResourceKind::MatchData).to_string(),
            "failed to create match data: out of memory"
        );
        assert_eq!(
            MatchErrorKind::JitStackLimit.to_string(),
            "JIT stack limit reached"
        );
    }

    #[test]
    fn codes() {
        assert!(CompileErrorKind::UnclosedGroup.code() > 0);
        assert!(MatchErrorKind::DfaWorkspaceSize.code() < 0);
        assert_eq!(
            ResourceError::InvalidJitStackSize { min: 0, max: 0 }.kind(),
            ResourceKind::JitStack
        );
    }
}
