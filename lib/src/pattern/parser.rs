use regex_syntax as re;

use crate::context::Newline;
use crate::errors::{CompileError, CompileErrorKind};

/// A regular expression parser.
///
/// Takes the text of a pattern and produces its corresponding
/// [`re::hir::Hir`]. Patterns are parsed with ASCII-only character classes
/// and may match arbitrary bytes, not only valid UTF-8.
pub(crate) struct Parser {
    nest_limit: u32,
    newline: Newline,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            nest_limit: crate::context::DEFAULT_PARENS_NEST_LIMIT,
            newline: Newline::default(),
        }
    }

    /// Maximum nesting depth of groups, classes and repetitions.
    pub fn nest_limit(mut self, limit: u32) -> Self {
        self.nest_limit = limit;
        self
    }

    /// Newline convention used by `.`, `^` and `$`.
    pub fn newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    /// Parses the pattern and returns its HIR. Offsets in errors are
    /// relative to `pattern`.
    pub fn parse(&self, pattern: &str) -> Result<re::hir::Hir, CompileError> {
        let mut parser = re::ast::parse::ParserBuilder::new()
            .nest_limit(self.nest_limit)
            .build();

        let ast = parser.parse(pattern).map_err(|err| {
            CompileError::new(ast_error_kind(err.kind()), err.span().start.offset)
        })?;

        let mut builder = re::hir::translate::TranslatorBuilder::new();

        builder.unicode(false).utf8(false);

        match self.newline {
            Newline::Lf => builder.line_terminator(b'\n'),
            Newline::Cr => builder.line_terminator(b'\r'),
            Newline::Nul => builder.line_terminator(b'\0'),
            Newline::CrLf | Newline::AnyCrlf | Newline::Any => {
                builder.crlf(true)
            }
        };

        builder.build().translate(pattern, &ast).map_err(|err| {
            CompileError::new(
                CompileErrorKind::Unsupported,
                err.span().start.offset,
            )
        })
    }
}

fn ast_error_kind(kind: &re::ast::ErrorKind) -> CompileErrorKind {
    use re::ast::ErrorKind;
    match kind {
        ErrorKind::GroupUnclosed => CompileErrorKind::UnclosedGroup,
        ErrorKind::GroupUnopened => CompileErrorKind::UnopenedGroup,
        ErrorKind::ClassUnclosed => CompileErrorKind::UnclosedClass,
        ErrorKind::ClassEscapeInvalid
        | ErrorKind::ClassRangeInvalid
        | ErrorKind::ClassRangeLiteral => CompileErrorKind::InvalidClass,
        ErrorKind::EscapeUnrecognized
        | ErrorKind::EscapeUnexpectedEof
        | ErrorKind::EscapeHexEmpty
        | ErrorKind::EscapeHexInvalid
        | ErrorKind::EscapeHexInvalidDigit => CompileErrorKind::InvalidEscape,
        ErrorKind::RepetitionMissing => CompileErrorKind::NothingToRepeat,
        ErrorKind::RepetitionCountInvalid => {
            CompileErrorKind::QuantifierOutOfOrder
        }
        ErrorKind::RepetitionCountDecimalEmpty
        | ErrorKind::RepetitionCountUnclosed
        | ErrorKind::DecimalInvalid => CompileErrorKind::InvalidQuantifier,
        ErrorKind::CaptureLimitExceeded => CompileErrorKind::TooManyCaptures,
        ErrorKind::NestLimitExceeded(_) => CompileErrorKind::NestTooDeep,
        _ => CompileErrorKind::Unsupported,
    }
}
