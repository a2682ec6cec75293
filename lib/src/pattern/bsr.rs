use crate::context::Bsr;

/// A pattern where every `\R` outside of a character class was replaced
/// with the alternation of line endings selected by a [`Bsr`] option.
pub(crate) struct Expansion {
    text: String,
    // (offset in `text`, offset in the original pattern, replacement length)
    // for every replaced `\R`, sorted by offset.
    edits: Vec<(usize, usize, usize)>,
}

impl Expansion {
    /// Expands every `\R` in `pattern`.
    pub fn new(pattern: &str, bsr: Bsr) -> Self {
        let replacement = match bsr {
            Bsr::AnyCrlf => r"(?:\r\n|\r|\n)",
            Bsr::Unicode => r"(?:\r\n|[\n\x0B\x0C\r\x85])",
        };

        let mut text = String::with_capacity(pattern.len());
        let mut edits = Vec::new();

        // Nesting depth of character classes.
        let mut class_depth = 0_usize;
        // True right after the opening `[` or `[^` of a class, where `]` is
        // a literal.
        let mut class_start = false;

        let mut chars = pattern.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'R')) if class_depth == 0 => {
                        edits.push((text.len(), pos, replacement.len()));
                        text.push_str(replacement);
                    }
                    Some((_, next)) => {
                        text.push('\\');
                        text.push(next);
                    }
                    None => text.push('\\'),
                },
                '[' => {
                    text.push('[');
                    class_depth += 1;
                    if let Some((_, '^')) = chars.peek() {
                        text.push('^');
                        chars.next();
                    }
                    class_start = true;
                    continue;
                }
                ']' if class_depth > 0 && !class_start => {
                    text.push(']');
                    class_depth -= 1;
                }
                c => text.push(c),
            }
            class_start = false;
        }

        Self { text, edits }
    }

    /// The expanded pattern.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Converts an offset within the expanded pattern to an offset within
    /// the original one. Offsets inside a replacement are mapped to the
    /// position of its `\R`.
    pub fn original_offset(&self, offset: usize) -> usize {
        let mut delta = 0_isize;
        for &(start, original, len) in &self.edits {
            if offset < start {
                break;
            }
            if offset < start + len {
                return original;
            }
            delta += len as isize - 2;
        }
        (offset as isize - delta) as usize
    }
}
