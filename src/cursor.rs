/// Returned by [`Cursor::read`] and [`Cursor::peek`] once the input is
/// exhausted.
pub(crate) const EOF: char = '\0';

/// A positional reader over template text.
///
/// Offsets are byte offsets into the input, `line` is 1-based and `column`
/// counts characters consumed since the last newline (0-based).
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    #[inline]
    pub(crate) const fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) const fn line(&self) -> usize {
        self.line
    }

    #[inline]
    pub(crate) const fn column(&self) -> usize {
        self.column
    }

    /// Consumes and returns the current character, or [`EOF`] past the end.
    pub(crate) fn read(&mut self) -> char {
        let Some(current) = self.input[self.pos..].chars().next() else {
            return EOF;
        };
        self.pos += current.len_utf8();
        if current == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        current
    }

    /// Looks `offset` characters ahead without consuming anything.
    pub(crate) fn peek(&self, offset: usize) -> char {
        self.input[self.pos..].chars().nth(offset).unwrap_or(EOF)
    }

    /// Consumes characters for as long as `predicate` holds.
    pub(crate) fn skip_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek(0) != EOF && predicate(self.peek(0)) {
            self.read();
        }
    }

    pub(crate) fn substring(&self, begin: usize, end: usize) -> &'a str {
        &self.input[begin..end]
    }

    /// The unread tail of the input.
    pub(crate) fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_read_tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\nc");
        assert_eq!((cursor.line(), cursor.column()), (1, 0));
        assert_eq!(cursor.read(), 'a');
        assert_eq!(cursor.read(), 'b');
        assert_eq!((cursor.line(), cursor.column()), (1, 2));
        assert_eq!(cursor.read(), '\n');
        assert_eq!((cursor.line(), cursor.column()), (2, 0));
        assert_eq!(cursor.read(), 'c');
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
        assert_eq!(cursor.read(), EOF);
        assert_eq!(cursor.read(), EOF);
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_peek_does_not_consume() {
        let cursor = Cursor::new("{%");
        assert_eq!(cursor.peek(0), '{');
        assert_eq!(cursor.peek(1), '%');
        assert_eq!(cursor.peek(2), EOF);
        assert_eq!(cursor.pos(), 0);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_multibyte_characters() {
        let mut cursor = Cursor::new("é{%");
        assert_eq!(cursor.read(), 'é');
        assert_eq!(cursor.pos(), 2);
        assert_eq!(cursor.column(), 1);
        assert_eq!(cursor.substring(0, cursor.pos()), "é");
        assert_eq!(cursor.rest(), "{%");
    }
}
