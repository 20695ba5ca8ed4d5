use std::borrow::Cow;

use crate::cursor::{Cursor, EOF};
use crate::error::{ParseError, ParseErrorKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SpanKind {
    Literal,
    Directive,
}

/// A classified fragment of template source.
///
/// For a directive, `text` is the content between `{%` and `%}` with `%%`
/// already collapsed, and `line`/`column` point at the first character
/// after the opening `{%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span<'a> {
    pub(crate) kind: SpanKind,
    pub(crate) text: Cow<'a, str>,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl<'a> Span<'a> {
    #[inline]
    pub(crate) fn is_literal(&self) -> bool {
        self.kind == SpanKind::Literal
    }

    fn literal(text: &'a str, line: usize, column: usize) -> Self {
        Self {
            kind: SpanKind::Literal,
            text: Cow::Borrowed(text),
            line,
            column,
        }
    }
}

/// Splits template text into literal and directive spans.
pub(crate) struct Scanner<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            cursor: Cursor::new(input),
        }
    }

    /// Current `(line, column)` of the underlying cursor.
    pub(crate) fn position(&self) -> (usize, usize) {
        (self.cursor.line(), self.cursor.column())
    }

    /// Returns the next span. An empty literal signals the end of input.
    pub(crate) fn next_span(&mut self) -> Result<Span<'a>, ParseError> {
        let begin = self.cursor.pos();
        let line = self.cursor.line();
        let column = self.cursor.column();

        while self.cursor.peek(0) != EOF {
            if self.cursor.peek(0) == '{' && self.cursor.peek(1) == '%' {
                if self.cursor.pos() != begin {
                    break;
                }
                self.cursor.read();
                self.cursor.read();
                return self.scan_directive();
            }
            self.cursor.read();
        }

        Ok(Span::literal(
            self.cursor.substring(begin, self.cursor.pos()),
            line,
            column,
        ))
    }

    /// Scans a directive body; the opening `{%` has been consumed.
    fn scan_directive(&mut self) -> Result<Span<'a>, ParseError> {
        let begin = self.cursor.pos();
        let line = self.cursor.line();
        let column = self.cursor.column();
        // Only allocate once an escape forces the text to differ from the
        // source slice.
        let mut escaped: Option<String> = None;

        loop {
            let before = self.cursor.pos();
            let ch = self.cursor.read();
            match ch {
                EOF => {
                    return Err(ParseError::new(
                        self.cursor.line(),
                        self.cursor.column(),
                        ParseErrorKind::UnexpectedEof,
                    ));
                }
                '%' if self.cursor.peek(0) == '}' => {
                    self.cursor.read();
                    let text = match escaped {
                        Some(text) => Cow::Owned(text),
                        None => Cow::Borrowed(self.cursor.substring(begin, before)),
                    };
                    return Ok(Span {
                        kind: SpanKind::Directive,
                        text,
                        line,
                        column,
                    });
                }
                '%' if self.cursor.peek(0) == '%' => {
                    self.cursor.read();
                    escaped
                        .get_or_insert_with(|| self.cursor.substring(begin, before).to_string())
                        .push('%');
                }
                _ => {
                    if let Some(text) = escaped.as_mut() {
                        text.push(ch);
                    }
                }
            }
        }
    }
}

/// Scans the whole input into spans, returning them together with the
/// cursor position at the end of input.
pub(crate) fn scan(input: &str) -> Result<(Vec<Span<'_>>, (usize, usize)), ParseError> {
    let mut scanner = Scanner::new(input);
    let mut spans = Vec::new();
    loop {
        let span = scanner.next_span()?;
        if span.is_literal() && span.text.is_empty() {
            break;
        }
        spans.push(span);
    }
    Ok((spans, scanner.position()))
}
