//! Removes the blank lines that directive-only source lines would otherwise
//! leave in the output.
//!
//! A run of directives "owns" its line when the literal before it ends at a
//! line break and the literal after it starts at one (whitespace between the
//! break and the directive is ignored). For such a run the indentation
//! before the first directive and the line break after the last one are
//! dropped. Only literal text is ever changed.

use std::borrow::Cow;
use std::ops::Range;

use tracing::debug;

use crate::scanner::Span;

/// Byte range to keep of a literal that precedes a directive-only line, or
/// `None` if it does not end at a line boundary.
///
/// `at_line_start` is set when the literal itself begins a line, in which
/// case pure whitespace also counts as a boundary.
fn tail_boundary(text: &str, at_line_start: bool) -> Option<Range<usize>> {
    for (idx, ch) in text.char_indices().rev() {
        if ch == '\n' {
            return Some(0..idx + 1);
        }
        if !ch.is_whitespace() {
            return None;
        }
    }
    at_line_start.then_some(0..0)
}

/// Byte range to keep of a literal that follows a directive-only line, or
/// `None` if it does not start at a line boundary.
///
/// `at_end` is set for the final span of the template, where trailing pure
/// whitespace also counts as a boundary.
fn head_boundary(text: &str, at_end: bool) -> Option<Range<usize>> {
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            return Some(idx + 1..text.len());
        }
        if !ch.is_whitespace() {
            return None;
        }
    }
    at_end.then_some(text.len()..text.len())
}

fn retain<'a>(text: &mut Cow<'a, str>, range: Range<usize>) {
    match text {
        Cow::Borrowed(borrowed) => {
            let whole: &'a str = *borrowed;
            *borrowed = &whole[range];
        }
        Cow::Owned(owned) => {
            owned.truncate(range.end);
            owned.drain(..range.start);
        }
    }
}

/// Runs the blank-line pass over the scanned spans in place.
pub(crate) fn trim_blank_lines(spans: &mut [Span<'_>]) {
    let count = spans.len();
    // `Some(left)` while inside a candidate run; `left` is the index of the
    // literal before the run, if there is one.
    let mut run: Option<Option<usize>> = None;
    // Literal whose leading line break was removed by the previous run, so
    // that it now begins a line.
    let mut fresh_line: Option<usize> = None;
    let mut trimmed = 0usize;

    for idx in 0..count {
        if spans[idx].is_literal() {
            if run.take().is_some() {
                debug!(span = idx, "directive run shares its line with text, not trimming");
            }
            continue;
        }

        if run.is_none() {
            let opens = match idx.checked_sub(1) {
                None => true,
                Some(prev) => {
                    let at_line_start = prev == 0 || fresh_line == Some(prev);
                    spans[prev].is_literal()
                        && tail_boundary(&spans[prev].text, at_line_start).is_some()
                }
            };
            if !opens {
                continue;
            }
            run = Some(idx.checked_sub(1));
        }

        let next = idx + 1;
        let closes = next == count
            || (spans[next].is_literal()
                && head_boundary(&spans[next].text, next + 1 == count).is_some());
        if !closes {
            continue;
        }

        if let Some(Some(prev)) = run.take() {
            let at_line_start = prev == 0 || fresh_line == Some(prev);
            if let Some(keep) = tail_boundary(&spans[prev].text, at_line_start) {
                retain(&mut spans[prev].text, keep);
            }
        }
        if next < count {
            if let Some(keep) = head_boundary(&spans[next].text, next + 1 == count) {
                retain(&mut spans[next].text, keep);
            }
            fresh_line = Some(next);
        }
        trimmed += 1;
    }

    debug!(spans = count, lines = trimmed, "trimmed directive-only lines");
}
