use crate::cursor::Cursor;
use crate::error::{ParseError, ParseErrorKind};

/// Words that may not be used as a loop variable.
pub const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "elif", "else", "end", "false", "for", "if", "in", "not",
    "null", "or", "true",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// The outcome of parsing one directive's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive<'a> {
    For { variable: &'a str, source: &'a str },
    If { condition: &'a str },
    Elif { condition: &'a str },
    Else,
    End,
    /// Anything without a recognised keyword is substituted.
    Expression { expression: &'a str },
}

/// Parses directive text that started at `line`/`column` in the template.
pub(crate) fn parse_directive(
    text: &str,
    line: usize,
    column: usize,
) -> Result<Directive<'_>, ParseError> {
    let mut cursor = Cursor::new(text);
    // Positions inside the directive are relative; only its first line is
    // offset by the column the directive started at.
    let error_at = |cursor: &Cursor<'_>, kind: ParseErrorKind| {
        let inner_line = cursor.line();
        let adjusted_column = if inner_line == 1 {
            cursor.column() + column
        } else {
            cursor.column()
        };
        ParseError::new(inner_line + line - 1, adjusted_column, kind)
    };

    skip_blank(&mut cursor);
    let keyword = parse_identifier(&mut cursor);
    match keyword {
        "for" => {
            skip_blank(&mut cursor);
            let variable = parse_identifier(&mut cursor);
            if variable.is_empty() || is_reserved(variable) {
                return Err(error_at(&cursor, ParseErrorKind::IdentifierExpected));
            }
            skip_blank(&mut cursor);
            if parse_identifier(&mut cursor) != "in" {
                return Err(error_at(&cursor, ParseErrorKind::InExpected));
            }
            skip_blank(&mut cursor);
            let source = cursor.rest().trim();
            if source.is_empty() {
                return Err(error_at(&cursor, ParseErrorKind::ExpressionExpected));
            }
            Ok(Directive::For { variable, source })
        }
        "if" | "elif" => {
            skip_blank(&mut cursor);
            let condition = cursor.rest().trim();
            if condition.is_empty() {
                return Err(error_at(&cursor, ParseErrorKind::ExpressionExpected));
            }
            if keyword == "if" {
                Ok(Directive::If { condition })
            } else {
                Ok(Directive::Elif { condition })
            }
        }
        "else" | "end" => {
            skip_blank(&mut cursor);
            if !cursor.rest().trim().is_empty() {
                return Err(error_at(&cursor, ParseErrorKind::UnexpectedContent));
            }
            if keyword == "else" {
                Ok(Directive::Else)
            } else {
                Ok(Directive::End)
            }
        }
        _ => Ok(Directive::Expression {
            expression: text.trim(),
        }),
    }
}

fn skip_blank(cursor: &mut Cursor<'_>) {
    cursor.skip_while(char::is_whitespace);
}

/// Consumes an identifier (letters, digits and `_`, not starting with a
/// digit). Returns an empty string if none starts here.
fn parse_identifier<'a>(cursor: &mut Cursor<'a>) -> &'a str {
    let start = cursor.pos();
    let first = cursor.peek(0);
    if !(first.is_alphabetic() || first == '_') {
        return "";
    }
    cursor.skip_while(|ch| ch.is_alphanumeric() || ch == '_');
    cursor.substring(start, cursor.pos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_for_directive() {
        assert_eq!(
            parse_directive(" for item in items ", 1, 2),
            Ok(Directive::For {
                variable: "item",
                source: "items"
            })
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_directive_keeps_source_verbatim() {
        assert_eq!(
            parse_directive("for i in range(0, len(logs))", 1, 2),
            Ok(Directive::For {
                variable: "i",
                source: "range(0, len(logs))"
            })
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_missing_identifier() {
        let err = parse_directive(" for  in x", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::IdentifierExpected);
        let err = parse_directive(" for 1x in x", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::IdentifierExpected);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_reserved_identifier() {
        let err = parse_directive("for if in x", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::IdentifierExpected);
        // Reported after the offending word.
        assert_eq!((err.line, err.column), (1, 8));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_missing_in() {
        let err = parse_directive(" for x of xs ", 4, 10).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InExpected);
        assert_eq!((err.line, err.column), (4, 19));
        let err = parse_directive("for x inside xs", 1, 0).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InExpected);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_missing_source() {
        let err = parse_directive(" for x in ", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpressionExpected);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_position_on_later_line() {
        let err = parse_directive(" for x\n  of xs", 3, 20).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InExpected);
        // Second line of the directive: no column offset applied.
        assert_eq!((err.line, err.column), (4, 4));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_if_and_elif() {
        assert_eq!(
            parse_directive(" if a and b ", 1, 2),
            Ok(Directive::If {
                condition: "a and b"
            })
        );
        assert_eq!(
            parse_directive("elif(x)", 1, 2),
            Ok(Directive::Elif { condition: "(x)" })
        );
        let err = parse_directive(" if ", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpressionExpected);
        let err = parse_directive("elif", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpressionExpected);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_else_and_end() {
        assert_eq!(parse_directive(" else ", 1, 2), Ok(Directive::Else));
        assert_eq!(parse_directive("end", 1, 2), Ok(Directive::End));
        let err = parse_directive(" else if x ", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedContent);
        assert_eq!((err.line, err.column), (1, 8));
        let err = parse_directive("end for", 1, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedContent);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_substitution() {
        assert_eq!(
            parse_directive(" user.name ", 1, 2),
            Ok(Directive::Expression {
                expression: "user.name"
            })
        );
        // Keywords only count as whole identifiers.
        assert_eq!(
            parse_directive(" format ", 1, 2),
            Ok(Directive::Expression {
                expression: "format"
            })
        );
        assert_eq!(
            parse_directive(" 1 + 2 ", 1, 2),
            Ok(Directive::Expression { expression: "1 + 2" })
        );
    }
}
