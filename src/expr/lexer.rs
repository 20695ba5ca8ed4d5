use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) offset: usize,
}

pub(crate) fn syntax_error(message: impl Into<String>, offset: usize) -> EvalError {
    EvalError::Syntax {
        message: message.into(),
        offset,
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.cursor;
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.advance(ch.len_utf8());
        }
        &self.input[start..self.cursor]
    }

    fn number(&mut self) -> EvalResult<Token> {
        let start = self.cursor;
        self.take_while(|ch| ch.is_ascii_digit());
        let rest = self.remaining();
        let is_float = rest.starts_with('.')
            && rest[1..].chars().next().is_some_and(|ch| ch.is_ascii_digit());
        if is_float {
            self.advance(1);
            self.take_while(|ch| ch.is_ascii_digit());
        }
        let text = &self.input[start..self.cursor];
        if is_float {
            text.parse()
                .map(Token::Float)
                .map_err(|_| syntax_error(format!("invalid number '{}'", text), start))
        } else {
            text.parse()
                .map(Token::Int)
                .map_err(|_| syntax_error(format!("integer '{}' out of range", text), start))
        }
    }

    fn string(&mut self, quote: char) -> EvalResult<Token> {
        let start = self.cursor;
        self.advance(1);
        let mut out = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(syntax_error("unterminated string literal", start));
            };
            self.advance(ch.len_utf8());
            match ch {
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(syntax_error("unterminated string literal", start));
                    };
                    self.advance(escaped.len_utf8());
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                ch if ch == quote => return Ok(Token::Str(out)),
                ch => out.push(ch),
            }
        }
    }

    fn symbol(&mut self) -> Option<Token> {
        let rest = self.remaining();
        let double = match rest.get(..2) {
            Some("//") => Some(Token::SlashSlash),
            Some("==") => Some(Token::EqEq),
            Some("!=") => Some(Token::NotEq),
            Some("<=") => Some(Token::LtEq),
            Some(">=") => Some(Token::GtEq),
            Some("&&") => Some(Token::AndAnd),
            Some("||") => Some(Token::OrOr),
            _ => None,
        };
        if let Some(token) = double {
            self.advance(2);
            return Some(token);
        }
        let single = match rest.chars().next()? {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '<' => Token::Lt,
            '>' => Token::Gt,
            '!' => Token::Bang,
            '.' => Token::Dot,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            _ => return None,
        };
        self.advance(1);
        Some(single)
    }
}

/// Splits an expression into tokens.
pub(crate) fn tokenize(input: &str) -> EvalResult<Vec<Spanned>> {
    let mut tokenizer = Tokenizer { input, cursor: 0 };
    let mut tokens = Vec::new();
    loop {
        tokenizer.take_while(char::is_whitespace);
        let offset = tokenizer.cursor;
        let Some(ch) = tokenizer.peek() else {
            return Ok(tokens);
        };
        let token = if ch.is_ascii_digit() {
            tokenizer.number()?
        } else if ch == '"' || ch == '\'' {
            tokenizer.string(ch)?
        } else if ch.is_alphabetic() || ch == '_' {
            let ident = tokenizer.take_while(|ch| ch.is_alphanumeric() || ch == '_');
            Token::Ident(ident.to_string())
        } else if let Some(symbol) = tokenizer.symbol() {
            symbol
        } else {
            return Err(syntax_error(format!("unexpected character '{}'", ch), offset));
        };
        tokens.push(Spanned { token, offset });
    }
}
