use crate::error::EvalResult;
use crate::expr::lexer::{Spanned, Token, syntax_error, tokenize};
use crate::value::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

impl BinaryOp {
    pub(crate) const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Variable(String),
    List(Vec<Expr>),
    Attribute(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Deepest expression tree the parser builds. Parsing and evaluation both
/// recurse once per level, so this bounds their stack use.
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Offset reported for errors at the end of input.
    end: usize,
    /// Levels of the tree currently being built above the parse position.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|spanned| &spanned.token)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|spanned| &spanned.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |spanned| spanned.offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(ident)) if ident == keyword)
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> EvalResult<()> {
        if self.consume(token) {
            Ok(())
        } else {
            Err(syntax_error(format!("expected {}", what), self.offset()))
        }
    }

    /// Descends `levels` more levels into the tree.
    fn enter(&mut self, levels: usize) -> EvalResult<()> {
        self.depth += levels;
        if self.depth > MAX_DEPTH {
            return Err(syntax_error("expression nested too deeply", self.offset()));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    // Precedence: OR -> AND -> NOT -> comparison -> additive ->
    // multiplicative -> unary -> postfix -> primary

    fn parse_or(&mut self) -> EvalResult<Expr> {
        self.enter(1)?;
        let mut chained = 0;
        let mut left = self.parse_and()?;
        while self.consume(&Token::OrOr) || self.consume_keyword("or") {
            self.enter(1)?;
            chained += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.leave(chained + 1);
        Ok(left)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut chained = 0;
        let mut left = self.parse_not()?;
        while self.consume(&Token::AndAnd) || self.consume_keyword("and") {
            self.enter(1)?;
            chained += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.leave(chained);
        Ok(left)
    }

    fn parse_not(&mut self) -> EvalResult<Expr> {
        if self.consume(&Token::Bang) || self.consume_keyword("not") {
            self.enter(1)?;
            let inner = self.parse_not()?;
            self.leave(1);
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> EvalResult<Expr> {
        let mut chained = 0;
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::GtEq) => BinaryOp::GtEq,
                Some(Token::Ident(ident)) if ident == "in" => BinaryOp::In,
                Some(Token::Ident(ident))
                    if ident == "not"
                        && matches!(self.peek_at(1), Some(Token::Ident(next)) if next == "in") =>
                {
                    BinaryOp::NotIn
                }
                _ => break,
            };
            self.pos += if op == BinaryOp::NotIn { 2 } else { 1 };
            self.enter(1)?;
            chained += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.leave(chained);
        Ok(left)
    }

    fn parse_additive(&mut self) -> EvalResult<Expr> {
        let mut chained = 0;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.enter(1)?;
            chained += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.leave(chained);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> EvalResult<Expr> {
        let mut chained = 0;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::SlashSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.enter(1)?;
            chained += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.leave(chained);
        Ok(left)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        // Unary plus is a no-op.
        while self.consume(&Token::Plus) {}
        if self.consume(&Token::Minus) {
            self.enter(1)?;
            let inner = self.parse_unary()?;
            self.leave(1);
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> EvalResult<Expr> {
        let mut chained = 0;
        let mut expr = self.parse_primary()?;
        loop {
            if self.peek() == Some(&Token::Dot)
                || self.peek() == Some(&Token::LBracket)
                || self.peek() == Some(&Token::LParen)
            {
                self.enter(1)?;
                chained += 1;
            }
            if self.consume(&Token::Dot) {
                let offset = self.offset();
                match self.bump() {
                    Some(Token::Ident(name)) => {
                        expr = Expr::Attribute(Box::new(expr), name);
                    }
                    _ => return Err(syntax_error("expected attribute name", offset)),
                }
            } else if self.consume(&Token::LBracket) {
                let index = self.parse_or()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek() == Some(&Token::LParen) {
                let Expr::Variable(name) = expr else {
                    return Err(syntax_error("only named functions can be called", self.offset()));
                };
                self.pos += 1;
                let args = self.parse_list(&Token::RParen, "')'")?;
                expr = Expr::Call(name, args);
            } else {
                self.leave(chained);
                return Ok(expr);
            }
        }
    }

    /// Parses comma separated expressions up to and including `close`.
    fn parse_list(&mut self, close: &Token, what: &str) -> EvalResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.consume(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if self.consume(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma, &format!("',' or {}", what))?;
            // Trailing comma.
            if self.consume(close) {
                return Ok(items);
            }
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        let offset = self.offset();
        let Some(token) = self.bump() else {
            return Err(syntax_error("unexpected end of expression", offset));
        };
        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(ident) => Ok(match ident.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "null" | "None" => Expr::Literal(Value::Null),
                "and" | "or" | "not" | "in" => {
                    return Err(syntax_error(
                        format!("unexpected keyword '{}'", ident),
                        offset,
                    ));
                }
                _ => Expr::Variable(ident),
            }),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::List(self.parse_list(&Token::RBracket, "']'")?)),
            other => Err(syntax_error(format!("unexpected token {:?}", other), offset)),
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// Parses a complete expression.
pub(crate) fn parse_expression(input: &str) -> EvalResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
        depth: 0,
    };
    if parser.peek().is_none() {
        return Err(syntax_error("empty expression", 0));
    }
    let expr = parser.parse_or()?;
    if parser.peek().is_some() {
        return Err(syntax_error("unexpected trailing input", parser.offset()));
    }
    Ok(expr)
}
