use thiserror::Error;

pub type EtlateResult<T> = std::result::Result<T, EtlateError>;

/// Result type used by [`crate::Evaluator`] implementations.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// The broad class a [`ParseErrorKind`] falls into.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A directive keyword was used with malformed trailing content.
    Syntax,
    /// Blocks do not nest correctly: a stray `else`, `elif` or `end`, or a
    /// block left open at the end of the template.
    Structural,
    /// The template ended inside an open `{% ... %}` tag.
    UnterminatedDirective,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ParseErrorKind {
    #[error("identifier expected")]
    IdentifierExpected,
    #[error("keyword 'in' expected")]
    InExpected,
    #[error("expression expected")]
    ExpressionExpected,
    #[error("unexpected content after directive")]
    UnexpectedContent,
    #[error("unexpected else branch")]
    UnexpectedElse,
    #[error("unexpected elif branch")]
    UnexpectedElif,
    #[error("unexpected block end")]
    UnexpectedBlockEnd,
    #[error("unclosed block")]
    UnclosedBlock,
    #[error("unexpected end of input")]
    UnexpectedEof,
}

impl ParseErrorKind {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::IdentifierExpected
            | Self::InExpected
            | Self::ExpressionExpected
            | Self::UnexpectedContent => ErrorCategory::Syntax,
            Self::UnexpectedElse
            | Self::UnexpectedElif
            | Self::UnexpectedBlockEnd
            | Self::UnclosedBlock => ErrorCategory::Structural,
            Self::UnexpectedEof => ErrorCategory::UnterminatedDirective,
        }
    }
}

/// A positioned parse failure.
///
/// `line` is 1-based and `column` is 0-based, so the error renders as
/// `"<line>:<column>: <description>"`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("{line}:{column}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    #[source]
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub const fn new(line: usize, column: usize, kind: ParseErrorKind) -> Self {
        Self { line, column, kind }
    }

    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

/// Errors raised while evaluating a directive's expression.
///
/// The template core never inspects these; they are handed back to the
/// caller unchanged inside [`EtlateError::Evaluation`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum EvalError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("expression syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },
    #[error("unsupported operand types for '{op}': {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },
    #[error("value of type {ty} is not iterable")]
    NotIterable { ty: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of range")]
    IndexOutOfRange { index: String },
    #[error("unknown key '{key}'")]
    UnknownKey { key: String },
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
    #[error("function '{name}' called with {found} arguments")]
    Arity { name: String, found: usize },
    #[error("function '{name}' does not accept a value of type {ty}")]
    BadArgument { name: String, ty: String },
    #[error("integer overflow")]
    Overflow,
    #[error("{0}")]
    Custom(String),
}

impl EvalError {
    /// Wraps an arbitrary message, for evaluators that are not the built-in
    /// [`crate::DefaultEvaluator`].
    pub fn custom<T: std::fmt::Display>(message: T) -> Self {
        Self::Custom(message.to_string())
    }

    pub(crate) fn type_mismatch(op: &str, left: &crate::Value, right: &crate::Value) -> Self {
        Self::TypeMismatch {
            op: op.to_string(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum EtlateError {
    #[error("Template already exists: {template_name}")]
    TemplateExists { template_name: String },
    #[error("Template not found: {template_name}")]
    MissingTemplate { template_name: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Evaluation error in '{expression}': {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvalError,
    },
}

impl EtlateError {
    pub(crate) fn evaluation(expression: &str, source: EvalError) -> Self {
        Self::Evaluation {
            expression: expression.to_string(),
            source,
        }
    }
}
