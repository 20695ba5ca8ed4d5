//! A small text templating engine.
//!
//! Templates are plain text with `{% ... %}` directives:
//!
//! - `{% for name in expression %} ... {% end %}` repeats its body once per
//!   item, binding `name` in the context;
//! - `{% if expression %} ... {% elif expression %} ... {% else %} ... {% end %}`
//!   picks one branch;
//! - any other `{% expression %}` is replaced by the value of the expression.
//!
//! Inside a directive `%%` stands for a literal `%`, so `{% a %%} b %}`
//! carries the expression text `a %} b`. A directive that is alone on its
//! line takes its line break and indentation with it.
//!
//! Expressions are opaque to the template core. They are handed to an
//! [`Evaluator`]; [`DefaultEvaluator`] implements a small Python-flavoured
//! expression language.
//!
//! ```
//! use etlate::Context;
//!
//! let mut context = Context::new().with("items", vec!["a", "b"]);
//! let out = etlate::render(
//!     "<ul>\n{% for item in items %}\n  <li>{% item %}</li>\n{% end %}\n</ul>\n",
//!     &mut context,
//! )
//! .unwrap();
//! assert_eq!(out, "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
//! ```

mod ast;
mod cursor;
mod directive;
mod engine;
mod error;
mod evaluator;
mod expr;
mod interface;
mod parser;
mod render;
mod scanner;
mod template;
mod trim;
mod value;

// Public exports.
pub use ast::{Ast, Child, Node, NodeId, NodeKind};
pub use directive::RESERVED;
pub use engine::{Engine, EngineConfig};
pub use error::{
    ErrorCategory, EtlateError, EtlateResult, EvalError, EvalResult, ParseError, ParseErrorKind,
};
pub use evaluator::Evaluator;
pub use expr::DefaultEvaluator;
pub use interface::EtlateInterface;
pub use template::Template;
pub use value::{Context, Value, ValueIter};

/// Scans, trims and builds `text` into a tree, without rendering it.
///
/// # Errors
///
/// Returns the first [`ParseError`] found; no partial tree is produced.
///
/// ```
/// use etlate::{Child, NodeKind};
///
/// let ast = etlate::process("{% if a %}x{% else %}y{% end %}").unwrap();
/// let Child::Node(id) = ast.root()[0] else { unreachable!() };
/// assert!(matches!(ast.node(id).kind(), NodeKind::IfElse { .. }));
///
/// let err = etlate::process("{% else %}").unwrap_err();
/// assert_eq!(err.to_string(), "1:2: unexpected else branch");
/// ```
pub fn process(text: &str) -> Result<Ast, ParseError> {
    parser::process(text, EngineConfig::default().trim_blank_lines)
}

/// Processes and renders `text` with the [`DefaultEvaluator`].
///
/// # Errors
///
/// Returns [`EtlateError::Parse`] for malformed templates and
/// [`EtlateError::Evaluation`] when an expression fails.
pub fn render(text: &str, context: &mut Context) -> EtlateResult<String> {
    Template::new(text)?.render(context, &DefaultEvaluator::new())
}
