use crate::error::EvalResult;
use crate::value::{Context, Value, ValueIter};

/// Evaluates the expression text carried by directives.
///
/// The template core never looks inside an expression; it hands the text
/// to an `Evaluator` together with the current [`Context`] and uses the
/// result as a condition, a loop source or a substituted value.
///
/// Any closure `Fn(&str, &Context) -> EvalResult<Value>` is an evaluator.
///
/// ```
/// use etlate::{Context, EvalError, Template, Value};
///
/// let lookup = |expression: &str, context: &Context| {
///     context
///         .get(expression)
///         .cloned()
///         .ok_or_else(|| EvalError::custom(format!("no '{}'", expression)))
/// };
///
/// let template = Template::new("Hi {% name %}").unwrap();
/// let mut context = Context::new().with("name", "Ada");
/// assert_eq!(template.render(&mut context, &lookup).unwrap(), "Hi Ada");
/// ```
pub trait Evaluator {
    fn evaluate(&self, expression: &str, context: &Context) -> EvalResult<Value>;

    /// Boolean coercion for `if` and `elif` conditions.
    fn truthy(&self, expression: &str, context: &Context) -> EvalResult<bool> {
        Ok(self.evaluate(expression, context)?.is_truthy())
    }

    /// The sequence a `for` loop iterates over.
    ///
    /// Override this to feed loops from a source that is not a [`Value`],
    /// including unbounded ones; the caller is then responsible for
    /// bounding the render.
    fn iterate(&self, expression: &str, context: &Context) -> EvalResult<ValueIter> {
        self.evaluate(expression, context)?.into_items()
    }
}

impl<F> Evaluator for F
where
    F: Fn(&str, &Context) -> EvalResult<Value>,
{
    fn evaluate(&self, expression: &str, context: &Context) -> EvalResult<Value> {
        self(expression, context)
    }
}
