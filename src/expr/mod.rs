//! The built-in expression language.
//!
//! Expressions are small Python-flavoured formulas: literals, variables,
//! attribute and index access, arithmetic, comparisons, membership tests,
//! boolean logic and a handful of functions (`len`, `range`, `str`, `int`).

mod lexer;
mod parser;

use std::cmp::Ordering;

use tracing::trace;

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::{Context, Value};

use parser::{BinaryOp, Expr, parse_expression};

/// The evaluator used when none is supplied.
///
/// In strict mode (the default) an undefined variable or a missing map key
/// is an error; otherwise both evaluate to `null`.
///
/// ```
/// use etlate::{Context, DefaultEvaluator, Evaluator, Value};
///
/// let context = Context::new().with("xs", vec![1, 2, 3]);
/// let evaluator = DefaultEvaluator::new();
/// assert_eq!(
///     evaluator.evaluate("len(xs) * 2", &context).unwrap(),
///     Value::from(6)
/// );
/// assert!(evaluator.evaluate("missing", &context).is_err());
///
/// let lenient = DefaultEvaluator::new().strict(false);
/// assert_eq!(lenient.evaluate("missing", &context).unwrap(), Value::Null);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DefaultEvaluator {
    strict: bool,
}

impl Default for DefaultEvaluator {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl DefaultEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    fn missing(&self, err: EvalError) -> EvalResult<Value> {
        if self.strict { Err(err) } else { Ok(Value::Null) }
    }

    fn eval(&self, expr: &Expr, context: &Context) -> EvalResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => match context.get(name) {
                Some(value) => Ok(value.clone()),
                None => self.missing(EvalError::UndefinedVariable { name: name.clone() }),
            },
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item, context))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),
            Expr::Attribute(object, name) => match self.eval(object, context)? {
                Value::Map(mut map) => match map.remove(name) {
                    Some(value) => Ok(value),
                    None => self.missing(EvalError::UnknownKey { key: name.clone() }),
                },
                _ => self.missing(EvalError::UnknownKey { key: name.clone() }),
            },
            Expr::Index(object, index) => {
                let object = self.eval(object, context)?;
                let index = self.eval(index, context)?;
                self.index(object, index)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, context))
                    .collect::<EvalResult<Vec<_>>>()?;
                call(name, args)
            }
            Expr::Negate(inner) => match self.eval(inner, context)? {
                Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(EvalError::custom(format!(
                    "bad operand type for unary -: {}",
                    other.type_name()
                ))),
            },
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner, context)?.is_truthy())),
            Expr::And(left, right) => {
                let left = self.eval(left, context)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right, context)
            }
            Expr::Or(left, right) => {
                let left = self.eval(left, context)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                self.eval(right, context)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, context)?;
                let right = self.eval(right, context)?;
                binary(*op, left, right)
            }
        }
    }

    fn index(&self, object: Value, index: Value) -> EvalResult<Value> {
        match (object, index) {
            (Value::Array(mut items), Value::Int(i)) => {
                let len = items.len();
                match resolve_index(i, len) {
                    Some(idx) => Ok(items.swap_remove(idx)),
                    None => Err(EvalError::IndexOutOfRange {
                        index: i.to_string(),
                    }),
                }
            }
            (Value::String(s), Value::Int(i)) => {
                let len = s.chars().count();
                resolve_index(i, len)
                    .and_then(|idx| s.chars().nth(idx))
                    .map(|ch| Value::String(ch.to_string()))
                    .ok_or_else(|| EvalError::IndexOutOfRange {
                        index: i.to_string(),
                    })
            }
            (range @ Value::Range { start, step, .. }, Value::Int(i)) => {
                let len = range.len().unwrap_or(0);
                resolve_index(i, len)
                    .and_then(|idx| i64::try_from(idx).ok())
                    .and_then(|idx| idx.checked_mul(step))
                    .and_then(|offset| start.checked_add(offset))
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::IndexOutOfRange {
                        index: i.to_string(),
                    })
            }
            (Value::Map(mut map), Value::String(key)) => match map.remove(&key) {
                Some(value) => Ok(value),
                None => self.missing(EvalError::UnknownKey { key }),
            },
            (object, index) => Err(EvalError::type_mismatch("[]", &object, &index)),
        }
    }
}

impl Evaluator for DefaultEvaluator {
    fn evaluate(&self, expression: &str, context: &Context) -> EvalResult<Value> {
        trace!(expression, "evaluating");
        let expr = parse_expression(expression)?;
        self.eval(&expr, context)
    }
}

/// Maps a possibly negative index onto `0..len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        i128::from(index) + len as i128
    } else {
        i128::from(index)
    };
    usize::try_from(resolved).ok().filter(|idx| *idx < len)
}

fn call(name: &str, args: Vec<Value>) -> EvalResult<Value> {
    let arity = |expected: &[usize]| {
        if expected.contains(&args.len()) {
            Ok(())
        } else {
            Err(EvalError::Arity {
                name: name.to_string(),
                found: args.len(),
            })
        }
    };
    let bad_argument = |value: &Value| EvalError::BadArgument {
        name: name.to_string(),
        ty: value.type_name().to_string(),
    };

    match name {
        "len" => {
            arity(&[1])?;
            args[0].len().map(Value::from).ok_or_else(|| bad_argument(&args[0]))
        }
        "str" => {
            arity(&[1])?;
            Ok(Value::String(args[0].to_string()))
        }
        "int" => {
            arity(&[1])?;
            match &args[0] {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| EvalError::custom(format!("invalid integer literal '{}'", s))),
                other => Err(bad_argument(other)),
            }
        }
        "range" => {
            let mut bounds = Vec::with_capacity(args.len());
            for arg in &args {
                bounds.push(arg.as_i64().ok_or_else(|| bad_argument(arg))?);
            }
            let (start, end, step) = match bounds[..] {
                [end] => (0, end, 1),
                [start, end] => (start, end, 1),
                [start, end, step] => (start, end, step),
                _ => {
                    return Err(EvalError::Arity {
                        name: name.to_string(),
                        found: args.len(),
                    });
                }
            };
            if step == 0 {
                return Err(EvalError::custom("range() step must not be zero"));
            }
            Ok(Value::Range { start, end, step })
        }
        _ => Err(EvalError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn float_op(op: BinaryOp, left: &Value, right: &Value, f: fn(f64, f64) -> f64) -> EvalResult<Value> {
    match (as_f64(left), as_f64(right)) {
        (Some(a), Some(b)) => Ok(Value::Float(f(a, b))),
        _ => Err(EvalError::type_mismatch(op.symbol(), left, right)),
    }
}

fn is_zero(value: &Value) -> bool {
    as_f64(value) == Some(0.0)
}

/// Integer division rounding towards negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

/// Remainder taking the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        Some(remainder + b)
    } else {
        Some(remainder)
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_f64(left) == as_f64(right)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => as_f64(left)?.partial_cmp(&as_f64(right)?),
    }
}

fn contains(container: &Value, item: &Value) -> EvalResult<bool> {
    match (container, item) {
        (Value::Array(items), _) => Ok(items.iter().any(|candidate| values_equal(candidate, item))),
        (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Map(map), _) => Ok(item.as_str().is_some_and(|key| map.contains_key(key))),
        (Value::Range { step: 0, .. }, _) => Ok(false),
        (Value::Range { start, end, step }, Value::Int(i)) => {
            let within = if *step > 0 {
                start <= i && i < end
            } else {
                end < i && i <= start
            };
            Ok(within && (i128::from(*i) - i128::from(*start)) % i128::from(*step) == 0)
        }
        (Value::Range { .. }, _) => Ok(false),
        _ => Err(EvalError::type_mismatch("in", item, container)),
    }
}

/// Upper bound on the byte length of a repeated string.
const MAX_REPEAT_LEN: usize = 1 << 24;

/// `s * n`; a negative count yields the empty string.
fn repeat(s: &str, n: i64) -> EvalResult<String> {
    let count = usize::try_from(n).unwrap_or(0);
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_REPEAT_LEN => Ok(s.repeat(count)),
        _ => Err(EvalError::Overflow),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(&left, &right)
                .ok_or_else(|| EvalError::type_mismatch(op.symbol(), &left, &right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::In => contains(&right, &left).map(Value::Bool),
        BinaryOp::NotIn => contains(&right, &left).map(|found| Value::Bool(!found)),
        BinaryOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::Array(mut a), Value::Array(b)) => {
                a.extend(b);
                Ok(Value::Array(a))
            }
            (left, right) => float_op(op, &left, &right, |a, b| a + b),
        },
        BinaryOp::Sub => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int).ok_or(EvalError::Overflow),
            _ => float_op(op, &left, &right, |a, b| a - b),
        },
        BinaryOp::Mul => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).ok_or(EvalError::Overflow),
            (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                repeat(s, *n).map(Value::String)
            }
            _ => float_op(op, &left, &right, |a, b| a * b),
        },
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if is_zero(&right) => {
            if as_f64(&left).is_some() {
                Err(EvalError::DivisionByZero)
            } else {
                Err(EvalError::type_mismatch(op.symbol(), &left, &right))
            }
        }
        BinaryOp::Div => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => match a.checked_rem(*b) {
                Some(0) => a.checked_div(*b).map(Value::Int).ok_or(EvalError::Overflow),
                Some(_) => Ok(Value::Float(*a as f64 / *b as f64)),
                None => Err(EvalError::Overflow),
            },
            _ => float_op(op, &left, &right, |a, b| a / b),
        },
        BinaryOp::FloorDiv => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => floor_div(*a, *b).map(Value::Int).ok_or(EvalError::Overflow),
            _ => float_op(op, &left, &right, |a, b| (a / b).floor()),
        },
        BinaryOp::Mod => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => floor_mod(*a, *b).map(Value::Int).ok_or(EvalError::Overflow),
            _ => float_op(op, &left, &right, |a, b| a - b * (a / b).floor()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let mut user = std::collections::BTreeMap::new();
        user.insert("name".to_string(), Value::from("ada"));
        user.insert("tags".to_string(), Value::from(vec!["x", "y"]));
        Context::new()
            .with("n", 7)
            .with("f", 2.5)
            .with("s", "hello")
            .with("xs", vec![10, 20, 30])
            .with("user", user)
            .with("empty", Vec::<Value>::new())
    }

    fn eval(expression: &str) -> EvalResult<Value> {
        DefaultEvaluator::new().evaluate(expression, &context())
    }

    fn ok(expression: &str) -> Value {
        eval(expression).unwrap()
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_literals_and_variables() {
        assert_eq!(ok("42"), Value::from(42));
        assert_eq!(ok("'hi'"), Value::from("hi"));
        assert_eq!(ok("None"), Value::Null);
        assert_eq!(ok("True"), Value::from(true));
        assert_eq!(ok("n"), Value::from(7));
        assert_eq!(ok("[n, 's']"), Value::from(vec![Value::from(7), Value::from("s")]));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_strictness() {
        assert_eq!(
            eval("nope"),
            Err(EvalError::UndefinedVariable {
                name: "nope".to_string()
            })
        );
        assert!(matches!(eval("user.age"), Err(EvalError::UnknownKey { .. })));

        let lenient = DefaultEvaluator::new().strict(false);
        assert_eq!(lenient.evaluate("nope", &context()).unwrap(), Value::Null);
        assert_eq!(lenient.evaluate("user.age", &context()).unwrap(), Value::Null);
        assert!(!lenient.is_strict());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_attribute_and_index() {
        assert_eq!(ok("user.name"), Value::from("ada"));
        assert_eq!(ok("user['name']"), Value::from("ada"));
        assert_eq!(ok("user.tags[-1]"), Value::from("y"));
        assert_eq!(ok("xs[0]"), Value::from(10));
        assert_eq!(ok("xs[-3]"), Value::from(10));
        assert_eq!(ok("s[1]"), Value::from("e"));
        assert_eq!(ok("range(0, 10, 3)[-1]"), Value::from(9));
        assert!(matches!(eval("xs[3]"), Err(EvalError::IndexOutOfRange { .. })));
        assert!(matches!(eval("n[0]"), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arithmetic() {
        assert_eq!(ok("1 + 2 * 3"), Value::from(7));
        assert_eq!(ok("n - 10"), Value::from(-3));
        assert_eq!(ok("n + f"), Value::from(9.5));
        assert_eq!(ok("6 / 3"), Value::from(2));
        assert_eq!(ok("7 / 2"), Value::from(3.5));
        assert_eq!(ok("str(f * 2)"), Value::from("5.0"));
        assert_eq!(ok("str(6 / 3)"), Value::from("2"));
        assert_eq!(ok("-7 // 2"), Value::from(-4));
        assert_eq!(ok("-7 % 3"), Value::from(2));
        assert_eq!(ok("7 % -3"), Value::from(-2));
        assert_eq!(ok("'ab' + 'c'"), Value::from("abc"));
        assert_eq!(ok("'ab' * 2"), Value::from("abab"));
        assert_eq!(ok("[1] + [2]"), Value::from(vec![1, 2]));
        assert_eq!(ok("-(n)"), Value::from(-7));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arithmetic_errors() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(eval("'ab' * 9223372036854775807"), Err(EvalError::Overflow));
        assert_eq!(eval("9223372036854775807 * s"), Err(EvalError::Overflow));
        assert_eq!(ok("'' * 9223372036854775807"), Value::from(""));
        assert_eq!(ok("'ab' * -3"), Value::from(""));
        assert_eq!(
            eval("'a' - 1"),
            Err(EvalError::TypeMismatch {
                op: "-".to_string(),
                left: "string".to_string(),
                right: "int".to_string(),
            })
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comparisons_and_membership() {
        assert_eq!(ok("n == 7.0"), Value::from(true));
        assert_eq!(ok("n != 7"), Value::from(false));
        assert_eq!(ok("'a' < 'b'"), Value::from(true));
        assert_eq!(ok("f >= 2"), Value::from(true));
        assert_eq!(ok("20 in xs"), Value::from(true));
        assert_eq!(ok("'ell' in s"), Value::from(true));
        assert_eq!(ok("'name' in user"), Value::from(true));
        assert_eq!(ok("3 in range(0, 10, 3)"), Value::from(true));
        assert_eq!(ok("4 in range(0, 10, 3)"), Value::from(false));
        assert_eq!(ok("5 not in xs"), Value::from(true));
        assert!(matches!(eval("s < 1"), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_zero_step_range_is_empty() {
        let context = Context::new().with(
            "r",
            Value::Range {
                start: 5,
                end: 0,
                step: 0,
            },
        );
        let evaluator = DefaultEvaluator::new();
        assert_eq!(evaluator.evaluate("3 in r", &context), Ok(Value::from(false)));
        assert_eq!(evaluator.evaluate("5 not in r", &context), Ok(Value::from(true)));
        assert_eq!(evaluator.evaluate("len(r)", &context), Ok(Value::from(0)));
        assert!(matches!(
            evaluator.evaluate("r[0]", &context),
            Err(EvalError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    #[ntest::timeout(1000)]
    fn test_deep_nesting_is_rejected() {
        let unary = format!("{}1", "-".repeat(200_000));
        let nots = format!("{}x", "not ".repeat(10_000));
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let lists = format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000));
        for expression in [&unary, &nots, &parens, &lists] {
            match eval(expression) {
                Err(EvalError::Syntax { message, .. }) => {
                    assert_eq!(message, "expression nested too deeply");
                }
                other => panic!("expected a nesting error, got {:?}", other),
            }
        }

        // Moderate nesting still evaluates.
        assert_eq!(ok(&format!("{}7{}", "(".repeat(50), ")".repeat(50))), Value::from(7));
        assert_eq!(ok(&format!("{}7", "--".repeat(20))), Value::from(7));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_logic_short_circuits() {
        assert_eq!(ok("empty or 'fallback'"), Value::from("fallback"));
        assert_eq!(ok("n and s"), Value::from("hello"));
        // The right operand is never evaluated.
        assert_eq!(ok("0 and nope"), Value::from(0));
        assert_eq!(ok("n || nope"), Value::from(7));
        assert_eq!(ok("not empty"), Value::from(true));
        assert_eq!(ok("!n"), Value::from(false));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_functions() {
        assert_eq!(ok("len(xs)"), Value::from(3));
        assert_eq!(ok("len(s)"), Value::from(5));
        assert_eq!(ok("str(n) + '!'"), Value::from("7!"));
        assert_eq!(ok("int('12') + int(f)"), Value::from(14));
        assert_eq!(
            ok("range(3)"),
            Value::Range {
                start: 0,
                end: 3,
                step: 1
            }
        );
        assert!(matches!(eval("len(n)"), Err(EvalError::BadArgument { .. })));
        assert!(matches!(eval("len()"), Err(EvalError::Arity { found: 0, .. })));
        assert!(matches!(eval("range()"), Err(EvalError::Arity { found: 0, .. })));
        assert!(matches!(eval("range(1, 2, 3, 4)"), Err(EvalError::Arity { found: 4, .. })));
        assert!(matches!(eval("range(0, 1, 0)"), Err(EvalError::Custom(_))));
        assert!(matches!(eval("upper(s)"), Err(EvalError::UnknownFunction { .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_syntax_errors_surface() {
        assert!(matches!(eval(""), Err(EvalError::Syntax { offset: 0, .. })));
        assert!(matches!(eval("n +"), Err(EvalError::Syntax { offset: 3, .. })));
        assert!(matches!(eval("n n"), Err(EvalError::Syntax { offset: 2, .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_iterate_and_truthy() {
        let evaluator = DefaultEvaluator::new();
        let context = context();
        let items: Vec<Value> = evaluator.iterate("range(3)", &context).unwrap().collect();
        assert_eq!(items, vec![Value::from(0), Value::from(1), Value::from(2)]);
        assert!(evaluator.truthy("len(xs) > 2", &context).unwrap());
        assert!(!evaluator.truthy("empty", &context).unwrap());
    }
}
