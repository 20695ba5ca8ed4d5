use std::slice;

use tracing::trace;

use crate::ast::{Ast, Child, NodeId, NodeKind};
use crate::error::{EtlateError, EtlateResult};
use crate::evaluator::Evaluator;
use crate::value::{Context, Value, ValueIter};

/// A `for` loop in progress.
struct LoopFrame<'t> {
    variable: &'t str,
    items: ValueIter,
    /// The binding the loop variable had before the first iteration.
    /// `None` until the first item has been bound.
    prior: Option<Option<Value>>,
    body: &'t [Child],
}

impl LoopFrame<'_> {
    fn restore(self, context: &mut Context) {
        if let Some(prior) = self.prior {
            trace!(variable = self.variable, "restoring loop variable");
            context.restore(self.variable, prior);
        }
    }
}

enum Work<'t> {
    Text(&'t str),
    Node(NodeId),
    Sequence(slice::Iter<'t, Child>),
    Loop(LoopFrame<'t>),
}

/// Renders `ast` against `context`.
///
/// The walk is driven by an explicit work stack, so its depth is bounded by
/// the nesting of blocks in the template, never by the number of loop
/// iterations.
///
/// `context` is only modified while a loop runs. Every loop variable is
/// restored before this returns, including when rendering fails.
pub(crate) fn render<E>(ast: &Ast, context: &mut Context, evaluator: &E) -> EtlateResult<String>
where
    E: Evaluator + ?Sized,
{
    let mut stack = vec![Work::Sequence(ast.root().iter())];
    let mut output = String::new();

    while let Some(work) = stack.pop() {
        if let Err(err) = step(ast, work, &mut stack, &mut output, context, evaluator) {
            unwind(stack, context);
            return Err(err);
        }
    }

    Ok(output)
}

fn step<'t, E>(
    ast: &'t Ast,
    work: Work<'t>,
    stack: &mut Vec<Work<'t>>,
    output: &mut String,
    context: &mut Context,
    evaluator: &E,
) -> EtlateResult<()>
where
    E: Evaluator + ?Sized,
{
    match work {
        Work::Text(text) => output.push_str(text),
        Work::Sequence(mut children) => {
            if let Some(child) = children.next() {
                stack.push(Work::Sequence(children));
                stack.push(match child {
                    Child::Text(text) => Work::Text(text),
                    Child::Node(id) => Work::Node(*id),
                });
            }
        }
        Work::Loop(mut frame) => match frame.items.next() {
            Some(item) => {
                trace!(variable = frame.variable, %item, "loop iteration");
                let previous = context.bind(frame.variable, item);
                if frame.prior.is_none() {
                    frame.prior = Some(previous);
                }
                let body = frame.body;
                stack.push(Work::Loop(frame));
                stack.push(Work::Sequence(body.iter()));
            }
            None => frame.restore(context),
        },
        Work::Node(id) => match ast.node(id).kind() {
            NodeKind::Expression { expression } => {
                let value = evaluator
                    .evaluate(expression, context)
                    .map_err(|err| EtlateError::evaluation(expression, err))?;
                output.push_str(&value.to_string());
            }
            NodeKind::If { condition, body } => {
                if truthy(evaluator, condition, context)? {
                    stack.push(Work::Sequence(body.iter()));
                }
            }
            NodeKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if truthy(evaluator, condition, context)? {
                    then_branch
                } else {
                    else_branch
                };
                stack.push(Work::Sequence(branch.iter()));
            }
            NodeKind::For {
                variable,
                source,
                body,
            } => {
                let items = evaluator
                    .iterate(source, context)
                    .map_err(|err| EtlateError::evaluation(source, err))?;
                stack.push(Work::Loop(LoopFrame {
                    variable,
                    items,
                    prior: None,
                    body,
                }));
            }
        },
    }
    Ok(())
}

fn truthy<E>(evaluator: &E, condition: &str, context: &Context) -> EtlateResult<bool>
where
    E: Evaluator + ?Sized,
{
    evaluator
        .truthy(condition, context)
        .map_err(|err| EtlateError::evaluation(condition, err))
}

/// Restores the loop variables of every loop still open, innermost first.
fn unwind(stack: Vec<Work<'_>>, context: &mut Context) {
    for work in stack.into_iter().rev() {
        if let Work::Loop(frame) = work {
            frame.restore(context);
        }
    }
}
