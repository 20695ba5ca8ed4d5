use std::mem;

use tracing::{debug, instrument};

use crate::ast::{Ast, Child, NodeId, NodeKind};
use crate::directive::{Directive, parse_directive};
use crate::error::{ParseError, ParseErrorKind};
use crate::scanner::{Span, scan};
use crate::trim::trim_blank_lines;

type ParseResult<T> = Result<T, ParseError>;

/// A block whose `{% end %}` has not been reached yet, with the children
/// collected for it so far.
struct Open {
    id: NodeId,
    children: Vec<Child>,
}

impl Open {
    const fn new(id: NodeId) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }
}

/// Builds the tree from a span sequence, tracking currently open blocks on
/// an explicit stack.
struct Builder {
    ast: Ast,
    open: Vec<Open>,
}

impl Builder {
    fn new() -> Self {
        Self {
            ast: Ast::default(),
            open: Vec::new(),
        }
    }

    #[inline]
    fn top(&self) -> Option<NodeId> {
        self.open.last().map(|open| open.id)
    }

    /// The sequence new children are appended to.
    fn sequence(&mut self) -> &mut Vec<Child> {
        match self.open.last_mut() {
            Some(open) => &mut open.children,
            None => self.ast.root_mut(),
        }
    }

    fn attach(&mut self, kind: NodeKind) -> NodeId {
        let parent = self.top();
        let id = self.ast.push(parent, kind);
        self.sequence().push(Child::Node(id));
        id
    }

    /// Pops the innermost open block and hands its children to the tree.
    fn close(&mut self) -> Option<NodeId> {
        let open = self.open.pop()?;
        self.ast.close(open.id, open.children);
        Some(open.id)
    }

    fn span(&mut self, span: &Span<'_>) -> ParseResult<()> {
        if span.is_literal() {
            if !span.text.is_empty() {
                self.sequence().push(Child::Text(span.text.to_string()));
            }
            return Ok(());
        }

        match parse_directive(&span.text, span.line, span.column)? {
            Directive::For { variable, source } => {
                let id = self.attach(NodeKind::For {
                    variable: variable.to_string(),
                    source: source.to_string(),
                    body: Vec::new(),
                });
                self.open.push(Open::new(id));
            }
            Directive::If { condition } => {
                let id = self.attach(NodeKind::If {
                    condition: condition.to_string(),
                    body: Vec::new(),
                });
                self.open.push(Open::new(id));
            }
            Directive::Else => {
                self.promote(span, ParseErrorKind::UnexpectedElse)?;
            }
            Directive::Elif { condition } => {
                let promoted = self.promote(span, ParseErrorKind::UnexpectedElif)?;
                // The chain continues as an `if` nested in the else branch,
                // which replaces the promoted node as the open block.
                let id = self.attach(NodeKind::If {
                    condition: condition.to_string(),
                    body: Vec::new(),
                });
                debug_assert_eq!(self.ast.node(id).parent(), Some(promoted));
                self.close();
                self.open.push(Open::new(id));
            }
            Directive::End => {
                if self.close().is_none() {
                    return Err(ParseError::new(
                        span.line,
                        span.column,
                        ParseErrorKind::UnexpectedBlockEnd,
                    ));
                }
            }
            Directive::Expression { expression } => {
                self.attach(NodeKind::Expression {
                    expression: expression.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Rewrites the open `If` on top of the stack into an `IfElse` in place,
    /// moving its collected children into the then-branch. The node keeps
    /// its id, so its position in the parent is unchanged and it stays the
    /// open block, now collecting into the else-branch.
    fn promote(&mut self, span: &Span<'_>, unexpected: ParseErrorKind) -> ParseResult<NodeId> {
        let error = || ParseError::new(span.line, span.column, unexpected.clone());
        let open = self.open.last_mut().ok_or_else(error)?;
        let kind = self.ast.kind_mut(open.id);
        let NodeKind::If { condition, .. } = kind else {
            return Err(error());
        };
        let promoted = NodeKind::IfElse {
            condition: mem::take(condition),
            then_branch: mem::take(&mut open.children),
            else_branch: Vec::new(),
        };
        *kind = promoted;
        Ok(open.id)
    }

    fn finish(self, end: (usize, usize)) -> ParseResult<Ast> {
        if !self.open.is_empty() {
            return Err(ParseError::new(end.0, end.1, ParseErrorKind::UnclosedBlock));
        }
        Ok(self.ast)
    }
}

/// Compiles template text into its tree.
///
/// Parsing stops at the first error; no partial tree is returned.
#[instrument(level = "debug", skip_all, fields(len = input.len()))]
pub(crate) fn process(input: &str, trim: bool) -> ParseResult<Ast> {
    let (mut spans, end) = scan(input)?;
    if trim {
        trim_blank_lines(&mut spans);
    }

    let mut builder = Builder::new();
    for span in &spans {
        builder.span(span)?;
    }
    let ast = builder.finish(end)?;
    debug!(spans = spans.len(), nodes = ast.len(), "processed template");
    Ok(ast)
}
