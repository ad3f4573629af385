//! Builds a nested node tree from the token stream.
//!
//! Scopes (environments, brace groups, bracketed options) live on an explicit
//! stack. An `\end{x}` closes any scopes still open inside `x`, and a stray
//! `\end` is ignored, so most malformed input still produces a tree. A frame
//! that is never explicitly closed is the one unrecoverable case.

use crate::lexer::{Token, TokenKind};
use forge_core::ParseError;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Plain text; the content is the span.
    Text(Range<usize>),
    ParBreak(Range<usize>),
    Command {
        name: String,
        span: Range<usize>,
        line: usize,
    },
    /// `{...}`
    Group {
        children: Vec<Node>,
        span: Range<usize>,
    },
    /// `[...]` directly following a command or an environment start.
    Optional {
        children: Vec<Node>,
        span: Range<usize>,
    },
    Math {
        source: String,
        display: bool,
        span: Range<usize>,
        line: usize,
    },
    Verbatim {
        body: String,
        span: Range<usize>,
    },
    Environment {
        name: String,
        children: Vec<Node>,
        /// Whole environment, from `\begin` to `\end`.
        span: Range<usize>,
        /// Between the `\begin{..}` and `\end{..}` markers.
        body: Range<usize>,
        line: usize,
    },
}

impl Node {
    pub fn span(&self) -> Range<usize> {
        match self {
            Node::Text(span) | Node::ParBreak(span) => span.clone(),
            Node::Command { span, .. }
            | Node::Group { span, .. }
            | Node::Optional { span, .. }
            | Node::Math { span, .. }
            | Node::Verbatim { span, .. }
            | Node::Environment { span, .. } => span.clone(),
        }
    }

    /// Children of container nodes.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group { children, .. }
            | Node::Optional { children, .. }
            | Node::Environment { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_command(&self, wanted: &str) -> bool {
        matches!(self, Node::Command { name, .. } if name == wanted)
    }

    pub fn is_environment(&self, wanted: &str) -> bool {
        matches!(self, Node::Environment { name, .. } if name == wanted)
    }
}

#[derive(Debug)]
enum ScopeKind {
    Root,
    Environment { name: String, line: usize, body_start: usize },
    Group,
    Optional,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    start: usize,
    children: Vec<Node>,
}

impl Scope {
    fn new(kind: ScopeKind, start: usize) -> Self {
        Self {
            kind,
            start,
            children: Vec::new(),
        }
    }

    fn is_environment(&self, wanted: &str) -> bool {
        matches!(&self.kind, ScopeKind::Environment { name, .. } if name == wanted)
    }
}

/// Build the tree for `tokens` lexed from `source`.
pub fn build_tree(source: &str, tokens: Vec<Token>) -> Result<Vec<Node>, ParseError> {
    let mut stack = vec![Scope::new(ScopeKind::Root, 0)];

    for token in tokens {
        let Token { kind, span, line } = token;
        match kind {
            TokenKind::Begin(name) => {
                let body_start = span.end;
                stack.push(Scope::new(
                    ScopeKind::Environment {
                        name,
                        line,
                        body_start,
                    },
                    span.start,
                ));
            }
            TokenKind::End(name) => {
                match stack.iter().rposition(|s| s.is_environment(&name)) {
                    Some(index) => {
                        while stack.len() > index + 1 {
                            close_top(source, &mut stack, span.start, span.start, true)?;
                        }
                        close_top(source, &mut stack, span.start, span.end, false)?;
                    }
                    None => log::warn!(
                        "line {}: ignoring \\end{{{}}} without a matching \\begin",
                        line,
                        name
                    ),
                }
            }
            TokenKind::OpenGroup => stack.push(Scope::new(ScopeKind::Group, span.start)),
            TokenKind::CloseGroup => {
                let open_group = stack
                    .iter()
                    .rev()
                    .take_while(|s| !matches!(s.kind, ScopeKind::Environment { .. }))
                    .position(|s| matches!(s.kind, ScopeKind::Group));
                match open_group {
                    Some(depth) => {
                        for _ in 0..depth {
                            close_top(source, &mut stack, span.start, span.start, true)?;
                        }
                        close_top(source, &mut stack, span.end, span.end, false)?;
                    }
                    None => log::debug!("line {}: ignoring unbalanced '}}'", line),
                }
            }
            TokenKind::OpenBracket => {
                if opens_optional(current(&stack)) {
                    stack.push(Scope::new(ScopeKind::Optional, span.start));
                } else {
                    push_node(&mut stack, Node::Text(span));
                }
            }
            TokenKind::CloseBracket => {
                if matches!(current(&stack).kind, ScopeKind::Optional) {
                    close_top(source, &mut stack, span.end, span.end, false)?;
                } else {
                    push_node(&mut stack, Node::Text(span));
                }
            }
            TokenKind::Command(name) => push_node(&mut stack, Node::Command { name, span, line }),
            TokenKind::InlineMath(source) => push_node(
                &mut stack,
                Node::Math {
                    source,
                    display: false,
                    span,
                    line,
                },
            ),
            TokenKind::DisplayMath(source) => push_node(
                &mut stack,
                Node::Math {
                    source,
                    display: true,
                    span,
                    line,
                },
            ),
            TokenKind::Verbatim { body, .. } => push_node(&mut stack, Node::Verbatim { body, span }),
            TokenKind::ParBreak => push_node(&mut stack, Node::ParBreak(span)),
            TokenKind::Text => push_node(&mut stack, Node::Text(span)),
        }
    }

    if let Some(ScopeKind::Environment { line, .. }) = stack
        .iter()
        .find(|s| s.is_environment("frame"))
        .map(|s| &s.kind)
    {
        return Err(ParseError::at_line(source, *line, "unterminated frame environment"));
    }

    let end = source.len();
    while stack.len() > 1 {
        close_top(source, &mut stack, end, end, true)?;
    }

    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

fn current(stack: &[Scope]) -> &Scope {
    &stack[stack.len() - 1]
}

fn push_node(stack: &mut [Scope], node: Node) {
    let last = stack.len() - 1;
    stack[last].children.push(node);
}

/// A `[` opens an option list right after a command, right after an
/// environment start, or right after another option list.
fn opens_optional(scope: &Scope) -> bool {
    match scope.children.last() {
        None => matches!(scope.kind, ScopeKind::Environment { .. }),
        Some(Node::Command { .. }) | Some(Node::Optional { .. }) => true,
        Some(_) => false,
    }
}

/// Pop the innermost scope into a node of its parent.
///
/// `body_end` is where the scope's content stops; `end` is where its closing
/// marker ends. Closing a frame implicitly is an error.
fn close_top(
    source: &str,
    stack: &mut Vec<Scope>,
    body_end: usize,
    end: usize,
    implicit: bool,
) -> Result<(), ParseError> {
    let Some(scope) = stack.pop() else {
        return Ok(());
    };
    let span = scope.start..end;

    let node = match scope.kind {
        ScopeKind::Root => {
            stack.push(scope);
            return Ok(());
        }
        ScopeKind::Environment {
            name,
            line,
            body_start,
        } => {
            if implicit {
                if name == "frame" {
                    return Err(ParseError::at_line(
                        source,
                        line,
                        "unterminated frame environment",
                    ));
                }
                log::warn!("line {}: \\begin{{{}}} closed implicitly", line, name);
            }
            Node::Environment {
                name,
                children: scope.children,
                span,
                body: body_start..body_end.max(body_start),
                line,
            }
        }
        ScopeKind::Group => Node::Group {
            children: scope.children,
            span,
        },
        ScopeKind::Optional => Node::Optional {
            children: scope.children,
            span,
        },
    };

    push_node(stack, node);
    Ok(())
}
