//! Generic rewriting walker over the AST
//!
//! [`traverse`] visits the tree depth first. At every node the pre hooks run
//! in order, each receiving the node returned by the previous one. The
//! children of whatever comes out are traversed and the node is rebuilt from
//! the results, then the post hooks run in order the same way. A hook that
//! does not want to change anything hands the node back untouched.
//!
//! Hooks are plain functions over an explicitly threaded context, so one
//! walk can combine several analyses (scopes + types, returns + folding)
//! without any of them owning global state.

use super::{Expression, ExpressionKind, FunctionDeclaration, Program, Statement, StatementKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program(Program),
    FunctionDeclaration(FunctionDeclaration),
    Statement(Statement),
    Expression(Expression),
}

/// A pre or post hook. Must return a node of the same variant it was given.
pub type Hook<C> = fn(&mut C, Node) -> Node;

pub fn traverse<C>(node: Node, context: &mut C, pre: &[Hook<C>], post: &[Hook<C>]) -> Node {
    let node = pre.iter().fold(node, |node, hook| hook(context, node));
    let node = traverse_children(node, context, pre, post);

    post.iter().fold(node, |node, hook| hook(context, node))
}

fn traverse_children<C>(node: Node, context: &mut C, pre: &[Hook<C>], post: &[Hook<C>]) -> Node {
    let expression = |e: Expression, context: &mut C| {
        traverse(Node::Expression(e), context, pre, post).into_expression()
    };

    match node {
        Node::Program(mut program) => {
            program.decls = program
                .decls
                .into_iter()
                .map(|decl| {
                    traverse(Node::FunctionDeclaration(decl), context, pre, post)
                        .into_function_declaration()
                })
                .collect();

            Node::Program(program)
        }
        Node::FunctionDeclaration(mut decl) => {
            decl.body = traverse(Node::Statement(decl.body), context, pre, post).into_statement();

            Node::FunctionDeclaration(decl)
        }
        Node::Statement(mut statement) => {
            let stmt = |s: Statement, context: &mut C| {
                traverse(Node::Statement(s), context, pre, post).into_statement()
            };

            statement.kind = match statement.kind {
                StatementKind::Block(statements) => StatementKind::Block(
                    statements.into_iter().map(|s| stmt(s, context)).collect(),
                ),
                kind @ StatementKind::Declaration { .. } => kind,
                StatementKind::Assignment { target, expression: e } => StatementKind::Assignment {
                    target,
                    expression: Box::new(expression(*e, context)),
                },
                StatementKind::Return(value) => {
                    StatementKind::Return(value.map(|e| Box::new(expression(*e, context))))
                }
                StatementKind::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let condition = Box::new(expression(*condition, context));
                    let then_branch = Box::new(stmt(*then_branch, context));
                    let else_branch = else_branch.map(|s| Box::new(stmt(*s, context)));

                    StatementKind::If {
                        condition,
                        then_branch,
                        else_branch,
                    }
                }
                StatementKind::While { condition, body } => {
                    let condition = Box::new(expression(*condition, context));
                    let body = Box::new(stmt(*body, context));

                    StatementKind::While { condition, body }
                }
                StatementKind::FreeExpression(e) => {
                    StatementKind::FreeExpression(Box::new(expression(*e, context)))
                }
            };

            Node::Statement(statement)
        }
        Node::Expression(mut e) => {
            if let ExpressionKind::Application {
                function,
                arguments,
            } = e.kind
            {
                let function = Box::new(expression(*function, context));
                let arguments = arguments
                    .into_iter()
                    .map(|a| expression(a, context))
                    .collect();

                e.kind = ExpressionKind::Application {
                    function,
                    arguments,
                };
            }

            Node::Expression(e)
        }
    }
}

impl Node {
    pub fn into_program(self) -> Program {
        match self {
            Node::Program(program) => program,
            other => unreachable!("expected program but hook produced {other:?}"),
        }
    }

    pub fn into_function_declaration(self) -> FunctionDeclaration {
        match self {
            Node::FunctionDeclaration(decl) => decl,
            other => unreachable!("expected function declaration but hook produced {other:?}"),
        }
    }

    pub fn into_statement(self) -> Statement {
        match self {
            Node::Statement(statement) => statement,
            other => unreachable!("expected statement but hook produced {other:?}"),
        }
    }

    pub fn into_expression(self) -> Expression {
        match self {
            Node::Expression(expression) => expression,
            other => unreachable!("expected expression but hook produced {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{
        ast::{Identifier, ty::Value},
        lexer::Span,
    };

    fn int(value: i32) -> Expression {
        Expression::new(Span::default(), ExpressionKind::IConstant(value))
    }

    fn sample() -> Statement {
        Statement::new(
            Span::default(),
            StatementKind::Block(vec![
                Statement::new(
                    Span::default(),
                    StatementKind::Assignment {
                        target: Identifier {
                            span: Span::default(),
                            name: "x".into(),
                        },
                        expression: Box::new(int(1)),
                    },
                ),
                Statement::new(
                    Span::default(),
                    StatementKind::Return(Some(Box::new(int(2)))),
                ),
            ]),
        )
    }

    #[derive(Default)]
    struct Log(Vec<String>);

    fn describe(node: &Node) -> String {
        match node {
            Node::Program(_) => "program".into(),
            Node::FunctionDeclaration(_) => "function".into(),
            Node::Statement(s) => match s.kind {
                StatementKind::Block(_) => "block".into(),
                StatementKind::Assignment { .. } => "assign".into(),
                StatementKind::Return(_) => "return".into(),
                _ => "statement".into(),
            },
            Node::Expression(e) => match e.kind {
                ExpressionKind::IConstant(v) => v.to_string(),
                _ => "expression".into(),
            },
        }
    }

    fn log_pre(log: &mut Log, node: Node) -> Node {
        log.0.push(format!("pre {}", describe(&node)));
        node
    }

    fn log_post(log: &mut Log, node: Node) -> Node {
        log.0.push(format!("post {}", describe(&node)));
        node
    }

    #[test]
    fn visits_pre_then_children_then_post() {
        let mut log = Log::default();

        let out = traverse(
            Node::Statement(sample()),
            &mut log,
            &[log_pre],
            &[log_post],
        );

        assert_eq!(out, Node::Statement(sample()));
        assert_eq!(
            log.0,
            [
                "pre block",
                "pre assign",
                "pre 1",
                "post 1",
                "post assign",
                "pre return",
                "pre 2",
                "post 2",
                "post return",
                "post block",
            ]
        );
    }

    fn bump_constants(_: &mut Log, node: Node) -> Node {
        match node {
            Node::Expression(Expression {
                kind: ExpressionKind::IConstant(v),
                span,
                ..
            }) => Node::Expression(Expression::literal(span, Value::Int(v + 10))),
            other => other,
        }
    }

    #[test]
    fn post_hooks_replace_nodes_and_chain() {
        let mut log = Log::default();

        let out = traverse(
            Node::Statement(sample()),
            &mut log,
            &[],
            &[bump_constants, log_post],
        );

        let StatementKind::Block(statements) = out.into_statement().kind else {
            panic!("expected block");
        };
        let StatementKind::Return(Some(value)) = &statements[1].kind else {
            panic!("expected return");
        };

        assert_eq!(value.kind, ExpressionKind::IConstant(12));
        assert_eq!(value.value, Some(Value::Int(12)));
        // The second post hook sees the replacement
        assert!(log.0.contains(&"post 11".to_string()));
    }

    fn replace_return_with_empty_block(_: &mut Log, node: Node) -> Node {
        match node {
            Node::Statement(Statement {
                kind: StatementKind::Return(_),
                span,
                ..
            }) => Node::Statement(Statement::empty(span)),
            other => other,
        }
    }

    #[test]
    fn pre_hook_replacement_children_are_visited() {
        let mut log = Log::default();

        traverse(
            Node::Statement(sample()),
            &mut log,
            &[replace_return_with_empty_block, log_pre],
            &[],
        );

        // The replaced return's value is never visited
        assert!(!log.0.contains(&"pre 2".to_string()));
        assert_eq!(log.0.iter().filter(|l| *l == "pre block").count(), 2);
    }
}
