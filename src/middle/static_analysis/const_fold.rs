//! Constant folding and branch elimination
//!
//! Literals carry their value. A built-in operator applied to known values is
//! evaluated and replaced by a literal, and so is a read of a local variable
//! whose only assignment is its initializer with a known value. `while` and
//! `if` with a known condition are replaced by what would run.
//!
//! Variables are told apart by their declaration site, so the folder keeps
//! its own symbol table mapping names to the span of the declaring
//! identifier.

use hashbrown::{HashMap, HashSet};

use super::StaticAnalyzer;
use crate::{
    frontend::{
        ast::{
            Expression, ExpressionKind, FunctionDeclaration, Statement, StatementKind,
            traverse::Node,
            ty::Value,
        },
        lexer::Span,
    },
    middle::{
        prelude::evaluate,
        scope::{HiddenBindings, SymbolTable},
    },
};

#[derive(Debug, Default)]
pub struct ConstantFolder {
    sites: SymbolTable<Span>,
    hidden: Vec<HiddenBindings<Span>>,
    /// Declaration sites assigned exactly once in the current function
    single_assignment: HashSet<Span>,
    known: HashMap<Span, Value>,
}

pub(super) fn open_scopes(analyzer: &mut StaticAnalyzer, node: Node) -> Node {
    let folder = &mut analyzer.folder;

    match &node {
        Node::FunctionDeclaration(decl) => {
            folder.single_assignment = count_assignments(decl);
            folder.known.clear();
            folder.sites.enter_scope();

            for param in &decl.params {
                folder.sites.declare(param.name.name.clone(), param.name.span);
            }
        }
        Node::Statement(Statement {
            kind: StatementKind::Block(_),
            ..
        }) => folder.sites.enter_scope(),
        Node::Expression(expression) if !expression.ignore_names.is_empty() => {
            let hidden = folder.sites.hide(&expression.ignore_names);
            folder.hidden.push(hidden);
        }
        _ => {}
    }

    node
}

/// Closes what [`open_scopes`] opened for statements. Runs before folding, which
/// may swap an `if` for the block in one of its branches.
pub(super) fn close_scopes(analyzer: &mut StaticAnalyzer, node: Node) -> Node {
    let folder = &mut analyzer.folder;

    match &node {
        Node::FunctionDeclaration(_)
        | Node::Statement(Statement {
            kind: StatementKind::Block(_),
            ..
        }) => folder.sites.exit_scope(),
        Node::Statement(Statement {
            kind: StatementKind::Declaration { name, .. },
            ..
        }) => folder.sites.declare(name.name.clone(), name.span),
        _ => {}
    }

    node
}

/// Puts back the names hidden for an expression. Runs after folding so a
/// variable in a declaration initializer resolves past the declaration.
pub(super) fn unhide_names(analyzer: &mut StaticAnalyzer, node: Node) -> Node {
    let folder = &mut analyzer.folder;

    if let Node::Expression(expression) = &node {
        if !expression.ignore_names.is_empty() {
            if let Some(hidden) = folder.hidden.pop() {
                folder.sites.unhide(hidden);
            }
        }
    }

    node
}

pub(super) fn fold_constants(analyzer: &mut StaticAnalyzer, node: Node) -> Node {
    match node {
        Node::Expression(expression) => {
            Node::Expression(analyzer.folder.fold_expression(expression))
        }
        Node::Statement(statement) => Node::Statement(analyzer.folder.fold_statement(statement)),
        other => other,
    }
}

impl ConstantFolder {
    fn fold_expression(&self, mut expression: Expression) -> Expression {
        let value = match &expression.kind {
            ExpressionKind::IConstant(value) => Some(Value::Int(*value)),
            ExpressionKind::BConstant(value) => Some(Value::Bool(*value)),
            ExpressionKind::SConstant(value) => Some(Value::String(value.clone())),
            ExpressionKind::Variable(name) => self
                .sites
                .lookup(name)
                .and_then(|site| self.known.get(site))
                .cloned(),
            ExpressionKind::Application {
                function,
                arguments,
            } => match function.kind {
                ExpressionKind::Operator {
                    instance: Some(builtin),
                    ..
                } => arguments
                    .iter()
                    .map(|argument| argument.value.clone())
                    .collect::<Option<Vec<_>>>()
                    .and_then(|values| evaluate(builtin, &values)),
                _ => None,
            },
            ExpressionKind::Operator { .. } | ExpressionKind::Error => None,
        };

        let Some(value) = value else {
            return expression;
        };

        if expression.is_literal() {
            expression.value = Some(value);
            return expression;
        }

        Expression {
            ty: expression.ty,
            ignore_names: expression.ignore_names,
            ..Expression::literal(expression.span, value)
        }
    }

    fn fold_statement(&mut self, statement: Statement) -> Statement {
        let Statement {
            span,
            kind,
            returns,
        } = statement;

        let kind = match kind {
            StatementKind::Assignment { target, expression } => {
                let site = self
                    .sites
                    .lookup(&target.name)
                    .copied()
                    .filter(|site| self.single_assignment.contains(site));

                if let (Some(site), Some(value)) = (site, &expression.value) {
                    self.known.insert(site, value.clone());
                }

                StatementKind::Assignment { target, expression }
            }
            StatementKind::While { condition, .. }
                if condition.value == Some(Value::Bool(false)) =>
            {
                StatementKind::Block(Vec::new())
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => match condition.value {
                Some(Value::Bool(true)) => {
                    let taken = *then_branch;
                    return Statement { returns, ..taken };
                }
                Some(Value::Bool(false)) => {
                    return match else_branch.map(|s| *s) {
                        Some(taken) => Statement { returns, ..taken },
                        None => Statement {
                            returns,
                            ..Statement::empty(span)
                        },
                    };
                }
                _ => StatementKind::If {
                    condition,
                    then_branch,
                    else_branch,
                },
            },
            kind => kind,
        };

        Statement {
            span,
            kind,
            returns,
        }
    }
}

/// Declaration sites of locals assigned exactly once in `decl`, which for a
/// local is its initializer. Parameters are bound but never counted.
fn count_assignments(decl: &FunctionDeclaration) -> HashSet<Span> {
    let mut counter = AssignmentCounter::default();

    counter.sites.enter_scope();

    for param in &decl.params {
        counter.sites.declare(param.name.name.clone(), param.name.span);
    }

    counter.count_statement(&decl.body);

    counter
        .counts
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .map(|(site, _)| site)
        .collect()
}

#[derive(Debug, Default)]
struct AssignmentCounter {
    sites: SymbolTable<Span>,
    counts: HashMap<Span, usize>,
}

impl AssignmentCounter {
    fn count_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Block(statements) => {
                self.sites.enter_scope();

                for statement in statements {
                    self.count_statement(statement);
                }

                self.sites.exit_scope();
            }
            StatementKind::Declaration { name, .. } => {
                self.sites.declare(name.name.clone(), name.span);
                self.counts.insert(name.span, 0);
            }
            StatementKind::Assignment { target, .. } => {
                let count = self
                    .sites
                    .lookup(&target.name)
                    .and_then(|site| self.counts.get_mut(site));

                if let Some(count) = count {
                    *count += 1;
                }
            }
            StatementKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.count_statement(then_branch);

                if let Some(else_branch) = else_branch {
                    self.count_statement(else_branch);
                }
            }
            StatementKind::While { body, .. } => self.count_statement(body),
            StatementKind::Return(_) | StatementKind::FreeExpression(_) => {}
        }
    }
}
