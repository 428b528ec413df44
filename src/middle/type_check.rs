//! Latte Type Checker
//!
//! Runs as a single traversal combining two sets of hooks: the scope hooks
//! keep the symbol table in sync with the position in the tree, and the type
//! hooks decorate every expression with its type and check statements against
//! them.
//!
//! Before any body is looked at, the program's pre hook binds the prelude and
//! every function signature in the global scope, so functions may be called
//! before (or from within) their own definition.
//!
//! Errors never stop the walk. Anything whose type cannot be computed gets
//! [`Type::Undefined`], and checks involving an undefined type are skipped
//! because the root cause has already been reported.

use itertools::Itertools;
use tracing::debug;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    frontend::{
        ast::{
            Expression, ExpressionKind, FunctionDeclaration, Program, Statement, StatementKind,
            traverse::{Hook, Node, traverse},
            ty::{FunctionType, Type},
        },
        lexer::Span,
    },
    middle::{
        prelude::PRELUDE_FUNCTIONS,
        scope::{Declaration, HiddenBindings, SymbolTable},
    },
    report,
};

#[derive(Debug)]
pub struct TypeChecker {
    scopes: SymbolTable<Declaration>,
    /// Bindings hidden by the expressions currently being checked, innermost
    /// last
    hidden: Vec<HiddenBindings<Declaration>>,
    warn_shadow: bool,
    diagnostics: Vec<Diagnostic>,
}

impl TypeChecker {
    pub fn new(warn_shadow: bool) -> Self {
        Self {
            scopes: SymbolTable::new(),
            hidden: Vec::new(),
            warn_shadow,
            diagnostics: Vec::new(),
        }
    }
}

const PRE_HOOKS: &[Hook<TypeChecker>] = &[scopes_pre, types_pre];
const POST_HOOKS: &[Hook<TypeChecker>] = &[types_post, scopes_post];

/// Type checks `program`, returning the decorated tree and everything that
/// was reported along the way
pub fn type_check_program(program: Program, warn_shadow: bool) -> (Program, Vec<Diagnostic>) {
    let mut checker = TypeChecker::new(warn_shadow);

    let program = traverse(
        Node::Program(program),
        &mut checker,
        PRE_HOOKS,
        POST_HOOKS,
    )
    .into_program();

    debug!(diagnostics = checker.diagnostics.len(), "type checked program");

    (program, checker.diagnostics)
}

fn scopes_pre(checker: &mut TypeChecker, node: Node) -> Node {
    match &node {
        Node::FunctionDeclaration(decl) => {
            checker
                .scopes
                .enter_function_scope(decl.return_type.clone());
        }
        Node::Statement(Statement {
            kind: StatementKind::Block(_),
            ..
        }) => checker.scopes.enter_scope(),
        Node::Expression(expression) if !expression.ignore_names.is_empty() => {
            let hidden = checker.scopes.hide(&expression.ignore_names);
            checker.hidden.push(hidden);
        }
        _ => {}
    }

    node
}

fn scopes_post(checker: &mut TypeChecker, node: Node) -> Node {
    match &node {
        Node::FunctionDeclaration(_)
        | Node::Statement(Statement {
            kind: StatementKind::Block(_),
            ..
        }) => checker.scopes.exit_scope(),
        Node::Statement(Statement {
            kind: StatementKind::Declaration { ty, name },
            ..
        }) => checker.scopes.declare(
            name.name.clone(),
            Declaration {
                ty: ty.clone(),
                span: Some(name.span),
            },
        ),
        Node::Expression(expression) if !expression.ignore_names.is_empty() => {
            if let Some(hidden) = checker.hidden.pop() {
                checker.scopes.unhide(hidden);
            }
        }
        _ => {}
    }

    node
}

fn types_pre(checker: &mut TypeChecker, node: Node) -> Node {
    match &node {
        Node::Program(program) => checker.declare_globals(program),
        Node::FunctionDeclaration(decl) => checker.declare_parameters(decl),
        _ => {}
    }

    node
}

fn types_post(checker: &mut TypeChecker, node: Node) -> Node {
    match node {
        Node::Expression(mut expression) => {
            let ty = checker.infer_expression(&mut expression);
            expression.ty = Some(ty);

            Node::Expression(expression)
        }
        Node::Statement(statement) => {
            checker.check_statement(&statement);

            Node::Statement(statement)
        }
        other => other,
    }
}

impl TypeChecker {
    /// Binds the prelude and all function signatures, then makes sure `main`
    /// is there
    fn declare_globals(&mut self, program: &Program) {
        for (name, ty) in PRELUDE_FUNCTIONS.iter() {
            self.scopes.declare(
                *name,
                Declaration {
                    ty: Type::Function(ty.clone()),
                    span: None,
                },
            );
        }

        for decl in &program.decls {
            if let Some(previous) = self.scopes.lookup(&decl.name.name) {
                let previous = match previous.span {
                    Some(_) => "an earlier definition",
                    None => "a built-in function",
                };

                report!(
                    self.diagnostics,
                    decl.name.span,
                    DiagnosticKind::MultipleFunctionDefinitions,
                    "Function {} is already defined as {previous}",
                    decl.name.name
                );
                continue;
            }

            self.scopes.declare(
                decl.name.name.clone(),
                Declaration {
                    ty: Type::Function(decl.ty()),
                    span: Some(decl.name.span),
                },
            );
        }

        let main_type = FunctionType::new([], Type::Int);

        match program.decls.iter().find(|decl| decl.name.name == "main") {
            None => report!(
                self.diagnostics,
                None,
                DiagnosticKind::NoMain,
                "No main function defined"
            ),
            Some(main) if main.ty() != main_type => report!(
                self.diagnostics,
                main.name.span,
                DiagnosticKind::NoMain,
                "main must have type {main_type} but has type {}",
                main.ty()
            ),
            Some(_) => {}
        }
    }

    /// Checks parameter types and names and binds them in the function scope
    fn declare_parameters(&mut self, decl: &FunctionDeclaration) {
        for (index, param) in decl.params.iter().enumerate() {
            if param.ty == Type::Void {
                report!(
                    self.diagnostics,
                    param.span,
                    DiagnosticKind::VoidParameter,
                    "Parameter {} of function {} cannot have type void",
                    param.name.name,
                    decl.name.name
                );
            }

            if decl.params[..index]
                .iter()
                .any(|other| other.name.name == param.name.name)
            {
                report!(
                    self.diagnostics,
                    param.span,
                    DiagnosticKind::FunctionSameParameter,
                    "Function {} has more than one parameter named {}",
                    decl.name.name,
                    param.name.name
                );
                continue;
            }

            self.scopes.declare(
                param.name.name.clone(),
                Declaration {
                    ty: param.ty.clone(),
                    span: Some(param.span),
                },
            );
        }
    }

    fn infer_expression(&mut self, expression: &mut Expression) -> Type {
        match &mut expression.kind {
            ExpressionKind::IConstant(_) => Type::Int,
            ExpressionKind::BConstant(_) => Type::Bool,
            ExpressionKind::SConstant(_) => Type::String,
            ExpressionKind::Variable(name) => match self.scopes.lookup(name) {
                Some(declaration) => declaration.ty.clone(),
                None => {
                    report!(
                        self.diagnostics,
                        expression.span,
                        DiagnosticKind::VariableDoesNotExist,
                        "Variable {name} does not exist in this scope"
                    );

                    Type::Undefined
                }
            },
            ExpressionKind::Operator { operator, instance } => {
                if let [single] = operator.instances() {
                    *instance = Some(*single);
                }

                operator.ty()
            }
            ExpressionKind::Application {
                function,
                arguments,
            } => self.infer_application(expression.span, function, arguments),
            // Already reported by the parser
            ExpressionKind::Error => Type::Undefined,
        }
    }

    fn infer_application(
        &mut self,
        span: Span,
        function: &mut Expression,
        arguments: &[Expression],
    ) -> Type {
        match function.ty().clone() {
            Type::Undefined => Type::Undefined,
            Type::Function(function_type) => {
                if function_type.params.len() != arguments.len() {
                    report!(
                        self.diagnostics,
                        span,
                        DiagnosticKind::IncorrectArgumentCount,
                        "There are {} arguments in the function call, should be {}",
                        arguments.len(),
                        function_type.params.len()
                    );
                }

                for (expected, actual) in function_type.params.iter().zip(arguments) {
                    if actual.ty() != expected && !actual.ty().is_undefined() {
                        report!(
                            self.diagnostics,
                            actual.span,
                            DiagnosticKind::ArgumentTypeMismatch,
                            "The argument has type {} but {expected} was expected",
                            actual.ty()
                        );
                    }
                }

                *function_type.ret
            }
            Type::Alternative(alternatives) => {
                let chosen = alternatives.iter().position(|alternative| {
                    alternative.params.len() == arguments.len()
                        && alternative
                            .params
                            .iter()
                            .zip(arguments)
                            .all(|(expected, actual)| actual.ty() == expected)
                });

                let Some(index) = chosen else {
                    if !arguments.iter().any(|a| a.ty().is_undefined()) {
                        report!(
                            self.diagnostics,
                            span,
                            DiagnosticKind::FunctionCallMismatch,
                            "Could not match overloaded call. Possible types are: {}. \
                             Argument types are: ({})",
                            alternatives.iter().join("; "),
                            arguments.iter().map(|a| a.ty()).join(", ")
                        );
                    }

                    return Type::Undefined;
                };

                let resolved = alternatives[index].clone();

                if let ExpressionKind::Operator { operator, instance } = &mut function.kind {
                    *instance = Some(operator.instances()[index]);
                }

                function.ty = Some(Type::Function(resolved.clone()));

                *resolved.ret
            }
            other => {
                report!(
                    self.diagnostics,
                    function.span,
                    DiagnosticKind::FunctionNotCallable,
                    "This object of type {other} is not callable"
                );

                Type::Undefined
            }
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Declaration { ty, name } => {
                if *ty == Type::Void {
                    report!(
                        self.diagnostics,
                        name.span,
                        DiagnosticKind::AssignmentTypeMismatch,
                        "Variable {} cannot have type void",
                        name.name
                    );
                }

                let Some(previous) = self.scopes.lookup(&name.name) else {
                    return;
                };

                let previous = previous
                    .span
                    .map(|span| format!("at byte {}", span.start))
                    .unwrap_or_else(|| "as a built-in".to_string());

                if self.scopes.is_declared_in_current_scope(&name.name) {
                    report!(
                        self.diagnostics,
                        name.span,
                        DiagnosticKind::VariableRedeclaration,
                        "Variable {} has already been declared in this scope ({previous})",
                        name.name
                    );
                } else if self.warn_shadow {
                    report!(
                        self.diagnostics,
                        name.span,
                        DiagnosticKind::VariableShadow,
                        "Declaration of {} shadows a previous declaration ({previous})",
                        name.name
                    );
                }
            }
            StatementKind::Assignment { target, expression } => {
                let Some(declaration) = self.scopes.lookup(&target.name) else {
                    report!(
                        self.diagnostics,
                        target.span,
                        DiagnosticKind::VariableDoesNotExist,
                        "Variable {} does not exist in this scope",
                        target.name
                    );
                    return;
                };

                let target_type = declaration.ty.clone();
                let value_type = expression.ty();

                if let Type::Function(_) = target_type {
                    report!(
                        self.diagnostics,
                        target.span,
                        DiagnosticKind::AssignmentTypeMismatch,
                        "Function {} cannot be assigned to",
                        target.name
                    );
                    return;
                }

                if !target_type.is_undefined()
                    && !value_type.is_undefined()
                    && target_type != *value_type
                {
                    report!(
                        self.diagnostics,
                        statement.span,
                        DiagnosticKind::AssignmentTypeMismatch,
                        "The type of variable {} ({target_type}) does not agree with the type \
                         of the expression ({value_type})",
                        target.name
                    );
                }
            }
            StatementKind::Return(value) => {
                let Some(return_type) = self.scopes.return_type().cloned() else {
                    unreachable!("return statement outside of a function");
                };

                match value {
                    Some(value) if !value.ty().is_undefined() && *value.ty() != return_type => {
                        report!(
                            self.diagnostics,
                            statement.span,
                            DiagnosticKind::ReturnTypeMismatch,
                            "The function returns {return_type} but the expression has type {}",
                            value.ty()
                        );
                    }
                    None if return_type != Type::Void => {
                        report!(
                            self.diagnostics,
                            statement.span,
                            DiagnosticKind::ReturnTypeMismatch,
                            "The function returns {return_type} but no value is returned"
                        );
                    }
                    _ => {}
                }
            }
            StatementKind::If { condition, .. } | StatementKind::While { condition, .. } => {
                let ty = condition.ty();

                if !ty.is_undefined() && *ty != Type::Bool {
                    report!(
                        self.diagnostics,
                        condition.span,
                        DiagnosticKind::ConditionTypeMismatch,
                        "The condition has type {ty} but should be boolean"
                    );
                }
            }
            StatementKind::Block(_) | StatementKind::FreeExpression(_) => {}
        }
    }
}
