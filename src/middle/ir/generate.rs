//! Lowering of the checked and folded AST to quads
//!
//! Strings are reference counted at runtime. The generator keeps the counts
//! balanced with a stack of defer scopes: quads pushed onto a defer scope are
//! emitted when the scope closes, and a `return` emits everything still
//! pending before leaving the function.
//!
//! * a string parameter is retained on entry and released on exit
//! * every string written to a variable is retained, and the value it
//!   replaces is released, except when the write is the declaration's own
//!   initializer, whose release is deferred to the end of the block instead
//! * a string returned by a call is released at the end of the statement
//! * a returned string is retained before the pending releases run

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::{
    frontend::ast::{
        self, Expression, ExpressionKind, FunctionDeclaration, Statement, StatementKind,
        operator::Builtin,
        ty::Type,
    },
    index::{Index, IndexVec},
    middle::{
        ir::{Function, LabelId, Program, Quad, RegType, RegisterId, StringId, Val, Var},
        prelude::{ADDREF_STRING, DELREF_STRING, refcount_helper_type},
        scope::SymbolTable,
    },
};

/// Generates quads for every function of a type checked program, in
/// declaration order
pub fn generate_program(program: &ast::Program) -> Program {
    let mut strings = StringTable::default();

    let functions = program
        .decls
        .iter()
        .map(|decl| BodyLoweringContext::new(&mut strings).lower_function(decl))
        .collect::<Vec<_>>();

    debug!(
        functions = functions.len(),
        strings = strings.values.len(),
        "generated quads"
    );

    Program {
        functions,
        strings: strings.values,
    }
}

#[derive(Debug, Default)]
struct StringTable {
    values: IndexVec<StringId, String>,
    ids: HashMap<String, StringId>,
}

impl StringTable {
    fn intern(&mut self, value: &str) -> StringId {
        if let Some(id) = self.ids.get(value) {
            return *id;
        }

        let id = self.values.push(value.to_string());
        self.ids.insert(value.to_string(), id);
        id
    }
}

#[derive(Debug)]
struct DeferScope {
    quads: Vec<Quad>,
    /// Whether variables declared in the scope release their value here, as
    /// opposed to a scope holding the temporaries of one statement
    holds_variables: bool,
}

struct BodyLoweringContext<'a> {
    strings: &'a mut StringTable,

    names: SymbolTable<Var>,
    next_register: RegisterId,
    next_label: LabelId,

    body: Vec<Quad>,
    defer_scopes: Vec<DeferScope>,
}

impl<'a> BodyLoweringContext<'a> {
    fn new(strings: &'a mut StringTable) -> Self {
        Self {
            strings,
            names: SymbolTable::new(),
            next_register: RegisterId::new(0),
            next_label: LabelId::ENTRY.plus(1),
            body: Vec::new(),
            defer_scopes: Vec::new(),
        }
    }

    fn create_register(&mut self, ty: RegType) -> Var {
        let id = self.next_register;
        self.next_register.increment_by(1);
        Var { ty, id }
    }

    fn create_label(&mut self) -> LabelId {
        let label = self.next_label;
        self.next_label.increment_by(1);
        label
    }

    fn push_quad(&mut self, quad: Quad) {
        trace!(%quad, "emit");
        self.body.push(quad);
    }

    /// Whether the last emitted quad ends a block, making anything emitted
    /// before the next label unreachable
    fn is_terminated(&self) -> bool {
        self.body.last().is_some_and(Quad::is_terminator)
    }

    fn push_branch(&mut self, destination: LabelId) {
        if !self.is_terminated() {
            self.push_quad(Quad::Branch { destination });
        }
    }

    fn open_defer_scope(&mut self, holds_variables: bool) {
        self.defer_scopes.push(DeferScope {
            quads: Vec::new(),
            holds_variables,
        });
    }

    /// Pops the innermost defer scope and emits its quads, latest first
    fn close_defer_scope(&mut self) {
        let Some(scope) = self.defer_scopes.pop() else {
            unreachable!("defer scope stack underflow");
        };

        if self.is_terminated() {
            return;
        }

        for quad in scope.quads.into_iter().rev() {
            self.push_quad(quad);
        }
    }

    /// Emits every pending deferred quad without closing any scope
    fn flush_defer_scopes(&mut self) {
        let pending = self
            .defer_scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.quads.iter().rev().cloned())
            .collect::<Vec<_>>();

        for quad in pending {
            self.push_quad(quad);
        }
    }

    fn defer_temporary(&mut self, quad: Quad) {
        match self.defer_scopes.last_mut() {
            Some(scope) => scope.quads.push(quad),
            None => unreachable!("temporary outside of any defer scope"),
        }
    }

    fn defer_variable(&mut self, quad: Quad) {
        match self.defer_scopes.iter_mut().rev().find(|s| s.holds_variables) {
            Some(scope) => scope.quads.push(quad),
            None => unreachable!("variable outside of any block"),
        }
    }

    fn refcount_call(helper: &str, value: Val) -> Quad {
        Quad::Call {
            target: None,
            function: Val::GlobalVar {
                ty: RegType::from(&refcount_helper_type()),
                name: helper.to_string(),
            },
            arguments: vec![value],
        }
    }

    fn addref(&mut self, value: Val) {
        self.push_quad(Self::refcount_call(ADDREF_STRING, value));
    }

    fn delref(&mut self, value: Val) {
        self.push_quad(Self::refcount_call(DELREF_STRING, value));
    }

    fn lower_function(mut self, decl: &FunctionDeclaration) -> Function {
        self.push_quad(Quad::Label(LabelId::ENTRY));
        self.names.enter_scope();
        self.open_defer_scope(true);

        let mut params = Vec::with_capacity(decl.params.len());

        // Parameters are copied into fresh registers so a reassigned
        // parameter is assigned more than once like any other variable
        for param in &decl.params {
            let ty = RegType::from(&param.ty);
            let incoming = self.create_register(ty.clone());
            let local = self.create_register(ty);

            self.push_quad(Quad::Assign {
                target: local.clone(),
                source: Val::Var(incoming.clone()),
            });

            if param.ty == Type::String {
                self.addref(Val::Var(local.clone()));
                self.defer_variable(Self::refcount_call(DELREF_STRING, Val::Var(local.clone())));
            }

            self.names.declare(param.name.name.clone(), local);
            params.push(incoming);
        }

        self.lower_statement(&decl.body);
        self.close_defer_scope();
        self.names.exit_scope();

        if decl.return_type == Type::Void && !self.is_terminated() {
            self.push_quad(Quad::Return { value: None });
        }

        trace!(function = %decl.name.name, quads = self.body.len(), "lowered function");

        Function {
            ret: RegType::from(&decl.return_type),
            name: decl.name.name.clone(),
            params,
            body: self.body,
        }
    }

    fn lower_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Block(statements) => {
                self.names.enter_scope();
                self.open_defer_scope(true);

                for statement in statements {
                    self.lower_statement(statement);
                }

                self.close_defer_scope();
                self.names.exit_scope();
            }
            StatementKind::Declaration { ty, name } => {
                let var = self.create_register(RegType::from(ty));
                self.names.declare(name.name.clone(), var);
            }
            StatementKind::Assignment { target, expression } => {
                self.open_defer_scope(false);
                self.lower_assignment(target, expression);
                self.close_defer_scope();
            }
            StatementKind::Return(value) => {
                self.open_defer_scope(false);

                let value = value.as_ref().map(|e| (self.lower_expression(e), e.ty()));

                let value = match value {
                    Some((value, Type::String)) => {
                        self.addref(value.clone());
                        Some(value)
                    }
                    Some((_, Type::Void)) | None => None,
                    Some((value, _)) => Some(value),
                };

                self.flush_defer_scopes();
                self.push_quad(Quad::Return { value });
                self.close_defer_scope();
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_label = self.create_label();
                let else_label = else_branch.as_ref().map(|_| self.create_label());
                let end_label = self.create_label();

                self.lower_condition(condition, then_label, else_label.unwrap_or(end_label));

                self.push_quad(Quad::Label(then_label));
                self.lower_branch(then_branch);
                self.push_branch(end_label);

                if let (Some(else_label), Some(else_branch)) = (else_label, else_branch) {
                    self.push_quad(Quad::Label(else_label));
                    self.lower_branch(else_branch);
                    self.push_branch(end_label);
                }

                self.push_quad(Quad::Label(end_label));
            }
            StatementKind::While { condition, body } => {
                let body_label = self.create_label();
                let condition_label = self.create_label();
                let end_label = self.create_label();

                self.push_branch(condition_label);

                self.push_quad(Quad::Label(body_label));
                self.lower_branch(body);
                self.push_branch(condition_label);

                self.push_quad(Quad::Label(condition_label));
                self.lower_condition(condition, body_label, end_label);

                self.push_quad(Quad::Label(end_label));
            }
            StatementKind::FreeExpression(expression) => {
                self.open_defer_scope(false);
                self.lower_expression(expression);
                self.close_defer_scope();
            }
        }
    }

    /// Lowers the body of an `if` arm or a loop in a scope of its own
    fn lower_branch(&mut self, statement: &Statement) {
        self.open_defer_scope(true);
        self.lower_statement(statement);
        self.close_defer_scope();
    }

    /// Evaluates a boolean condition and branches on it. Temporaries are
    /// released before the branch.
    fn lower_condition(&mut self, condition: &Expression, positive: LabelId, negative: LabelId) {
        self.open_defer_scope(false);
        let condition = self.lower_expression(condition);
        self.close_defer_scope();

        self.push_quad(Quad::CondBranch {
            condition,
            positive,
            negative,
        });
    }

    fn lookup(&self, name: &str) -> Var {
        match self.names.lookup(name) {
            Some(var) => var.clone(),
            None => unreachable!("variable {name} was not resolved by the type checker"),
        }
    }

    fn lower_assignment(&mut self, target: &ast::Identifier, expression: &Expression) {
        let var = self.lookup(&target.name);
        let value = self.lower_expression(expression);

        if *expression.ty() == Type::String {
            self.addref(value.clone());

            if expression.ignore_names.contains(&target.name) {
                self.defer_variable(Self::refcount_call(DELREF_STRING, Val::Var(var.clone())));
            } else {
                self.delref(Val::Var(var.clone()));
            }
        }

        self.push_quad(Quad::Assign {
            target: var,
            source: value,
        });
    }

    fn lower_expression(&mut self, expression: &Expression) -> Val {
        match &expression.kind {
            ExpressionKind::IConstant(value) => Val::Constant {
                ty: RegType::I32,
                value: *value,
            },
            ExpressionKind::BConstant(value) => Val::Constant {
                ty: RegType::I1,
                value: i32::from(*value),
            },
            ExpressionKind::SConstant(value) => Val::StringConstant {
                id: self.strings.intern(value),
            },
            ExpressionKind::Variable(name) => match self.names.lookup(name) {
                Some(var) => Val::Var(var.clone()),
                // Only functions live outside of the function's own scopes
                None => Val::GlobalVar {
                    ty: RegType::from(expression.ty()),
                    name: name.clone(),
                },
            },
            ExpressionKind::Application {
                function,
                arguments,
            } => self.lower_application(expression, function, arguments),
            ExpressionKind::Operator { .. } | ExpressionKind::Error => {
                unreachable!("{:?} cannot be lowered on its own", expression.kind)
            }
        }
    }

    fn lower_application(
        &mut self,
        expression: &Expression,
        function: &Expression,
        arguments: &[Expression],
    ) -> Val {
        let callee = match &function.kind {
            ExpressionKind::Operator {
                operator,
                instance: Some(builtin),
            } if operator.is_short_circuiting() => {
                return self.lower_short_circuit(*builtin, arguments);
            }
            ExpressionKind::Operator {
                instance: Some(builtin),
                ..
            } => Val::GlobalVar {
                ty: RegType::from(&builtin.signature()),
                name: builtin.symbol(),
            },
            ExpressionKind::Variable(_) => self.lower_expression(function),
            _ => unreachable!("callee {:?} was not resolved", function.kind),
        };

        let arguments = arguments
            .iter()
            .map(|argument| self.lower_expression(argument))
            .collect();

        match expression.ty() {
            Type::Void => {
                self.push_quad(Quad::Call {
                    target: None,
                    function: callee,
                    arguments,
                });

                Val::Constant {
                    ty: RegType::Void,
                    value: 0,
                }
            }
            ty => {
                let target = self.create_register(RegType::from(ty));

                self.push_quad(Quad::Call {
                    target: Some(target.clone()),
                    function: callee,
                    arguments,
                });

                if *ty == Type::String {
                    self.defer_temporary(Self::refcount_call(
                        DELREF_STRING,
                        Val::Var(target.clone()),
                    ));
                }

                Val::Var(target)
            }
        }
    }

    /// `a && b` and `a || b` only evaluate `b` when `a` does not decide the
    /// result. Both outcomes assign the same register.
    fn lower_short_circuit(&mut self, builtin: Builtin, arguments: &[Expression]) -> Val {
        let [lhs, rhs] = arguments else {
            unreachable!("{builtin:?} takes two operands");
        };

        let result = self.create_register(RegType::I1);
        let rhs_label = self.create_label();
        let positive_label = self.create_label();
        let negative_label = self.create_label();
        let end_label = self.create_label();

        let lhs = self.lower_expression(lhs);

        let (positive, negative) = match builtin {
            Builtin::And => (rhs_label, negative_label),
            _ => (positive_label, rhs_label),
        };

        self.push_quad(Quad::CondBranch {
            condition: lhs,
            positive,
            negative,
        });

        self.push_quad(Quad::Label(rhs_label));
        self.lower_condition(rhs, positive_label, negative_label);

        for (label, value) in [(positive_label, 1), (negative_label, 0)] {
            self.push_quad(Quad::Label(label));
            self.push_quad(Quad::Assign {
                target: result.clone(),
                source: Val::Constant {
                    ty: RegType::I1,
                    value,
                },
            });
            self.push_quad(Quad::Branch {
                destination: end_label,
            });
        }

        self.push_quad(Quad::Label(end_label));

        Val::Var(result)
    }
}
