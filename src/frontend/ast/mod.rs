use self::{
    operator::{Builtin, Operator},
    ty::{Type, Value},
};
use crate::frontend::lexer::Span;

pub mod operator;
pub mod traverse;
pub mod ty;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub span: Span,
    pub decls: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub span: Span,
    pub return_type: Type,
    pub name: Identifier,
    pub params: Vec<Parameter>,
    /// Always a block
    pub body: Statement,
}

impl FunctionDeclaration {
    pub fn ty(&self) -> ty::FunctionType {
        ty::FunctionType::new(
            self.params.iter().map(|p| p.ty.clone()).collect::<Vec<_>>(),
            self.return_type.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub span: Span,
    pub ty: Type,
    pub name: Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
    /// Whether every path through the statement ends in a `return`. Filled in
    /// by static analysis.
    pub returns: bool,
}

impl Statement {
    pub fn new(span: Span, kind: StatementKind) -> Self {
        Self {
            span,
            kind,
            returns: false,
        }
    }

    pub fn empty(span: Span) -> Self {
        Self::new(span, StatementKind::Block(Vec::new()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    // { ... }
    Block(Vec<Statement>),
    // int x
    //
    // Always directly followed by the assignment initializing `name`
    Declaration { ty: Type, name: Identifier },
    // x = e
    Assignment {
        target: Identifier,
        expression: Box<Expression>,
    },
    // return e
    Return(Option<Box<Expression>>),
    // if (c) s else s
    If {
        condition: Box<Expression>,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    // while (c) s
    While {
        condition: Box<Expression>,
        body: Box<Statement>,
    },
    // f(x)
    FreeExpression(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub span: Span,
    pub kind: ExpressionKind,
    /// Filled in by the type checker
    pub ty: Option<Type>,
    /// Filled in by constant folding when the value is known at compile time
    pub value: Option<Value>,
    /// Names which must not resolve to their innermost declaration while this
    /// expression is checked. Set on declaration initializers so `int x = x;`
    /// reads the outer `x`.
    pub ignore_names: Vec<String>,
}

impl Expression {
    pub fn new(span: Span, kind: ExpressionKind) -> Self {
        Self {
            span,
            kind,
            ty: None,
            value: None,
            ignore_names: Vec::new(),
        }
    }

    /// Builds the literal node holding `value`
    pub fn literal(span: Span, value: Value) -> Self {
        let ty = value.ty();
        let kind = match &value {
            Value::Int(value) => ExpressionKind::IConstant(*value),
            Value::Bool(value) => ExpressionKind::BConstant(*value),
            Value::String(value) => ExpressionKind::SConstant(value.clone()),
        };

        Self {
            span,
            kind,
            ty: Some(ty),
            value: Some(value),
            ignore_names: Vec::new(),
        }
    }

    pub fn operator_application(
        span: Span,
        operator: Operator,
        operator_span: Span,
        arguments: Vec<Expression>,
    ) -> Self {
        let function = Expression::new(
            operator_span,
            ExpressionKind::Operator {
                operator,
                instance: None,
            },
        );

        Self::new(
            span,
            ExpressionKind::Application {
                function: Box::new(function),
                arguments,
            },
        )
    }

    /// Type assigned by the type checker, or [`Type::Undefined`] if it has not
    /// run yet
    pub fn ty(&self) -> &Type {
        self.ty.as_ref().unwrap_or(&Type::Undefined)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::IConstant(_) | ExpressionKind::BConstant(_) | ExpressionKind::SConstant(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    // x
    Variable(String),
    // 1
    IConstant(i32),
    // true
    BConstant(bool),
    // "hello"
    SConstant(String),
    // The callee of a built-in operator application. `instance` is set by the
    // type checker once the implementation is known.
    Operator {
        operator: Operator,
        instance: Option<Builtin>,
    },
    // f(a, b)
    Application {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    // Placeholder for a fragment the parser could not make sense of
    Error,
}
