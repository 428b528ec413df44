//! Built-in operators and their typed instantiations
//!
//! An [`Operator`] is what the user wrote (`+`). A [`Builtin`] is one concrete
//! implementation of it (`add_string`) picked by the type checker once the
//! argument types are known. Only `+`, `==` and `!=` have more than one.

use strum::{Display, IntoStaticStr};

use super::ty::{FunctionType, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Operator {
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulus,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "&&")]
    LogicalAnd,
    #[strum(serialize = "||")]
    LogicalOr,
}

impl Operator {
    /// Every implementation of the operator in resolution order
    pub fn instances(self) -> &'static [Builtin] {
        use Builtin::*;

        match self {
            Operator::Negate => &[UnaryMinus],
            Operator::Not => &[UnaryNot],
            Operator::Multiply => &[Mul],
            Operator::Divide => &[Div],
            Operator::Modulus => &[Mod],
            Operator::Add => &[AddInt, AddString],
            Operator::Subtract => &[Sub],
            Operator::LessThan => &[Lt],
            Operator::LessThanOrEqualTo => &[Le],
            Operator::GreaterThan => &[Gt],
            Operator::GreaterThanOrEqualTo => &[Ge],
            Operator::Equals => &[EqInt, EqString, EqBool],
            Operator::NotEquals => &[NeInt, NeString, NeBool],
            Operator::LogicalAnd => &[And],
            Operator::LogicalOr => &[Or],
        }
    }

    /// Type of the operator when used as a callee
    pub fn ty(self) -> Type {
        match self.instances() {
            [single] => Type::Function(single.signature()),
            instances => Type::Alternative(instances.iter().map(|b| b.signature()).collect()),
        }
    }

    pub fn is_short_circuiting(self) -> bool {
        matches!(self, Operator::LogicalAnd | Operator::LogicalOr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Builtin {
    UnaryMinus,
    UnaryNot,
    Mul,
    Div,
    Mod,
    AddInt,
    AddString,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    EqInt,
    EqString,
    EqBool,
    NeInt,
    NeString,
    NeBool,
    And,
    Or,
}

impl Builtin {
    pub fn signature(self) -> FunctionType {
        use Builtin::*;

        match self {
            UnaryMinus => FunctionType::new([Type::Int], Type::Int),
            UnaryNot => FunctionType::new([Type::Bool], Type::Bool),
            Mul | Div | Mod | AddInt | Sub => FunctionType::new([Type::Int, Type::Int], Type::Int),
            AddString => FunctionType::new([Type::String, Type::String], Type::String),
            Lt | Le | Gt | Ge | EqInt | NeInt => {
                FunctionType::new([Type::Int, Type::Int], Type::Bool)
            }
            EqString | NeString => FunctionType::new([Type::String, Type::String], Type::Bool),
            EqBool | NeBool | And | Or => FunctionType::new([Type::Bool, Type::Bool], Type::Bool),
        }
    }

    /// Name of the runtime function implementing this builtin
    pub fn symbol(self) -> String {
        format!("__builtin__{}", <&'static str>::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polymorphic_operators_have_alternative_types() {
        assert!(matches!(Operator::Add.ty(), Type::Alternative(alt) if alt.len() == 2));
        assert!(matches!(Operator::Equals.ty(), Type::Alternative(alt) if alt.len() == 3));
        assert_eq!(
            Operator::Subtract.ty(),
            Type::Function(FunctionType::new([Type::Int, Type::Int], Type::Int))
        );
    }

    #[test]
    fn runtime_symbols() {
        assert_eq!(Builtin::AddString.symbol(), "__builtin__add_string");
        assert_eq!(Builtin::UnaryMinus.symbol(), "__builtin__unary_minus");
        assert_eq!(Builtin::EqBool.symbol(), "__builtin__eq_bool");
    }
}
