use std::fmt;

use itertools::Itertools;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// int
    Int,
    /// boolean
    Bool,
    /// string
    ///
    /// A reference counted heap object
    String,
    /// void
    Void,
    /// (int, string) -> boolean
    Function(FunctionType),
    /// A set of function types, one of which is picked at each call site.
    ///
    /// Only produced for the polymorphic built-in operators (`+`, `==`, `!=`)
    Alternative(Vec<FunctionType>),
    /// Given to anything whose type could not be computed. Only equal to
    /// itself and never reported twice, which stops one mistake from turning
    /// into a chain of errors.
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl FunctionType {
    pub fn new(params: impl Into<Vec<Type>>, ret: Type) -> Self {
        Self {
            params: params.into(),
            ret: Box::new(ret),
        }
    }
}

impl Type {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Type::Undefined)
    }

    /// Value a variable of this type holds before its first explicit
    /// assignment
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Type::Int => Some(Value::Int(0)),
            Type::Bool => Some(Value::Bool(false)),
            Type::String => Some(Value::String(String::new())),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("boolean"),
            Type::String => f.write_str("string"),
            Type::Void => f.write_str("void"),
            Type::Function(function) => write!(f, "{function}"),
            Type::Alternative(alternatives) => {
                write!(f, "{}", alternatives.iter().join("; "))
            }
            Type::Undefined => f.write_str("undefined"),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.params.iter().join(", "), self.ret)
    }
}

/// A statically known value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Bool(bool),
    String(String),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Bool(_) => Type::Bool,
            Value::String(_) => Type::String,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_function_and_alternative_types() {
        let add_int = FunctionType::new([Type::Int, Type::Int], Type::Int);
        let add_string = FunctionType::new([Type::String, Type::String], Type::String);

        assert_eq!(add_int.to_string(), "(int, int) -> int");
        assert_eq!(
            Type::Alternative(vec![add_int, add_string]).to_string(),
            "(int, int) -> int; (string, string) -> string"
        );
    }

    #[test]
    fn undefined_only_equals_itself() {
        assert_eq!(Type::Undefined, Type::Undefined);
        assert_ne!(Type::Undefined, Type::Int);
        assert_ne!(Type::Undefined, Type::Void);
    }
}
