//! Functions every program can call without declaring them, and the
//! compile time implementations of the built-in operators

use once_cell::sync::Lazy;

use crate::frontend::ast::{
    operator::Builtin,
    ty::{FunctionType, Type, Value},
};

/// Runtime helper incrementing a string's reference count
pub const ADDREF_STRING: &str = "__builtin__addref_string";
/// Runtime helper decrementing a string's reference count, freeing it at zero
pub const DELREF_STRING: &str = "__builtin__delref_string";

pub static PRELUDE_FUNCTIONS: Lazy<Vec<(&'static str, FunctionType)>> = Lazy::new(|| {
    vec![
        ("printInt", FunctionType::new([Type::Int], Type::Void)),
        ("printString", FunctionType::new([Type::String], Type::Void)),
        ("error", FunctionType::new([], Type::Void)),
        ("readInt", FunctionType::new([], Type::Int)),
        ("readString", FunctionType::new([], Type::String)),
    ]
});

/// Signature of the string reference counting helpers
pub fn refcount_helper_type() -> FunctionType {
    FunctionType::new([Type::String], Type::Void)
}

/// Evaluates `builtin` on known arguments. Returns `None` when the result is
/// not defined at compile time (division by zero).
pub fn evaluate(builtin: Builtin, arguments: &[Value]) -> Option<Value> {
    use Builtin::*;
    use Value::{Bool, Int, String};

    let value = match (builtin, arguments) {
        (UnaryMinus, [Int(a)]) => Int(a.wrapping_neg()),
        (UnaryNot, [Bool(a)]) => Bool(!a),

        (Mul, [Int(a), Int(b)]) => Int(a.wrapping_mul(*b)),
        (Div, [Int(a), Int(b)]) => Int(floor_div(*a, *b)?),
        (Mod, [Int(a), Int(b)]) => Int(floor_mod(*a, *b)?),
        (AddInt, [Int(a), Int(b)]) => Int(a.wrapping_add(*b)),
        (Sub, [Int(a), Int(b)]) => Int(a.wrapping_sub(*b)),
        (AddString, [String(a), String(b)]) => String(format!("{a}{b}")),

        (Lt, [Int(a), Int(b)]) => Bool(a < b),
        (Le, [Int(a), Int(b)]) => Bool(a <= b),
        (Gt, [Int(a), Int(b)]) => Bool(a > b),
        (Ge, [Int(a), Int(b)]) => Bool(a >= b),

        (EqInt, [Int(a), Int(b)]) => Bool(a == b),
        (EqString, [String(a), String(b)]) => Bool(a == b),
        (EqBool, [Bool(a), Bool(b)]) => Bool(a == b),
        (NeInt, [Int(a), Int(b)]) => Bool(a != b),
        (NeString, [String(a), String(b)]) => Bool(a != b),
        (NeBool, [Bool(a), Bool(b)]) => Bool(a != b),

        (And, [Bool(a), Bool(b)]) => Bool(*a && *b),
        (Or, [Bool(a), Bool(b)]) => Bool(*a || *b),

        _ => return None,
    };

    Some(value)
}

/// Quotient rounded towards negative infinity
pub fn floor_div(a: i32, b: i32) -> Option<i32> {
    if b == 0 {
        return None;
    }

    let quotient = a.wrapping_div(b);

    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Some(quotient.wrapping_sub(1))
    } else {
        Some(quotient)
    }
}

/// Remainder with the sign of the divisor
pub fn floor_mod(a: i32, b: i32) -> Option<i32> {
    if b == 0 {
        return None;
    }

    let remainder = a.wrapping_rem(b);

    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        Some(remainder.wrapping_add(b))
    } else {
        Some(remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_rounds_towards_negative_infinity() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(-7, -2), Some(3));
        assert_eq!(floor_div(-8, 2), Some(-4));
        assert_eq!(floor_div(i32::MIN, -1), Some(i32::MIN));
    }

    #[test]
    fn modulus_takes_sign_of_divisor() {
        assert_eq!(floor_mod(7, 3), Some(1));
        assert_eq!(floor_mod(-7, 3), Some(2));
        assert_eq!(floor_mod(7, -3), Some(-2));
        assert_eq!(floor_mod(-7, -3), Some(-1));
        assert_eq!(floor_mod(-6, 3), Some(0));
    }

    #[test]
    fn division_by_zero_is_not_evaluated() {
        assert_eq!(evaluate(Builtin::Div, &[Value::Int(1), Value::Int(0)]), None);
        assert_eq!(evaluate(Builtin::Mod, &[Value::Int(1), Value::Int(0)]), None);
    }

    #[test]
    fn evaluates_string_builtins() {
        let a = Value::String("foo".into());
        let b = Value::String("bar".into());

        assert_eq!(
            evaluate(Builtin::AddString, &[a.clone(), b.clone()]),
            Some(Value::String("foobar".into()))
        );
        assert_eq!(
            evaluate(Builtin::NeString, &[a.clone(), b]),
            Some(Value::Bool(true))
        );
        assert_eq!(evaluate(Builtin::EqString, &[a.clone(), a]), Some(Value::Bool(true)));
    }

    #[test]
    fn arithmetic_wraps_at_32_bits() {
        assert_eq!(
            evaluate(Builtin::AddInt, &[Value::Int(i32::MAX), Value::Int(1)]),
            Some(Value::Int(i32::MIN))
        );
        assert_eq!(
            evaluate(Builtin::UnaryMinus, &[Value::Int(i32::MIN)]),
            Some(Value::Int(i32::MIN))
        );
    }
}
