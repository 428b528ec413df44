//! Latte compiler front and middle end
//!
//! Source text is parsed into an AST, type checked, statically analyzed and
//! constant folded, then lowered to a quadruple IR which is optimized and
//! handed over as data together with its string constants.

pub mod index;

pub mod diagnostics;
pub mod frontend;
pub mod middle;
pub mod session;
