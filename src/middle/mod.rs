//! Everything between the parsed AST and the optimized IR: type checking,
//! static analysis and constant folding on the AST, then quad generation and
//! the IR level optimizations.

pub mod ir;
pub mod optimization;
pub mod prelude;
pub mod scope;
pub mod static_analysis;
pub mod type_check;
