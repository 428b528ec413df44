//! Static analysis of a type checked program
//!
//! One traversal computes return completeness and folds constants. Return
//! completeness is decided on the statements as written: when folding
//! replaces a statement, the replacement keeps the original's `returns` flag.
//! `if (true) return 1;` therefore still does not count as returning.

use tracing::debug;

use self::{
    const_fold::{ConstantFolder, close_scopes, fold_constants, open_scopes, unhide_names},
    returns::check_returns,
};
use crate::{
    diagnostics::Diagnostic,
    frontend::ast::{
        Program,
        traverse::{Hook, Node, traverse},
    },
};

pub mod const_fold;
pub mod returns;

#[derive(Debug, Default)]
pub struct StaticAnalyzer {
    diagnostics: Vec<Diagnostic>,
    folder: ConstantFolder,
}

const PRE_HOOKS: &[Hook<StaticAnalyzer>] = &[open_scopes];
const POST_HOOKS: &[Hook<StaticAnalyzer>] =
    &[check_returns, close_scopes, fold_constants, unhide_names];

/// Checks return completeness and folds constants
pub fn analyze_program(program: Program) -> (Program, Vec<Diagnostic>) {
    let mut analyzer = StaticAnalyzer::default();

    let program = traverse(
        Node::Program(program),
        &mut analyzer,
        PRE_HOOKS,
        POST_HOOKS,
    )
    .into_program();

    debug!(
        diagnostics = analyzer.diagnostics.len(),
        "statically analyzed program"
    );

    (program, analyzer.diagnostics)
}

/// Runs constant folding alone. Statement `returns` flags are left as they
/// are.
pub fn fold_program(program: Program) -> Program {
    let mut analyzer = StaticAnalyzer::default();

    traverse(
        Node::Program(program),
        &mut analyzer,
        PRE_HOOKS,
        &[close_scopes, fold_constants, unhide_names],
    )
    .into_program()
}
