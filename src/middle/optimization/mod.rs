use tracing::debug;

use crate::middle::ir;

pub mod mem_assignment;
pub mod pruning;

/// Runs the IR optimizations on every function of the program. Pruning runs
/// both before and after memory assignment so the latter never sees dead
/// blocks and leaves no unreachable quads behind.
pub fn optimize_program(mut program: ir::Program) -> ir::Program {
    for function in &mut program.functions {
        pruning::prune_dead_blocks(function);
        mem_assignment::eliminate_assignments(function);
        pruning::prune_dead_blocks(function);

        debug!(function = %function.name, quads = function.body.len(), "optimized");
    }

    program
}
