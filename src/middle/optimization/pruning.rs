use hashbrown::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::middle::ir::{Function, LabelId, Quad};

/// A label and the quads up to the next label. The quads before the first
/// label of a body form a block without one.
#[derive(Debug)]
struct Block {
    label: Option<LabelId>,
    quads: Vec<Quad>,
}

/// Removes blocks no path from the entry reaches and everything following the
/// first terminator of a block, until nothing changes. A block falling
/// through into the next one gets an explicit branch to it.
pub fn prune_dead_blocks(function: &mut Function) {
    let mut round = 0;

    loop {
        round += 1;

        let (changed, body) = prune_once(std::mem::take(&mut function.body));
        function.body = body;

        if !changed {
            break;
        }
    }

    debug!(function = %function.name, rounds = round, "pruned dead blocks");
}

fn prune_once(body: Vec<Quad>) -> (bool, Vec<Quad>) {
    let mut blocks = split_blocks(body);
    let mut changed = false;

    for block in &mut blocks {
        changed |= truncate_after_terminator(block);
    }

    // Make fallthrough explicit
    for index in 1..blocks.len() {
        let next = blocks[index].label;
        let block = &mut blocks[index - 1];

        if let Some(destination) = next {
            if !block.quads.last().is_some_and(Quad::is_terminator) {
                block.quads.push(Quad::Branch { destination });
                changed = true;
            }
        }
    }

    let reachable = reachable_blocks(&blocks);

    trace!(
        blocks = blocks.len(),
        unreachable = blocks.len() - reachable.len(),
        "pruning round"
    );

    changed |= reachable.len() != blocks.len();

    let body = blocks
        .into_iter()
        .enumerate()
        .filter(|(index, _)| reachable.contains(index))
        .flat_map(|(_, block)| block.quads)
        .collect();

    (changed, body)
}

fn split_blocks(body: Vec<Quad>) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current = Block {
        label: None,
        quads: Vec::new(),
    };

    for quad in body {
        if let Quad::Label(label) = quad {
            if current.label.is_some() || !current.quads.is_empty() {
                blocks.push(current);
            }

            current = Block {
                label: Some(label),
                quads: Vec::new(),
            };
        }

        current.quads.push(quad);
    }

    if current.label.is_some() || !current.quads.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Keeps the quads of `block` up to and including its first terminator.
/// Returns whether anything was dropped.
fn truncate_after_terminator(block: &mut Block) -> bool {
    let length = block.quads.len();

    if let Some(index) = block.quads.iter().position(Quad::is_terminator) {
        block.quads.truncate(index + 1);
    }

    block.quads.len() != length
}

/// Indices of the blocks reachable from the first one
fn reachable_blocks(blocks: &[Block]) -> HashSet<usize> {
    let by_label = blocks
        .iter()
        .enumerate()
        .filter_map(|(index, block)| block.label.map(|label| (label, index)))
        .collect::<HashMap<_, _>>();

    let mut reachable = HashSet::new();
    let mut worklist = Vec::new();

    if !blocks.is_empty() {
        worklist.push(0);
    }

    while let Some(index) = worklist.pop() {
        if !reachable.insert(index) {
            continue;
        }

        let Some(last) = blocks[index].quads.last() else {
            continue;
        };

        worklist.extend(
            last.branch_targets()
                .iter()
                .filter_map(|label| by_label.get(label).copied()),
        );
    }

    reachable
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        index::Index,
        middle::ir::{RegType, Val},
    };

    fn function(body: Vec<Quad>) -> Function {
        Function {
            ret: RegType::I32,
            name: "f".into(),
            params: Vec::new(),
            body,
        }
    }

    fn ret(value: i32) -> Quad {
        Quad::Return {
            value: Some(Val::Constant {
                ty: RegType::I32,
                value,
            }),
        }
    }

    fn label(index: usize) -> LabelId {
        LabelId::new(index)
    }

    #[test]
    fn drops_quads_after_terminator() {
        let mut f = function(vec![
            Quad::Label(LabelId::ENTRY),
            ret(1),
            ret(2),
        ]);

        prune_dead_blocks(&mut f);

        assert_eq!(f.body, [Quad::Label(LabelId::ENTRY), ret(1)]);
    }

    #[test]
    fn drops_unreachable_cycles() {
        let mut f = function(vec![
            Quad::Label(LabelId::ENTRY),
            ret(0),
            Quad::Label(label(1)),
            Quad::Branch {
                destination: label(2),
            },
            Quad::Label(label(2)),
            Quad::Branch {
                destination: label(1),
            },
        ]);

        prune_dead_blocks(&mut f);

        assert_eq!(f.body, [Quad::Label(LabelId::ENTRY), ret(0)]);
    }

    #[test]
    fn keeps_branch_targets_and_makes_fallthrough_explicit() {
        let condition = Val::Constant {
            ty: RegType::I1,
            value: 1,
        };

        let mut f = function(vec![
            Quad::Label(LabelId::ENTRY),
            Quad::CondBranch {
                condition: condition.clone(),
                positive: label(1),
                negative: label(2),
            },
            Quad::Label(label(1)),
            Quad::Label(label(2)),
            ret(3),
        ]);

        prune_dead_blocks(&mut f);

        assert_eq!(
            f.body,
            [
                Quad::Label(LabelId::ENTRY),
                Quad::CondBranch {
                    condition,
                    positive: label(1),
                    negative: label(2),
                },
                Quad::Label(label(1)),
                Quad::Branch {
                    destination: label(2)
                },
                Quad::Label(label(2)),
                ret(3),
            ]
        );
    }
}
