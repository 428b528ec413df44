use hashbrown::HashMap;
use tracing::debug;

use crate::{
    index::Index,
    middle::ir::{Function, LabelId, Quad, RegType, RegisterId, Val, Var},
};

/// Removes every `Assign` from the function.
///
/// A register assigned once becomes an alias of the value assigned to it,
/// resolved at the point of the assignment. A register assigned more than
/// once lives in a stack slot instead: the slot is allocated at the entry
/// label, each assignment becomes a store and each read a load emitted right
/// before the quad doing the read. Quads keep their relative order.
pub fn eliminate_assignments(function: &mut Function) {
    let mut assignments = HashMap::<RegisterId, usize>::new();

    for quad in &function.body {
        if let Quad::Assign { target, .. } = quad {
            *assignments.entry(target.id).or_default() += 1;
        }
    }

    let mut context = EliminationContext {
        next_register: function.next_free_register(),
        slots: HashMap::new(),
        aliases: HashMap::new(),
        body: Vec::with_capacity(function.body.len()),
    };

    let mut quads = std::mem::take(&mut function.body).into_iter().peekable();

    if quads.peek() == Some(&Quad::Label(LabelId::ENTRY)) {
        quads.next();
    }

    context.body.push(Quad::Label(LabelId::ENTRY));

    // Slots come first so they dominate every use
    let mut promoted = Vec::new();

    for quad in quads.clone() {
        if let Quad::Assign { target, .. } = quad {
            if assignments[&target.id] > 1 && !context.slots.contains_key(&target.id) {
                let slot = Var {
                    ty: RegType::Ptr(Box::new(target.ty.clone())),
                    id: target.id,
                };

                context.slots.insert(target.id, slot.clone());
                promoted.push(Quad::Alloc { target: slot });
            }
        }
    }

    context.body.extend(promoted);

    for quad in quads {
        context.eliminate(quad);
    }

    debug!(
        function = %function.name,
        promoted = context.slots.len(),
        aliased = context.aliases.len(),
        "eliminated assignments"
    );

    function.body = context.body;
}

struct EliminationContext {
    next_register: RegisterId,
    /// Stack slots of registers assigned more than once
    slots: HashMap<RegisterId, Var>,
    /// Values standing in for registers assigned exactly once
    aliases: HashMap<RegisterId, Val>,
    body: Vec<Quad>,
}

impl EliminationContext {
    fn eliminate(&mut self, quad: Quad) {
        match quad {
            Quad::Assign { target, source } => {
                let source = self.resolve(source);

                match self.slots.get(&target.id) {
                    Some(slot) => {
                        let target = slot.clone();
                        self.body.push(Quad::Store { source, target });
                    }
                    None => {
                        self.aliases.insert(target.id, source);
                    }
                }
            }
            quad => {
                let quad = quad.map_reads(|value| self.resolve(value));
                self.body.push(quad);
            }
        }
    }

    /// The value to read in place of `value`, loading it from its slot first
    /// if it has one
    fn resolve(&mut self, value: Val) -> Val {
        let var = match value {
            Val::Var(var) => var,
            other => return other,
        };

        if let Some(alias) = self.aliases.get(&var.id) {
            return alias.clone();
        }

        let Some(slot) = self.slots.get(&var.id).cloned() else {
            return Val::Var(var);
        };

        let target = Var {
            ty: var.ty,
            id: self.next_register,
        };
        self.next_register.increment_by(1);

        self.body.push(Quad::Load {
            target: target.clone(),
            source: slot,
        });

        Val::Var(target)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn int(id: usize) -> Var {
        Var {
            ty: RegType::I32,
            id: RegisterId::new(id),
        }
    }

    fn constant(value: i32) -> Val {
        Val::Constant {
            ty: RegType::I32,
            value,
        }
    }

    fn function(body: Vec<Quad>) -> Function {
        Function {
            ret: RegType::I32,
            name: "f".into(),
            params: Vec::new(),
            body,
        }
    }

    #[test]
    fn single_assignment_becomes_alias() {
        let mut f = function(vec![
            Quad::Label(LabelId::ENTRY),
            Quad::Assign {
                target: int(0),
                source: constant(1),
            },
            Quad::Assign {
                target: int(1),
                source: Val::Var(int(0)),
            },
            Quad::Return {
                value: Some(Val::Var(int(1))),
            },
        ]);

        eliminate_assignments(&mut f);

        assert_eq!(
            f.body,
            [
                Quad::Label(LabelId::ENTRY),
                Quad::Return {
                    value: Some(constant(1))
                },
            ]
        );
    }

    #[test]
    fn multiple_assignments_use_a_slot() {
        let slot = Var {
            ty: RegType::Ptr(Box::new(RegType::I32)),
            id: RegisterId::new(0),
        };

        let mut f = function(vec![
            Quad::Label(LabelId::ENTRY),
            Quad::Assign {
                target: int(0),
                source: constant(1),
            },
            Quad::Assign {
                target: int(0),
                source: constant(2),
            },
            Quad::Return {
                value: Some(Val::Var(int(0))),
            },
        ]);

        eliminate_assignments(&mut f);

        assert_eq!(
            f.body,
            [
                Quad::Label(LabelId::ENTRY),
                Quad::Alloc {
                    target: slot.clone()
                },
                Quad::Store {
                    source: constant(1),
                    target: slot.clone(),
                },
                Quad::Store {
                    source: constant(2),
                    target: slot.clone(),
                },
                Quad::Load {
                    target: int(1),
                    source: slot,
                },
                Quad::Return {
                    value: Some(Val::Var(int(1)))
                },
            ]
        );
    }

    #[test]
    fn alias_of_slot_register_loads_at_assignment() {
        let slot = Var {
            ty: RegType::Ptr(Box::new(RegType::I32)),
            id: RegisterId::new(0),
        };

        let mut f = function(vec![
            Quad::Label(LabelId::ENTRY),
            Quad::Assign {
                target: int(0),
                source: constant(1),
            },
            Quad::Assign {
                target: int(0),
                source: constant(2),
            },
            Quad::Assign {
                target: int(1),
                source: Val::Var(int(0)),
            },
            Quad::Return {
                value: Some(Val::Var(int(1))),
            },
        ]);

        eliminate_assignments(&mut f);

        assert_eq!(
            f.body[4..].to_vec(),
            [
                Quad::Load {
                    target: int(2),
                    source: slot,
                },
                Quad::Return {
                    value: Some(Val::Var(int(2)))
                },
            ]
        );
    }
}
