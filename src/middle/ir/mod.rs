//! Quadruple IR. Every function is a flat list of quads in which labels start
//! basic blocks and control flow is explicit branches. Virtual registers are
//! numbered per function and typed at every use.

use hashbrown::HashSet;

use crate::{
    frontend::ast::ty::{FunctionType, Type},
    index::{Index, IndexVec},
};

pub mod generate;
pub mod pretty_print;

crate::simple_index! {
    /// Identifies a virtual register within a function
    pub struct RegisterId;
}

crate::simple_index! {
    /// Identifies a label within a function
    pub struct LabelId;
}

crate::simple_index! {
    /// Identifies a string constant within a program
    pub struct StringId;
}

impl LabelId {
    /// The label every function body starts with
    pub const ENTRY: Self = Self(0);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegType {
    I1,
    I8,
    I32,
    /// Pointer to a reference counted string object
    String,
    Void,
    Ptr(Box<RegType>),
    Array(usize, Box<RegType>),
    FunctionPtr {
        ret: Box<RegType>,
        params: Vec<RegType>,
    },
}

impl From<&Type> for RegType {
    fn from(ty: &Type) -> Self {
        match ty {
            Type::Int => RegType::I32,
            Type::Bool => RegType::I1,
            Type::String => RegType::String,
            Type::Void => RegType::Void,
            Type::Function(function) => function.into(),
            Type::Alternative(_) | Type::Undefined => {
                unreachable!("unresolved type {ty} reached IR generation")
            }
        }
    }
}

impl From<&FunctionType> for RegType {
    fn from(function: &FunctionType) -> Self {
        RegType::FunctionPtr {
            ret: Box::new(RegType::from(&*function.ret)),
            params: function.params.iter().map(RegType::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub ty: RegType,
    pub id: RegisterId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Val {
    Var(Var),
    /// A function or runtime helper
    GlobalVar { ty: RegType, name: String },
    Constant { ty: RegType, value: i32 },
    StringConstant { id: StringId },
}

impl Val {
    pub fn ty(&self) -> RegType {
        match self {
            Val::Var(var) => var.ty.clone(),
            Val::GlobalVar { ty, .. } | Val::Constant { ty, .. } => ty.clone(),
            Val::StringConstant { .. } => RegType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Quad {
    Label(LabelId),
    Call {
        /// Absent for void calls
        target: Option<Var>,
        function: Val,
        arguments: Vec<Val>,
    },
    CondBranch {
        condition: Val,
        positive: LabelId,
        negative: LabelId,
    },
    Branch {
        destination: LabelId,
    },
    Return {
        value: Option<Val>,
    },
    Assign {
        target: Var,
        source: Val,
    },
    /// Reserves a stack slot. `target` has pointer type.
    Alloc {
        target: Var,
    },
    Load {
        target: Var,
        source: Var,
    },
    Store {
        source: Val,
        target: Var,
    },
}

impl Quad {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Quad::Return { .. } | Quad::Branch { .. } | Quad::CondBranch { .. }
        )
    }

    pub fn branch_targets(&self) -> Vec<LabelId> {
        match self {
            Quad::Branch { destination } => vec![*destination],
            Quad::CondBranch {
                positive, negative, ..
            } => vec![*positive, *negative],
            _ => Vec::new(),
        }
    }

    /// Rewrites every value the quad reads. Written registers are left alone.
    pub fn map_reads(self, mut f: impl FnMut(Val) -> Val) -> Quad {
        match self {
            Quad::Call {
                target,
                function,
                arguments,
            } => Quad::Call {
                target,
                function: f(function),
                arguments: arguments.into_iter().map(&mut f).collect(),
            },
            Quad::CondBranch {
                condition,
                positive,
                negative,
            } => Quad::CondBranch {
                condition: f(condition),
                positive,
                negative,
            },
            Quad::Return { value } => Quad::Return {
                value: value.map(f),
            },
            Quad::Assign { target, source } => Quad::Assign {
                target,
                source: f(source),
            },
            Quad::Store { source, target } => Quad::Store {
                source: f(source),
                target,
            },
            quad @ (Quad::Label(_)
            | Quad::Branch { .. }
            | Quad::Alloc { .. }
            | Quad::Load { .. }) => quad,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub ret: RegType,
    pub name: String,
    pub params: Vec<Var>,
    pub body: Vec<Quad>,
}

impl Function {
    /// Lowest register id not used anywhere in the function
    pub fn next_free_register(&self) -> RegisterId {
        let mut used = self.params.iter().map(|p| p.id).collect::<HashSet<_>>();

        for quad in &self.body {
            match quad {
                Quad::Call {
                    target: Some(target),
                    ..
                }
                | Quad::Assign { target, .. }
                | Quad::Alloc { target }
                | Quad::Load { target, .. }
                | Quad::Store { target, .. } => {
                    used.insert(target.id);
                }
                _ => {}
            }
        }

        used.into_iter()
            .max()
            .map(|max| max.plus(1))
            .unwrap_or(RegisterId::new(0))
    }

    /// Labels some branch in the body jumps to
    pub fn referenced_labels(&self) -> HashSet<LabelId> {
        self.body.iter().flat_map(Quad::branch_targets).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
    /// String constants referenced by [`Val::StringConstant`]
    pub strings: IndexVec<StringId, String>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Type of the NUL terminated byte array backing a string constant
    pub fn string_storage_type(&self, id: StringId) -> RegType {
        RegType::Array(self.strings[id].len() + 1, Box::new(RegType::I8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(id: usize) -> Var {
        Var {
            ty: RegType::I32,
            id: RegisterId::new(id),
        }
    }

    #[test]
    fn function_types_lower_to_function_pointers() {
        let ty = Type::Function(FunctionType::new([Type::String, Type::Bool], Type::Int));

        assert_eq!(
            RegType::from(&ty),
            RegType::FunctionPtr {
                ret: Box::new(RegType::I32),
                params: vec![RegType::String, RegType::I1],
            }
        );
    }

    #[test]
    fn map_reads_leaves_targets_alone() {
        let quad = Quad::Assign {
            target: var(0),
            source: Val::Var(var(0)),
        };

        let mapped = quad.map_reads(|_| Val::Constant {
            ty: RegType::I32,
            value: 7,
        });

        assert_eq!(
            mapped,
            Quad::Assign {
                target: var(0),
                source: Val::Constant {
                    ty: RegType::I32,
                    value: 7
                },
            }
        );
    }

    #[test]
    fn next_free_register_skips_everything_written() {
        let function = Function {
            ret: RegType::Void,
            name: "f".into(),
            params: vec![var(0)],
            body: vec![
                Quad::Label(LabelId::ENTRY),
                Quad::Assign {
                    target: var(4),
                    source: Val::Var(var(0)),
                },
                Quad::Return { value: None },
            ],
        };

        assert_eq!(function.next_free_register(), RegisterId::new(5));
    }
}
