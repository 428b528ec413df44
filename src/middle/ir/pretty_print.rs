use std::fmt;

use colored::Colorize;
use itertools::Itertools;

use crate::{
    index::Index,
    middle::ir::{Function, LabelId, Program, Quad, RegType, RegisterId, StringId, Val, Var},
};

/// Renders `program`. Without `color` the text carries no escape codes.
pub fn pretty_print_program(program: &Program, color: bool) -> String {
    let text = program.to_string();

    if color {
        text
    } else {
        strip_ansi_escapes::strip_str(text)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, value) in self.strings.enumerate() {
            writeln!(
                f,
                "{id} {} {} {}",
                "=".white(),
                self.string_storage_type(id),
                format!("{value:?}").green()
            )?;
        }

        if !self.strings.is_empty() {
            writeln!(f)?;
        }

        let functions = self.functions.iter().map(|function| function.to_string());

        write!(f, "{}", functions.format("\n"))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}{}{}{}",
            "fn".magenta(),
            self.ret,
            format!("@{}", self.name).blue(),
            "(".white(),
            self.params
                .iter()
                .map(|param| format!("{param}: {}", param.ty))
                .join(", "),
            ") {".white()
        )?;

        for quad in &self.body {
            match quad {
                Quad::Label(label) => writeln!(f, "{}", format!("{label}:").bright_red())?,
                quad => writeln!(f, "    {quad}")?,
            }
        }

        writeln!(f, "{}", "}".white())
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quad::Label(label) => write!(f, "{}", format!("{label}:").bright_red()),
            Quad::Call {
                target,
                function,
                arguments,
            } => {
                if let Some(target) = target {
                    write!(f, "{target} {} ", "=".white())?;
                }

                write!(
                    f,
                    "{} {function}{}{}{}",
                    "call".cyan(),
                    "(".white(),
                    arguments.iter().join(", "),
                    ")".white()
                )
            }
            Quad::CondBranch {
                condition,
                positive,
                negative,
            } => write!(
                f,
                "{} {condition}, {}, {}",
                "br".cyan(),
                positive.to_string().blue(),
                negative.to_string().blue()
            ),
            Quad::Branch { destination } => {
                write!(f, "{} {}", "jmp".cyan(), destination.to_string().blue())
            }
            Quad::Return { value: Some(value) } => write!(f, "{} {value}", "ret".cyan()),
            Quad::Return { value: None } => write!(f, "{}", "ret".cyan()),
            Quad::Assign { target, source } => write!(f, "{target} {} {source}", "=".white()),
            Quad::Alloc { target } => {
                let slot = match &target.ty {
                    RegType::Ptr(ty) => ty.as_ref(),
                    ty => ty,
                };

                write!(f, "{target} {} {} {slot}", "=".white(), "alloc".cyan())
            }
            Quad::Load { target, source } => {
                write!(f, "{target} {} {} {source}", "=".white(), "load".cyan())
            }
            Quad::Store { source, target } => {
                write!(f, "{} {target} {} {source}", "store".cyan(), "<-".white())
            }
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Var(var) => write!(f, "{var}"),
            Val::GlobalVar { name, .. } => write!(f, "{}", format!("@{name}").blue()),
            Val::Constant { value, .. } => write!(f, "{}", value.to_string().purple()),
            Val::StringConstant { id } => write!(f, "{id}"),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("%v{}", self.index()).yellow())
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == LabelId::ENTRY {
            write!(f, "entry")
        } else {
            write!(f, "L{}", self.index())
        }
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("@s{}", self.index()).green())
    }
}

impl fmt::Display for RegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegType::I1 => write!(f, "i1"),
            RegType::I8 => write!(f, "i8"),
            RegType::I32 => write!(f, "i32"),
            RegType::String => write!(f, "str"),
            RegType::Void => write!(f, "void"),
            RegType::Ptr(ty) => write!(f, "{ty}*"),
            RegType::Array(length, ty) => write!(f, "[{length} x {ty}]"),
            RegType::FunctionPtr { ret, params } => {
                write!(f, "{ret} ({})", params.iter().join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::index::IndexVec;

    #[test]
    fn prints_strings_then_functions() {
        let x = Var {
            ty: RegType::I32,
            id: RegisterId::new(0),
        };
        let slot = Var {
            ty: RegType::Ptr(Box::new(RegType::I32)),
            id: RegisterId::new(1),
        };

        let mut strings = IndexVec::new();
        strings.push("hi".to_string());

        let program = Program {
            functions: vec![Function {
                ret: RegType::I32,
                name: "main".into(),
                params: vec![x.clone()],
                body: vec![
                    Quad::Label(LabelId::ENTRY),
                    Quad::Alloc {
                        target: slot.clone(),
                    },
                    Quad::Call {
                        target: None,
                        function: Val::GlobalVar {
                            ty: RegType::FunctionPtr {
                                ret: Box::new(RegType::Void),
                                params: vec![RegType::String],
                            },
                            name: "printString".into(),
                        },
                        arguments: vec![Val::StringConstant {
                            id: StringId::new(0),
                        }],
                    },
                    Quad::Store {
                        source: Val::Var(x.clone()),
                        target: slot.clone(),
                    },
                    Quad::Branch {
                        destination: LabelId::new(1),
                    },
                    Quad::Label(LabelId::new(1)),
                    Quad::Load {
                        target: Var {
                            ty: RegType::I32,
                            id: RegisterId::new(2),
                        },
                        source: slot,
                    },
                    Quad::Return {
                        value: Some(Val::Constant {
                            ty: RegType::I32,
                            value: 0,
                        }),
                    },
                ],
            }],
            strings,
        };

        assert_eq!(
            pretty_print_program(&program, false),
            indoc! {r#"
                @s0 = [3 x i8] "hi"

                fn i32 @main(%v0: i32) {
                entry:
                    %v1 = alloc i32
                    call @printString(@s0)
                    store %v1 <- %v0
                    jmp L1
                L1:
                    %v2 = load %v1
                    ret 0
                }
            "#}
        );
    }
}
