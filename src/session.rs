//! The compilation pipeline
//!
//! A [`Session`] runs the stages over one source file in order and stops at
//! the first stage that reports anything.

use std::path::PathBuf;

use strum::Display;
use thiserror::Error;
use tracing::{debug, debug_span};

use crate::{
    diagnostics::Diagnostic,
    frontend::{SourceFile, ast, parser::Parser},
    middle::{
        ir::{self, generate::generate_program},
        optimization::optimize_program,
        static_analysis::analyze_program,
        type_check::type_check_program,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Report declarations shadowing a variable of an enclosing scope
    pub warn_shadow: bool,
    /// Run the IR optimizations after generation
    pub optimize: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            warn_shadow: false,
            optimize: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Parse,
    TypeCheck,
    StaticAnalysis,
    GenerateIr,
    Optimize,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{stage} reported {} diagnostic(s)", .diagnostics.len())]
    Diagnostics {
        stage: Stage,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("could not read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct Session<'source> {
    source: &'source SourceFile,
    options: CompilerOptions,
}

impl<'source> Session<'source> {
    pub fn new(source: &'source SourceFile, options: CompilerOptions) -> Self {
        Self { source, options }
    }

    /// Parses, type checks and statically analyzes the source. The returned
    /// tree is typed and folded.
    pub fn check(&self) -> Result<ast::Program, CompileError> {
        let program = run_stage(Stage::Parse, || Parser::parse_program(self.source))?;

        let program = run_stage(Stage::TypeCheck, || {
            type_check_program(program, self.options.warn_shadow)
        })?;

        run_stage(Stage::StaticAnalysis, || analyze_program(program))
    }

    /// Runs the whole pipeline
    pub fn compile(&self) -> Result<ir::Program, CompileError> {
        let program = self.check()?;

        let program = run_stage(Stage::GenerateIr, || (generate_program(&program), Vec::new()))?;

        if !self.options.optimize {
            return Ok(program);
        }

        run_stage(Stage::Optimize, || (optimize_program(program), Vec::new()))
    }
}

fn run_stage<T>(
    stage: Stage,
    run: impl FnOnce() -> (T, Vec<Diagnostic>),
) -> Result<T, CompileError> {
    let _span = debug_span!("stage", %stage).entered();

    let (output, diagnostics) = run();

    debug!(diagnostics = diagnostics.len(), "finished");

    if diagnostics.is_empty() {
        Ok(output)
    } else {
        Err(CompileError::Diagnostics { stage, diagnostics })
    }
}

/// Reads the source file at `path`
pub fn read_source(path: PathBuf) -> Result<SourceFile, CompileError> {
    SourceFile::from_path(path.clone()).map_err(|source| CompileError::Io { path, source })
}
