use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser as ClapParser, ValueEnum, error::ErrorKind};
use lattec::{
    middle::ir::pretty_print::pretty_print_program,
    session::{CompileError, CompilerOptions, Session, read_source},
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// The optimized quadruple IR
    Ir,
    /// The type checked and folded syntax tree
    Ast,
}

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    source_files: Vec<PathBuf>,

    /// Warn about declarations shadowing an outer variable
    #[arg(long)]
    wshadow: bool,

    /// Skip the IR optimizations
    #[arg(long)]
    no_optimize: bool,

    /// What to print on success
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Never color the output
    #[arg(long)]
    no_color: bool,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    if args.no_color {
        colored::control::set_override(false);
    }

    if args.source_files.is_empty() {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "Missing source files!")
            .exit();
    }

    for source_file in &args.source_files {
        if source_file.extension().is_none_or(|ext| ext != "lat") {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Source file '{}' is not a .lat file!", source_file.display()),
                )
                .exit()
        }
    }

    let options = CompilerOptions {
        warn_shadow: args.wshadow,
        optimize: !args.no_optimize,
    };

    for path in &args.source_files {
        if !compile(path, &options, args.emit, !args.no_color)? {
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Compiles one file and reports the outcome. Returns whether it succeeded.
fn compile(
    path: &Path,
    options: &CompilerOptions,
    emit: Option<Emit>,
    color: bool,
) -> Result<bool> {
    let source = read_source(path.to_path_buf())?;
    let session = Session::new(&source, options.clone());

    info!(path = %path.display(), "compiling");

    let outcome = match emit {
        Some(Emit::Ast) => session.check().map(|program| format!("{program:#?}")),
        Some(Emit::Ir) => session
            .compile()
            .map(|program| pretty_print_program(&program, color)),
        None => session.compile().map(|_| String::new()),
    };

    match outcome {
        Ok(output) => {
            eprintln!("OK");
            print!("{output}");
            Ok(true)
        }
        Err(CompileError::Diagnostics { diagnostics, .. }) => {
            eprintln!("ERROR");

            for diagnostic in &diagnostics {
                eprintln!("{}\n", diagnostic.render(&source));
            }

            Ok(false)
        }
        Err(error) => Err(error).with_context(|| format!("compiling {}", path.display())),
    }
}

fn setup_logging(verbose: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .try_init()
        .context("installing the log subscriber")
}
