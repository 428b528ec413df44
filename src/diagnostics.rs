//! Source level errors and warnings
//!
//! Problems in the program being compiled are never Rust errors. Each stage
//! collects [`Diagnostic`]s into a list and keeps going for as long as it can
//! so one run reports as much as possible. The driver then refuses to run the
//! next stage if anything was reported.

use colored::Colorize;
use strum::{Display, EnumIter};

use crate::frontend::{SourceFile, lexer::Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticKind {
    /* Parsing */
    MalformedParenExpr,
    AmbiguousElse,
    NoDefaultValue,
    ParserError,

    /* Analysis */
    VariableDoesNotExist,
    VariableRedeclaration,
    VariableShadow,
    MultipleFunctionDefinitions,
    NoMain,
    FunctionNotCallable,
    FunctionSameParameter,
    VoidParameter,
    FunctionDoesNotReturn,
    IncorrectArgumentCount,
    ArgumentTypeMismatch,
    AssignmentTypeMismatch,
    ReturnTypeMismatch,
    ConditionTypeMismatch,
    FunctionCallMismatch,
    DeadCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::VariableShadow => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Option<Span>,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Where in the compiler the diagnostic was reported from
    pub backtrace: Option<String>,
}

impl Diagnostic {
    pub fn new(span: Option<Span>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            span,
            kind,
            message: message.into(),
            backtrace: None,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Renders the diagnostic together with the offending source line
    pub fn render(&self, source: &SourceFile) -> String {
        let header = match self.severity() {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };

        let mut out = format!("{header}[{}]: {}", self.kind, self.message.bold());

        if let Some(span) = self.span {
            out.push_str(&format!(
                "\n  {} {}:{}:{}\n{}",
                "-->".blue(),
                source.origin,
                source.row_for_position(span.start),
                source.column_for_position(span.start),
                source.highlight_span(span)
            ));
        }

        if let Some(backtrace) = &self.backtrace {
            out.push_str(&format!("\n{}: {}", "backtrace".blue(), backtrace));
        }

        out
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        type_name_of(f)
            .rsplit("::")
            .find(|&part| part != "f" && part != "{{closure}}")
            .unwrap_or("<unknown>")
    }};
}

/// Builds a [`Diagnostic`] and pushes it onto `$sink` (anything with a
/// `push(Diagnostic)` method). The span is either a [`Span`] or the literal
/// `None`. With the `error-backtrace` feature the reporting location inside
/// the compiler is recorded too.
#[macro_export]
macro_rules! report {
    (@push $sink:expr, $span:expr, $kind:expr, $($message:tt)+) => {{
        #[allow(unused_mut)]
        let mut diagnostic = $crate::diagnostics::Diagnostic::new($span, $kind, format!($($message)+));

        #[cfg(feature = "error-backtrace")]
        {
            diagnostic.backtrace = Some(format!(
                "{}::{} (at {}:{}:{})",
                module_path!(),
                $crate::function!(),
                file!(),
                line!(),
                column!()
            ));
        }

        $sink.push(diagnostic)
    }};
    ($sink:expr, None, $kind:expr, $($message:tt)+) => {
        $crate::report!(@push $sink, ::core::option::Option::None, $kind, $($message)+)
    };
    ($sink:expr, $span:expr, $kind:expr, $($message:tt)+) => {
        $crate::report!(@push $sink, ::core::option::Option::Some($span), $kind, $($message)+)
    };
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn only_shadowing_is_a_warning() {
        let warnings = DiagnosticKind::iter()
            .filter(|kind| kind.severity() == Severity::Warning)
            .collect::<Vec<_>>();

        assert_eq!(warnings, [DiagnosticKind::VariableShadow]);
    }

    #[test]
    fn kind_displays_as_its_name() {
        assert_eq!(DiagnosticKind::FunctionDoesNotReturn.to_string(), "FunctionDoesNotReturn");
    }

    #[test]
    fn report_macro_records_kind_and_message() {
        let mut sink = Vec::new();

        crate::report!(
            sink,
            Span::new(1, 2),
            DiagnosticKind::NoMain,
            "missing {}",
            "main"
        );

        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].kind, DiagnosticKind::NoMain);
        assert_eq!(sink[0].message, "missing main");
        assert_eq!(sink[0].span, Some(Span::new(1, 2)));
        assert_eq!(
            sink[0].backtrace.is_some(),
            cfg!(feature = "error-backtrace")
        );
    }

    #[test]
    fn render_includes_location() {
        colored::control::set_override(false);

        let source = SourceFile::from_memory("int main() {\n  return x;\n}\n");
        let start = source.contents.find('x').unwrap();
        let diagnostic = Diagnostic::new(
            Some(Span::new(start, start + 1)),
            DiagnosticKind::VariableDoesNotExist,
            "variable x does not exist in this scope",
        );

        let rendered = diagnostic.render(&source);

        assert!(rendered.starts_with(
            "error[VariableDoesNotExist]: variable x does not exist in this scope\n  --> <memory>:2:9"
        ));
        assert!(rendered.ends_with("|          ^"));
    }
}
