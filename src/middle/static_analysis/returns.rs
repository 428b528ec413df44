use super::StaticAnalyzer;
use crate::{
    diagnostics::DiagnosticKind,
    frontend::{
        ast::{
            Statement, StatementKind,
            traverse::Node,
            ty::Type,
        },
        lexer::Span,
    },
    report,
};

/// Computes `returns` for every statement bottom up and reports unreachable
/// statements and functions that can finish without returning a value.
pub(super) fn check_returns(analyzer: &mut StaticAnalyzer, node: Node) -> Node {
    match node {
        Node::Statement(mut statement) => {
            statement.returns = analyzer.statement_returns(&statement);
            Node::Statement(statement)
        }
        Node::FunctionDeclaration(decl) => {
            if decl.return_type != Type::Void && !decl.body.returns {
                report!(
                    analyzer.diagnostics,
                    decl.name.span,
                    DiagnosticKind::FunctionDoesNotReturn,
                    "There is a path in function {} resulting in no return value",
                    decl.name.name
                );
            }

            Node::FunctionDeclaration(decl)
        }
        other => other,
    }
}

impl StaticAnalyzer {
    fn statement_returns(&mut self, statement: &Statement) -> bool {
        match &statement.kind {
            StatementKind::Return(_) => true,
            StatementKind::Block(statements) => {
                // Only the first unreachable run in a block is reported
                let unreachable = statements
                    .iter()
                    .position(|s| s.returns)
                    .map(|index| &statements[index + 1..])
                    .unwrap_or_default();

                if let (Some(first), Some(last)) = (unreachable.first(), unreachable.last()) {
                    report!(
                        self.diagnostics,
                        Span::new(first.span.start, last.span.end),
                        DiagnosticKind::DeadCode,
                        "This statement and everything after it in the block is unreachable"
                    );
                }

                statements.iter().any(|s| s.returns)
            }
            StatementKind::If {
                then_branch,
                else_branch,
                ..
            } => then_branch.returns && else_branch.as_ref().is_some_and(|s| s.returns),
            StatementKind::While { .. }
            | StatementKind::Declaration { .. }
            | StatementKind::Assignment { .. }
            | StatementKind::FreeExpression(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        diagnostics::DiagnosticKind,
        frontend::{SourceFile, parser::Parser},
        middle::{static_analysis::analyze_program, type_check::type_check_program},
    };

    fn analysis_errors(source: &str) -> Vec<DiagnosticKind> {
        let (program, diagnostics) = Parser::parse_program(&SourceFile::from_memory(source));
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");

        let (program, diagnostics) = type_check_program(program, false);
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");

        let (_, diagnostics) = analyze_program(program);

        diagnostics.into_iter().map(|d| d.kind).collect()
    }

    #[test]
    fn if_without_else_does_not_return() {
        assert_eq!(
            analysis_errors("int main() { if (readInt() > 0) return 1; }"),
            [DiagnosticKind::FunctionDoesNotReturn]
        );
    }

    #[test]
    fn constant_condition_still_needs_else() {
        assert_eq!(
            analysis_errors("int main() { if (true) return 1; }"),
            [DiagnosticKind::FunctionDoesNotReturn]
        );
    }

    #[test]
    fn both_branches_returning_is_enough() {
        assert_eq!(
            analysis_errors("int main() { if (readInt() > 0) return 1; else return 2; }"),
            Vec::<DiagnosticKind>::new()
        );
    }

    #[test]
    fn while_never_counts_as_returning() {
        assert_eq!(
            analysis_errors("int main() { while (true) return 1; }"),
            [DiagnosticKind::FunctionDoesNotReturn]
        );
    }

    #[test]
    fn void_functions_need_no_return() {
        assert_eq!(
            analysis_errors("void f() {} int main() { f(); return 0; }"),
            Vec::<DiagnosticKind>::new()
        );
    }

    #[test]
    fn statements_after_return_are_dead() {
        assert_eq!(
            analysis_errors("int main() { return 0; printInt(1); printInt(2); }"),
            [DiagnosticKind::DeadCode]
        );
    }
}
