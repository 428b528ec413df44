use std::{io, path::PathBuf};

use colored::Colorize;

use self::lexer::Span;

pub mod ast;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn from_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    /// Reads a source file from disk. Tabs are expanded to four spaces so
    /// highlighted columns line up.
    pub fn from_path(path: PathBuf) -> io::Result<Self> {
        let contents = std::fs::read_to_string(&path)?.replace('\t', "    ");

        Ok(Self {
            contents,
            origin: SourceFileOrigin::File(path),
        })
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line number of the byte at `position`
    pub fn row_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());

        self.contents[..position].matches('\n').count() + 1
    }

    /// 0-based column of the byte at `position`
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());

        position - self.line_start(position)
    }

    fn line_start(&self, position: usize) -> usize {
        self.contents[..position]
            .rfind('\n')
            .map(|newline| newline + 1)
            .unwrap_or(0)
    }

    /// Renders the line containing the start of `span` with the span
    /// underlined. Spans crossing a line break are cut at the end of the first
    /// line.
    pub fn highlight_span(&self, span: Span) -> String {
        let start = span.start.min(self.contents.len());
        let line_start = self.line_start(start);
        let line_end = self.contents[start..]
            .find('\n')
            .map(|offset| start + offset)
            .unwrap_or(self.contents.len());

        let line = &self.contents[line_start..line_end];
        let row = self.row_for_position(start).to_string();
        let gutter = " ".repeat(row.len());

        let underline_len = span.end.clamp(start + 1, line_end.max(start + 1)) - start;

        format!(
            "{gutter} {}\n{} {} {line}\n{gutter} {} {}{}",
            "|".blue(),
            row.blue(),
            "|".blue(),
            "|".blue(),
            " ".repeat(start - line_start),
            "^".repeat(underline_len).red()
        )
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}
