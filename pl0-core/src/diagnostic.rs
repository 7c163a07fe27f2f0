//! Presentation of a compilation failure against its source text.

use std::fmt;

use crate::error::CompileError;
use crate::span::{Position, source_line};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub position: Position,
    /// The offending source line, if the position lies within the source.
    pub source_line: Option<String>,
}

impl Diagnostic {
    pub fn new(error: &CompileError, source: &str) -> Self {
        let position = error.position();
        Diagnostic {
            message: error.message(),
            position,
            source_line: source_line(source, position.line).map(str::to_string),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;
        write!(f, "  --> {}", self.position)?;
        let Some(line) = &self.source_line else {
            return Ok(());
        };

        let number = self.position.line.to_string();
        let gutter = " ".repeat(number.len());
        // Keep tabs so the caret lines up with the text above it.
        let indent: String = line
            .chars()
            .take(self.position.column.saturating_sub(1))
            .map(|ch| if ch == '\t' { '\t' } else { ' ' })
            .collect();
        writeln!(f)?;
        writeln!(f, "{gutter} |")?;
        writeln!(f, "{number} | {line}")?;
        write!(f, "{gutter} | {indent}^")
    }
}
