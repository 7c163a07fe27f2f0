use thiserror::Error;

use crate::span::Position;
use crate::symbols::{SymbolError, SymbolKind};

/// The single diagnostic a compilation attempt can fail with.
///
/// `Parser` is the general syntax failure; the three symbol variants are
/// more specific parser failures raised while resolving names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unrecognized character {found:?} at {position}")]
    Lexer { found: char, position: Position },
    #[error("{message} at {position}")]
    Parser { message: String, position: Position },
    #[error("duplicate symbol '{name}' at {position}")]
    DuplicateSymbol { name: String, position: Position },
    #[error("undefined symbol '{name}' at {position}")]
    UndefinedSymbol { name: String, position: Position },
    #[error("'{name}' is a {found}, expected a {expected} at {position}")]
    WrongSymbolType {
        name: String,
        expected: SymbolKind,
        found: SymbolKind,
        position: Position,
    },
}

impl CompileError {
    pub fn parser(message: impl Into<String>, position: Position) -> Self {
        CompileError::Parser {
            message: message.into(),
            position,
        }
    }

    /// Attach the position of the offending name to a symbol table failure.
    pub fn from_symbol(err: SymbolError, position: Position) -> Self {
        match err {
            SymbolError::Duplicate { name } => CompileError::DuplicateSymbol { name, position },
            SymbolError::Undefined { name } => CompileError::UndefinedSymbol { name, position },
            SymbolError::WrongKind {
                name,
                expected,
                found,
            } => CompileError::WrongSymbolType {
                name,
                expected,
                found,
                position,
            },
        }
    }

    pub fn position(&self) -> Position {
        match self {
            CompileError::Lexer { position, .. }
            | CompileError::Parser { position, .. }
            | CompileError::DuplicateSymbol { position, .. }
            | CompileError::UndefinedSymbol { position, .. }
            | CompileError::WrongSymbolType { position, .. } => *position,
        }
    }

    /// The error text without its position suffix.
    pub fn message(&self) -> String {
        match self {
            CompileError::Lexer { found, .. } => format!("unrecognized character {found:?}"),
            CompileError::Parser { message, .. } => message.clone(),
            CompileError::DuplicateSymbol { name, .. } => format!("duplicate symbol '{name}'"),
            CompileError::UndefinedSymbol { name, .. } => format!("undefined symbol '{name}'"),
            CompileError::WrongSymbolType {
                name,
                expected,
                found,
                ..
            } => format!("'{name}' is a {found}, expected a {expected}"),
        }
    }

    pub fn is_parser_error(&self) -> bool {
        !matches!(self, CompileError::Lexer { .. })
    }
}
