//! Core compiler for the PL/0 teaching language.
//!
//! Compilation is a single pass:
//!
//!   source text
//!     -> lexer   (lazy token stream, longest match)
//!     -> parser  (recursive descent; drives the two below)
//!     -> symbols (scoped name table)
//!     -> pcode   (instruction stream with jump backpatching)
//!
//! The result is a flat p-code listing for a stack machine, or the first
//! error encountered. Front ends (CLI, web) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing
// ---------------------------------------------------------------------

pub mod lexer;

// ---------------------------------------------------------------------
// Semantic state and output
// ---------------------------------------------------------------------

pub mod symbols;
pub mod pcode;

// ---------------------------------------------------------------------
// Parsing, code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod parser;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, compile};
pub use diagnostic::Diagnostic;
pub use error::CompileError;
pub use lexer::{Token, TokenKind, tokenize};
pub use pcode::{Instruction, OpCode, Opr};
pub use span::Position;
pub use symbols::{SymbolKind, SymbolRecord};
