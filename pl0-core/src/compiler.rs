use crate::error::CompileError;
use crate::parser::Parser;
use crate::pcode::{Instruction, render_listing};
use crate::symbols::SymbolRecord;

/// Result of one successful compilation.
///
/// `symbols` holds every name declared anywhere in the program, in
/// declaration order, with procedure addresses and sizes filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifact {
    pub instructions: Vec<Instruction>,
    pub symbols: Vec<SymbolRecord>,
}

impl CompilationArtifact {
    pub fn listing(&self) -> String {
        render_listing(&self.instructions)
    }
}

/// Compile PL/0 source text into p-code.
///
/// Every call builds a fresh lexer, symbol table and instruction
/// stream; nothing is shared between calls.
pub fn compile(source: &str) -> Result<CompilationArtifact, CompileError> {
    Parser::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcode::{OpCode, Opr};
    use crate::span::Position;
    use crate::symbols::SymbolKind;

    #[test]
    fn compiles_constant_arithmetic_and_write() {
        let artifact = compile("const n = 10; var x; begin x := n + 1; write(x) end.")
            .expect("compile should succeed");
        assert_eq!(
            artifact.listing(),
            "(INT, 0, 4)\n\
             (LIT, 0, 10)\n\
             (LIT, 0, 1)\n\
             (OPR, 0, 2)\n\
             (STO, 0, 3)\n\
             (LOD, 0, 3)\n\
             (WRT, 0, 0)\n\
             (OPR, 0, 0)\n"
        );
    }

    #[test]
    fn records_all_declarations() {
        let source = "const k = 2;\nvar a;\nprocedure p;\n  var b;\n  b := k;\ncall p.";
        let artifact = compile(source).expect("compile should succeed");
        let summary: Vec<_> = artifact
            .symbols
            .iter()
            .map(|s| (s.kind, s.name.as_str(), s.level))
            .collect();
        assert_eq!(
            summary,
            vec![
                (SymbolKind::Constant, "k", 0),
                (SymbolKind::Variable, "a", 0),
                (SymbolKind::Procedure, "p", 0),
                (SymbolKind::Variable, "b", 1),
            ]
        );
        assert_eq!(artifact.symbols[0].value, Some(2));
    }

    #[test]
    fn reports_undefined_symbol_position() {
        let err = compile("var x;\nbegin\n  y := 1\nend.").unwrap_err();
        assert_eq!(
            err,
            CompileError::UndefinedSymbol {
                name: "y".to_string(),
                position: Position::new(3, 3),
            }
        );
    }

    #[test]
    fn compiles_all_comparisons() {
        let artifact = compile(
            "var a; begin \
             if a = 1 then ; if a <> 1 then ; if a < 1 then ; \
             if a <= 1 then ; if a > 1 then ; if a >= 1 then \
             end.",
        )
        .expect("compile should succeed");
        let comparisons: Vec<_> = artifact
            .instructions
            .iter()
            .filter(|i| i.op == OpCode::Operation && i.operand >= 8)
            .map(|i| i.operand)
            .collect();
        assert_eq!(
            comparisons,
            vec![
                Opr::Equal.code(),
                Opr::NotEqual.code(),
                Opr::Less.code(),
                Opr::LessEqual.code(),
                Opr::Greater.code(),
                Opr::GreaterEqual.code(),
            ]
        );
    }
}
