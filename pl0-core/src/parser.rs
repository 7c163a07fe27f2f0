//! Single-pass recursive-descent parser and code generator.
//!
//! There is no syntax tree. Each recognizer consumes the tokens of its
//! construct, updates the symbol table and writes p-code as it goes,
//! leaving `current` on the first token after the construct.
//!
//! ```text
//! program    = block "." .
//! block      = [ "const" ident "=" number { "," ident "=" number } ";" ]
//!              [ "var" ident { "," ident } ";" ]
//!              { "procedure" ident ";" block ";" } statement .
//! statement  = [ ident ":=" expression
//!              | "call" ident
//!              | "begin" statement { ";" statement } "end"
//!              | "if" condition "then" statement [ "else" statement ]
//!              | "while" condition "do" statement
//!              | "repeat" statement { ";" statement } "until" condition
//!              | "read" "(" ident { "," ident } ")"
//!              | "write" "(" expression { "," expression } ")" ] .
//! condition  = "odd" expression | expression relop expression .
//! expression = [ "+" | "-" ] term { ( "+" | "-" ) term } .
//! term       = factor { ( "*" | "/" ) factor } .
//! factor     = ident | number | "(" expression ")" .
//! ```

use crate::compiler::CompilationArtifact;
use crate::error::CompileError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::pcode::{FRAME_BASE, InstructionStream, OpCode, Opr};
use crate::span::Position;
use crate::symbols::{SymbolKind, SymbolRecord, SymbolTable};

/// Deepest allowed nesting of blocks, statements and expressions combined.
pub const MAX_NESTING: usize = 256;

pub struct Parser<'src> {
    tokens: Lexer<'src>,
    current: Token,
    symbols: SymbolTable,
    code: InstructionStream,
    depth: usize,
}

impl<'src> Parser<'src> {
    /// Create a parser positioned on the first token of `source`.
    pub fn new(source: &'src str) -> Result<Self, CompileError> {
        let mut tokens = Lexer::new(source);
        let current = match tokens.next() {
            Some(token) => token?,
            None => return Err(end_of_program(tokens.position())),
        };
        Ok(Parser {
            tokens,
            current,
            symbols: SymbolTable::new(),
            code: InstructionStream::new(),
            depth: 0,
        })
    }

    /// `program = block "." .` The token source must end at the dot.
    pub fn parse_program(mut self) -> Result<CompilationArtifact, CompileError> {
        self.block(0, None)?;
        self.expect(".")?;
        if let Some(trailing) = self.tokens.next() {
            let token = trailing?;
            return Err(CompileError::parser(
                format!("expecting end of program but found '{}'", token.text),
                token.position,
            ));
        }
        Ok(CompilationArtifact {
            instructions: self.code.into_instructions(),
            symbols: self.symbols.into_declarations(),
        })
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    /// Compile a block whose statements run at nesting depth `level`.
    ///
    /// `owner` is the table index of the procedure this block belongs to;
    /// the program block has none.
    fn block(&mut self, level: usize, owner: Option<usize>) -> Result<(), CompileError> {
        self.enter()?;
        let result = self.block_body(level, owner);
        self.depth -= 1;
        result
    }

    fn block_body(&mut self, level: usize, owner: Option<usize>) -> Result<(), CompileError> {
        let mark = self.symbols.open_frame();

        if self.current.is("const") {
            self.const_declarations(level)?;
        }
        let frame_size = if self.current.is("var") {
            self.var_declarations(level, FRAME_BASE)?
        } else {
            FRAME_BASE
        };
        if self.current.is("procedure") {
            // Nested procedures that call their parent land on this jump
            // until the parent's entry is known.
            let skip = self.code.emit_forward_jump(OpCode::Jump);
            if let Some(owner) = owner {
                self.symbols.set_address(owner, skip);
            }
            self.procedure_declarations(level)?;
            self.code.patch_here(skip);
        }

        if let Some(owner) = owner {
            self.symbols.set_address(owner, self.code.len());
            self.symbols.set_size(owner, frame_size);
        }
        self.code.emit(OpCode::ReserveFrame, 0, frame_size as i64);
        self.statement(level)?;
        self.code.emit_operation(Opr::Return);

        // The owner's record lives in the enclosing frame and survives.
        self.symbols.close_frame(mark, None);
        Ok(())
    }

    fn const_declarations(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        loop {
            let (name, position) = self.identifier()?;
            self.eat("=")?;
            let value = self.number()?;
            self.declare(SymbolRecord::constant(name, value, level), position)?;
            if !self.current.is(",") {
                break;
            }
            self.advance()?;
        }
        self.eat(";")
    }

    /// Declare the variables of a `var` list starting at frame offset
    /// `next_offset`; returns the offset after the last one.
    fn var_declarations(
        &mut self,
        level: usize,
        next_offset: usize,
    ) -> Result<usize, CompileError> {
        self.advance()?;
        let mut offset = next_offset;
        loop {
            let (name, position) = self.identifier()?;
            self.declare(SymbolRecord::variable(name, level, offset), position)?;
            offset += 1;
            if !self.current.is(",") {
                break;
            }
            self.advance()?;
        }
        self.eat(";")?;
        Ok(offset)
    }

    fn procedure_declarations(&mut self, level: usize) -> Result<(), CompileError> {
        while self.current.is("procedure") {
            self.advance()?;
            let (name, position) = self.identifier()?;
            let index = self.declare(SymbolRecord::procedure(name, level), position)?;
            self.eat(";")?;
            self.block(level + 1, Some(index))?;
            self.eat(";")?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.enter()?;
        let result = self.statement_body(level);
        self.depth -= 1;
        result
    }

    fn statement_body(&mut self, level: usize) -> Result<(), CompileError> {
        match self.current.kind {
            TokenKind::Identifier => self.assignment(level),
            TokenKind::Keyword => match self.current.text.as_str() {
                "if" => self.if_statement(level),
                "while" => self.while_statement(level),
                "call" => self.call_statement(level),
                "begin" => self.begin_statement(level),
                "repeat" => self.repeat_statement(level),
                "read" => self.read_statement(level),
                "write" => self.write_statement(level),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn statement_list(&mut self, level: usize) -> Result<(), CompileError> {
        self.statement(level)?;
        while self.current.is(";") {
            self.advance()?;
            self.statement(level)?;
        }
        Ok(())
    }

    fn assignment(&mut self, level: usize) -> Result<(), CompileError> {
        let (name, position) = self.identifier()?;
        let target = self.resolve(&name, Some(SymbolKind::Variable), position)?;
        self.eat(":=")?;
        self.expression(level)?;
        self.code.emit(OpCode::StoreVar, level - target.level, target.address as i64);
        Ok(())
    }

    fn if_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        self.condition(level)?;
        self.eat("then")?;
        let on_false = self.code.emit_forward_jump(OpCode::JumpIfFalse);
        self.statement(level)?;
        let to_end = self.code.emit_forward_jump(OpCode::Jump);

        if self.current.is("else") {
            self.advance()?;
            self.code.patch_here(on_false);
            self.statement(level)?;
            self.code.patch_here(to_end);
        } else {
            self.code.patch_here(to_end);
            self.code.patch_here(on_false);
        }
        Ok(())
    }

    fn while_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        let loop_start = self.code.len();
        self.condition(level)?;
        self.eat("do")?;
        let exit = self.code.emit_forward_jump(OpCode::JumpIfFalse);
        self.statement(level)?;
        self.code.emit(OpCode::Jump, 0, loop_start as i64);
        self.code.patch_here(exit);
        Ok(())
    }

    fn call_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        let (name, position) = self.identifier()?;
        let procedure = self.resolve(&name, Some(SymbolKind::Procedure), position)?;
        self.code.emit(OpCode::Call, level - procedure.level, procedure.address as i64);
        Ok(())
    }

    fn begin_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        self.statement_list(level)?;
        self.eat("end")
    }

    /// Loops back to the first body instruction while the condition is false.
    fn repeat_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        let loop_start = self.code.len();
        self.statement_list(level)?;
        self.eat("until")?;
        self.condition(level)?;
        self.code.emit(OpCode::JumpIfFalse, 0, loop_start as i64);
        Ok(())
    }

    fn read_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        self.eat("(")?;
        loop {
            let (name, position) = self.identifier()?;
            let target = self.resolve(&name, Some(SymbolKind::Variable), position)?;
            self.code.emit(OpCode::Read, level - target.level, target.address as i64);
            if !self.current.is(",") {
                break;
            }
            self.advance()?;
        }
        self.eat(")")
    }

    fn write_statement(&mut self, level: usize) -> Result<(), CompileError> {
        self.advance()?;
        self.eat("(")?;
        loop {
            self.expression(level)?;
            self.code.emit(OpCode::Write, 0, 0);
            if !self.current.is(",") {
                break;
            }
            self.advance()?;
        }
        self.eat(")")
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn condition(&mut self, level: usize) -> Result<(), CompileError> {
        if self.current.is("odd") {
            self.advance()?;
            self.expression(level)?;
            self.code.emit_operation(Opr::Odd);
            return Ok(());
        }

        self.expression(level)?;
        let comparison = match self.current.kind {
            TokenKind::RelationalOp => Opr::relational(&self.current.text),
            _ => None,
        }
        .ok_or_else(|| self.unexpected("relational operator"))?;
        self.advance()?;
        self.expression(level)?;
        self.code.emit_operation(comparison);
        Ok(())
    }

    fn expression(&mut self, level: usize) -> Result<(), CompileError> {
        self.enter()?;
        let result = self.expression_body(level);
        self.depth -= 1;
        result
    }

    fn expression_body(&mut self, level: usize) -> Result<(), CompileError> {
        let negate = if self.current.kind == TokenKind::AdditiveOp {
            let negate = self.current.text == "-";
            self.advance()?;
            negate
        } else {
            false
        };
        self.term(level)?;
        if negate {
            self.code.emit_operation(Opr::Negate);
        }

        while self.current.kind == TokenKind::AdditiveOp {
            let operation = if self.current.text == "-" {
                Opr::Subtract
            } else {
                Opr::Add
            };
            self.advance()?;
            self.term(level)?;
            self.code.emit_operation(operation);
        }
        Ok(())
    }

    fn term(&mut self, level: usize) -> Result<(), CompileError> {
        self.factor(level)?;
        while self.current.kind == TokenKind::MultiplicativeOp {
            let operation = if self.current.text == "/" {
                Opr::Divide
            } else {
                Opr::Multiply
            };
            self.advance()?;
            self.factor(level)?;
            self.code.emit_operation(operation);
        }
        Ok(())
    }

    fn factor(&mut self, level: usize) -> Result<(), CompileError> {
        match self.current.kind {
            TokenKind::Identifier => {
                let (name, position) = self.identifier()?;
                let symbol = self.resolve(&name, None, position)?;
                match symbol.kind {
                    SymbolKind::Constant => {
                        self.code.emit(OpCode::LoadConst, 0, symbol.value.unwrap_or_default());
                    }
                    SymbolKind::Variable => {
                        self.code
                            .emit(OpCode::LoadVar, level - symbol.level, symbol.address as i64);
                    }
                    SymbolKind::Procedure => {
                        return Err(CompileError::WrongSymbolType {
                            name,
                            expected: SymbolKind::Variable,
                            found: SymbolKind::Procedure,
                            position,
                        });
                    }
                }
                Ok(())
            }
            TokenKind::Number => {
                let value = self.number()?;
                self.code.emit(OpCode::LoadConst, 0, value);
                Ok(())
            }
            _ if self.current.is("(") => {
                self.advance()?;
                self.expression(level)?;
                self.eat(")")
            }
            _ => Err(self.unexpected("identifier, number or '('")),
        }
    }

    // -----------------------------------------------------------------
    // Token and symbol helpers
    // -----------------------------------------------------------------

    /// Count one level of recursion, failing before the native stack can.
    fn enter(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::parser("nesting too deep", self.current.position));
        }
        self.depth += 1;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), CompileError> {
        match self.tokens.next() {
            Some(token) => {
                self.current = token?;
                Ok(())
            }
            None => Err(end_of_program(self.tokens.position())),
        }
    }

    fn expect(&self, text: &str) -> Result<(), CompileError> {
        if self.current.is(text) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{text}'")))
        }
    }

    fn eat(&mut self, text: &str) -> Result<(), CompileError> {
        self.expect(text)?;
        self.advance()
    }

    fn identifier(&mut self) -> Result<(String, Position), CompileError> {
        if self.current.kind != TokenKind::Identifier {
            return Err(self.unexpected("identifier"));
        }
        let name = self.current.text.clone();
        let position = self.current.position;
        self.advance()?;
        Ok((name, position))
    }

    fn number(&mut self) -> Result<i64, CompileError> {
        if self.current.kind != TokenKind::Number {
            return Err(self.unexpected("number"));
        }
        let value = self.current.text.parse::<i64>().map_err(|_| {
            CompileError::parser(
                format!("number '{}' is out of range", self.current.text),
                self.current.position,
            )
        })?;
        self.advance()?;
        Ok(value)
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::parser(
            format!("expecting {expected} but found '{}'", self.current.text),
            self.current.position,
        )
    }

    fn declare(&mut self, record: SymbolRecord, position: Position) -> Result<usize, CompileError> {
        self.symbols
            .declare(record)
            .map_err(|err| CompileError::from_symbol(err, position))
    }

    fn resolve(
        &self,
        name: &str,
        expected: Option<SymbolKind>,
        position: Position,
    ) -> Result<SymbolRecord, CompileError> {
        self.symbols
            .lookup(name, expected)
            .cloned()
            .map_err(|err| CompileError::from_symbol(err, position))
    }
}

fn end_of_program(position: Position) -> CompileError {
    CompileError::parser("unexpected end of program", position)
}
