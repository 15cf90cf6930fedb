//! Compile engine.
//!
//! A recursive-descent parser that is also the code generator. Each
//! compile routine corresponds to one grammar nonterminal: it consumes
//! tokens from the lexer on demand (one-token lookahead, no
//! backtracking), resolves identifiers through the symbol table, and
//! emits instructions as a side effect of recognizing the production.
use super::{
    emit::{Segment, VmOp, VmWriter},
    symbol::{Symbol, SymbolKind, SymbolTable},
    CompileError,
};
use crate::{
    error::{JackError, JackResult},
    lex::Lexer,
    tokens::{Keyword, Token, TokenKind},
};

use smol_str::SmolStr;
use std::io;

pub struct CompileEngine<'a, W: io::Write> {
    lexer: Lexer<'a>,
    symbols: SymbolTable,
    writer: VmWriter<W>,

    /// Qualifies unqualified calls and sizes constructed objects.
    class_name: SmolStr,
    /// Monotonically increasing; makes every generated label unique
    /// within the source unit.
    label_count: u32,
    /// One-token lookahead window onto the lexer. `None` once the
    /// source is exhausted.
    current: Option<Token>,
}

impl<'a, W: io::Write> CompileEngine<'a, W> {
    pub fn new(lexer: Lexer<'a>, writer: VmWriter<W>) -> Self {
        Self {
            lexer,
            writer,
            symbols: SymbolTable::default(),
            class_name: SmolStr::default(),
            label_count: 0,
            current: None,
        }
    }

    /// Compile one source unit: a single class declaration.
    ///
    /// Returns the writer so the caller can close it. On failure the
    /// writer is dropped instead, which still flushes whatever was
    /// emitted before the abort.
    pub fn compile(mut self) -> JackResult<VmWriter<W>> {
        self.advance()?;
        self.compile_class()?;
        Ok(self.writer)
    }
}

/// Token plumbing.
impl<'a, W: io::Write> CompileEngine<'a, W> {
    /// Pull the next token out of the lexer.
    fn advance(&mut self) -> JackResult<()> {
        self.current = if self.lexer.has_more()? {
            Some(self.lexer.next_token()?)
        } else {
            None
        };
        Ok(())
    }

    fn peek(&self) -> Result<&Token, CompileError> {
        self.current.as_ref().ok_or(CompileError::UnexpectedEnd)
    }

    /// Consume the current token, whatever it is, and advance the
    /// lexer by one. Emits nothing by itself.
    fn take(&mut self) -> JackResult<Token> {
        match self.current.take() {
            Some(token) => {
                self.advance()?;
                Ok(token)
            }
            None => Err(CompileError::UnexpectedEnd.into()),
        }
    }

    fn check_symbol(&self, symbol: char) -> bool {
        matches!(&self.current, Some(token) if token.kind.is_symbol(symbol))
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current, Some(token) if token.kind.is_keyword(keyword))
    }

    fn expect_symbol(&mut self, symbol: char) -> JackResult<()> {
        let token = self.take()?;
        if token.kind.is_symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", symbol), token))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> JackResult<()> {
        let token = self.take()?;
        if token.kind.is_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword), token))
        }
    }

    fn take_ident(&mut self) -> JackResult<SmolStr> {
        let token = self.take()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(self.unexpected("an identifier", token)),
        }
    }

    /// Consume a type name: a primitive keyword or a class identifier.
    fn take_type(&mut self) -> JackResult<SmolStr> {
        let token = self.take()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            TokenKind::Keyword(keyword) => Ok(SmolStr::new(keyword.to_string())),
            _ => Err(self.unexpected("a type name", token)),
        }
    }

    #[inline(never)]
    #[cold]
    fn unexpected(&self, expected: &str, found: Token) -> JackError {
        CompileError::UnexpectedToken {
            expected: expected.to_string(),
            found,
        }
        .into()
    }

    /// Next globally unique control-flow label for this source unit.
    fn unique_label(&mut self, prefix: &str) -> String {
        self.label_count += 1;
        format!("{}{}", prefix, self.label_count)
    }

    fn resolve_variable(&self, name: &str) -> Result<Symbol, CompileError> {
        self.symbols
            .resolve(name)
            .cloned()
            .ok_or_else(|| CompileError::UnresolvedSymbol(SmolStr::from(name)))
    }
}

/// Grammar productions.
impl<'a, W: io::Write> CompileEngine<'a, W> {
    fn compile_class(&mut self) -> JackResult<()> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.take_ident()?;
        self.expect_symbol('{')?;

        while let Some(kind) = self.peek_class_var_kind() {
            self.compile_var_dec(kind)?;
        }
        while let Some(kind) = self.peek_subroutine_kind() {
            self.compile_subroutine(kind)?;
        }

        self.expect_symbol('}')?;
        Ok(())
    }

    fn peek_class_var_kind(&self) -> Option<SymbolKind> {
        match self.current.as_ref()?.kind {
            TokenKind::Keyword(Keyword::Static) => Some(SymbolKind::Static),
            TokenKind::Keyword(Keyword::Field) => Some(SymbolKind::Field),
            _ => None,
        }
    }

    fn peek_subroutine_kind(&self) -> Option<SubroutineKind> {
        match self.current.as_ref()?.kind {
            TokenKind::Keyword(Keyword::Constructor) => Some(SubroutineKind::Constructor),
            TokenKind::Keyword(Keyword::Function) => Some(SubroutineKind::Function),
            TokenKind::Keyword(Keyword::Method) => Some(SubroutineKind::Method),
            _ => None,
        }
    }

    /// Class-level and subroutine-level variable declarations share
    /// one production; only the kind differs.
    fn compile_var_dec(&mut self, kind: SymbolKind) -> JackResult<()> {
        self.take()?; // static | field | var
        let ty = self.take_type()?;

        loop {
            let name = self.take_ident()?;
            self.symbols.define(&name, &ty, kind)?;

            if self.check_symbol(',') {
                self.take()?; // ,
            } else {
                break;
            }
        }

        self.expect_symbol(';')?;
        Ok(())
    }

    fn compile_subroutine(&mut self, kind: SubroutineKind) -> JackResult<()> {
        self.symbols.start_subroutine();

        self.take()?; // constructor | function | method
        self.take_type()?; // return type
        let name = self.take_ident()?;
        let qualified = format!("{}.{}", self.class_name, name);

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;

        self.expect_symbol('{')?;
        while self.check_keyword(Keyword::Var) {
            self.compile_var_dec(SymbolKind::Local)?;
        }

        // The frame size is fixed before any statement code.
        let n_locals = self.symbols.count(SymbolKind::Local);
        self.writer.write_function(&qualified, n_locals);

        match kind {
            SubroutineKind::Method => {
                // Establish the implicit receiver as `this`.
                self.writer.write_push(Segment::Argument, 0);
                self.writer.write_pop(Segment::Pointer, 0);
            }
            SubroutineKind::Constructor => {
                // Allocate the new object and establish it as `this`.
                let n_fields = self.symbols.count(SymbolKind::Field);
                self.writer.write_push(Segment::Constant, n_fields);
                self.writer.write_call("Memory.alloc", 1);
                self.writer.write_pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')?;
        Ok(())
    }

    /// Comma-separated `(type, name)` pairs, each defined as an
    /// argument. Terminates at `)`.
    ///
    /// Explicit parameters start at argument index zero for every
    /// subroutine kind; no slot is reserved for a method's implicit
    /// receiver.
    fn compile_parameter_list(&mut self) -> JackResult<()> {
        while !self.check_symbol(')') {
            let ty = self.take_type()?;
            let name = self.take_ident()?;
            self.symbols.define(&name, &ty, SymbolKind::Argument)?;

            if self.check_symbol(',') {
                self.take()?; // ,
            }
        }
        Ok(())
    }

    fn compile_statements(&mut self) -> JackResult<()> {
        use Keyword as K;

        loop {
            if self.check_symbol('}') {
                return Ok(());
            }

            let keyword = match self.peek()?.kind {
                TokenKind::Keyword(keyword) => Some(keyword),
                _ => None,
            };
            match keyword {
                Some(K::Do) => self.compile_do()?,
                Some(K::Let) => self.compile_let()?,
                Some(K::While) => self.compile_while()?,
                Some(K::If) => self.compile_if()?,
                Some(K::Return) => self.compile_return()?,
                _ => {
                    let token = self.take()?;
                    return Err(self.unexpected("a statement", token));
                }
            }
        }
    }

    fn compile_do(&mut self) -> JackResult<()> {
        self.take()?; // do
        let leading = self.take_ident()?;
        self.compile_call(leading)?;
        self.expect_symbol(';')?;

        // Every callable leaves exactly one value; a do statement
        // discards it.
        self.writer.write_pop(Segment::Temp, 0);
        Ok(())
    }

    fn compile_let(&mut self) -> JackResult<()> {
        self.take()?; // let
        let name = self.take_ident()?;
        let symbol = self.resolve_variable(&name)?;

        let is_array = self.check_symbol('[');
        if is_array {
            // Element address = base + index, parked in `that`.
            self.writer.write_push(symbol.kind.segment(), symbol.index);
            self.take()?; // [
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(VmOp::Add);
            self.writer.write_pop(Segment::Pointer, 1);
        }

        self.expect_symbol('=')?;
        self.compile_expression()?;
        self.expect_symbol(';')?;

        if is_array {
            self.writer.write_pop(Segment::That, 0);
        } else {
            self.writer.write_pop(symbol.kind.segment(), symbol.index);
        }
        Ok(())
    }

    fn compile_while(&mut self) -> JackResult<()> {
        let start = self.unique_label("LOOPSTART");
        let end = self.unique_label("LOOPEND");

        self.writer.write_label(&start);
        self.take()?; // while
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;

        // Loop while the condition holds: exit on its negation.
        self.writer.write_arithmetic(VmOp::Not);
        self.writer.write_if_goto(&end);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;

        self.writer.write_goto(&start);
        self.writer.write_label(&end);
        Ok(())
    }

    fn compile_if(&mut self) -> JackResult<()> {
        self.take()?; // if
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;

        let if_true = self.unique_label("IFTRUE");
        let if_false = self.unique_label("IFFALSE");
        let if_end = self.unique_label("IFEND");

        self.writer.write_if_goto(&if_true);
        self.writer.write_goto(&if_false);
        self.writer.write_label(&if_true);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;

        self.writer.write_goto(&if_end);
        self.writer.write_label(&if_false);

        if self.check_keyword(Keyword::Else) {
            self.take()?; // else
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }

        self.writer.write_label(&if_end);
        Ok(())
    }

    fn compile_return(&mut self) -> JackResult<()> {
        self.take()?; // return
        if !self.check_symbol(';') {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.writer.write_return();
        Ok(())
    }

    /// Operands combine strictly left to right in source order; no
    /// operator precedence is applied.
    fn compile_expression(&mut self) -> JackResult<()> {
        self.compile_term()?;

        while let Some(op) = self.peek_binary_op() {
            self.take()?; // operator
            self.compile_term()?;
            match op {
                BinaryOp::Native(op) => self.writer.write_arithmetic(op),
                BinaryOp::Call(name) => self.writer.write_call(name, 2),
            }
        }
        Ok(())
    }

    #[rustfmt::skip]
    fn peek_binary_op(&self) -> Option<BinaryOp> {
        use BinaryOp as B;
        match self.current.as_ref()?.kind {
            TokenKind::Symbol('+') => Some(B::Native(VmOp::Add)),
            TokenKind::Symbol('-') => Some(B::Native(VmOp::Sub)),
            TokenKind::Symbol('&') => Some(B::Native(VmOp::And)),
            TokenKind::Symbol('|') => Some(B::Native(VmOp::Or)),
            TokenKind::Symbol('<') => Some(B::Native(VmOp::Lt)),
            TokenKind::Symbol('>') => Some(B::Native(VmOp::Gt)),
            TokenKind::Symbol('=') => Some(B::Native(VmOp::Eq)),
            TokenKind::Symbol('*') => Some(B::Call("Math.multiply")),
            TokenKind::Symbol('/') => Some(B::Call("Math.divide")),
            _ => None,
        }
    }

    fn compile_term(&mut self) -> JackResult<()> {
        let token = self.take()?;
        match token.kind {
            TokenKind::Symbol('(') => {
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            TokenKind::Symbol('-') => {
                self.compile_term()?;
                self.writer.write_arithmetic(VmOp::Neg);
            }
            TokenKind::Symbol('~') => {
                self.compile_term()?;
                self.writer.write_arithmetic(VmOp::Not);
            }
            TokenKind::Int(value) => {
                self.writer.write_push(Segment::Constant, value);
            }
            TokenKind::Str(text) => {
                self.compile_string(&text);
            }
            TokenKind::Keyword(Keyword::True) => {
                self.writer.write_push(Segment::Constant, 1);
                self.writer.write_arithmetic(VmOp::Neg);
            }
            TokenKind::Keyword(Keyword::False) | TokenKind::Keyword(Keyword::Null) => {
                self.writer.write_push(Segment::Constant, 0);
            }
            TokenKind::Keyword(Keyword::This) => {
                self.writer.write_push(Segment::Pointer, 0);
            }
            TokenKind::Ident(name) => {
                self.compile_ident_term(name)?;
            }
            _ => return Err(self.unexpected("a term", token)),
        }
        Ok(())
    }

    /// A term starting with an identifier: an array read, a call, or a
    /// plain variable read, decided by the following token.
    fn compile_ident_term(&mut self, name: SmolStr) -> JackResult<()> {
        if self.check_symbol('[') {
            // Array read: dereference base + index through `that`.
            let symbol = self.resolve_variable(&name)?;
            self.writer.write_push(symbol.kind.segment(), symbol.index);
            self.take()?; // [
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(VmOp::Add);
            self.writer.write_pop(Segment::Pointer, 1);
            self.writer.write_push(Segment::That, 0);
        } else if self.check_symbol('(') || self.check_symbol('.') {
            self.compile_call(name)?;
        } else {
            let symbol = self.resolve_variable(&name)?;
            self.writer.write_push(symbol.kind.segment(), symbol.index);
        }
        Ok(())
    }

    /// Build a string object on the stack, one append per character.
    fn compile_string(&mut self, text: &str) {
        let length = text.chars().count() as u16;
        self.writer.write_push(Segment::Constant, length);
        self.writer.write_call("String.new", 1);

        for c in text.chars() {
            self.writer.write_push(Segment::Constant, c as u16);
            self.writer.write_call("String.appendChar", 2);
        }
    }

    /// Compile a subroutine call. The leading identifier is already
    /// consumed; the current token is `.` or `(`.
    fn compile_call(&mut self, leading: SmolStr) -> JackResult<()> {
        let subroutine = if self.check_symbol('.') {
            self.take()?; // .
            Some(self.take_ident()?)
        } else {
            None
        };

        let (qualified, mut n_args) = match self.call_target(leading, subroutine) {
            CallTarget::Method(object, subroutine) => {
                // The object reference is the implicit first argument.
                self.writer.write_push(object.kind.segment(), object.index);
                (format!("{}.{}", object.ty, subroutine), 1)
            }
            CallTarget::CurrentObject(subroutine) => {
                self.writer.write_push(Segment::Pointer, 0);
                (format!("{}.{}", self.class_name, subroutine), 1)
            }
            CallTarget::ClassName(class, subroutine) => {
                (format!("{}.{}", class, subroutine), 0)
            }
        };

        self.expect_symbol('(')?;
        n_args += self.compile_expression_list()?;
        self.expect_symbol(')')?;

        self.writer.write_call(&qualified, n_args);
        Ok(())
    }

    /// Decide the receiver of a dotted-or-bare call target.
    fn call_target(&self, leading: SmolStr, subroutine: Option<SmolStr>) -> CallTarget {
        match (self.symbols.resolve(&leading).cloned(), subroutine) {
            // A known variable: method call on that object, qualified
            // by the declared type.
            (Some(symbol), subroutine) => {
                let subroutine = subroutine.unwrap_or(leading);
                CallTarget::Method(symbol, subroutine)
            }
            // A bare unresolved name: method call on the current object.
            (None, None) => CallTarget::CurrentObject(leading),
            // Anything else is a class-qualified call; an unresolved
            // leading name is not an error here.
            (None, Some(subroutine)) => CallTarget::ClassName(leading, subroutine),
        }
    }

    /// Comma-separated argument expressions, up to `)`. Returns how
    /// many were compiled.
    fn compile_expression_list(&mut self) -> JackResult<u16> {
        let mut count = 0;
        while !self.check_symbol(')') {
            count += 1;
            self.compile_expression()?;
            if self.check_symbol(',') {
                self.take()?; // ,
            }
        }
        Ok(count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Receiver resolution for a call target.
enum CallTarget {
    /// Method call on a resolved object.
    Method(Symbol, SmolStr),
    /// Implicit method call on the current object.
    CurrentObject(SmolStr),
    /// Plain class-qualified call, no receiver.
    ClassName(SmolStr, SmolStr),
}

enum BinaryOp {
    /// Native arithmetic or logical instruction.
    Native(VmOp),
    /// Two-argument call into the runtime library.
    Call(&'static str),
}
