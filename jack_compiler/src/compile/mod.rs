//! Syntax-directed compilation.
//!
//! There is no tree-building phase: the parsing productions in
//! [`engine`] double as the code generator, so parsing order is
//! evaluation order.
mod emit;
mod engine;
mod symbol;

pub use self::{
    emit::{Segment, VmInstr, VmOp, VmWriter},
    engine::CompileEngine,
    symbol::{Symbol, SymbolKind, SymbolTable},
};

use crate::tokens::Token;
use smol_str::SmolStr;
use std::{error, fmt};

#[derive(Debug)]
pub enum CompileError {
    /// Redefinition of a name within one scope.
    DuplicateSymbol(SmolStr),
    /// A name the engine requires to resolve to a variable does not.
    UnresolvedSymbol(SmolStr),
    /// No grammar production matches the current token.
    UnexpectedToken { expected: String, found: Token },
    /// Source ended in the middle of a production.
    UnexpectedEnd,
}

impl error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use CompileError as E;
        match self {
            E::DuplicateSymbol(name) => {
                write!(f, "symbol '{}' is already defined in this scope", name)
            }
            E::UnresolvedSymbol(name) => {
                write!(f, "'{}' does not resolve to a variable", name)
            }
            E::UnexpectedToken { expected, found } => write!(
                f,
                "line {}: encountered unexpected token '{}', expected {}",
                found.span.start_line, found.kind, expected
            ),
            E::UnexpectedEnd => write!(f, "unexpected end of source code"),
        }
    }
}
