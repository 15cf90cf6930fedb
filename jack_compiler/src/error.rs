//! Result and errors.
use crate::{compile::CompileError, lex::LexError};
use std::{
    fmt::{self, Display, Formatter},
    io,
};

pub type JackResult<T> = std::result::Result<T, JackError>;

/// Any failure while compiling one source unit.
///
/// All variants are fatal for the unit they occur in; compilation of
/// other units is unaffected.
#[derive(Debug)]
pub enum JackError {
    /// Tokenization failure.
    Lex(LexError),
    /// Parse or resolution failure.
    Compile(CompileError),
    Io(io::Error),
}

impl Display for JackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(err) => write!(f, "{}", err),
            Self::Compile(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for JackError {}

impl From<LexError> for JackError {
    fn from(err: LexError) -> Self {
        JackError::Lex(err)
    }
}

impl From<CompileError> for JackError {
    fn from(err: CompileError) -> Self {
        JackError::Compile(err)
    }
}

impl From<io::Error> for JackError {
    fn from(err: io::Error) -> Self {
        JackError::Io(err)
    }
}
