pub mod compile;
pub mod error;
pub mod lex;
pub mod tokens;

pub use self::error::{JackError, JackResult};

use crate::{
    compile::{CompileEngine, VmWriter},
    lex::{LexError, Lexer},
};
use std::io;

/// Compile a single source unit, writing instructions to `out`.
///
/// The destination receives whatever was emitted even when compilation
/// fails partway, so partial output is never silently lost.
pub fn compile_source<W: io::Write>(source: &str, out: W) -> JackResult<()> {
    let lexer = Lexer::new(source);
    let writer = VmWriter::new(out);
    let engine = CompileEngine::new(lexer, writer);

    engine.compile()?.close()?;
    Ok(())
}

/// Compile a source unit into a string of instruction text.
pub fn compile_str(source: &str) -> JackResult<String> {
    let mut buffer = Vec::new();
    compile_source(source, &mut buffer)?;
    Ok(String::from_utf8(buffer).expect("instruction text is UTF-8"))
}

/// Render the token stream as markup, one element per token.
///
/// A diagnostic view for differential testing against other tooling
/// that understands this format. Markup-sensitive symbol characters
/// are escape-encoded here, and only here; internal token values stay
/// raw.
pub fn tokenize_to_markup(source: &str) -> Result<String, LexError> {
    use tokens::TokenKind as T;

    let mut out = String::from("<tokens>\n");
    for result in Lexer::new(source) {
        let token = result?;
        let (tag, value) = match &token.kind {
            T::Keyword(keyword) => ("keyword", keyword.to_string()),
            T::Symbol(c) => ("symbol", escape_markup(*c)),
            T::Int(value) => ("integerConstant", value.to_string()),
            T::Str(text) => ("stringConstant", text.to_string()),
            T::Ident(name) => ("identifier", name.to_string()),
        };
        out.push_str(&format!("<{}> {} </{}>\n", tag, value, tag));
    }
    out.push_str("</tokens>\n");
    Ok(out)
}

fn escape_markup(c: char) -> String {
    match c {
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        '&' => "&amp;".to_string(),
        c => c.to_string(),
    }
}
