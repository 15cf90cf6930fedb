//! Lexical analysis (tokenizer)
use crate::tokens::{Keyword, Span, Token, TokenKind};

use itertools::{multipeek, MultiPeek};
use smol_str::SmolStr;
use std::{error, fmt, iter::Iterator, str::CharIndices, str::FromStr};

pub fn debug_print_lexer(lexer: Lexer) {
    let source = lexer.source.original;
    println!("Source Byte Count: {}", source.len());

    for result in lexer {
        match result {
            Ok(token) => {
                println!(
                    "{:4}-{:<4} L{:<3} {:?}",
                    token.span.start, token.span.end, token.span.start_line, token.kind
                );
            }
            Err(err) => println!("{:?}", err),
        }
    }
}

/// Lexical analyzer.
///
/// One instance covers one source unit; the token sequence is
/// finite and not restartable.
pub struct Lexer<'a> {
    pub(crate) source: SourceText<'a>,
    token_start: SourcePos,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: SourcePos {
                position: 0,
                line: 1,
                column: 1,
            },
        }
    }

    /// Whether any non-whitespace, non-comment input remains.
    ///
    /// Skips over whitespace, line comments and block comments,
    /// re-checking until real content or end of input is found.
    /// A block comment with no closing marker is an error.
    pub fn has_more(&mut self) -> Result<bool, LexError> {
        loop {
            self.consume_whitespace();

            self.source.reset_peek();
            match self.source.peek_char2() {
                (Some('/'), Some('/')) => {
                    self.source.next_char();
                    self.source.next_char();
                    self.consume_line_comment();
                }
                (Some('/'), Some('*')) => {
                    self.source.next_char();
                    self.source.next_char();
                    self.consume_block_comment()?;
                }
                (Some(_), _) => {
                    self.source.reset_peek();
                    return Ok(true);
                }
                (None, _) => return Ok(false),
            }
        }
    }

    /// Consume exactly one token from the front of the remaining input.
    ///
    /// Classification is tried in strict priority order, first match
    /// wins: integer literal, string literal, identifier-or-keyword,
    /// then any other non-whitespace character as a symbol.
    ///
    /// Callers must establish that input remains via
    /// [`has_more`](Lexer::has_more) before calling.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        match self.source.next_char() {
            Some((_, next_char)) => {
                self.start_token();

                match next_char {
                    '0'..='9' => self.consume_int(),
                    '"' => self.consume_string(),
                    c if is_word(c) => Ok(self.consume_ident()),
                    c => Ok(self.make_token(TokenKind::Symbol(c))),
                }
            }
            None => Err(LexError::UnexpectedEnd),
        }
    }

    /// Prime the lexer state for recording a new token.
    fn start_token(&mut self) {
        self.token_start = SourcePos {
            position: self.source.current.0,
            column: self.source.current_column,
            line: self.source.current_line,
        };
    }

    fn make_token(&mut self, token_kind: TokenKind) -> Token {
        let token_end = SourcePos {
            position: self.source.current.0,
            column: self.source.current_column,
            line: self.source.current_line,
        };

        // Build span.
        let span = Span {
            start: self.token_start.position,
            end: token_end.position,
            start_column: self.token_start.column,
            end_column: token_end.column,
            start_line: self.token_start.line,
            end_line: token_end.line,
        };

        Token {
            kind: token_kind,
            span,
        }
    }

    /// Consume whitespace until a non-whitespace character is encountered.
    fn consume_whitespace(&mut self) {
        self.source.reset_peek();
        while let Some((_, c)) = self.source.peek_char() {
            if c.is_ascii_whitespace() {
                self.source.next_char();
            } else {
                break;
            }
        }
        self.source.reset_peek();
    }

    /// Erase a line comment up to and including the trailing newline.
    fn consume_line_comment(&mut self) {
        loop {
            match self.source.next_char() {
                Some((_, '\n')) | None => break,
                Some(_) => {}
            }
        }
    }

    /// Erase a block comment, including the closing marker.
    fn consume_block_comment(&mut self) -> Result<(), LexError> {
        let line = self.source.current_line;
        loop {
            match self.source.next_char() {
                Some((_, '*')) => {
                    if let Some((_, '/')) = self.source.peek_char() {
                        self.source.next_char();
                        return Ok(());
                    }
                    self.source.reset_peek();
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedComment { line }),
            }
        }
    }

    fn consume_int(&mut self) -> Result<Token, LexError> {
        self.source.reset_peek();

        // Maximal run of decimal digits.
        while let Some((_, '0'..='9')) = self.source.peek_char() {
            self.source.next_char();
        }
        self.source.reset_peek();

        match self.token_fragment().parse::<u16>() {
            Ok(value) => Ok(self.make_token(TokenKind::Int(value))),
            Err(_) => Err(LexError::IntegerOverflow {
                line: self.token_start.line,
            }),
        }
    }

    /// Consume a string literal. The opening quote is already consumed;
    /// contents are taken verbatim up to the closing quote.
    fn consume_string(&mut self) -> Result<Token, LexError> {
        let line = self.token_start.line;
        let mut value = String::new();

        loop {
            match self.source.next_char() {
                Some((_, '"')) => break,
                Some((_, c)) => value.push(c),
                None => return Err(LexError::UnterminatedString { line }),
            }
        }

        Ok(self.make_token(TokenKind::Str(SmolStr::from(value.as_str()))))
    }

    fn consume_ident(&mut self) -> Token {
        self.source.reset_peek();

        while let Some((_, c)) = self.source.peek_char() {
            if is_word(c) {
                self.source.next_char();
            } else {
                break;
            }
        }
        self.source.reset_peek();

        // If the fragment exactly matches a reserved word, the token is
        // a keyword instead of a user defined identifier.
        let token_kind = Keyword::from_str(self.token_fragment())
            .map(TokenKind::Keyword)
            .unwrap_or_else(|_| TokenKind::Ident(SmolStr::from(self.token_fragment())));
        self.make_token(token_kind)
    }

    fn token_fragment(&self) -> &str {
        &self.source.original[self.token_start.position..=self.source.current.0]
    }
}

/// Implement `Lexer` as an iterator for consuming tokens lazily.
impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_more() {
            Ok(true) => Some(self.next_token()),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

fn is_word(c: char) -> bool {
    matches!(c, '_' | 'a'..='z' | 'A'..='Z' | '0'..='9')
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
pub(crate) struct SourceText<'a> {
    /// Keep reference to the source so the lexer can
    /// slice fragments from it.
    pub(crate) original: &'a str,

    /// Iterator over UTF-8 encoded source code.
    ///
    /// The `MultiPeek` wrapper allows for arbitrary lookahead by consuming
    /// the iterator internally and buffering the result. This is required
    /// because UTF-8 characters are variable in width. Indexing the string
    /// for individual bytes is possible, but impossible for encoded characters.
    ///
    /// An important semantic feature of `MultiPeek` is that peeking advances
    /// the internal peek cursor by 1. Each call will return the next element.
    /// The peek cursor offset is restored to 0 when calling `MultiPeek::next()`
    /// or `MultiPeek::reset_peek()`.
    source: MultiPeek<CharIndices<'a>>,

    /// Byte position in the source string of the current character.
    current: (usize, char),
    current_line: usize,
    current_column: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            source: multipeek(source.char_indices()),
            current: (0, '\0'),
            current_line: 1,
            current_column: 1,
        }
    }

    /// number of bytes in source.
    fn byte_count(&self) -> usize {
        self.original.len()
    }

    /// Advance the cursor and return the next position and character.
    fn next_char(&mut self) -> Option<(usize, char)> {
        if let Some((index, c)) = self.source.next() {
            if c == '\n' {
                self.current_column = 0;
                self.current_line += 1;
            } else {
                self.current_column += 1;
            }
            self.current = (index, c);
            Some((index, c))
        } else {
            // Source code iterator has reached end-of-file.
            //
            // Set the current index to the size of the source
            // string. There is no End-of-file character, so
            // we just set it to the null-byte.
            self.current = (self.byte_count(), '\0');
            None
        }
    }

    /// Peeks the current character in the stream.
    ///
    /// This call advances the peek cursor. Subsequent
    /// calls will look ahead by one character each call.
    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.source.peek().cloned()
    }

    /// Two character lookahead.
    fn peek_char2(&mut self) -> (Option<char>, Option<char>) {
        (
            self.source.peek().map(|(_, c)| c).cloned(),
            self.source.peek().map(|(_, c)| c).cloned(),
        )
    }

    /// Reset the stream peek cursor.
    fn reset_peek(&mut self) {
        self.source.reset_peek()
    }
}

#[derive(Debug, Default)]
struct SourcePos {
    position: usize,
    column: usize,
    line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Block comment start with no matching end marker.
    UnterminatedComment { line: usize },
    /// String literal with no closing quote.
    UnterminatedString { line: usize },
    /// Integer literal too large for the target word size.
    IntegerOverflow { line: usize },
    /// Token requested past the end of the source.
    UnexpectedEnd,
}

impl error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use LexError as E;
        match self {
            E::UnterminatedComment { line } => {
                write!(f, "line {}: block comment is never terminated", line)
            }
            E::UnterminatedString { line } => {
                write!(f, "line {}: string literal is never terminated", line)
            }
            E::IntegerOverflow { line } => {
                write!(f, "line {}: integer literal out of range", line)
            }
            E::UnexpectedEnd => write!(f, "unexpected end of source code"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lex_kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|result| result.unwrap().kind)
            .collect()
    }

    #[test]
    fn test_classification_priority() {
        use TokenKind as T;

        let kinds = lex_kinds(r#"let x1 = 42 + "hi";"#);
        assert_eq!(
            kinds,
            vec![
                T::Keyword(Keyword::Let),
                T::Ident(SmolStr::from("x1")),
                T::Symbol('='),
                T::Int(42),
                T::Symbol('+'),
                T::Str(SmolStr::from("hi")),
                T::Symbol(';'),
            ]
        );
    }

    #[test]
    fn test_comments_produce_no_tokens() {
        let source = "
            // line comment
            /* block
               comment */
            class /* inline */ Main // trailing
        ";
        let kinds = lex_kinds(source);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::Class),
                TokenKind::Ident(SmolStr::from("Main")),
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("class\n/* dangling");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Keyword(Keyword::Class));
        assert_eq!(
            lexer.next(),
            Some(Err(LexError::UnterminatedComment { line: 2 }))
        );
        // The failed lexer has consumed its input.
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"no closing quote");
        assert_eq!(
            lexer.next(),
            Some(Err(LexError::UnterminatedString { line: 1 }))
        );
    }

    #[test]
    fn test_integer_overflow() {
        let mut lexer = Lexer::new("99999999");
        assert_eq!(
            lexer.next(),
            Some(Err(LexError::IntegerOverflow { line: 1 }))
        );
    }

    #[test]
    fn test_string_contents_verbatim() {
        let kinds = lex_kinds(r#""a < b & c // not a comment""#);
        assert_eq!(
            kinds,
            vec![TokenKind::Str(SmolStr::from("a < b & c // not a comment"))]
        );
    }

    #[test]
    fn test_symbols_are_single_characters() {
        let kinds = lex_kinds("(){}[].,;+-*/&|<>=~");
        assert_eq!(kinds.len(), 19);
        for kind in kinds {
            assert!(matches!(kind, TokenKind::Symbol(_)));
        }
    }

    #[test]
    fn test_round_trip() {
        // Reconstructing source text from tokens, then lexing again,
        // reproduces the same token sequence.
        let source = r#"
            class Point {
                field int x, y;
                method int getX() { return x; }
            }
        "#;
        let tokens = lex_kinds(source);
        let reconstructed = tokens
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(lex_kinds(&reconstructed), tokens);
    }

    #[test]
    fn test_span_line_tracking() {
        let mut lexer = Lexer::new("class\n  Main");
        let class = lexer.next().unwrap().unwrap();
        let name = lexer.next().unwrap().unwrap();
        assert_eq!(class.span.start_line, 1);
        assert_eq!(name.span.start_line, 2);
        assert_eq!(name.span.start_column, 3);
    }
}
