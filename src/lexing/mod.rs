//! Lexing
//!
//! This module turns source text into a stream of tokens. The [Lexer] pulls
//! bytes one at a time from a [CharSource] and keeps a single byte of
//! look-ahead; [lex] is the convenience interface that drains a whole string.
//!
//! The parser that consumes these tokens lives outside this crate; it is
//! expected to build the trees defined in [crate::ast].

use miette::Diagnostic;
use thiserror::Error;

use crate::Span;

mod lexer;
mod token;

pub use lexer::{CharSource, Lexer};
pub use token::{keyword, NumSuffix, NumberLiteral, StrKind, Token};

#[derive(Debug, Error, Diagnostic)]
pub enum LexError {
    #[error("The string literal is never terminated")]
    UnterminatedString {
        #[label("starts here")]
        span: Span,
    },

    #[error("The char literal is never terminated")]
    UnterminatedChar {
        #[label("starts here")]
        span: Span,
    },

    #[error("Invalid escape `\\{escape}`")]
    InvalidEscape {
        escape: char,

        #[label("in this literal")]
        span: Span,
    },

    #[error("Expected two hex digits after `\\x`")]
    InvalidHexEscape {
        #[label("in this literal")]
        span: Span,
    },

    #[error("A char literal must contain exactly one character")]
    CharTooLong {
        #[label("here")]
        span: Span,
    },

    #[error("The block comment is never closed")]
    UnterminatedBlockComment {
        #[label("starts here")]
        span: Span,
    },
}

/// Tokenize source code
///
/// The end-of-input token is not included in the result.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    let mut lexer = Lexer::new(source.bytes());
    let mut tokens = Vec::new();
    loop {
        let (token, span) = lexer.next_token()?;
        if token == Token::Eof {
            break;
        }
        tokens.push((token, span));
    }
    Ok(tokens)
}
