use crate::Span;

use super::token::{keyword, NumSuffix, NumberLiteral, StrKind, Token};
use super::LexError;

type Result<T> = std::result::Result<T, LexError>;

/// The byte-at-a-time input the lexer reads from
///
/// There is no seeking and no pushback; the lexer keeps its own single byte
/// of look-ahead.
pub trait CharSource {
    fn next_char(&mut self) -> Option<u8>;
}

impl<I: Iterator<Item = u8>> CharSource for I {
    fn next_char(&mut self) -> Option<u8> {
        self.next()
    }
}

/// A stateful tokenizer over a [CharSource]
///
/// Holds exactly one byte of look-ahead and never re-reads a byte from the
/// source. Byte offsets are tracked for spans.
pub struct Lexer<S> {
    source: S,
    current: Option<u8>,
    pos: usize,
}

impl<S: CharSource> Lexer<S> {
    pub fn new(mut source: S) -> Self {
        let current = source.next_char();
        Self {
            source,
            current,
            pos: 0,
        }
    }

    /// Step to the next byte, returning what was current before the step
    fn bump(&mut self) -> Option<u8> {
        let previous = self.current;
        self.current = self.source.next_char();
        if previous.is_some() {
            self.pos += 1;
        }
        previous
    }

    /// Produce the next token; comments and whitespace are skipped
    pub fn next_token(&mut self) -> Result<(Token, Span)> {
        loop {
            while matches!(self.current, Some(c) if c.is_ascii_whitespace()) {
                self.bump();
            }

            let start = self.pos;
            let Some(c) = self.current else {
                return Ok((Token::Eof, Span::marker(start)));
            };

            let token = match c {
                c if c.is_ascii_alphabetic() || c == b'_' => self.ident(),
                c if c.is_ascii_digit() => self.number(),
                b'"' => self.string(start)?,
                b'\'' => self.char_literal(start)?,
                _ => match self.operator(start)? {
                    Some(token) => token,
                    // a comment was skipped; go find the next real token
                    None => continue,
                },
            };

            return Ok((token, Span::new(start, self.pos)));
        }
    }

    fn ident(&mut self) -> Token {
        let mut text = String::new();
        while let Some(c) = self.current {
            if !c.is_ascii_alphanumeric() && c != b'_' {
                break;
            }
            text.push(c as char);
            self.bump();
        }

        match keyword(&text) {
            Some(token) => token,
            None => Token::Ident(text),
        }
    }

    fn number(&mut self) -> Token {
        let started_with_zero = self.current == Some(b'0');
        let mut text = String::new();
        text.push(self.bump().unwrap_or(b'0') as char);

        let mut base = 10;
        if started_with_zero {
            match self.current {
                Some(b'x') => base = 16,
                Some(b'b') => base = 2,
                Some(b'o') => base = 8,
                _ => {}
            }
            if base != 10 {
                // drop the prefix, including the leading zero
                text.clear();
                self.bump();
            }
        }

        let mut has_dot = false;
        while let Some(c) = self.current {
            let accept = match base {
                16 => c.is_ascii_hexdigit(),
                10 => c.is_ascii_digit() || (c == b'.' && !has_dot),
                8 => (b'0'..=b'7').contains(&c),
                _ => c == b'0' || c == b'1',
            };
            if !accept {
                break;
            }
            if c == b'.' {
                has_dot = true;
            }
            text.push(c as char);
            self.bump();
        }

        let suffix = self.current.and_then(NumSuffix::from_byte);
        if suffix.is_some() {
            self.bump();
        }

        Token::Number(NumberLiteral {
            text,
            base,
            has_dot,
            suffix,
        })
    }

    fn string(&mut self, start: usize) -> Result<Token> {
        self.bump(); // eat "
        let mut value = Vec::new();
        loop {
            match self.current {
                None => return Err(LexError::UnterminatedString { span: Span::new(start, self.pos) }),
                Some(b'"') => break,
                Some(b'\\') => value.push(self.escape(start)?),
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.bump(); // eat "

        let kind = match self.current {
            Some(b'c') => StrKind::CStr,
            Some(b'p') => StrKind::PtrCharArray,
            _ => StrKind::CharArray,
        };
        if kind != StrKind::CharArray {
            self.bump();
        }

        Ok(Token::Str { value, kind })
    }

    fn char_literal(&mut self, start: usize) -> Result<Token> {
        self.bump(); // eat '
        let value = match self.current {
            None | Some(b'\n') | Some(b'\r') => {
                return Err(LexError::UnterminatedChar { span: Span::new(start, self.pos) })
            }
            Some(b'\\') => self.escape(start)?,
            Some(c) => {
                self.bump();
                c
            }
        };
        if self.current != Some(b'\'') {
            return Err(LexError::CharTooLong { span: Span::new(start, self.pos + 1) });
        }
        self.bump(); // eat '
        Ok(Token::Char(value))
    }

    /// Decode one escape sequence, with `current` sitting on the backslash
    fn escape(&mut self, start: usize) -> Result<u8> {
        self.bump(); // eat backslash
        let Some(c) = self.bump() else {
            return Err(LexError::UnterminatedString { span: Span::new(start, self.pos) });
        };
        let escaped = match c {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'\'' => b'\'',
            b'"' => b'"',
            b'\\' => b'\\',
            b'0' => b'\0',
            b'x' => {
                let first = self.bump();
                let second = self.bump();
                let (Some(first), Some(second)) = (first, second) else {
                    return Err(LexError::InvalidHexEscape { span: Span::new(start, self.pos) });
                };
                if !first.is_ascii_hexdigit() || !second.is_ascii_hexdigit() {
                    return Err(LexError::InvalidHexEscape { span: Span::new(start, self.pos) });
                }
                (hex_digit(first) << 4) + hex_digit(second)
            }
            c => {
                return Err(LexError::InvalidEscape {
                    escape: c as char,
                    span: Span::new(start, self.pos),
                })
            }
        };
        Ok(escaped)
    }

    /// Operators, punctuation, and comments
    ///
    /// Returns `None` when a comment was consumed instead of a token. Ties
    /// between single- and multi-character operators are broken by reading
    /// one byte further; the non-matching byte stays in the look-ahead.
    fn operator(&mut self, start: usize) -> Result<Option<Token>> {
        let curr = self.bump().unwrap_or_default();

        if self.current == Some(b'=') {
            let compound = match curr {
                b'=' => Some(Token::EqEq),
                b'<' => Some(Token::LessEq),
                b'>' => Some(Token::GreaterEq),
                b'!' => Some(Token::NotEq),
                b'+' => Some(Token::PlusEq),
                b'-' => Some(Token::MinusEq),
                b'*' => Some(Token::StarEq),
                b'/' => Some(Token::SlashEq),
                b'%' => Some(Token::PercentEq),
                b'&' => Some(Token::AndEq),
                b'|' => Some(Token::OrEq),
                _ => None,
            };
            if let Some(token) = compound {
                self.bump();
                return Ok(Some(token));
            }
        }

        if self.current == Some(curr) {
            let doubled = match curr {
                b'|' => Some(Token::OrOr),
                b'&' => Some(Token::AndAnd),
                b'<' => Some(Token::Shl),
                b'>' => Some(Token::Shr),
                b':' => Some(Token::ColonColon),
                _ => None,
            };
            if let Some(token) = doubled {
                self.bump();
                return Ok(Some(token));
            }
        }

        if curr == b'/' {
            if self.current == Some(b'/') {
                while !matches!(self.current, None | Some(b'\n') | Some(b'\r')) {
                    self.bump();
                }
                return Ok(None);
            }
            if self.current == Some(b'*') {
                self.bump();
                let mut last = 0;
                loop {
                    match self.current {
                        None => {
                            return Err(LexError::UnterminatedBlockComment {
                                span: Span::new(start, self.pos),
                            })
                        }
                        Some(c) => {
                            self.bump();
                            if last == b'*' && c == b'/' {
                                break;
                            }
                            last = c;
                        }
                    }
                }
                return Ok(None);
            }
        }

        Ok(Some(Token::Punct(curr as char)))
    }
}

fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(src: &str) -> Vec<(Token, Span)> {
        let mut lexer = Lexer::new(src.bytes());
        let mut tokens = Vec::new();
        loop {
            let (token, span) = lexer.next_token().unwrap();
            if token == Token::Eof {
                break;
            }
            tokens.push((token, span));
        }
        tokens
    }

    fn tokenize_without_spans(src: &str) -> Vec<Token> {
        tokenize(src).into_iter().map(|(tok, _)| tok).collect()
    }

    fn number(text: &str, base: u32, has_dot: bool, suffix: Option<NumSuffix>) -> Token {
        Token::Number(NumberLiteral {
            text: String::from(text),
            base,
            has_dot,
            suffix,
        })
    }

    #[test]
    fn numbers() {
        let src = "0 0.0 123.4 42i 7u 9l 255b 1.5f 2.5d";

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                number("0", 10, false, None),
                number("0.0", 10, true, None),
                number("123.4", 10, true, None),
                number("42", 10, false, Some(NumSuffix::I)),
                number("7", 10, false, Some(NumSuffix::U)),
                number("9", 10, false, Some(NumSuffix::L)),
                number("255", 10, false, Some(NumSuffix::B)),
                number("1.5", 10, true, Some(NumSuffix::F)),
                number("2.5", 10, true, Some(NumSuffix::D)),
            ]
        );
    }

    #[test]
    fn number_bases() {
        let src = "0xff 0b101 0o17 0xFFl";

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                number("ff", 16, false, None),
                number("101", 2, false, None),
                number("17", 8, false, None),
                number("FF", 16, false, Some(NumSuffix::L)),
            ]
        );
    }

    #[test]
    fn strings() {
        let src = r#""hi" "hi"c "hi"p "a\n\x41\0""#;

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                Token::Str {
                    value: b"hi".to_vec(),
                    kind: StrKind::CharArray
                },
                Token::Str {
                    value: b"hi".to_vec(),
                    kind: StrKind::CStr
                },
                Token::Str {
                    value: b"hi".to_vec(),
                    kind: StrKind::PtrCharArray
                },
                Token::Str {
                    value: b"a\n\x41\0".to_vec(),
                    kind: StrKind::CharArray
                },
            ]
        );
    }

    #[test]
    fn chars() {
        let src = r"'a' '\n' '\x20' '\''";

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                Token::Char(b'a'),
                Token::Char(b'\n'),
                Token::Char(b' '),
                Token::Char(b'\''),
            ]
        );
    }

    #[test]
    fn operators() {
        let src = "== != <= >= += -= *= /= %= &= |= && || << >> :: = < > + - * / % & | ! :";

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::LessEq,
                Token::GreaterEq,
                Token::PlusEq,
                Token::MinusEq,
                Token::StarEq,
                Token::SlashEq,
                Token::PercentEq,
                Token::AndEq,
                Token::OrEq,
                Token::AndAnd,
                Token::OrOr,
                Token::Shl,
                Token::Shr,
                Token::ColonColon,
                Token::Punct('='),
                Token::Punct('<'),
                Token::Punct('>'),
                Token::Punct('+'),
                Token::Punct('-'),
                Token::Punct('*'),
                Token::Punct('/'),
                Token::Punct('%'),
                Token::Punct('&'),
                Token::Punct('|'),
                Token::Punct('!'),
                Token::Punct(':'),
            ]
        );
    }

    #[test]
    fn operator_lookahead_is_kept() {
        // the `=` after `+` combines; the `3` after `=` must not be lost
        assert_eq!(
            tokenize_without_spans("x+=3"),
            vec![
                Token::Ident(String::from("x")),
                Token::PlusEq,
                number("3", 10, false, None),
            ]
        );

        // `<` followed by `-` stays single; `-` starts the next token
        assert_eq!(
            tokenize_without_spans("a<-b"),
            vec![
                Token::Ident(String::from("a")),
                Token::Punct('<'),
                Token::Punct('-'),
                Token::Ident(String::from("b")),
            ]
        );
    }

    #[test]
    fn keywords_and_idents() {
        let src = "fun let const if else while declare struct type new as null true false foo _bar x9";

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                Token::KwFun,
                Token::KwLet,
                Token::KwConst,
                Token::KwIf,
                Token::KwElse,
                Token::KwWhile,
                Token::KwDeclare,
                Token::KwStruct,
                Token::KwType,
                Token::KwNew,
                Token::KwAs,
                Token::KwNull,
                Token::Bool(true),
                Token::Bool(false),
                Token::Ident(String::from("foo")),
                Token::Ident(String::from("_bar")),
                Token::Ident(String::from("x9")),
            ]
        );
    }

    #[test]
    fn comments() {
        let src = "a // line comment\nb /* block\ncomment */ c";

        assert_eq!(
            tokenize_without_spans(src),
            vec![
                Token::Ident(String::from("a")),
                Token::Ident(String::from("b")),
                Token::Ident(String::from("c")),
            ]
        );
    }

    #[test]
    fn spans() {
        let src = "let x = 5";

        assert_eq!(
            tokenize(src),
            vec![
                (Token::KwLet, Span::new(0, 3)),
                (Token::Ident(String::from("x")), Span::new(4, 5)),
                (Token::Punct('='), Span::new(6, 7)),
                (number("5", 10, false, None), Span::new(8, 9)),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::new(r#""abc"#.bytes());
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn char_too_long() {
        let mut lexer = Lexer::new("'ab'".bytes());
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::CharTooLong { .. })
        ));
    }

    #[test]
    fn invalid_escape() {
        let mut lexer = Lexer::new(r#""\q""#.bytes());
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::InvalidEscape { escape: 'q', .. })
        ));
    }

    #[test]
    fn invalid_hex_escape() {
        let mut lexer = Lexer::new(r#""\xgg""#.bytes());
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::InvalidHexEscape { .. })
        ));
    }
}
