use std::fmt;

/// A lexed token
///
/// Multi-character operators get their own variant; any other single ASCII
/// character that is not part of a literal surfaces as [Token::Punct].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Ident(String),
    Number(NumberLiteral),
    Str { value: Vec<u8>, kind: StrKind },
    Char(u8),
    Bool(bool),

    KwFun,
    KwLet,
    KwConst,
    KwIf,
    KwElse,
    KwWhile,
    KwDeclare,
    KwStruct,
    KwType,
    KwNew,
    KwAs,
    KwNull,

    EqEq,
    NotEq,
    LessEq,
    GreaterEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AndEq,
    OrEq,
    AndAnd,
    OrOr,
    Shl,
    Shr,
    ColonColon,

    Punct(char),

    Eof,
}

/// Map an identifier spelling to its keyword token, if it is one
pub fn keyword(ident: &str) -> Option<Token> {
    let token = match ident {
        "fun" => Token::KwFun,
        "let" => Token::KwLet,
        "const" => Token::KwConst,
        "if" => Token::KwIf,
        "else" => Token::KwElse,
        "while" => Token::KwWhile,
        "declare" => Token::KwDeclare,
        "struct" => Token::KwStruct,
        "type" => Token::KwType,
        "new" => Token::KwNew,
        "as" => Token::KwAs,
        "null" => Token::KwNull,
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        _ => return None,
    };
    Some(token)
}

/// The raw text of a numeric literal plus everything needed to type it
///
/// `text` excludes the base prefix and the suffix letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberLiteral {
    pub text: String,
    pub base: u32,
    pub has_dot: bool,
    pub suffix: Option<NumSuffix>,
}

/// The one-letter type suffix of a numeric literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumSuffix {
    /// `d`: f64
    D,
    /// `f`: f32
    F,
    /// `i`: i32
    I,
    /// `u`: u32
    U,
    /// `l`: i64
    L,
    /// `b`: u8
    B,
}

impl NumSuffix {
    pub fn letter(self) -> char {
        match self {
            Self::D => 'd',
            Self::F => 'f',
            Self::I => 'i',
            Self::U => 'u',
            Self::L => 'l',
            Self::B => 'b',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'd' => Some(Self::D),
            b'f' => Some(Self::F),
            b'i' => Some(Self::I),
            b'u' => Some(Self::U),
            b'l' => Some(Self::L),
            b'b' => Some(Self::B),
            _ => None,
        }
    }
}

/// Which of the three string flavors a literal selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrKind {
    /// No suffix: fixed-size char array, null terminator included
    CharArray,
    /// `p`: pointer to a char array
    PtrCharArray,
    /// `c`: null-terminated byte pointer
    CStr,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(id) => write!(f, "{id}"),
            Token::Number(num) => write!(f, "{num}"),
            Token::Str { value, kind } => {
                write!(f, "\"{}\"", String::from_utf8_lossy(value))?;
                match kind {
                    StrKind::CharArray => Ok(()),
                    StrKind::PtrCharArray => write!(f, "p"),
                    StrKind::CStr => write!(f, "c"),
                }
            }
            Token::Char(c) => write!(f, "'{}'", *c as char),
            Token::Bool(b) => write!(f, "{b}"),
            Token::KwFun => write!(f, "fun"),
            Token::KwLet => write!(f, "let"),
            Token::KwConst => write!(f, "const"),
            Token::KwIf => write!(f, "if"),
            Token::KwElse => write!(f, "else"),
            Token::KwWhile => write!(f, "while"),
            Token::KwDeclare => write!(f, "declare"),
            Token::KwStruct => write!(f, "struct"),
            Token::KwType => write!(f, "type"),
            Token::KwNew => write!(f, "new"),
            Token::KwAs => write!(f, "as"),
            Token::KwNull => write!(f, "null"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LessEq => write!(f, "<="),
            Token::GreaterEq => write!(f, ">="),
            Token::PlusEq => write!(f, "+="),
            Token::MinusEq => write!(f, "-="),
            Token::StarEq => write!(f, "*="),
            Token::SlashEq => write!(f, "/="),
            Token::PercentEq => write!(f, "%="),
            Token::AndEq => write!(f, "&="),
            Token::OrEq => write!(f, "|="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::ColonColon => write!(f, "::"),
            Token::Punct(c) => write!(f, "{c}"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            16 => write!(f, "0x")?,
            8 => write!(f, "0o")?,
            2 => write!(f, "0b")?,
            _ => {}
        }
        write!(f, "{}", self.text)?;
        if let Some(suffix) = self.suffix {
            write!(f, "{}", suffix.letter())?;
        }
        Ok(())
    }
}

impl fmt::Display for NumSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
