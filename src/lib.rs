pub mod ast;
pub mod codegen;
pub mod common;
pub mod elaborate;
pub mod lexing;
pub mod types;
pub mod value;

pub use codegen::compile;
pub use common::Span;
pub use elaborate::elaborate;
pub use lexing::lex;
pub use types::Type;
