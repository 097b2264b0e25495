pub mod document;
pub mod error;
pub mod parser;
pub mod source;
pub mod types;
mod writer;

pub use document::Document;
pub use error::{PdfError, Result};
pub use parser::{Lexer, Parser, Token};
pub use source::ByteSource;
pub use types::{Dictionary, Object, StreamData, Value, XRefEntry};
