use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("unable to open {}: {source}", .path.display())]
    UnableToOpenFile { path: PathBuf, source: io::Error },

    #[error("invalid PDF header")]
    InvalidHeader,

    #[error("unexpected end of file at offset {offset}")]
    TruncatedFile { offset: u64 },

    #[error("invalid token {token:?} at offset {offset}")]
    InvalidToken { offset: u64, token: String },

    #[error("invalid name at offset {offset}")]
    InvalidName { offset: u64 },

    #[error("invalid hex string at offset {offset}")]
    InvalidHexString { offset: u64 },

    #[error("invalid stream at offset {offset}")]
    InvalidStream { offset: u64 },

    #[error("invalid object at offset {offset}")]
    InvalidObject { offset: u64 },

    #[error("invalid trailer at offset {offset}")]
    InvalidTrailer { offset: u64 },

    #[error("invalid line at offset {offset}")]
    InvalidLine { offset: u64 },

    /// Reserved for the future canonical full-rewrite mode.
    #[error("not implemented")]
    NotImplemented,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;
