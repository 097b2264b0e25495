use std::io::{Read, Seek};

use crate::error::{PdfError, Result};
use crate::source::ByteSource;

/// Raw token: the bytes exactly as they appear in the file plus the offset
/// of the first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: Vec<u8>,
    pub offset: u64,
}

impl Token {
    pub fn is(&self, text: &[u8]) -> bool {
        self.text == text
    }

    pub fn first(&self) -> Option<u8> {
        self.text.first().copied()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Bytes that end the current token and are pushed back for the next call.
const DELIMS: &[u8] = b" \t<>[]()/";
/// Bytes that end the current token only when preceded by a space.
const WHITESPACE_PREV_DELIMS: &[u8] = b"+-";
/// Bytes that form a single-byte token when they open one.
const START_DELIMS: &[u8] = b"<>[]()";

/// Scan result: either a complete token, or end of input with whatever was
/// accumulated so far.
enum Scan {
    Token(Token),
    Eof(Option<Token>),
}

/// Tokenizer over a byte source, honoring PDF delimiter, whitespace, and
/// comment rules, including the `<<`/`>>` digraphs.
pub struct Lexer<R> {
    source: ByteSource<R>,
}

impl<R: Read + Seek> Lexer<R> {
    pub fn new(source: ByteSource<R>) -> Self {
        Self { source }
    }

    pub fn source_mut(&mut self) -> &mut ByteSource<R> {
        &mut self.source
    }

    pub fn into_source(self) -> ByteSource<R> {
        self.source
    }

    /// Next token; end of input anywhere during the scan is an error.
    pub fn next_token(&mut self) -> Result<Token> {
        match self.scan(false)? {
            Scan::Token(token) => Ok(token),
            Scan::Eof(_) => Err(PdfError::TruncatedFile {
                offset: self.source.tell(),
            }),
        }
    }

    /// Next token, or `None` once the input is exhausted. A token cut off
    /// by the end of input is returned as-is.
    pub fn try_next_token(&mut self) -> Result<Option<Token>> {
        match self.scan(false)? {
            Scan::Token(token) => Ok(Some(token)),
            Scan::Eof(partial) => Ok(partial),
        }
    }

    /// Like `try_next_token`, but a `%` comment is returned verbatim (up to
    /// the line terminator) instead of being skipped.
    pub fn try_next_token_keep_comment(&mut self) -> Result<Option<Token>> {
        match self.scan(true)? {
            Scan::Token(token) => Ok(Some(token)),
            Scan::Eof(partial) => Ok(partial),
        }
    }

    fn scan(&mut self, keep_comment: bool) -> Result<Scan> {
        let mut text: Vec<u8> = Vec::new();
        let mut offset = self.source.tell();
        let mut found = false;
        let mut c = 0u8;

        while !found {
            let prev = c;
            c = match self.source.read_byte()? {
                Some(c) => c,
                None => {
                    let partial = if text.is_empty() {
                        None
                    } else {
                        Some(Token { text, offset })
                    };
                    return Ok(Scan::Eof(partial));
                }
            };

            if c == b'%' {
                if keep_comment {
                    offset = self.source.tell() - 1;
                    text.push(c);
                    loop {
                        match self.source.read_byte()? {
                            None => return Ok(Scan::Eof(Some(Token { text, offset }))),
                            Some(b'\n') | Some(b'\r') => break,
                            Some(c) => text.push(c),
                        }
                    }
                    break;
                }
                self.finish_line()?;
                if text.is_empty() {
                    continue;
                }
                break;
            }

            // Leading whitespace (NUL included)
            if matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0) && text.is_empty() {
                continue;
            }

            // Line terminators end a token and are consumed
            if c == b'\n' || c == b'\r' {
                if text.is_empty() {
                    continue;
                }
                break;
            }

            if !text.is_empty() {
                if DELIMS.contains(&c) {
                    self.source.unread()?;
                    break;
                }
                if prev == b' ' && WHITESPACE_PREV_DELIMS.contains(&c) {
                    self.source.unread()?;
                    break;
                }
                text.push(c);
            } else {
                offset = self.source.tell() - 1;
                if START_DELIMS.contains(&c) {
                    found = true;
                }
                text.push(c);
            }
        }

        // Extend '<' and '>' to the dictionary digraphs when doubled
        if text == b"<" || text == b">" {
            if let Some(next) = self.source.read_byte()? {
                if next == text[0] {
                    text.push(next);
                } else {
                    self.source.unread()?;
                }
            }
        }

        Ok(Scan::Token(Token { text, offset }))
    }

    /// Consume the rest of the current line, tolerating `\r\n` and `\n\r`
    /// pairs.
    pub fn finish_line(&mut self) -> Result<()> {
        loop {
            match self.source.read_byte()? {
                None => return Ok(()),
                Some(b'\n') | Some(b'\r') => break,
                Some(_) => {}
            }
        }
        if let Some(c) = self.source.read_byte()? {
            if c != b'\n' && c != b'\r' {
                self.source.unread()?;
            }
        }
        Ok(())
    }
}
