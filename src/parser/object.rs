use std::io::{Read, Seek};
use std::str::FromStr;

use log::{debug, trace, warn};

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::parser::lexer::{Lexer, Token};
use crate::source::ByteSource;
use crate::types::{Dictionary, Object, StreamData, Value, XRefEntry};

/// Line buffer size for the endstream scan.
const STREAM_SCAN_CHUNK: usize = 4096;
const ENDSTREAM: &[u8] = b"endstream";

/// Recursive-descent reader for the PDF container grammar.
///
/// Populates the document as it goes: objects, xref entries, and the
/// trailer land on the document even when a later error aborts the parse.
pub struct Parser<'a, R> {
    lexer: Lexer<R>,
    doc: &'a mut Document,
}

impl<'a, R: Read + Seek> Parser<'a, R> {
    pub fn new(source: ByteSource<R>, doc: &'a mut Document) -> Self {
        Self {
            lexer: Lexer::new(source),
            doc,
        }
    }

    /// Parse the whole file: header, top-level dispatch until end of input,
    /// then reconcile the xref table with the parsed objects. Returns the
    /// reader so the caller can keep it open for stream copy-through.
    pub fn parse(mut self) -> Result<R> {
        self.parse_header()?;
        debug!(
            "PDF version {}.{}",
            self.doc.version.0, self.doc.version.1
        );

        let mut second_line = true;
        loop {
            let Some(token) = self.lexer.try_next_token()? else {
                break;
            };

            if token.is(b"xref") {
                self.parse_xref(&token)?;
            } else if matches!(token.first(), Some(b'1'..=b'9')) {
                self.parse_object(&token)?;
            } else if token.is(b"startxref") {
                // A startxref can appear without a trailer mid-file.
                self.parse_startxref()?;
            } else if second_line {
                // The line after the header may be an uncommented binary
                // marker; discard that whole line.
                warn!(
                    "discarding unclassifiable line at offset {}",
                    token.offset
                );
                self.lexer.source_mut().seek_to(token.offset)?;
                self.lexer.finish_line()?;
            } else {
                return Err(PdfError::InvalidLine {
                    offset: token.offset,
                });
            }
            second_line = false;
        }

        // Copy the used flag from each xref entry onto its object.
        let Document { xref, objects, .. } = &mut *self.doc;
        for entry in xref.iter() {
            let found = objects
                .iter_mut()
                .find(|o| o.id() == entry.id && o.generation() == entry.gen);
            if let Some(object) = found {
                object.set_used(entry.used);
            }
        }

        Ok(self.lexer.into_source().into_inner())
    }

    /// `%PDF-` signature, major digit, `.`, minor digit; the rest of the
    /// line is discarded.
    fn parse_header(&mut self) -> Result<()> {
        if self.read_line_chunk(5)? != b"%PDF-" {
            return Err(PdfError::InvalidHeader);
        }
        self.doc.version.0 = match self.read_line_chunk(1)?.first() {
            Some(d @ b'0'..=b'9') => d - b'0',
            _ => return Err(PdfError::InvalidHeader),
        };
        if self.read_line_chunk(1)? != b"." {
            return Err(PdfError::InvalidHeader);
        }
        self.doc.version.1 = match self.read_line_chunk(1)?.first() {
            Some(d @ b'0'..=b'9') => d - b'0',
            _ => return Err(PdfError::InvalidHeader),
        };
        self.lexer.finish_line()
    }

    /// Read up to `size` bytes from the current line: leading terminators
    /// are skipped, a terminator after content stops early.
    fn read_line_chunk(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(size);
        while buf.len() < size {
            let Some(c) = self.lexer.source_mut().read_byte()? else {
                break;
            };
            if c == b'\n' || c == b'\r' {
                if buf.is_empty() {
                    continue;
                }
                break;
            }
            buf.push(c);
        }
        Ok(buf)
    }

    /// Indirect object: generation and `obj` keyword, then dictionary /
    /// indirect-offset / data values until `endobj`.
    fn parse_object(&mut self, id_token: &Token) -> Result<()> {
        let offset = id_token.offset;
        let id: u32 =
            parse_decimal(id_token).map_err(|_| PdfError::InvalidObject { offset })?;
        let gen_token = self.lexer.next_token()?;
        let gen: u32 =
            parse_decimal(&gen_token).map_err(|_| PdfError::InvalidObject { offset })?;
        if !self.lexer.next_token()?.is(b"obj") {
            return Err(PdfError::InvalidObject { offset });
        }
        trace!("object {} {} at offset {}", id, gen, offset);

        let mut object = Object::parsed(id, gen, offset);
        loop {
            let token = self.lexer.next_token()?;
            if token.is(b"endobj") {
                break;
            }
            if token.is(b"<<") {
                let dict = self.parse_dictionary(object.dictionary())?;
                object.dictionary_mut().extend(dict);
            } else if matches!(token.first(), Some(b'1'..=b'9')) {
                // Bare positive integer body: an object-stream reference.
                match token_to_number(&token)? {
                    Value::Integer { value, .. } => object.set_indirect_offset(value),
                    _ => {
                        return Err(PdfError::InvalidObject {
                            offset: token.offset,
                        })
                    }
                }
            } else {
                let value = self.parse_type(&token, object.dictionary())?;
                object.push_value(value);
            }
        }
        self.doc.objects.push(object);
        Ok(())
    }

    /// Top-level value dispatch. `enclosing` is the dictionary of the
    /// surrounding object, consulted for stream lengths.
    fn parse_type(&mut self, token: &Token, enclosing: &Dictionary) -> Result<Value> {
        if token.is(b"<<") {
            Ok(Value::Dictionary(self.parse_dictionary(enclosing)?))
        } else if token.is(b"[") {
            self.parse_array(enclosing)
        } else if token.is(b"(") {
            self.parse_string()
        } else if token.is(b"<") {
            self.parse_hex_string(token.offset)
        } else if token.is(b"stream") {
            self.parse_stream(enclosing)
        } else if matches!(token.first(), Some(b'1'..=b'9')) {
            self.parse_number_or_reference(token)
        } else if token.first() == Some(b'/') {
            parse_name(token)
        } else if matches!(token.first(), Some(b'+' | b'-' | b'0' | b'.')) {
            token_to_number(token)
        } else if token.is(b"true") {
            Ok(Value::Boolean(true))
        } else if token.is(b"false") {
            Ok(Value::Boolean(false))
        } else if token.is(b"null") {
            Ok(Value::Null)
        } else {
            Err(invalid_token(token))
        }
    }

    /// `N` alone is an integer; `N G R` is a reference. The lookahead is
    /// transactional: on mismatch the cursor rolls back to just after `N`.
    fn parse_number_or_reference(&mut self, token: &Token) -> Result<Value> {
        let number = token_to_number(token)?;
        let id = match &number {
            Value::Integer { value, .. } => *value,
            _ => return Ok(number),
        };

        let saved = self.lexer.source_mut().tell();
        let gen_token = self.lexer.next_token()?;
        let r_token = self.lexer.next_token()?;

        let gen = match token_to_number(&gen_token) {
            Ok(Value::Integer { value, .. }) => u32::try_from(value).ok(),
            _ => None,
        };

        match (u32::try_from(id).ok(), gen) {
            (Some(id), Some(gen)) if r_token.is(b"R") => Ok(Value::Reference { id, gen }),
            _ => {
                self.lexer.source_mut().seek_to(saved)?;
                Ok(number)
            }
        }
    }

    fn parse_array(&mut self, enclosing: &Dictionary) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            let token = self.lexer.next_token()?;
            if token.is(b"]") {
                break;
            }
            items.push(self.parse_type(&token, enclosing)?);
        }
        Ok(Value::Array(items))
    }

    /// Literal string body after `(`. Escapes are carried through raw; the
    /// only bookkeeping is what it takes to find the closing paren.
    fn parse_string(&mut self) -> Result<Value> {
        let mut body = Vec::new();
        let mut escaped = false;
        let mut depth = 1;
        loop {
            let Some(c) = self.lexer.source_mut().read_byte()? else {
                break;
            };
            if c == b'(' && !escaped {
                depth += 1;
            } else if c == b')' && !escaped {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            // A doubled backslash escapes itself, not the next byte
            escaped = c == b'\\' && !escaped;
            body.push(c);
        }
        Ok(Value::String(body))
    }

    fn parse_hex_string(&mut self, offset: u64) -> Result<Value> {
        let mut body = Vec::new();
        loop {
            let Some(c) = self.lexer.source_mut().read_byte()? else {
                break;
            };
            if c == b'>' {
                break;
            }
            body.push(c);
        }
        if body.len() % 2 == 1 {
            return Err(PdfError::InvalidHexString { offset });
        }
        Ok(Value::HexString(body))
    }

    /// Key/value pairs until `>>`. A key directly followed by `>>` maps to
    /// Null. Duplicate keys overwrite in place.
    fn parse_dictionary(&mut self, enclosing: &Dictionary) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let token = self.lexer.next_token()?;
            if token.is(b">>") {
                break;
            }
            let key = name_key(&token)?;

            let token = self.lexer.next_token()?;
            if token.is(b">>") {
                dict.insert(key, Value::Null);
                break;
            }
            let value = self.parse_type(&token, enclosing)?;
            dict.insert(key, value);
        }
        Ok(dict)
    }

    /// Stream body after the `stream` keyword. The body is recorded as an
    /// extent in the source; bytes are not materialized.
    fn parse_stream(&mut self, dict: &Dictionary) -> Result<Value> {
        let start = self.lexer.source_mut().tell();

        if !dict.contains_key("Length") {
            return Err(PdfError::InvalidStream { offset: start });
        }

        // Direct jump when the length is usable as-is
        if !dict.contains_key("Filter") {
            if let Some(length) = dict.get("Length").and_then(Value::as_int) {
                let end = start + length.max(0) as u64;
                self.lexer.source_mut().seek_to(end)?;
                match self.lexer.try_next_token()? {
                    Some(token) if token.is(b"endstream") => {
                        return Ok(Value::Stream(StreamData::Extent { start, end }));
                    }
                    _ => self.lexer.source_mut().seek_to(start)?,
                }
            }
        }

        // Scan line by line for the endstream keyword
        loop {
            let (line_start, line) = self.read_stream_line()?;
            if let Some(pos) = find_subslice(&line, ENDSTREAM) {
                let end = line_start + pos as u64;
                self.lexer
                    .source_mut()
                    .seek_to(end + ENDSTREAM.len() as u64)?;
                return Ok(Value::Stream(StreamData::Extent { start, end }));
            }
        }
    }

    /// Read one line (up to the chunk size), skipping leading terminators.
    /// Returns the offset of the first content byte. End of input here
    /// means a stream body ran off the file.
    fn read_stream_line(&mut self) -> Result<(u64, Vec<u8>)> {
        let mut buf = Vec::new();
        let mut start = self.lexer.source_mut().tell();
        while buf.len() < STREAM_SCAN_CHUNK {
            let offset = self.lexer.source_mut().tell();
            let Some(c) = self.lexer.source_mut().read_byte()? else {
                return Err(PdfError::TruncatedFile { offset });
            };
            if c == b'\n' || c == b'\r' {
                if buf.is_empty() {
                    start = self.lexer.source_mut().tell();
                    continue;
                }
                break;
            }
            if buf.is_empty() {
                start = offset;
            }
            buf.push(c);
        }
        Ok((start, buf))
    }

    /// Cross-reference table after the `xref` keyword: entry rows are
    /// recognized by their fixed 10-digit offset field, anything else is a
    /// subsection header. Ends at `trailer`.
    fn parse_xref(&mut self, xref_token: &Token) -> Result<bool> {
        self.doc.xref_offset = xref_token.offset;
        debug!("xref table at offset {}", self.doc.xref_offset);

        let mut cur_id: u32 = 0;
        loop {
            let first = self.lexer.next_token()?;
            if first.is(b"trailer") {
                break;
            }
            let second = self.lexer.next_token()?;

            if first.text.len() == 10 {
                let third = self.lexer.next_token()?;
                self.doc.xref.push(XRefEntry {
                    id: cur_id,
                    offset: parse_decimal(&first)?,
                    gen: parse_decimal(&second)?,
                    used: third.is(b"n"),
                });
                cur_id += 1;
            } else {
                // Subsection header: first_id count (count discarded)
                cur_id = parse_decimal(&first)?;
            }
        }
        self.parse_trailer()
    }

    /// Trailer dictionary, merged over any earlier revision's trailer.
    /// Returns false (after rewinding) when no startxref follows.
    fn parse_trailer(&mut self) -> Result<bool> {
        let token = self.lexer.next_token()?;
        if !token.is(b"<<") {
            return Err(PdfError::InvalidTrailer {
                offset: token.offset,
            });
        }
        let enclosing = Dictionary::new();
        let dict = self.parse_dictionary(&enclosing)?;
        self.doc.trailer.extend(dict);
        trace!("trailer parsed, {} keys total", self.doc.trailer.len());

        let token = self.lexer.next_token()?;
        if !token.is(b"startxref") {
            self.lexer.source_mut().seek_to(token.offset)?;
            return Ok(false);
        }
        self.parse_startxref()?;
        Ok(true)
    }

    /// Offset line and `%%EOF` marker. The marker may run straight into
    /// the next object (`%%EOF1 0 obj`); rewind to just past it then.
    fn parse_startxref(&mut self) -> Result<()> {
        let _offset = self.lexer.next_token()?;

        let token = self.lexer.try_next_token_keep_comment()?.ok_or_else(|| {
            PdfError::InvalidTrailer {
                offset: self.lexer.source_mut().tell(),
            }
        })?;
        if !token.text.starts_with(b"%%EOF") {
            return Err(PdfError::InvalidTrailer {
                offset: token.offset,
            });
        }
        if token.text.len() > 5 {
            self.lexer.source_mut().seek_to(token.offset + 5)?;
        }
        Ok(())
    }
}

fn invalid_token(token: &Token) -> PdfError {
    PdfError::InvalidToken {
        offset: token.offset,
        token: token.to_string_lossy(),
    }
}

fn parse_decimal<T: FromStr>(token: &Token) -> Result<T> {
    std::str::from_utf8(&token.text)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_token(token))
}

/// Integer or real from a token, with the sign carried as a flag so output
/// can reproduce it. A leading `.` is normalized to `0.`.
fn token_to_number(token: &Token) -> Result<Value> {
    let (sign, digits) = match token.text.first() {
        Some(b'+') => (Some(b'+'), &token.text[1..]),
        Some(b'-') => (Some(b'-'), &token.text[1..]),
        _ => (None, &token.text[..]),
    };
    let mut text = std::str::from_utf8(digits)
        .map_err(|_| invalid_token(token))?
        .to_string();

    if text.contains('.') {
        if text.starts_with('.') {
            text.insert(0, '0');
        }
        let mut value: f64 = text.parse().map_err(|_| invalid_token(token))?;
        if sign == Some(b'-') {
            value = -value;
        }
        Ok(Value::Real {
            value,
            explicit_sign: sign.is_some(),
        })
    } else {
        let mut value: i64 = text.parse().map_err(|_| invalid_token(token))?;
        if sign == Some(b'-') {
            value = -value;
        }
        Ok(Value::Integer {
            value,
            explicit_sign: sign.is_some(),
        })
    }
}

fn parse_name(token: &Token) -> Result<Value> {
    if token.first() != Some(b'/') {
        return Err(PdfError::InvalidName {
            offset: token.offset,
        });
    }
    let text = std::str::from_utf8(&token.text).map_err(|_| PdfError::InvalidName {
        offset: token.offset,
    })?;
    Ok(Value::Name(text.to_string()))
}

/// Dictionary key: a name token with the slash stripped.
fn name_key(token: &Token) -> Result<String> {
    match parse_name(token)? {
        Value::Name(name) => Ok(name[1..].to_string()),
        _ => unreachable!(),
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
