use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::types::{Dictionary, Object, StreamData, Value};

/// Four high bytes after the header line, marking the file as binary.
const BINARY_MARKER: &[u8] = &[0xE2, 0xE3, 0xCF, 0xD3];

impl Document {
    /// Write the document to `path`. With `update` only objects added
    /// since parsing are appended as an incremental update; otherwise a
    /// full PDF is emitted.
    pub fn write<P: AsRef<Path>>(&mut self, path: P, update: bool) -> Result<()> {
        if update {
            self.write_update(path.as_ref())
        } else {
            self.write_full(path.as_ref())
        }
    }

    /// Full PDF: header, every object in list order, xref, trailer,
    /// startxref.
    fn write_full(&mut self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| PdfError::UnableToOpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = CountingWriter::new(file, 0);

        out.write_bytes(format!("%PDF-{}.{}\r%", self.version.0, self.version.1).as_bytes())?;
        out.write_bytes(BINARY_MARKER)?;
        out.write_bytes(b"\r\n")?;

        let mut xref: Vec<u8> = b"xref\n0 1 f\r\n0000000000 65535 f\r\n".to_vec();
        let mut nb_objects: i64 = 1;

        let Document {
            objects, source, ..
        } = &mut *self;
        for object in objects.iter() {
            let offset = out.offset();
            let bytes = serialize_object(object, source.as_mut())?;
            out.write_bytes(&bytes)?;
            push_xref_section(&mut xref, object, offset, object.used());
            nb_objects += 1;
        }

        let new_xref_offset = out.offset();
        out.write_bytes(&xref)?;

        self.trailer.remove("Prev");
        self.trailer.remove("Size");
        self.trailer.insert("Size", Value::integer(nb_objects));
        self.trailer.remove("XRefStm");

        out.write_bytes(b"trailer\n")?;
        let mut trailer = Vec::new();
        append_dictionary(&mut trailer, &self.trailer, None)?;
        out.write_bytes(&trailer)?;
        out.write_bytes(format!("startxref\n{}\n%%EOF", new_xref_offset).as_bytes())?;

        debug!(
            "full write of {} objects to {}, xref at {}",
            nb_objects - 1,
            path.display(),
            new_xref_offset
        );
        Ok(())
    }

    /// Incremental update: append the new objects, an xref section over
    /// them, and a trailer whose `Prev` chains to the previous xref.
    fn write_update(&mut self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| PdfError::UnableToOpenFile {
                path: path.to_path_buf(),
                source,
            })?;

        if !self.objects.iter().any(Object::is_new) {
            debug!("no new objects, {} left untouched", path.display());
            return Ok(());
        }

        let end = file.seek(SeekFrom::End(0))?;
        let mut out = CountingWriter::new(file, end);
        out.write_bytes(b"\r")?;

        let mut xref: Vec<u8> = b"xref\n".to_vec();
        let mut nb_new = 0;

        let Document {
            objects, source, ..
        } = &mut *self;
        for object in objects.iter().filter(|o| o.is_new()) {
            let offset = out.offset();
            let bytes = serialize_object(object, source.as_mut())?;
            out.write_bytes(&bytes)?;
            push_xref_section(&mut xref, object, offset, true);
            nb_new += 1;
        }

        let new_xref_offset = out.offset();
        out.write_bytes(&xref)?;

        // Re-add Prev so it lands last in the trailer
        self.trailer.remove("Prev");
        self.trailer
            .insert("Prev", Value::integer(self.xref_offset as i64));

        out.write_bytes(b"trailer\n")?;
        let mut trailer = Vec::new();
        append_dictionary(&mut trailer, &self.trailer, None)?;
        out.write_bytes(&trailer)?;
        out.write_bytes(format!("startxref\n{}\n%%EOF", new_xref_offset).as_bytes())?;

        debug!(
            "appended {} objects to {}, xref at {}",
            nb_new,
            path.display(),
            new_xref_offset
        );
        Ok(())
    }
}

/// Output sink that tracks the byte offset for xref bookkeeping.
struct CountingWriter<W> {
    inner: W,
    offset: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W, offset: u64) -> Self {
        Self { inner, offset }
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }
}

/// One single-entry xref subsection for `object` at `offset`.
fn push_xref_section(xref: &mut Vec<u8>, object: &Object, offset: u64, used: bool) {
    xref.extend_from_slice(format!("{} 1\n", object.id()).as_bytes());
    let kind = if used { 'n' } else { 'f' };
    // The \r terminator is load-bearing for many readers
    xref.extend_from_slice(
        format!("{:010} {:05} {}\r\n", offset, object.generation(), kind).as_bytes(),
    );
}

/// Serialize one indirect object, copying stream extents through from the
/// source file.
pub(crate) fn serialize_object(
    object: &Object,
    mut source: Option<&mut File>,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("{} {} obj\n", object.id(), object.generation()).as_bytes());
    if let Some(offset) = object.indirect_offset() {
        out.extend_from_slice(format!("   {}\n", offset).as_bytes());
    } else {
        if !object.dictionary().is_empty() {
            append_dictionary(&mut out, object.dictionary(), source.as_deref_mut())?;
        }
        for value in object.data() {
            append_value(&mut out, value, source.as_deref_mut())?;
        }
        if !object.data().is_empty() {
            out.push(b'\n');
        }
    }
    out.extend_from_slice(b"endobj\n");
    Ok(out)
}

fn append_dictionary(
    out: &mut Vec<u8>,
    dict: &Dictionary,
    mut source: Option<&mut File>,
) -> Result<()> {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b'/');
        out.extend_from_slice(key.as_bytes());
        append_value(out, value, source.as_deref_mut())?;
    }
    out.extend_from_slice(b">>\n");
    Ok(())
}

/// Serialize one value. Numbers, booleans, null, and references lead with
/// a space; the other forms are self-delimiting.
fn append_value(out: &mut Vec<u8>, value: &Value, mut source: Option<&mut File>) -> Result<()> {
    match value {
        Value::Null => out.extend_from_slice(b" null"),
        Value::Boolean(true) => out.extend_from_slice(b" true"),
        Value::Boolean(false) => out.extend_from_slice(b" false"),
        Value::Integer {
            value,
            explicit_sign,
        } => {
            out.push(b' ');
            if *explicit_sign && *value >= 0 {
                out.push(b'+');
            }
            out.extend_from_slice(value.to_string().as_bytes());
        }
        Value::Real {
            value,
            explicit_sign,
        } => {
            out.push(b' ');
            if *explicit_sign && *value >= 0.0 {
                out.push(b'+');
            }
            out.extend_from_slice(format_real(*value).as_bytes());
        }
        Value::Name(name) => out.extend_from_slice(name.as_bytes()),
        Value::String(body) => {
            out.push(b'(');
            out.extend_from_slice(body);
            out.push(b')');
        }
        Value::HexString(body) => {
            out.push(b'<');
            out.extend_from_slice(body);
            out.push(b'>');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                append_value(out, item, source.as_deref_mut())?;
            }
            out.push(b']');
        }
        Value::Dictionary(dict) => append_dictionary(out, dict, source)?,
        Value::Reference { id, gen } => {
            out.extend_from_slice(format!(" {} {} R", id, gen).as_bytes());
        }
        Value::Stream(data) => {
            out.extend_from_slice(b"stream\n");
            match data {
                StreamData::Bytes(bytes) => out.extend_from_slice(bytes),
                StreamData::Extent { start, end } => {
                    let Some(file) = source.as_deref_mut() else {
                        return Err(PdfError::Io(io::Error::new(
                            io::ErrorKind::Other,
                            "stream body source is no longer open",
                        )));
                    };
                    copy_extent(file, *start, *end, out)?;
                }
            }
            out.extend_from_slice(b"\nendstream\n");
        }
    }
    Ok(())
}

/// Copy `end - start` bytes of a parsed stream body out of the source.
fn copy_extent(file: &mut File, start: u64, end: u64, out: &mut Vec<u8>) -> Result<()> {
    let len = end.saturating_sub(start) as usize;
    file.seek(SeekFrom::Start(start))?;
    let mut body = vec![0u8; len];
    file.read_exact(&mut body)?;
    out.extend_from_slice(&body);
    Ok(())
}

/// Decimal text for a real: no exponent, trailing zeros trimmed, whole
/// values keep one decimal so they re-parse as reals.
fn format_real(value: f64) -> String {
    if value == value.floor() && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        let text = format!("{:.6}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn value_bytes(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        append_value(&mut out, value, None).unwrap();
        out
    }

    #[test_case(0.5, "0.5"; "fraction")]
    #[test_case(3.5, "3.5"; "mixed")]
    #[test_case(3.0, "3.0"; "whole keeps decimal")]
    #[test_case(-0.25, "-0.25"; "negative")]
    #[test_case(1.25e-3, "0.00125"; "small no exponent")]
    fn test_format_real(value: f64, expected: &str) {
        assert_eq!(format_real(value), expected);
    }

    #[test_case(Value::integer(7), b" 7"; "integer")]
    #[test_case(Value::Integer { value: 7, explicit_sign: true }, b" +7"; "plus sign kept")]
    #[test_case(Value::Integer { value: -7, explicit_sign: true }, b" -7"; "negative integer")]
    #[test_case(Value::real(0.5), b" 0.5"; "real")]
    #[test_case(Value::Null, b" null"; "null")]
    #[test_case(Value::Boolean(true), b" true"; "boolean")]
    #[test_case(Value::reference(1, 0), b" 1 0 R"; "reference")]
    #[test_case(Value::name("Type"), b"/Type"; "name")]
    #[test_case(Value::string(*b"s"), b"(s)"; "literal string")]
    #[test_case(Value::hex_string(*b"4142"), b"<4142>"; "hex string")]
    fn test_value_forms(value: Value, expected: &[u8]) {
        assert_eq!(value_bytes(&value), expected);
    }

    #[test]
    fn test_array_form() {
        let value = Value::Array(vec![
            Value::integer(1),
            Value::name("N"),
            Value::string(*b"s"),
        ]);
        assert_eq!(value_bytes(&value), b"[ 1 /N (s)]");
    }

    #[test]
    fn test_dictionary_form() {
        let mut dict = Dictionary::new();
        dict.insert("A", Value::integer(1));
        dict.insert("B", Value::name("X"));
        let value = Value::Dictionary(dict);
        assert_eq!(value_bytes(&value), b"<</A 1/B/X>>\n");
    }

    #[test]
    fn test_object_form() {
        let mut object = Object::new(1, 0);
        object.dictionary_mut().insert("A", Value::integer(1));
        let bytes = serialize_object(&object, None).unwrap();
        assert_eq!(bytes, b"1 0 obj\n<</A 1>>\nendobj\n");
    }

    #[test]
    fn test_object_with_data_closes_line() {
        let mut object = Object::new(2, 0);
        object.push_value(Value::Null);
        let bytes = serialize_object(&object, None).unwrap();
        assert_eq!(bytes, b"2 0 obj\n null\nendobj\n");
    }

    #[test]
    fn test_indirect_object_form() {
        let mut object = Object::new(3, 0);
        object.set_indirect_offset(117);
        let bytes = serialize_object(&object, None).unwrap();
        assert_eq!(bytes, b"3 0 obj\n   117\nendobj\n");
    }

    #[test]
    fn test_stream_bytes_form() {
        let mut object = Object::new(4, 0);
        object.dictionary_mut().insert("Length", Value::integer(3));
        object.push_value(Value::stream(b"abc".to_vec()));
        let bytes = serialize_object(&object, None).unwrap();
        assert_eq!(
            bytes,
            b"4 0 obj\n<</Length 3>>\nstream\nabc\nendstream\n\nendobj\n".as_slice()
        );
    }

    #[test]
    fn test_xref_section_widths() {
        let mut xref = Vec::new();
        push_xref_section(&mut xref, &Object::new(42, 0), 7, true);
        assert_eq!(xref, b"42 1\n0000000007 00000 n\r\n");

        let mut free = Vec::new();
        push_xref_section(&mut free, &Object::new(5, 3), 0, false);
        assert_eq!(free, b"5 1\n0000000000 00003 f\r\n");
    }

    use crate::document::Document;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    // xref keyword sits at offset 41: 9 header bytes + 32 object bytes.
    const BASE: &[u8] = b"%PDF-1.4\n\
1 0 obj<</Type /Catalog>>endobj\n\
xref\n\
0 2\n\
0000000000 65535 f \n\
0000000009 00000 n \n\
trailer\n\
<</Size 2/Root 1 0 R>>\n\
startxref\n\
41\n\
%%EOF";

    #[test]
    fn test_full_write_layout() {
        let mut doc = Document::new();
        let mut object = Object::new(1, 0);
        object.dictionary_mut().insert("A", Value::integer(1));
        doc.add_object(object);

        let out = NamedTempFile::new().unwrap();
        doc.write(out.path(), false).unwrap();
        let bytes = std::fs::read(out.path()).unwrap();

        let mut expected = b"%PDF-1.4\r%\xE2\xE3\xCF\xD3\r\n".to_vec();
        let obj_offset = expected.len();
        expected.extend_from_slice(b"1 0 obj\n<</A 1>>\nendobj\n");
        let xref_offset = expected.len();
        expected.extend_from_slice(b"xref\n0 1 f\r\n0000000000 65535 f\r\n1 1\n");
        expected.extend_from_slice(format!("{:010} 00000 n\r\n", obj_offset).as_bytes());
        expected.extend_from_slice(b"trailer\n<</Size 2>>\n");
        expected.extend_from_slice(format!("startxref\n{}\n%%EOF", xref_offset).as_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_incremental_update_layout() {
        let file = write_temp(BASE);
        let mut doc = Document::new();
        doc.parse(file.path()).unwrap();
        assert_eq!(doc.xref_offset(), 41);

        let mut object = Object::new(42, 0);
        object.dictionary_mut().insert("Type", Value::name("Annot"));
        doc.add_object(object);

        doc.write(file.path(), true).unwrap();
        let bytes = std::fs::read(file.path()).unwrap();

        let mut expected = BASE.to_vec();
        expected.push(b'\r');
        let obj_offset = expected.len();
        expected.extend_from_slice(b"42 0 obj\n<</Type/Annot>>\nendobj\n");
        let new_xref = expected.len();
        expected.extend_from_slice(b"xref\n42 1\n");
        expected.extend_from_slice(format!("{:010} 00000 n\r\n", obj_offset).as_bytes());
        expected.extend_from_slice(b"trailer\n<</Size 2/Root 1 0 R/Prev 41>>\n");
        expected.extend_from_slice(format!("startxref\n{}\n%%EOF", new_xref).as_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_update_reparses_with_prev_chain() {
        let file = write_temp(BASE);
        let mut doc = Document::new();
        doc.parse(file.path()).unwrap();

        let mut object = Object::new(42, 0);
        object.push_value(Value::string(*b"touched"));
        doc.add_object(object);
        doc.write(file.path(), true).unwrap();

        let mut reparsed = Document::new();
        reparsed.parse(file.path()).unwrap();

        let object = reparsed.get_object(42, 0).unwrap();
        assert_eq!(object.data(), &[Value::string(*b"touched")]);
        assert!(object.used());
        assert_eq!(
            reparsed.trailer().get("Prev").and_then(Value::as_int),
            Some(41)
        );
        // The update's xref records the object where it actually landed.
        let entry = reparsed.xref().iter().find(|e| e.id == 42).unwrap();
        assert_eq!(entry.offset, object.offset());
    }

    #[test]
    fn test_update_without_new_objects_is_noop() {
        let file = write_temp(BASE);
        let mut doc = Document::new();
        doc.parse(file.path()).unwrap();

        doc.write(file.path(), true).unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), BASE);
    }

    #[test]
    fn test_stream_copy_through() {
        let base = b"%PDF-1.4\n\
1 0 obj<</Length 3>>stream\nabc\nendstream\nendobj\n";
        let file = write_temp(base);
        let mut doc = Document::new();
        doc.parse(file.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        doc.write(out.path(), false).unwrap();
        let bytes = std::fs::read(out.path()).unwrap();

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("stream\nabc\nendstream\n"));

        // The copied body re-parses to the same 3-byte extent.
        let mut reparsed = Document::new();
        reparsed.parse(out.path()).unwrap();
        match reparsed.get_object(1, 0).unwrap().data() {
            [Value::Stream(StreamData::Extent { start, end })] => assert_eq!(end - start, 3),
            other => panic!("expected stream extent, got {:?}", other),
        }
    }

    #[test]
    fn test_full_write_round_trip() {
        let base = b"%PDF-1.4\n\
1 0 obj<</Type /Catalog /Pages 2 0 R>>endobj\n\
2 0 obj\n[+1 -2 3.5 /Name (s) <4142> true null]\nendobj\n\
xref\n\
0 3\n\
0000000000 65535 f \n\
0000000009 00000 n \n\
0000000054 00000 n \n\
trailer\n\
<</Size 3/Root 1 0 R>>\n\
startxref\n\
108\n\
%%EOF";
        let file = write_temp(base);
        let mut doc = Document::new();
        doc.parse(file.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        doc.write(out.path(), false).unwrap();

        let mut reparsed = Document::new();
        reparsed.parse(out.path()).unwrap();

        assert_eq!(reparsed.objects().len(), doc.objects().len());
        for object in doc.objects() {
            let other = reparsed
                .get_object(object.id(), object.generation())
                .unwrap();
            assert_eq!(other.dictionary(), object.dictionary());
            assert_eq!(other.data(), object.data());
            assert_eq!(other.used(), object.used());
        }
        for (key, value) in doc.trailer().iter() {
            if matches!(key, "Size" | "Prev" | "XRefStm") {
                continue;
            }
            assert_eq!(reparsed.trailer().get(key), Some(value));
        }
    }
}
