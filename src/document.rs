use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;

use crate::error::{PdfError, Result};
use crate::parser::Parser;
use crate::source::ByteSource;
use crate::types::{Dictionary, Object, XRefEntry};

/// A PDF document: the ordered object list, the trailer dictionary, the
/// cross-reference table, and the file version.
///
/// The source file stays open after `parse` so that stream bodies recorded
/// as extents can be copied through on write. Dropping the document closes
/// it.
#[derive(Debug)]
pub struct Document {
    pub(crate) objects: Vec<Object>,
    pub(crate) trailer: Dictionary,
    pub(crate) xref: Vec<XRefEntry>,
    pub(crate) xref_offset: u64,
    pub(crate) version: (u8, u8),
    pub(crate) source: Option<File>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            trailer: Dictionary::new(),
            xref: Vec::new(),
            xref_offset: 0,
            version: (1, 4),
            source: None,
        }
    }

    /// Parse `path` into this document, replacing any previous contents.
    pub fn parse<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PdfError::UnableToOpenFile {
            path: path.to_path_buf(),
            source,
        })?;

        self.objects.clear();
        self.trailer = Dictionary::new();
        self.xref.clear();
        self.xref_offset = 0;
        self.version = (1, 4);
        self.source = None;

        let reader = Parser::new(ByteSource::new(BufReader::new(file)), self).parse()?;
        self.source = Some(reader.into_inner());
        debug!(
            "parsed {}: {} objects, {} xref entries",
            path.display(),
            self.objects.len(),
            self.xref.len()
        );
        Ok(())
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut Vec<Object> {
        &mut self.objects
    }

    /// Add an object. Objects built with `Object::new` carry the new flag
    /// and are picked up by incremental writes.
    pub fn add_object(&mut self, object: Object) {
        self.objects.push(object);
    }

    pub fn get_object(&self, id: u32, gen: u32) -> Option<&Object> {
        self.objects
            .iter()
            .find(|o| o.id() == id && o.generation() == gen)
    }

    pub fn get_object_mut(&mut self, id: u32, gen: u32) -> Option<&mut Object> {
        self.objects
            .iter_mut()
            .find(|o| o.id() == id && o.generation() == gen)
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    pub fn set_version(&mut self, major: u8, minor: u8) {
        self.version = (major, minor);
    }

    pub fn xref(&self) -> &[XRefEntry] {
        &self.xref
    }

    /// Offset of the last xref table seen during parse; incremental writes
    /// chain their trailer's `Prev` to it.
    pub fn xref_offset(&self) -> u64 {
        self.xref_offset
    }
}
