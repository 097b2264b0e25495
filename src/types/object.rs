use crate::types::value::{Dictionary, Value};

/// Indirect object: `N G obj ... endobj`.
///
/// The body is a dictionary (possibly empty) plus an ordered list of
/// additional values. An object whose `indirect_offset` is set is an
/// object-stream reference and carries no other content.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    id: u32,
    gen: u32,
    offset: u64,
    dict: Dictionary,
    data: Vec<Value>,
    indirect_offset: Option<i64>,
    used: bool,
    new: bool,
}

impl Object {
    /// Externally constructed object; will be picked up by incremental
    /// writes.
    pub fn new(id: u32, gen: u32) -> Self {
        Self {
            id,
            gen,
            offset: 0,
            dict: Dictionary::new(),
            data: Vec::new(),
            indirect_offset: None,
            used: true,
            new: true,
        }
    }

    /// Object materialized by the parser at the given body offset.
    pub(crate) fn parsed(id: u32, gen: u32, offset: u64) -> Self {
        let mut object = Self::new(id, gen);
        object.offset = offset;
        object.new = false;
        object
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn generation(&self) -> u32 {
        self.gen
    }

    /// Byte offset of the object in the source file (0 for new objects).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub fn push_value(&mut self, value: Value) {
        self.data.push(value);
    }

    pub fn indirect_offset(&self) -> Option<i64> {
        self.indirect_offset
    }

    pub fn set_indirect_offset(&mut self, offset: i64) {
        self.indirect_offset = Some(offset);
    }

    /// True for object-stream references.
    pub fn is_indirect(&self) -> bool {
        self.indirect_offset.is_some()
    }

    pub fn used(&self) -> bool {
        self.used
    }

    pub fn set_used(&mut self, used: bool) {
        self.used = used;
    }

    /// True when the object was added after parsing; incremental writes
    /// emit only these.
    pub fn is_new(&self) -> bool {
        self.new
    }
}

/// Cross-reference table entry, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    pub id: u32,
    pub offset: u64,
    pub gen: u32,
    pub used: bool,
}
