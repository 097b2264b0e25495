/// All possible PDF syntactic values.
///
/// `Integer` and `Real` remember whether the source spelled an explicit
/// sign so output reproduces the `+` the input used. `Name` keeps its
/// leading `/` and `#xx` escapes untouched; `String` and `HexString` keep
/// their raw bodies, escapes included.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer { value: i64, explicit_sign: bool },
    Real { value: f64, explicit_sign: bool },
    Name(String),
    String(Vec<u8>),
    HexString(Vec<u8>),
    Array(Vec<Value>),
    Dictionary(Dictionary),
    Reference { id: u32, gen: u32 },
    Stream(StreamData),
}

impl Value {
    pub fn integer(value: i64) -> Self {
        Value::Integer {
            value,
            explicit_sign: false,
        }
    }

    pub fn real(value: f64) -> Self {
        Value::Real {
            value,
            explicit_sign: false,
        }
    }

    /// Build a name value; the leading `/` is added when missing.
    pub fn name(name: &str) -> Self {
        if name.starts_with('/') {
            Value::Name(name.to_string())
        } else {
            Value::Name(format!("/{}", name))
        }
    }

    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Value::String(bytes.into())
    }

    pub fn hex_string(chars: impl Into<Vec<u8>>) -> Self {
        Value::HexString(chars.into())
    }

    pub fn reference(id: u32, gen: u32) -> Self {
        Value::Reference { id, gen }
    }

    /// Stream with an in-memory body.
    pub fn stream(bytes: Vec<u8>) -> Self {
        Value::Stream(StreamData::Bytes(bytes))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real { value, .. } => Some(*value),
            Value::Integer { value, .. } => Some(*value as f64),
            _ => None,
        }
    }

    /// Name payload without the leading `/`.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(n) => Some(n.strip_prefix('/').unwrap_or(n)),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hex_string(&self) -> Option<&[u8]> {
        match self {
            Value::HexString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<(u32, u32)> {
        match self {
            Value::Reference { id, gen } => Some((*id, *gen)),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamData> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }
}

/// Stream body location.
///
/// Parsed streams reference their extent in the source file without
/// materializing bytes; streams built in memory carry their own buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    Extent { start: u64, end: u64 },
    Bytes(Vec<u8>),
}

impl StreamData {
    /// Body length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            StreamData::Extent { start, end } => end.saturating_sub(*start),
            StreamData::Bytes(b) => b.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Name-to-value mapping with stable insertion order.
///
/// Keys are stored without the leading slash. `insert` overwrites in place,
/// keeping the key's position; `remove` followed by `insert` moves it to
/// the end. The incremental writer relies on that distinction for `/Prev`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(String, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Merge another dictionary with `insert` semantics per entry.
    pub fn extend(&mut self, other: Dictionary) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut dict = Dictionary::new();
        dict.insert("A", Value::integer(1));
        dict.insert("B", Value::integer(2));
        dict.insert("A", Value::integer(3));

        let keys: Vec<&str> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(dict.get("A").and_then(Value::as_int), Some(3));
    }

    #[test]
    fn test_remove_and_insert_moves_to_end() {
        let mut dict = Dictionary::new();
        dict.insert("Prev", Value::integer(100));
        dict.insert("Size", Value::integer(9));

        dict.remove("Prev");
        dict.insert("Prev", Value::integer(200));

        let keys: Vec<&str> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Size", "Prev"]);
    }

    #[test]
    fn test_name_builder_adds_slash() {
        assert_eq!(Value::name("Type"), Value::Name("/Type".into()));
        assert_eq!(Value::name("/Type"), Value::Name("/Type".into()));
        assert_eq!(Value::name("Type").as_name(), Some("Type"));
    }

    #[test]
    fn test_stream_len() {
        let s = StreamData::Extent { start: 10, end: 13 };
        assert_eq!(s.len(), 3);
        assert_eq!(StreamData::Bytes(vec![1, 2]).len(), 2);
    }
}
