//! In-memory document tree for the save markup dialect.

/// A parsed markup value.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Dict(Dict),
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl Node {
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Node::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Node::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn into_dict(self) -> Option<Dict> {
        match self {
            Node::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Node::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Coerces a scalar to an integer the way the game's tooling does:
    /// text is parsed leniently, reals truncate, anything else is zero.
    pub fn coerce_integer(&self) -> i64 {
        match self {
            Node::Integer(value) => *value,
            Node::Text(text) => lenient_int(text),
            Node::Real(value) if value.is_finite() => value.trunc() as i64,
            _ => 0,
        }
    }
}

impl From<Dict> for Node {
    fn from(value: Dict) -> Self {
        Node::Dict(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Integer(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Real(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

/// Insertion-ordered mapping with unique keys.
///
/// Entry tables are display-ordered, so order is part of the document and
/// must survive a parse/build cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(String, Node)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts at the end, or replaces in place when the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Inserts at the front; an existing entry with the same key is removed first.
    pub fn insert_front(&mut self, key: impl Into<String>, value: impl Into<Node>) {
        let key = key.into();
        self.remove(&key);
        self.entries.insert(0, (key, value.into()));
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Node)> {
        self.entries
            .iter_mut()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl IntoIterator for Dict {
    type Item = (String, Node);
    type IntoIter = std::vec::IntoIter<(String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Node>> FromIterator<(K, V)> for Dict {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut dict = Dict::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}

/// Parses a leading optionally-signed run of decimal digits, ignoring
/// surrounding whitespace and any trailing garbage. Returns 0 when no digits
/// lead the text or the value overflows.
pub fn lenient_int(text: &str) -> i64 {
    let trimmed = text.trim();
    let digits_start = usize::from(trimmed.starts_with(['-', '+']));
    let digits_len = trimmed[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return 0;
    }
    trimmed[..digits_start + digits_len].parse().unwrap_or(0)
}
