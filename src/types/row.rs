use std::fmt;

use crate::types::{FetchMode, Value};

/// Driver-agnostic raw result from a statement execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<Value>>,
    /// Rows changed by an INSERT/UPDATE/DELETE
    pub affected_rows: u64,
    /// AUTO_INCREMENT id generated by the statement, 0 if none
    pub last_insert_id: u64,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            affected_rows: 0,
            last_insert_id: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Key of a row entry: a 0-based column index or a column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Index(usize),
    Name(String),
}

impl From<usize> for RowKey {
    fn from(index: usize) -> Self {
        RowKey::Index(index)
    }
}

impl From<&str> for RowKey {
    fn from(name: &str) -> Self {
        RowKey::Name(name.to_string())
    }
}

impl From<String> for RowKey {
    fn from(name: String) -> Self {
        RowKey::Name(name)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Index(i) => write!(f, "{}", i),
            RowKey::Name(name) => f.write_str(name),
        }
    }
}

/// A fetched row: an ordered mapping from keys to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(RowKey, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row in the shape requested by `mode`.
    pub(crate) fn from_values(columns: &[String], values: &[Value], mode: FetchMode) -> Self {
        let mut row = Row::new();
        for (index, value) in values.iter().enumerate() {
            if mode != FetchMode::Assoc {
                row.insert(index, value.clone());
            }
            if mode != FetchMode::Num {
                if let Some(name) = columns.get(index) {
                    row.insert(name.as_str(), value.clone());
                }
            }
        }
        row
    }

    /// Sets a value, keeping the original position when the key already exists.
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, key: impl Into<RowKey>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Gets a value by column name or index.
    pub fn get(&self, key: impl Into<RowKey>) -> Option<&Value> {
        let key = key.into();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: impl Into<RowKey>) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Returns the number of entries in this row.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if this row has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<RowKey>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (RowKey, Value);
    type IntoIter = std::vec::IntoIter<(RowKey, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
