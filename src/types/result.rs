use std::fmt;

use crate::types::{RawQueryResult, Row, Value};

/// Opaque handle to a buffered result, returned by `query` and `execute`.
///
/// The result stays alive in the client until it is passed to `free_result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResultHandle(pub(crate) u64);

impl ResultHandle {
    /// Handle of statements that produce no result set (INSERT, UPDATE, ...).
    /// Reads from it see zero rows and freeing it is a no-op.
    pub const EMPTY: ResultHandle = ResultHandle(0);

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shape of a fetched row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Keyed by column name.
    Assoc,
    /// Keyed by 0-based column index.
    Num,
    /// Both keys, interleaved.
    #[default]
    Both,
}

/// A buffered result with a read cursor.
#[derive(Debug, Clone)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    cursor: usize,
}

impl ResultSet {
    pub fn from_raw(raw: RawQueryResult) -> Self {
        Self {
            columns: raw.columns,
            rows: raw.rows,
            cursor: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> u64 {
        self.rows.len() as u64
    }

    /// Returns the row under the cursor and advances it.
    pub fn fetch(&mut self, mode: FetchMode) -> Option<Row> {
        let values = self.rows.get(self.cursor)?;
        let row = Row::from_values(&self.columns, values, mode);
        self.cursor += 1;
        Some(row)
    }

    /// Returns every row from the cursor on.
    pub fn fetch_all(&mut self, mode: FetchMode) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.rows.len().saturating_sub(self.cursor));
        while let Some(row) = self.fetch(mode) {
            rows.push(row);
        }
        rows
    }

    /// Moves the cursor to `row`. Returns false, leaving the cursor alone,
    /// if the row is out of range.
    pub fn seek(&mut self, row: u64) -> bool {
        match usize::try_from(row) {
            Ok(index) if index < self.rows.len() => {
                self.cursor = index;
                true
            }
            _ => false,
        }
    }
}
