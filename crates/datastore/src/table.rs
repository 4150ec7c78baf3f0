//! Tabular Query Results
//!
//! A small column-named row store for query results, plus a parser for the
//! annotated CSV bodies returned by the store's query endpoint.

use chrono::{DateTime, Utc};
use std::fmt;

/// Column name carrying the row timestamp
pub const TIME_COLUMN: &str = "_time";

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String cell (tags, identifiers)
    Str(String),
    /// Numeric cell (fields)
    Float(f64),
    /// Timestamp cell
    Time(DateTime<Utc>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Parse a raw CSV cell into the narrowest matching value
    fn parse(raw: &str) -> Value {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
            return Value::Time(t.with_timezone(&Utc));
        }
        Value::Str(raw.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Float(v) => write!(f, "{}", v),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// Ordered rows with named columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. The row must have one value per column.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column name)
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Copy of the first `limit` rows
    pub fn head(&self, limit: usize) -> DataTable {
        DataTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    /// Parse an annotated CSV body from the query endpoint.
    ///
    /// Annotation rows (`#datatype`, `#group`, `#default`) are skipped; the
    /// first unannotated row of a block is the header. Blocks after a blank
    /// line are appended when their header matches the first block.
    pub fn from_annotated_csv(body: &str) -> DataTable {
        let mut table = DataTable::default();
        let mut expect_header = true;
        for line in body.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                expect_header = true;
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            let cells = split_csv_line(line);
            if expect_header {
                expect_header = false;
                if table.columns.is_empty() {
                    table.columns = cells;
                } else if table.columns != cells {
                    // Mismatched follow-up block; nothing sensible to merge.
                    break;
                }
                continue;
            }
            let row: Vec<Value> = cells.iter().map(|c| Value::parse(c)).collect();
            if row.len() == table.columns.len() {
                table.rows.push(row);
            }
        }
        table
    }
}

/// Split one CSV line, honouring double-quoted cells and `""` escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    cells.push(current);
    cells
}
