//! Result types returned by backends and by the executor.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One flat, column-aliased result row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TupleRow {
    /// (alias, value) pairs in projection order.
    pub columns: Vec<(String, Value)>,
}

impl TupleRow {
    /// Create a row from (alias, value) pairs.
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Append a column.
    pub fn push(&mut self, alias: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((alias.into(), value.into()));
    }

    /// Get a column value by alias.
    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.columns.iter().find(|(a, _)| a == alias).map(|(_, v)| v)
    }

    /// Number of columns in this row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Raw rows handed back by a backend for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowSet {
    /// Whole entities, as JSON documents.
    Entities(Vec<serde_json::Value>),
    /// Flat tuples.
    Tuples(Vec<TupleRow>),
    /// A row count.
    Count(u64),
}

impl RowSet {
    /// Number of rows (a count result counts as one row).
    pub fn len(&self) -> usize {
        match self {
            RowSet::Entities(rows) => rows.len(),
            RowSet::Tuples(rows) => rows.len(),
            RowSet::Count(_) => 1,
        }
    }

    /// Check if the row set holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A page of results with its totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of matching rows across all pages.
    pub total_elements: u64,
    /// Requested page size.
    pub page_size: u32,
    /// Zero-based page number.
    pub page_number: u32,
    /// Elements on this page.
    pub elements: Vec<T>,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(total_elements: u64, page_size: u32, page_number: u32, elements: Vec<T>) -> Self {
        Self {
            total_elements,
            page_size,
            page_number,
            elements,
        }
    }

    /// Total number of pages, `ceil(total_elements / page_size)`.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.page_size))
    }

    /// Check if a page follows this one.
    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) + 1 < self.total_pages()
    }

    /// Map the elements, keeping the totals.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_elements: self.total_elements,
            page_size: self.page_size,
            page_number: self.page_number,
            elements: self.elements.into_iter().map(f).collect(),
        }
    }
}
