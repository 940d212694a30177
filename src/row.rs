//! Result rows.

/// One result row: cells in column order, rendered as text, `None` for NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    /// Create a row from its cells.
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a cell's text by 0-based index. NULL and out-of-range both yield `None`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Returns true if the cell is NULL or out of range.
    pub fn is_null(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    /// All cells.
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Take ownership of the cells.
    pub fn into_values(self) -> Vec<Option<String>> {
        self.values
    }
}

impl From<Vec<Option<String>>> for Row {
    fn from(values: Vec<Option<String>>) -> Self {
        Self::new(values)
    }
}
