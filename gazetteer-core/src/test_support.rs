//! Test-only row sink that records emitted rows in memory.

use crate::emit::{Column, RowSink};

/// Owned copy of a [`Column`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedValue {
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Key/value map in insertion order.
    Tags(Vec<(String, String)>),
    /// SQL NULL.
    Null,
}

impl RecordedValue {
    /// Shorthand for a text value.
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_owned())
    }

    /// Shorthand for a tag map.
    pub fn tags(pairs: &[(&str, &str)]) -> Self {
        Self::Tags(
            pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        )
    }
}

impl From<Column<'_>> for RecordedValue {
    fn from(column: Column<'_>) -> Self {
        match column {
            Column::Text(value) => Self::text(value),
            Column::Integer(value) => Self::Integer(value),
            Column::Tags(pairs) => Self::tags(pairs),
            Column::Null => Self::Null,
        }
    }
}

/// [`RowSink`] that keeps every finished row.
///
/// A row left open when `prepare` is called again is discarded.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Finished rows.
    pub rows: Vec<Vec<RecordedValue>>,
    /// Number of `prepare` calls.
    pub prepared: usize,
    current: Vec<RecordedValue>,
}

impl RowSink for RecordingSink {
    type Error = std::convert::Infallible;

    fn prepare(&mut self) -> Result<(), Self::Error> {
        self.prepared += 1;
        self.current.clear();
        Ok(())
    }

    fn add_column(&mut self, column: Column<'_>) {
        self.current.push(column.into());
    }

    fn finish_row(&mut self) -> Result<(), Self::Error> {
        self.rows.push(std::mem::take(&mut self.current));
        Ok(())
    }
}
