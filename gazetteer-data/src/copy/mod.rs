//! Bulk row transport into SQLite.
//!
//! Rows are collected per target table in a [`CopyBuffer`] together with a
//! [`Deleter`] holding the deletions that must land before them. Full buffers
//! are handed to a [`CopyWorker`] thread which writes each one in its own
//! transaction, deletions first.

use std::hash::Hash;
use std::sync::Arc;

use gazetteer_core::{DeleteFlushError, quote_identifier};
use rusqlite::Connection;
use rusqlite::types::Value;
use thiserror::Error;

mod manager;
mod worker;

pub use manager::{CopyMgr, MAX_BUFFERED_ROWS};
pub use worker::CopyWorker;

/// Errors raised by the copy transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A statement failed on the worker connection.
    #[error("SQLite failure while trying to {operation}")]
    Sqlite {
        /// What the worker was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Buffered deletions could not be executed.
    #[error("failed to execute buffered deletions")]
    Delete {
        /// Underlying flush failure.
        #[source]
        source: DeleteFlushError,
    },
    /// The worker thread could not be started.
    #[error("failed to spawn the copy worker thread")]
    WorkerSpawn {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The worker thread stopped accepting commands.
    #[error("the copy worker is no longer running")]
    WorkerGone,
    /// The worker thread panicked.
    #[error("the copy worker panicked")]
    WorkerPanicked,
    /// A row had the wrong number of columns.
    #[error("row for {table} has {found} columns, expected {expected}")]
    ColumnCount {
        /// Target table.
        table: String,
        /// Columns declared by the target.
        expected: usize,
        /// Columns supplied.
        found: usize,
    },
    /// A row was finished without being started.
    #[error("no row is open")]
    NoOpenLine,
}

impl TransportError {
    pub(crate) fn sqlite(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Sqlite { operation, source }
    }
}

/// Description of a table rows are copied into.
///
/// # Examples
/// ```
/// use gazetteer_data::TargetDescr;
///
/// let target = TargetDescr::new("public", "place", "place_id", ["osm_id", "class"]);
/// assert_eq!(target.qualified_name(), "\"main\".\"place\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescr {
    schema: String,
    name: String,
    id_column: String,
    columns: Vec<String>,
    conflict_columns: Vec<String>,
}

impl TargetDescr {
    /// Describe a table and the columns every row supplies, in order.
    pub fn new<I, C>(
        schema: impl Into<String>,
        name: impl Into<String>,
        id_column: impl Into<String>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            schema: schema.into(),
            name: name.into(),
            id_column: id_column.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            conflict_columns: Vec::new(),
        }
    }

    /// Turn inserts into upserts on the given unique key.
    #[must_use]
    pub fn with_conflict_key<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.conflict_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Schema name. `public` is SQLite's `main` schema.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key column.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Columns supplied by each row.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True when both descriptors address the same table.
    #[must_use]
    pub fn same_copy_target(&self, other: &Self) -> bool {
        self.schema == other.schema && self.name == other.name
    }

    fn sqlite_schema(&self) -> &str {
        if self.schema == "public" {
            "main"
        } else {
            &self.schema
        }
    }

    /// Schema-qualified, quoted table name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(self.sqlite_schema()),
            quote_identifier(&self.name)
        )
    }

    pub(crate) fn insert_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_name(),
            columns.join(", "),
            placeholders.join(", ")
        );
        if self.conflict_columns.is_empty() {
            return sql;
        }

        let key: Vec<String> = self
            .conflict_columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect();
        let updates: Vec<String> = self
            .columns
            .iter()
            .filter(|column| !self.conflict_columns.contains(column))
            .map(|column| {
                let quoted = quote_identifier(column);
                format!("{quoted} = excluded.{quoted}")
            })
            .collect();
        sql.push_str(&format!(" ON CONFLICT ({}) DO ", key.join(", ")));
        if updates.is_empty() {
            sql.push_str("NOTHING");
        } else {
            sql.push_str(&format!("UPDATE SET {}", updates.join(", ")));
        }
        sql
    }
}

/// Pending deletions that accompany a [`CopyBuffer`].
pub trait Deleter: Default + Send + 'static {
    /// Identity of the object a row or deletion belongs to.
    type Object: Eq + Hash;

    /// True when deletions are pending.
    fn has_data(&self) -> bool;

    /// True when the owner should hand the buffer to the worker.
    fn is_full(&self) -> bool;

    /// Object a finished row belongs to, if it can be told.
    fn row_object(row: &[Value]) -> Option<Self::Object>;

    /// Execute the pending deletions on `table`, keyed by `column`.
    fn delete_rows(
        &mut self,
        table: &str,
        column: &str,
        connection: &Connection,
    ) -> Result<usize, TransportError>;
}

/// Rows for one target plus the deletions to run before them.
#[derive(Debug)]
pub struct CopyBuffer<D> {
    target: Arc<TargetDescr>,
    rows: Vec<Vec<Value>>,
    deleter: D,
}

impl<D: Deleter> CopyBuffer<D> {
    /// Empty buffer for `target`.
    pub fn new(target: Arc<TargetDescr>) -> Self {
        Self {
            target,
            rows: Vec::new(),
            deleter: D::default(),
        }
    }

    /// Destination table.
    pub fn target(&self) -> &TargetDescr {
        &self.target
    }

    /// Buffered rows.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of buffered rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Pending deletions.
    pub fn deleter(&self) -> &D {
        &self.deleter
    }

    /// Pending deletions, mutably.
    pub fn deleter_mut(&mut self) -> &mut D {
        &mut self.deleter
    }

    /// True when there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && !self.deleter.has_data()
    }

    pub(crate) fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }
}
