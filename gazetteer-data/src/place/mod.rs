//! The copy manager bound to the place table.

use std::sync::Arc;

use gazetteer_core::{
    Column, DeleteBuffer, MetadataField, MetadataFields, OsmType, RowSink, TagRef,
};
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::copy::{CopyMgr, CopyWorker, Deleter, TargetDescr, TransportError};

mod schema;

pub use schema::{PlaceSchemaError, create_place_schema, open_place_database};

/// Schema of the place table.
pub const PLACE_SCHEMA: &str = "public";
/// Name of the place table.
pub const PLACE_TABLE: &str = "place";
/// Primary key column of the place table.
pub const PLACE_ID_COLUMN: &str = "place_id";

const BASE_COLUMNS: [&str; 10] = [
    "osm_type",
    "osm_id",
    "class",
    "type",
    "name",
    "admin_level",
    "address",
    "extratags",
    "operator",
    "geometry",
];

/// Descriptor of the place table with the requested metadata columns.
#[must_use]
pub fn place_target(fields: MetadataFields) -> TargetDescr {
    let columns = BASE_COLUMNS
        .into_iter()
        .chain(fields.iter().map(MetadataField::column));
    TargetDescr::new(PLACE_SCHEMA, PLACE_TABLE, PLACE_ID_COLUMN, columns)
        .with_conflict_key(["osm_type", "osm_id", "class"])
}

impl Deleter for DeleteBuffer {
    type Object = (OsmType, i64);

    fn has_data(&self) -> bool {
        Self::has_data(self)
    }

    fn is_full(&self) -> bool {
        Self::is_full(self)
    }

    fn row_object(row: &[Value]) -> Option<Self::Object> {
        match row {
            [Value::Text(code), Value::Integer(id), ..] => {
                OsmType::from_code(code).map(|osm_type| (osm_type, *id))
            }
            _ => None,
        }
    }

    fn delete_rows(
        &mut self,
        table: &str,
        column: &str,
        connection: &Connection,
    ) -> Result<usize, TransportError> {
        self.flush(table, column, connection)
            .map_err(|source| TransportError::Delete { source })
    }
}

/// Copy manager permanently bound to `public.place`.
///
/// [`PlaceCopyMgr::prepare`] starts each row the emitter writes.
#[derive(Debug)]
pub struct PlaceCopyMgr {
    copy: CopyMgr<DeleteBuffer>,
    target: Arc<TargetDescr>,
}

impl PlaceCopyMgr {
    /// Bind a worker to the place table.
    pub fn new(worker: CopyWorker<DeleteBuffer>, fields: MetadataFields) -> Self {
        Self {
            copy: CopyMgr::new(worker),
            target: Arc::new(place_target(fields)),
        }
    }

    /// The place table descriptor.
    #[must_use]
    pub fn target(&self) -> &TargetDescr {
        &self.target
    }

    /// Start a new place row.
    pub fn prepare(&mut self) -> Result<(), TransportError> {
        self.copy.new_line(&self.target)
    }

    /// Remove the object's rows whose class is not in `class_list`. An empty
    /// list removes every row.
    pub fn delete_object(
        &mut self,
        osm_type: OsmType,
        osm_id: i64,
        class_list: &str,
    ) -> Result<(), TransportError> {
        self.copy
            .delete_object(&self.target, &(osm_type, osm_id), |buffer| {
                buffer.add(osm_type, osm_id, class_list);
            })
    }

    /// Remove every row of the object.
    pub fn delete_all(&mut self, osm_type: OsmType, osm_id: i64) -> Result<(), TransportError> {
        self.copy
            .delete_object(&self.target, &(osm_type, osm_id), |buffer| {
                buffer.add_full(osm_type, osm_id);
            })
    }

    /// Hand buffered rows and deletions to the worker.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.copy.flush()
    }

    /// Wait until everything queued so far has landed.
    pub fn sync(&mut self) -> Result<(), TransportError> {
        self.copy.sync()
    }

    /// Write what is left and stop the worker.
    pub fn finish(self) -> Result<(), TransportError> {
        self.copy.finish()
    }
}

impl RowSink for PlaceCopyMgr {
    type Error = TransportError;

    fn prepare(&mut self) -> Result<(), Self::Error> {
        Self::prepare(self)
    }

    fn add_column(&mut self, column: Column<'_>) {
        self.copy.add_column(column_value(column));
    }

    fn finish_row(&mut self) -> Result<(), Self::Error> {
        self.copy.finish_line()
    }
}

fn column_value(column: Column<'_>) -> Value {
    match column {
        Column::Text(text) => Value::Text(text.to_owned()),
        Column::Integer(number) => Value::Integer(number),
        Column::Tags([]) | Column::Null => Value::Null,
        Column::Tags(pairs) => Value::Text(tags_json(pairs)),
    }
}

fn tags_json(pairs: &[TagRef<'_>]) -> String {
    let object: serde_json::Map<String, serde_json::Value> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), serde_json::Value::from(*value)))
        .collect();
    serde_json::Value::Object(object).to_string()
}
