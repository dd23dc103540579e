//! Storage and ingestion for the gazetteer place importer.
//!
//! Responsibilities:
//! - Move place rows and deletions into SQLite on a background worker.
//! - Bind that transport to the `place` table and its schema.
//! - Drive classification for whole entities and for OSM PBF files.
//!
//! Boundaries:
//! - Do not encode tag rules (live in `gazetteer-core`).
//! - Only the copy worker touches the write connection.
//!
//! Invariants:
//! - Buffers land in the order they were handed over.
//! - Within one buffer deletions run before inserts.

mod copy;
mod ingest;
mod output;
mod place;

pub use copy::{
    CopyBuffer, CopyMgr, CopyWorker, Deleter, MAX_BUFFERED_ROWS, TargetDescr, TransportError,
};
pub use ingest::{ImportError, ImportSummary, PlaceImporter, WktGeometryBuilder, import_osm_pbf};
pub use output::{Mode, PlaceOutput, PlaceOutputError, Processed};
pub use place::{
    PLACE_ID_COLUMN, PLACE_SCHEMA, PLACE_TABLE, PlaceCopyMgr, PlaceSchemaError,
    create_place_schema, open_place_database, place_target,
};
