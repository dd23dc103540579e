//! Facade crate for the gazetteer place importer.
//!
//! This crate re-exports the classification core and, behind the
//! `store-sqlite` feature, the SQLite place transport and PBF import.

#![forbid(unsafe_code)]

pub use gazetteer_core::{
    Classification, Column, DeleteBuffer, DeleteRequest, EmitSource, EntityMetadata, MainTag,
    MetadataField, MetadataFields, OsmEntity, OsmType, RowSink, Style, StyleError, StyleFlags,
    StyleRule, classify, emit_rows,
};

#[cfg(feature = "store-sqlite")]
pub use gazetteer_core::DeleteFlushError;

#[cfg(feature = "store-sqlite")]
pub use gazetteer_data::{
    ImportError, ImportSummary, Mode, PlaceCopyMgr, PlaceOutput, PlaceOutputError, Processed,
    TransportError, import_osm_pbf,
};
