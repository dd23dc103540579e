//! Core of the gazetteer place importer.
//!
//! A [`Style`] maps tags to [`StyleFlags`]. [`classify`] applies it to one
//! entity and returns a [`Classification`], which [`emit_rows`] turns into
//! place rows on a [`RowSink`]. Rows an entity no longer produces are
//! removed through a [`DeleteBuffer`].
//!
//! Nothing here performs I/O apart from [`Style::load`] and, with the
//! `store-sqlite` feature, [`DeleteBuffer::flush`].

#![cfg_attr(docsrs, feature(doc_cfg))]

mod classify;
mod delete;
mod emit;
mod entity;
mod flags;
mod style;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use classify::{Classification, MainTag, TagRef, classify};
pub use delete::{DeleteBuffer, DeleteRequest, MAX_DELETE_ENTRIES};
#[cfg(feature = "store-sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "store-sqlite")))]
pub use delete::{DeleteFlushError, quote_identifier};
pub use emit::{Column, EmitSource, RowSink, emit_rows};
pub use entity::{EntityMetadata, MetadataField, MetadataFields, OsmEntity, OsmType};
pub use flags::StyleFlags;
pub use style::{MAX_ADMIN_LEVEL, MatcherKind, Style, StyleError, StyleRule};
