//! Row emission: one place row per surviving main pair.

use crate::classify::{Classification, TagRef};
use crate::entity::{EntityMetadata, MetadataField, MetadataFields, OsmType};

/// A single column value handed to a [`RowSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<'a> {
    /// Text value.
    Text(&'a str),
    /// Integer value.
    Integer(i64),
    /// Key/value map (name, address and extra tags). Sinks store an empty
    /// map as NULL.
    Tags(&'a [TagRef<'a>]),
    /// SQL NULL.
    Null,
}

impl<'a> Column<'a> {
    fn optional_text(value: Option<&'a str>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }

    fn optional_integer(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

/// Destination of emitted place rows.
///
/// Column order per row: `osm_type`, `osm_id`, `class`, `type`, `name`,
/// `admin_level`, `address`, `extratags`, `operator`, `geometry`, then the
/// requested metadata columns in [`MetadataField::ALL`] order.
pub trait RowSink {
    /// Error raised when a finished row cannot be handed on.
    type Error;

    /// Start a new row on the place table.
    fn prepare(&mut self) -> Result<(), Self::Error>;

    /// Append the next column of the current row.
    fn add_column(&mut self, column: Column<'_>);

    /// Close the current row.
    fn finish_row(&mut self) -> Result<(), Self::Error>;
}

/// Identity plus metadata of the entity being emitted.
#[derive(Debug, Clone, Copy)]
pub struct EmitSource<'a> {
    /// Object type.
    pub osm_type: OsmType,
    /// Object id.
    pub osm_id: i64,
    /// Object metadata.
    pub metadata: &'a EntityMetadata,
    /// Metadata columns to write.
    pub fields: MetadataFields,
}

/// Write one row per surviving main pair, in classification order.
///
/// Returns the number of rows written. The first row is the entity's
/// primary classification.
pub fn emit_rows<S: RowSink>(
    source: EmitSource<'_>,
    geometry: &str,
    classification: &Classification<'_>,
    sink: &mut S,
) -> Result<usize, S::Error> {
    for main in classification.main_tags() {
        sink.prepare()?;
        sink.add_column(Column::Text(source.osm_type.as_str()));
        sink.add_column(Column::Integer(source.osm_id));
        sink.add_column(Column::Text(main.class));
        sink.add_column(Column::Text(main.kind));
        sink.add_column(Column::Tags(classification.names()));
        sink.add_column(Column::Integer(i64::from(classification.admin_level())));
        sink.add_column(Column::Tags(classification.address()));
        sink.add_column(Column::Tags(classification.extra()));
        sink.add_column(Column::optional_text(classification.operator()));
        sink.add_column(Column::Text(geometry));
        for field in source.fields.iter() {
            sink.add_column(metadata_column(source.metadata, field));
        }
        sink.finish_row()?;
    }
    Ok(classification.main_tags().len())
}

fn metadata_column(metadata: &EntityMetadata, field: MetadataField) -> Column<'_> {
    match field {
        MetadataField::Version => Column::optional_integer(metadata.version),
        MetadataField::Timestamp => Column::optional_text(metadata.timestamp.as_deref()),
        MetadataField::Changeset => Column::optional_integer(metadata.changeset),
        MetadataField::Uid => Column::optional_integer(metadata.uid),
        MetadataField::User => Column::optional_text(metadata.user.as_deref()),
    }
}
