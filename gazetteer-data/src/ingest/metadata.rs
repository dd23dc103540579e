//! Object metadata from PBF info blocks.

use gazetteer_core::EntityMetadata;
use osmpbf::{DenseNode, Info};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Metadata of a node, way or relation.
pub(super) fn from_info(info: &Info<'_>) -> EntityMetadata {
    EntityMetadata {
        version: info.version().map(i64::from),
        timestamp: info.milli_timestamp().and_then(format_timestamp),
        changeset: info.changeset(),
        uid: info.uid().map(i64::from),
        user: info.user().and_then(Result::ok).map(str::to_owned),
    }
}

/// Metadata of a dense node; absent when the block carries none.
pub(super) fn from_dense(node: &DenseNode<'_>) -> EntityMetadata {
    node.info()
        .map(|info| EntityMetadata {
            version: Some(i64::from(info.version())),
            timestamp: format_timestamp(info.milli_timestamp()),
            changeset: Some(info.changeset()),
            uid: Some(i64::from(info.uid())),
            user: info.user().ok().map(str::to_owned),
        })
        .unwrap_or_default()
}

/// RFC 3339 UTC timestamp, e.g. `2024-05-01T12:00:00Z`.
pub(super) fn format_timestamp(milliseconds: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(milliseconds.div_euclid(1000))
        .ok()?
        .format(&Rfc3339)
        .ok()
}
