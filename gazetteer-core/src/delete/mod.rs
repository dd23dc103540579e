//! Buffered removal of stale place rows.
//!
//! Deletions are collected here and executed in one batch. The buffer never
//! flushes on its own: [`DeleteBuffer::is_full`] tells the owner when it is
//! time to do so.

use crate::entity::OsmType;

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{DeleteFlushError, quote_identifier};

/// Occupancy above which [`DeleteBuffer::is_full`] reports true.
pub const MAX_DELETE_ENTRIES: usize = 100_000;

/// One buffered deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Object type.
    pub osm_type: OsmType,
    /// Object id.
    pub osm_id: i64,
    /// Comma-joined classes to keep, or `None` to remove every row.
    pub classes: Option<String>,
}

impl DeleteRequest {
    /// Classes to keep; empty for a full delete.
    pub fn kept_classes(&self) -> impl Iterator<Item = &str> {
        self.classes
            .as_deref()
            .into_iter()
            .flat_map(|list| list.split(','))
    }
}

/// Ordered sequence of pending deletions.
///
/// # Examples
/// ```
/// use gazetteer_core::{DeleteBuffer, OsmType};
///
/// let mut buffer = DeleteBuffer::default();
/// buffer.add(OsmType::Way, 7, "amenity,shop");
/// buffer.add_full(OsmType::Node, 3);
/// assert!(buffer.has_data());
/// assert!(!buffer.is_full());
/// assert_eq!(buffer.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct DeleteBuffer {
    requests: Vec<DeleteRequest>,
}

impl DeleteBuffer {
    /// Remove every row of the object whose class is not in `class_list`.
    ///
    /// An empty list keeps nothing, which is the same as [`Self::add_full`].
    pub fn add(&mut self, osm_type: OsmType, osm_id: i64, class_list: &str) {
        let classes = (!class_list.is_empty()).then(|| class_list.to_owned());
        self.requests.push(DeleteRequest {
            osm_type,
            osm_id,
            classes,
        });
    }

    /// Remove every row of the object.
    pub fn add_full(&mut self, osm_type: OsmType, osm_id: i64) {
        self.requests.push(DeleteRequest {
            osm_type,
            osm_id,
            classes: None,
        });
    }

    /// True when at least one deletion is pending.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.requests.is_empty()
    }

    /// True once more than [`MAX_DELETE_ENTRIES`] deletions are pending.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.requests.len() > MAX_DELETE_ENTRIES
    }

    /// Number of pending deletions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Pending deletions in insertion order.
    #[must_use]
    pub fn requests(&self) -> &[DeleteRequest] {
        &self.requests
    }

    /// True when a pending deletion targets the object.
    #[must_use]
    pub fn contains_object(&self, osm_type: OsmType, osm_id: i64) -> bool {
        self.requests
            .iter()
            .any(|request| request.osm_type == osm_type && request.osm_id == osm_id)
    }

    /// Drop every pending deletion.
    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
