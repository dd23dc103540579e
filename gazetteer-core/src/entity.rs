//! Tagged OSM entities as seen by the classifier and the emitter.

use std::fmt;

/// OSM object type, stored as a single character in the place table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OsmType {
    /// A node.
    Node,
    /// A way.
    Way,
    /// A relation.
    Relation,
}

impl OsmType {
    /// Place-table encoding (`N`, `W` or `R`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "N",
            Self::Way => "W",
            Self::Relation => "R",
        }
    }

    /// Inverse of [`OsmType::as_str`].
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "N" => Some(Self::Node),
            "W" => Some(Self::Way),
            "R" => Some(Self::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for OsmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object metadata columns a style can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetadataField {
    /// `osm_version`
    Version,
    /// `osm_timestamp`
    Timestamp,
    /// `osm_changeset`
    Changeset,
    /// `osm_uid`
    Uid,
    /// `osm_user`
    User,
}

impl MetadataField {
    /// All fields in column order.
    pub const ALL: [Self; 5] = [
        Self::Version,
        Self::Timestamp,
        Self::Changeset,
        Self::Uid,
        Self::User,
    ];

    /// Style key and column name of the field.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Version => "osm_version",
            Self::Timestamp => "osm_timestamp",
            Self::Changeset => "osm_changeset",
            Self::Uid => "osm_uid",
            Self::User => "osm_user",
        }
    }

    /// Resolve a style key to the field it requests.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == key)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Version => 1 << 0,
            Self::Timestamp => 1 << 1,
            Self::Changeset => 1 << 2,
            Self::Uid => 1 << 3,
            Self::User => 1 << 4,
        }
    }
}

/// Set of requested metadata fields.
///
/// Iteration always follows [`MetadataField::ALL`], so the emitted column
/// order does not depend on the order of the style file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetadataFields(u8);

impl MetadataFields {
    /// Request nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    /// Add a field to the set.
    pub fn insert(&mut self, field: MetadataField) {
        self.0 |= field.bit();
    }

    /// True when the field is requested.
    #[must_use]
    pub const fn contains(self, field: MetadataField) -> bool {
        self.0 & field.bit() != 0
    }

    /// True when nothing is requested.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Requested fields in column order.
    pub fn iter(self) -> impl Iterator<Item = MetadataField> {
        MetadataField::ALL
            .into_iter()
            .filter(move |field| self.contains(*field))
    }
}

impl FromIterator<MetadataField> for MetadataFields {
    fn from_iter<I: IntoIterator<Item = MetadataField>>(iter: I) -> Self {
        let mut fields = Self::none();
        for field in iter {
            fields.insert(field);
        }
        fields
    }
}

/// Metadata carried by an OSM object. Absent values become NULL columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityMetadata {
    /// Object version.
    pub version: Option<i64>,
    /// Last modification time as an ISO 8601 string.
    pub timestamp: Option<String>,
    /// Changeset of the last modification.
    pub changeset: Option<i64>,
    /// Id of the last editor.
    pub uid: Option<i64>,
    /// Name of the last editor.
    pub user: Option<String>,
}

/// An OSM object with its ordered tag list.
///
/// # Examples
/// ```
/// use gazetteer_core::{OsmEntity, OsmType};
///
/// let entity = OsmEntity::new(OsmType::Node, 42, [("amenity", "cafe")]);
/// assert_eq!(entity.tag("amenity"), Some("cafe"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OsmEntity {
    /// Object type.
    pub osm_type: OsmType,
    /// Object id.
    pub id: i64,
    /// Tags in source order. Keys are unique.
    pub tags: Vec<(String, String)>,
    /// Object metadata.
    pub metadata: EntityMetadata,
}

impl OsmEntity {
    /// Build an entity without metadata.
    pub fn new<I, K, V>(osm_type: OsmType, id: i64, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            osm_type,
            id,
            tags: tags
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            metadata: EntityMetadata::default(),
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EntityMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Borrowed view over the tags.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> + Clone {
        self.tags
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Value of a tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn metadata_fields_iterate_in_column_order() {
        let fields: MetadataFields = [MetadataField::User, MetadataField::Version]
            .into_iter()
            .collect();
        let columns: Vec<&str> = fields.iter().map(MetadataField::column).collect();
        assert_eq!(columns, ["osm_version", "osm_user"]);
    }

    #[rstest]
    #[case("osm_changeset", Some(MetadataField::Changeset))]
    #[case("osm_version", Some(MetadataField::Version))]
    #[case("version", None)]
    fn resolves_metadata_keys(#[case] key: &str, #[case] expected: Option<MetadataField>) {
        assert_eq!(MetadataField::from_key(key), expected);
    }

    #[rstest]
    fn type_codes_are_single_letters() {
        let codes: Vec<String> = [OsmType::Node, OsmType::Way, OsmType::Relation]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(codes, ["N", "W", "R"]);
        for code in codes {
            let parsed = OsmType::from_code(&code).map(|osm_type| osm_type.to_string());
            assert_eq!(parsed.as_deref(), Some(code.as_str()));
        }
        assert_eq!(OsmType::from_code("X"), None);
    }
}
