//! Place import from OSM PBF files.

use std::path::{Path, PathBuf};

use gazetteer_core::{EntityMetadata, OsmEntity, OsmType};
use log::{info, warn};
use osmpbf::{Element, ElementReader};
use thiserror::Error;

use crate::output::{Mode, PlaceOutput, PlaceOutputError, Processed};

mod geometry;
mod metadata;

pub use geometry::WktGeometryBuilder;

/// Counts collected during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Nodes read, including dense nodes.
    pub nodes: u64,
    /// Ways read.
    pub ways: u64,
    /// Relations read.
    pub relations: u64,
    /// Place rows written.
    pub rows: u64,
    /// Entities with data that could not be written.
    pub skipped: u64,
}

/// Errors returned when importing an OSM PBF file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Path of the file.
        path: PathBuf,
        /// Source error returned by `osmpbf`.
        #[source]
        source: osmpbf::Error,
    },
    /// The file could not be decoded.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Decode {
        /// Path of the file.
        path: PathBuf,
        /// Source error returned by `osmpbf`.
        #[source]
        source: osmpbf::Error,
    },
    /// Writing places failed.
    #[error("failed to write places")]
    Output {
        /// Underlying output error.
        #[source]
        source: PlaceOutputError,
    },
}

/// Import every element of an OSM PBF file in file order.
///
/// The output is synced before returning, so the summary only reports rows
/// that have landed.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use camino::Utf8Path;
/// use gazetteer_core::Style;
/// use gazetteer_data::{Mode, PlaceOutput, import_osm_pbf};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let style = Style::load(Utf8Path::new("import-full.style"))?;
/// let mut output = PlaceOutput::open(style, Utf8Path::new("places.db"))?;
/// let summary = import_osm_pbf(Path::new("monaco.osm.pbf"), &mut output, Mode::Create)?;
/// output.finish()?;
/// assert!(summary.rows <= summary.nodes + summary.ways + summary.relations);
/// # Ok(())
/// # }
/// ```
pub fn import_osm_pbf(
    path: &Path,
    output: &mut PlaceOutput,
    mode: Mode,
) -> Result<ImportSummary, ImportError> {
    let reader = ElementReader::from_path(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut importer = PlaceImporter::new(output, mode);
    let mut failure = None;
    reader
        .for_each(|element| {
            if failure.is_none() {
                failure = importer.element(element).err();
            }
        })
        .map_err(|source| ImportError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(source) = failure {
        return Err(ImportError::Output { source });
    }

    let summary = importer.finish().map_err(|source| ImportError::Output { source })?;
    info!(
        "imported {}: {} nodes, {} ways, {} relations, {} rows, {} skipped",
        path.display(),
        summary.nodes,
        summary.ways,
        summary.relations,
        summary.rows,
        summary.skipped
    );
    Ok(summary)
}

/// Feeds decoded OSM objects into a [`PlaceOutput`].
///
/// Node locations are cached so ways arriving later can be assembled.
#[derive(Debug)]
pub struct PlaceImporter<'o> {
    output: &'o mut PlaceOutput,
    mode: Mode,
    geometry: WktGeometryBuilder,
    summary: ImportSummary,
}

impl<'o> PlaceImporter<'o> {
    /// Start an import into `output`.
    pub fn new(output: &'o mut PlaceOutput, mode: Mode) -> Self {
        Self {
            output,
            mode,
            geometry: WktGeometryBuilder::default(),
            summary: ImportSummary::default(),
        }
    }

    /// True when the style asks for metadata columns.
    #[must_use]
    pub fn wants_metadata(&self) -> bool {
        !self.output.style().metadata_fields().is_empty()
    }

    /// Process a node.
    pub fn node<'t, I>(
        &mut self,
        id: i64,
        lon: f64,
        lat: f64,
        tags: I,
        metadata: EntityMetadata,
    ) -> Result<(), PlaceOutputError>
    where
        I: IntoIterator<Item = (&'t str, &'t str)>,
    {
        self.summary.nodes += 1;
        let location = self.geometry.add_node(id, lon, lat);
        if !valid_id(OsmType::Node, id) {
            self.summary.skipped += 1;
            return Ok(());
        }
        let entity = OsmEntity::new(OsmType::Node, id, tags).with_metadata(metadata);
        if entity.tags.is_empty() && self.mode == Mode::Create {
            return Ok(());
        }
        let point = location.map(WktGeometryBuilder::point_wkt);
        self.process(&entity, point.as_deref())
    }

    /// Process a way given its node references.
    pub fn way<'t, I>(
        &mut self,
        id: i64,
        refs: &[i64],
        tags: I,
        metadata: EntityMetadata,
    ) -> Result<(), PlaceOutputError>
    where
        I: IntoIterator<Item = (&'t str, &'t str)>,
    {
        self.summary.ways += 1;
        if !valid_id(OsmType::Way, id) {
            self.summary.skipped += 1;
            return Ok(());
        }
        let entity = OsmEntity::new(OsmType::Way, id, tags).with_metadata(metadata);
        let geometry = self.geometry.way_wkt(refs);
        self.process(&entity, geometry.as_deref())
    }

    /// Process a relation. Relation geometries are not assembled.
    pub fn relation<'t, I>(
        &mut self,
        id: i64,
        tags: I,
        metadata: EntityMetadata,
    ) -> Result<(), PlaceOutputError>
    where
        I: IntoIterator<Item = (&'t str, &'t str)>,
    {
        self.summary.relations += 1;
        if !valid_id(OsmType::Relation, id) {
            self.summary.skipped += 1;
            return Ok(());
        }
        let entity = OsmEntity::new(OsmType::Relation, id, tags).with_metadata(metadata);
        self.process(&entity, None)
    }

    /// Counts so far.
    #[must_use]
    pub const fn summary(&self) -> ImportSummary {
        self.summary
    }

    /// Sync the output and return the final counts.
    pub fn finish(self) -> Result<ImportSummary, PlaceOutputError> {
        self.output.sync()?;
        Ok(self.summary)
    }

    fn element(&mut self, element: Element<'_>) -> Result<(), PlaceOutputError> {
        let wants_metadata = self.wants_metadata();
        match element {
            Element::Node(node) => {
                let metadata = wants_metadata
                    .then(|| metadata::from_info(&node.info()))
                    .unwrap_or_default();
                self.node(node.id(), node.lon(), node.lat(), node.tags(), metadata)
            }
            Element::DenseNode(node) => {
                let metadata = wants_metadata
                    .then(|| metadata::from_dense(&node))
                    .unwrap_or_default();
                self.node(node.id(), node.lon(), node.lat(), node.tags(), metadata)
            }
            Element::Way(way) => {
                let metadata = wants_metadata
                    .then(|| metadata::from_info(&way.info()))
                    .unwrap_or_default();
                let refs: Vec<i64> = way.refs().collect();
                self.way(way.id(), &refs, way.tags(), metadata)
            }
            Element::Relation(relation) => {
                let metadata = wants_metadata
                    .then(|| metadata::from_info(&relation.info()))
                    .unwrap_or_default();
                self.relation(relation.id(), relation.tags(), metadata)
            }
        }
    }

    fn process(
        &mut self,
        entity: &OsmEntity,
        geometry: Option<&str>,
    ) -> Result<(), PlaceOutputError> {
        match self.output.process(entity, geometry, self.mode)? {
            Processed::Emitted(rows) => {
                self.summary.rows += u64::try_from(rows).unwrap_or(u64::MAX);
            }
            Processed::MissingGeometry => {
                warn!(
                    "skipped {}{}: no geometry could be built",
                    entity.osm_type, entity.id
                );
                self.summary.skipped += 1;
            }
            Processed::NoData | Processed::Ignored => {}
        }
        Ok(())
    }
}

fn valid_id(osm_type: OsmType, id: i64) -> bool {
    let valid = id > 0;
    if !valid {
        warn!("skipped {osm_type}{id}: ids must be positive");
    }
    valid
}
