//! Classification and row emission for whole entities.

use camino::Utf8Path;
use gazetteer_core::{EmitSource, OsmEntity, OsmType, Style, classify, emit_rows};
use thiserror::Error;

use crate::copy::{CopyWorker, TransportError};
use crate::place::{PlaceCopyMgr, PlaceSchemaError, open_place_database};

/// How existing rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Fresh import into an empty table.
    #[default]
    Create,
    /// Update run: rows the entity no longer justifies are removed first.
    Append,
}

/// Outcome of [`PlaceOutput::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    /// Rows were written.
    Emitted(usize),
    /// The entity carries nothing the style keeps.
    NoData,
    /// The entity has data but no geometry could be built.
    MissingGeometry,
    /// A relation that is neither a boundary nor a multipolygon.
    Ignored,
}

/// Errors raised while writing places.
#[derive(Debug, Error)]
pub enum PlaceOutputError {
    /// The place database could not be prepared.
    #[error(transparent)]
    Schema(#[from] PlaceSchemaError),
    /// Rows or deletions could not be written.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Turns entities into place rows according to a style.
#[derive(Debug)]
pub struct PlaceOutput {
    style: Style,
    copy: PlaceCopyMgr,
}

impl PlaceOutput {
    /// Combine a style with a bound copy manager.
    #[must_use]
    pub const fn new(style: Style, copy: PlaceCopyMgr) -> Self {
        Self { style, copy }
    }

    /// Open the place database at `path` and start a copy worker for it.
    pub fn open(style: Style, path: &Utf8Path) -> Result<Self, PlaceOutputError> {
        let connection = open_place_database(path)?;
        let worker = CopyWorker::spawn(connection)?;
        let copy = PlaceCopyMgr::new(worker, style.metadata_fields());
        Ok(Self::new(style, copy))
    }

    /// The active style.
    #[must_use]
    pub const fn style(&self) -> &Style {
        &self.style
    }

    /// Classify `entity` and write its rows.
    ///
    /// In [`Mode::Append`] the rows of classes the entity lost are deleted
    /// first. An entity without data or without geometry loses all rows.
    pub fn process(
        &mut self,
        entity: &OsmEntity,
        geometry: Option<&str>,
        mode: Mode,
    ) -> Result<Processed, PlaceOutputError> {
        if entity.osm_type == OsmType::Relation && !is_area_relation(entity) {
            if mode == Mode::Append {
                self.copy.delete_all(entity.osm_type, entity.id)?;
            }
            return Ok(Processed::Ignored);
        }

        let classification = classify(&self.style, entity.tags());
        let writable = classification.has_data().then_some(geometry).flatten();
        if mode == Mode::Append {
            if writable.is_some() {
                self.copy.delete_object(
                    entity.osm_type,
                    entity.id,
                    &classification.class_list(),
                )?;
            } else {
                self.copy.delete_all(entity.osm_type, entity.id)?;
            }
        }

        if !classification.has_data() {
            return Ok(Processed::NoData);
        }
        let Some(geometry) = writable else {
            return Ok(Processed::MissingGeometry);
        };
        let source = EmitSource {
            osm_type: entity.osm_type,
            osm_id: entity.id,
            metadata: &entity.metadata,
            fields: self.style.metadata_fields(),
        };
        let rows = emit_rows(source, geometry, &classification, &mut self.copy)?;
        Ok(Processed::Emitted(rows))
    }

    /// Remove every row of an object deleted upstream.
    pub fn delete(&mut self, osm_type: OsmType, osm_id: i64) -> Result<(), PlaceOutputError> {
        self.copy.delete_all(osm_type, osm_id)?;
        Ok(())
    }

    /// Wait until everything written so far has landed.
    pub fn sync(&mut self) -> Result<(), PlaceOutputError> {
        self.copy.sync()?;
        Ok(())
    }

    /// Write what is left and stop the copy worker.
    pub fn finish(self) -> Result<(), PlaceOutputError> {
        self.copy.finish()?;
        Ok(())
    }
}

fn is_area_relation(entity: &OsmEntity) -> bool {
    matches!(entity.tag("type"), Some("boundary" | "multipolygon"))
}
