//! The SQLite place table.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, Error as SqliteError};
use thiserror::Error;

/// Errors raised while preparing the place database.
#[derive(Debug, Error)]
pub enum PlaceSchemaError {
    /// Failed to create the parent directory for the database.
    #[error("failed to create parent directory for {path:?}")]
    CreateDirectory {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `place` table failed.
    #[error("failed to create place table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Open (or create) a place database on disk and make sure the table exists.
pub fn open_place_database(path: &Utf8Path) -> Result<Connection, PlaceSchemaError> {
    gazetteer_fs::ensure_parent_dir(path).map_err(|source| PlaceSchemaError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })?;
    let connection =
        Connection::open(path.as_std_path()).map_err(|source| PlaceSchemaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    create_place_schema(&connection)?;
    Ok(connection)
}

/// Create the `place` table if missing.
///
/// Every metadata column exists whether or not the style asks for it; rows
/// leave unrequested ones NULL. Tag maps are JSON objects.
pub fn create_place_schema(connection: &Connection) -> Result<(), PlaceSchemaError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS place (
                place_id INTEGER PRIMARY KEY,
                osm_type TEXT NOT NULL CHECK (osm_type IN ('N', 'W', 'R')),
                osm_id INTEGER NOT NULL,
                class TEXT NOT NULL,
                type TEXT NOT NULL,
                name TEXT,
                admin_level INTEGER NOT NULL,
                address TEXT,
                extratags TEXT,
                operator TEXT,
                geometry TEXT NOT NULL,
                osm_version INTEGER,
                osm_timestamp TEXT,
                osm_changeset INTEGER,
                osm_uid INTEGER,
                osm_user TEXT,
                UNIQUE (osm_type, osm_id, class)
            );",
        )
        .map_err(|source| PlaceSchemaError::CreateSchema { source })
}
