//! Error types emitted by the gazetteer CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use gazetteer_core::StyleError;
use gazetteer_data::{ImportError, PlaceOutputError};
use thiserror::Error;

/// Errors emitted by the gazetteer CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The style file could not be loaded.
    #[error("failed to load style: {0}")]
    LoadStyle(#[from] StyleError),
    /// The place database could not be opened.
    #[error("failed to open place database at {path:?}: {source}")]
    OpenDatabase {
        path: Utf8PathBuf,
        #[source]
        source: PlaceOutputError,
    },
    /// Reading the OSM extract or writing its places failed.
    #[error("failed to import OSM data: {0}")]
    Import(#[from] ImportError),
    /// Flushing the last rows failed.
    #[error("failed to finish writing places to {path:?}: {source}")]
    FinishImport {
        path: Utf8PathBuf,
        #[source]
        source: PlaceOutputError,
    },
    /// Writing the import summary failed.
    #[error("failed to write import summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}
