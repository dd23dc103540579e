//! Command-line interface for the gazetteer place importer.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use gazetteer_core::Style;
use gazetteer_data::{ImportSummary, Mode, PlaceOutput, import_osm_pbf};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

mod error;

pub use error::CliError;

const ARG_STYLE: &str = "style";
const ARG_OSM_PBF: &str = "osm-pbf";
const ARG_DATABASE: &str = "database";
const ARG_APPEND: &str = "append";
const ENV_STYLE: &str = "GAZETTEER_CMDS_IMPORT_STYLE";
const ENV_OSM_PBF: &str = "GAZETTEER_CMDS_IMPORT_OSM_PBF";
const DEFAULT_DATABASE: &str = "places.db";

/// Run the gazetteer CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Import(args) => {
            let summary = run_import(args)?;
            write_summary(&mut std::io::stdout().lock(), &summary)
                .map_err(CliError::WriteSummary)?;
        }
    }
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<ImportSummary, CliError> {
    let config = resolve_import_config(args)?;
    execute_import(&config)
}

fn resolve_import_config(args: ImportArgs) -> Result<ImportConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

fn execute_import(config: &ImportConfig) -> Result<ImportSummary, CliError> {
    let style = Style::load(&config.style)?;
    let mut output =
        PlaceOutput::open(style, &config.database).map_err(|source| CliError::OpenDatabase {
            path: config.database.clone(),
            source,
        })?;
    let summary = import_osm_pbf(config.osm_pbf.as_std_path(), &mut output, config.mode)?;
    output.finish().map_err(|source| CliError::FinishImport {
        path: config.database.clone(),
        source,
    })?;
    info!(
        "wrote {} place rows into {} ({:?} mode)",
        summary.rows, config.database, config.mode
    );
    Ok(summary)
}

fn write_summary(out: &mut impl Write, summary: &ImportSummary) -> std::io::Result<()> {
    writeln!(out, "nodes: {}", summary.nodes)?;
    writeln!(out, "ways: {}", summary.ways)?;
    writeln!(out, "relations: {}", summary.relations)?;
    writeln!(out, "place rows: {}", summary.rows)?;
    writeln!(out, "skipped: {}", summary.skipped)
}

#[derive(Debug, Parser)]
#[command(
    name = "gazetteer",
    about = "Import OpenStreetMap places into a gazetteer database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify an OSM extract with a style file and write place rows.
    Import(ImportArgs),
}

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Classify every object of an OSM PBF extract with a \
                 gazetteer style and write the resulting place rows. Paths \
                 can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Import places from an OSM PBF extract"
)]
#[ortho_config(prefix = "GAZETTEER")]
struct ImportArgs {
    /// Path to the gazetteer style file.
    #[arg(long = ARG_STYLE, value_name = "path")]
    #[serde(default)]
    style: Option<Utf8PathBuf>,
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    osm_pbf: Option<Utf8PathBuf>,
    /// Path to the SQLite place database (defaults to `places.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// Update an existing database instead of filling a fresh one.
    #[arg(
        long = ARG_APPEND,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    append: Option<bool>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportConfig {
    style: Utf8PathBuf,
    osm_pbf: Utf8PathBuf,
    database: Utf8PathBuf,
    mode: Mode,
}

impl ImportConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.style, ARG_STYLE)?;
        Self::require_existing(&self.osm_pbf, ARG_OSM_PBF)?;
        if self.mode == Mode::Append {
            Self::require_existing(&self.database, ARG_DATABASE)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match gazetteer_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let style = args.style.ok_or(CliError::MissingArgument {
            field: ARG_STYLE,
            env: ENV_STYLE,
        })?;
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_OSM_PBF,
        })?;
        let database = args
            .database
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE));
        let mode = if args.append.unwrap_or(false) {
            Mode::Append
        } else {
            Mode::Create
        };
        Ok(Self {
            style,
            osm_pbf,
            database,
            mode,
        })
    }
}

#[cfg(test)]
mod tests;
