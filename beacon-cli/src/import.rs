//! `import-profiles` command: load profile documents into the database.

use std::io::{BufReader, Write};

use beacon_store::ProfileRecord;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_PROFILES, CliError, ENV_IMPORT_DATABASE, ENV_IMPORT_PROFILES, open_store,
    write_json,
};

/// CLI arguments for the `import-profiles` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "import-profiles",
    long_about = "Load a JSON array of profile documents into the database. \
                 Existing profiles with the same id are replaced, together \
                 with their block-lists.",
    about = "Import profile documents"
)]
#[ortho_config(prefix = "BEACON")]
pub(crate) struct ImportArgs {
    /// Path to a JSON file holding an array of profile documents.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) profiles: Option<Utf8PathBuf>,
    /// Path to the SQLite database; created when absent.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import-profiles` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) profiles: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let profiles = args.profiles.ok_or(CliError::MissingArgument {
            field: ARG_PROFILES,
            env: ENV_IMPORT_PROFILES,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_IMPORT_DATABASE,
        })?;
        Ok(Self { profiles, database })
    }
}

#[derive(Debug, Serialize)]
struct ImportSummary {
    imported: usize,
}

pub(crate) fn run_import_with(args: ImportArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let summary = execute_import(&config)?;
    write_json(writer, &summary)
}

fn execute_import(config: &ImportConfig) -> Result<ImportSummary, CliError> {
    let records = load_profiles(&config.profiles)?;
    let store = open_store(&config.database)?;
    let imported = store.import_profiles(records)?;
    info!("imported {imported} profiles into {}", config.database);
    Ok(ImportSummary { imported })
}

/// Load a JSON array of profile documents from disk.
pub(crate) fn load_profiles(path: &Utf8Path) -> Result<Vec<ProfileRecord>, CliError> {
    let file = fs_utf8::File::open_ambient(path, ambient_authority()).map_err(|source| {
        CliError::OpenProfiles {
            path: path.to_path_buf(),
            source,
        }
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseProfiles {
        path: path.to_path_buf(),
        source,
    })
}
