//! Command-line interface over a Beacon `SQLite` database.
//!
//! Every subcommand writes one JSON document to standard output so the tool
//! composes with `jq` and shell pipelines. Options layer from flags,
//! configuration files, and `BEACON_CMDS_<SUBCOMMAND>_<OPTION>` environment
//! variables.
#![forbid(unsafe_code)]

use std::io::Write;

use beacon_store::SqliteStore;
use camino::Utf8Path;
use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;

mod error;
mod import;
mod learn;
mod recommend;
mod record;

pub use error::CliError;

use import::{ImportArgs, run_import_with};
use learn::{LearnArgs, run_learn_with};
use recommend::{RecommendArgs, run_recommend_with};
use record::{RecordArgs, run_record_with};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_PROFILES: &str = "profiles";
pub(crate) const ARG_USER: &str = "user";
pub(crate) const ARG_TARGET: &str = "target";
pub(crate) const ARG_TYPE: &str = "type";

pub(crate) const ENV_IMPORT_DATABASE: &str = "BEACON_CMDS_IMPORT_PROFILES_DATABASE";
pub(crate) const ENV_IMPORT_PROFILES: &str = "BEACON_CMDS_IMPORT_PROFILES_PROFILES";
pub(crate) const ENV_RECOMMEND_DATABASE: &str = "BEACON_CMDS_RECOMMEND_DATABASE";
pub(crate) const ENV_RECOMMEND_USER: &str = "BEACON_CMDS_RECOMMEND_USER";
pub(crate) const ENV_RECORD_DATABASE: &str = "BEACON_CMDS_RECORD_DATABASE";
pub(crate) const ENV_RECORD_USER: &str = "BEACON_CMDS_RECORD_USER";
pub(crate) const ENV_RECORD_TARGET: &str = "BEACON_CMDS_RECORD_TARGET";
pub(crate) const ENV_RECORD_TYPE: &str = "BEACON_CMDS_RECORD_KIND";
pub(crate) const ENV_LEARN_DATABASE: &str = "BEACON_CMDS_LEARN_DATABASE";
pub(crate) const ENV_LEARN_USER: &str = "BEACON_CMDS_LEARN_USER";

/// Run the Beacon CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when parsing, configuration, storage, or the engine
/// operation fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse()?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::ImportProfiles(args) => run_import_with(args, writer),
        Command::Recommend(args) => run_recommend_with(args, writer),
        Command::Record(args) => run_record_with(args, writer),
        Command::Learn(args) => run_learn_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "beacon",
    about = "Recommendation scoring and preference learning for the Beacon feed",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load profile documents from a JSON file into the database.
    ImportProfiles(ImportArgs),
    /// Rank candidates for a viewer.
    Recommend(RecommendArgs),
    /// Record an interaction on behalf of a user.
    Record(RecordArgs),
    /// Rebuild learned preference models.
    Learn(LearnArgs),
}

pub(crate) fn open_store(path: &Utf8Path) -> Result<SqliteStore, CliError> {
    debug!("opening database at {path}");
    SqliteStore::open(path).map_err(CliError::from)
}

pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
