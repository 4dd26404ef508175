//! `record` command: append an interaction on behalf of a user.

use std::io::Write;

use beacon_core::{InteractionEvent, InteractionKind};
use beacon_scorer::{InteractionRecorder, RecordInteraction};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_TARGET, ARG_TYPE, ARG_USER, CliError, ENV_RECORD_DATABASE,
    ENV_RECORD_TARGET, ENV_RECORD_TYPE, ENV_RECORD_USER, open_store, write_json,
};

/// CLI arguments for the `record` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "record",
    long_about = "Append one interaction to the user's history. Known types \
                 are view, like, message, meet, save, skip, and block; other \
                 values are stored verbatim and carry no learning weight.",
    about = "Record an interaction"
)]
#[ortho_config(prefix = "BEACON")]
pub(crate) struct RecordArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identity of the acting user.
    #[arg(long = ARG_USER, value_name = "id")]
    #[serde(default)]
    pub(crate) user: Option<String>,
    /// Identity of the profile acted upon.
    #[arg(long = ARG_TARGET, value_name = "id")]
    #[serde(default)]
    pub(crate) target: Option<String>,
    /// Interaction type.
    #[arg(long = ARG_TYPE, value_name = "kind")]
    #[serde(default)]
    pub(crate) kind: Option<String>,
    /// Distance between the two users, in kilometres.
    #[arg(long = "distance-km", value_name = "km")]
    #[serde(default)]
    pub(crate) distance_km: Option<f64>,
    /// Actor latitude.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Actor longitude.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lng: Option<f64>,
    /// How long the interaction lasted, in seconds.
    #[arg(long = "duration-seconds", value_name = "seconds")]
    #[serde(default)]
    pub(crate) duration_seconds: Option<u32>,
    /// Free-form JSON metadata.
    #[arg(long, value_name = "json")]
    #[serde(default)]
    pub(crate) metadata: Option<String>,
}

impl RecordArgs {
    fn into_config(self) -> Result<RecordConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RecordConfig::try_from(merged)
    }
}

/// Resolved `record` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) user: String,
    pub(crate) request: RecordInteraction,
}

impl TryFrom<RecordArgs> for RecordConfig {
    type Error = CliError;

    fn try_from(args: RecordArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_RECORD_DATABASE,
        })?;
        let user = args.user.ok_or(CliError::MissingArgument {
            field: ARG_USER,
            env: ENV_RECORD_USER,
        })?;
        let target_id = args.target.ok_or(CliError::MissingArgument {
            field: ARG_TARGET,
            env: ENV_RECORD_TARGET,
        })?;
        let kind = args.kind.ok_or(CliError::MissingArgument {
            field: ARG_TYPE,
            env: ENV_RECORD_TYPE,
        })?;
        let metadata = args
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(CliError::ParseMetadata)?
            .unwrap_or_default();
        Ok(Self {
            database,
            user,
            request: RecordInteraction {
                target_id,
                kind: InteractionKind::from(kind),
                distance_km: args.distance_km,
                lat: args.lat,
                lng: args.lng,
                duration_seconds: args.duration_seconds,
                metadata,
            },
        })
    }
}

pub(crate) fn run_record_with(args: RecordArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let event = execute_record(config)?;
    write_json(writer, &event)
}

fn execute_record(config: RecordConfig) -> Result<InteractionEvent, CliError> {
    let store = open_store(&config.database)?;
    let recorder = InteractionRecorder::new(&store);
    Ok(recorder.record(&config.user, config.request)?)
}
