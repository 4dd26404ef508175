//! Error types emitted by the Beacon CLI.
//!
//! Keep this error type reasonably small, as every subcommand returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use beacon_scorer::EngineError;
use beacon_store::SqliteStoreError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the Beacon CLI.
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
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// Options were combined in a way the command does not accept.
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Why the combination was rejected.
        reason: &'static str,
    },
    /// Opening or writing the database failed.
    #[error(transparent)]
    Store(#[from] SqliteStoreError),
    /// Opening the profile document file failed.
    #[error("failed to open profile documents at {path:?}: {source}")]
    OpenProfiles {
        /// Requested document path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Profile documents could not be decoded.
    #[error("failed to parse profile documents at {path:?}: {source}")]
    ParseProfiles {
        /// Requested document path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Interaction metadata was not valid JSON.
    #[error("failed to parse interaction metadata: {0}")]
    ParseMetadata(#[source] serde_json::Error),
    /// The engine rejected or failed the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
