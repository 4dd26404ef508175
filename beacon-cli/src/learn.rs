//! `learn` command: rebuild preference models from interaction history.

use std::io::Write;
use std::time::Duration;

use beacon_core::LearnedPreferenceModel;
use beacon_scorer::{BatchSummary, LearnOutcome, LearnerConfig, PreferenceLearner};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_USER, CliError, ENV_LEARN_DATABASE, ENV_LEARN_USER, open_store, write_json,
};

/// CLI arguments for the `learn` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "learn",
    long_about = "Rebuild the learned preference model for one user, or for \
                 every user with interactions when --all is given. Batch runs \
                 continue past per-user failures and report a summary.",
    about = "Learn preferences from interactions"
)]
#[ortho_config(prefix = "BEACON")]
pub(crate) struct LearnArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Learn for this user only.
    #[arg(long = ARG_USER, value_name = "id", conflicts_with = "all")]
    #[serde(default)]
    pub(crate) user: Option<String>,
    /// Learn for every user with interactions.
    #[arg(long)]
    #[serde(default)]
    pub(crate) all: bool,
    /// Milliseconds to pause between users in a batch run.
    #[arg(long = "pace-ms", value_name = "ms")]
    #[serde(default)]
    pub(crate) pace_ms: Option<u64>,
    /// Maximum number of recent interactions read per user.
    #[arg(long = "history-limit", value_name = "count")]
    #[serde(default)]
    pub(crate) history_limit: Option<usize>,
}

impl LearnArgs {
    fn into_config(self) -> Result<LearnConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LearnConfig::try_from(merged)
    }
}

/// Which users a learning run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LearnScope {
    User(String),
    Everyone,
}

/// Resolved `learn` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LearnConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) scope: LearnScope,
    pub(crate) learner: LearnerConfig,
}

impl TryFrom<LearnArgs> for LearnConfig {
    type Error = CliError;

    fn try_from(args: LearnArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_LEARN_DATABASE,
        })?;
        let scope = match (args.user, args.all) {
            (Some(_), true) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_USER,
                    reason: "cannot be combined with --all",
                });
            }
            (Some(user), false) => LearnScope::User(user),
            (None, true) => LearnScope::Everyone,
            (None, false) => {
                return Err(CliError::MissingArgument {
                    field: ARG_USER,
                    env: ENV_LEARN_USER,
                });
            }
        };
        let defaults = LearnerConfig::default();
        let learner = LearnerConfig {
            history_limit: args.history_limit.unwrap_or(defaults.history_limit),
            pacing: args.pace_ms.map_or(defaults.pacing, Duration::from_millis),
            ..defaults
        };
        Ok(Self {
            database,
            scope,
            learner,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserReport<'a> {
    user_id: &'a str,
    message: &'static str,
    model: Option<&'a LearnedPreferenceModel>,
}

pub(crate) fn run_learn_with(args: LearnArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = open_store(&config.database)?;
    let learner = PreferenceLearner::with_config(&store, &store, &store, config.learner);
    match &config.scope {
        LearnScope::User(user) => {
            let outcome: LearnOutcome = learner.learn(user)?;
            write_json(
                writer,
                &UserReport {
                    user_id: user,
                    message: outcome.message(),
                    model: outcome.model(),
                },
            )
        }
        LearnScope::Everyone => {
            let summary: BatchSummary = learner.learn_all()?;
            write_json(writer, &summary)
        }
    }
}
