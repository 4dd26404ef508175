//! `recommend` command: rank candidates for a viewer.

use std::io::Write;

use beacon_scorer::{CandidateRanker, RankerConfig, RecommendationPage, RecommendationQuery};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_USER, CliError, ENV_RECOMMEND_DATABASE, ENV_RECOMMEND_USER, open_store,
    write_json,
};

/// CLI arguments for the `recommend` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "recommend",
    long_about = "Score every visible candidate for the viewer and print one \
                 page of recommendations with per-component score breakdowns.",
    about = "Rank candidates for a viewer"
)]
#[ortho_config(prefix = "BEACON")]
pub(crate) struct RecommendArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identity of the viewer.
    #[arg(long = ARG_USER, value_name = "id")]
    #[serde(default)]
    pub(crate) user: Option<String>,
    /// Latitude overriding the viewer's stored location.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude overriding the viewer's stored location.
    #[arg(long, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lng: Option<f64>,
    /// Page size; clamped to 1..=50.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
    /// Number of ranked candidates to skip.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) offset: Option<usize>,
    /// Drop candidates scoring below this value.
    #[arg(long = "min-score", value_name = "score")]
    #[serde(default)]
    pub(crate) min_score: Option<f64>,
    /// Keep candidates the viewer has blocked.
    #[arg(long = "include-blocked")]
    #[serde(default)]
    pub(crate) include_blocked: bool,
    /// Ignore the viewer's learned preference model.
    #[arg(long = "no-ml")]
    #[serde(default)]
    pub(crate) no_ml: bool,
}

impl RecommendArgs {
    fn into_config(self) -> Result<RecommendConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RecommendConfig::try_from(merged)
    }
}

/// Resolved `recommend` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecommendConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) user: String,
    pub(crate) query: RecommendationQuery,
    pub(crate) ranker: RankerConfig,
}

impl TryFrom<RecommendArgs> for RecommendConfig {
    type Error = CliError;

    fn try_from(args: RecommendArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_RECOMMEND_DATABASE,
        })?;
        let user = args.user.ok_or(CliError::MissingArgument {
            field: ARG_USER,
            env: ENV_RECOMMEND_USER,
        })?;
        let query = RecommendationQuery {
            lat: args.lat,
            lng: args.lng,
            limit: args.limit,
            offset: args.offset.unwrap_or_default(),
            min_score: args.min_score.unwrap_or_default(),
            exclude_blocked: !args.include_blocked,
        };
        let ranker = RankerConfig {
            ml_enabled: !args.no_ml,
            ..RankerConfig::default()
        };
        Ok(Self {
            database,
            user,
            query,
            ranker,
        })
    }
}

pub(crate) fn run_recommend_with(
    args: RecommendArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let page = execute_recommend(&config)?;
    write_json(writer, &page)
}

fn execute_recommend(config: &RecommendConfig) -> Result<RecommendationPage, CliError> {
    let store = open_store(&config.database)?;
    let ranker = CandidateRanker::with_config(&store, &store, config.ranker);
    Ok(ranker.recommend(&config.user, &config.query)?)
}
