//! Failure taxonomy for the prediction pipeline.
//!
//! Every variant renders as a message fit to show the user; the request
//! boundary turns any of them into a single error string.

use thiserror::Error;

/// One side of a match that could not be mapped to a team in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedName {
    pub input: String,
    /// Closest candidate seen, even if it scored below the cutoff.
    pub closest: Option<String>,
}

impl UnresolvedName {
    fn describe(&self) -> String {
        match &self.closest {
            Some(name) => format!("'{}' (closest: '{}')", self.input, name),
            None => format!("'{}'", self.input),
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Unknown league '{0}'. Supported leagues: NCAAF, NBA, NFL.")]
    UnknownLeague(String),

    #[error("Failed to fetch {league} data from the stats sheet: {reason}")]
    RemoteFetchFailed { league: String, reason: String },

    #[error("No data found in the '{0}' sheet.")]
    EmptyDataset(String),

    #[error("Missing required column '{column}' in the '{league}' sheet.")]
    MissingColumn { league: String, column: String },

    #[error("One or both team names were not found: {}. Please try again.", describe_unresolved(.team1, .team2))]
    UnresolvedTeamName {
        team1: Option<UnresolvedName>,
        team2: Option<UnresolvedName>,
    },

    #[error("Stats lookup failed: {0}")]
    StatsLookup(String),
}

fn describe_unresolved(team1: &Option<UnresolvedName>, team2: &Option<UnresolvedName>) -> String {
    [team1, team2]
        .into_iter()
        .flatten()
        .map(UnresolvedName::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures of the remote tabular source itself, kept apart from
/// validation errors on the data it returns.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sheets API error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}
