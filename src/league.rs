//! Supported leagues and their sheet layouts.
//!
//! Each league maps to one tab of the stats spreadsheet. The layout of that
//! tab (which columns must exist) and the formula used to turn a row into a
//! predicted total are both decided by the league's [`StatFamily`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PredictError;

/// Column holding the canonical team name in every league tab.
pub const TEAM_COLUMN: &str = "Team";

pub const GAMES_COLUMN: &str = "G";
pub const POINTS_FOR_COLUMN: &str = "PF";
pub const POINTS_AGAINST_COLUMN: &str = "PA";
pub const PPG_COLUMN: &str = "PPG";
pub const OPP_PPG_COLUMN: &str = "OPP PPG";

/// How a league publishes its scoring stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatFamily {
    /// Season totals (games, points for, points against); averaged per game
    /// at prediction time.
    PerGameAverage,
    /// Already averaged points-per-game and opponent points-per-game.
    PointsPerGame,
}

impl StatFamily {
    /// Columns that must be present in the sheet header.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            StatFamily::PerGameAverage => &[
                TEAM_COLUMN,
                GAMES_COLUMN,
                POINTS_FOR_COLUMN,
                POINTS_AGAINST_COLUMN,
            ],
            StatFamily::PointsPerGame => &[TEAM_COLUMN, PPG_COLUMN, OPP_PPG_COLUMN],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum League {
    Ncaaf,
    Nba,
    Nfl,
}

impl League {
    pub const ALL: [League; 3] = [League::Ncaaf, League::Nba, League::Nfl];

    /// Display name, also the canonical cache key.
    pub fn name(self) -> &'static str {
        match self {
            League::Ncaaf => "NCAAF",
            League::Nba => "NBA",
            League::Nfl => "NFL",
        }
    }

    /// A1-notation range read from the spreadsheet.
    pub fn range(self) -> &'static str {
        match self {
            League::Ncaaf => "NCAAF!A1:D135",
            League::Nba => "NBA!A1:D31",
            League::Nfl => "NFL!A1:D135",
        }
    }

    pub fn family(self) -> StatFamily {
        match self {
            League::Nba => StatFamily::PointsPerGame,
            League::Ncaaf | League::Nfl => StatFamily::PerGameAverage,
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        self.family().required_columns()
    }

    /// Case-insensitive lookup of a user-supplied league key.
    pub fn parse_key(key: &str) -> Result<Self, PredictError> {
        let wanted = key.trim();
        League::ALL
            .into_iter()
            .find(|league| league.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PredictError::UnknownLeague(key.to_string()))
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for League {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        League::parse_key(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_is_case_insensitive() {
        assert_eq!(League::parse_key("nba").unwrap(), League::Nba);
        assert_eq!(League::parse_key("  Ncaaf ").unwrap(), League::Ncaaf);
        assert_eq!("NFL".parse::<League>().unwrap(), League::Nfl);
    }

    #[test]
    fn test_parse_key_unknown() {
        match League::parse_key("MLB") {
            Err(PredictError::UnknownLeague(key)) => assert_eq!(key, "MLB"),
            other => panic!("expected UnknownLeague, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_differs_for_nba() {
        assert_eq!(League::Nba.required_columns(), &["Team", "PPG", "OPP PPG"]);
        assert_eq!(League::Nfl.required_columns(), &["Team", "G", "PF", "PA"]);
        assert_eq!(League::Ncaaf.family(), StatFamily::PerGameAverage);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(League::Nba.range(), "NBA!A1:D31");
        assert_eq!(League::Ncaaf.range(), "NCAAF!A1:D135");
    }
}
