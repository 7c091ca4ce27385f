//! Predicted combined score for a matchup.
//!
//! Both formulas average what each team scores and concedes, then halve the
//! sum of the two teams' totals. The formula is picked by the league's
//! [`StatFamily`].

use serde::Serialize;

use crate::error::PredictError;
use crate::league::{
    League, StatFamily, GAMES_COLUMN, OPP_PPG_COLUMN, POINTS_AGAINST_COLUMN, POINTS_FOR_COLUMN,
    PPG_COLUMN,
};
use crate::table::{TeamRow, TeamStatsTable};

/// A predicted over/under line and the inputs that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub league: League,
    pub team1: String,
    pub team2: String,
    pub predicted: f64,
}

impl Prediction {
    /// One decimal place, as shown to users and stored in history
    pub fn formatted(&self) -> String {
        format!("{:.1}", self.predicted)
    }
}

/// Predict the combined score for two canonical team names.
///
/// Fails with `StatsLookup` if either team is missing from the table or a
/// per-game average would divide by zero games.
pub fn predict(
    league: League,
    team1: &str,
    team2: &str,
    table: &TeamStatsTable,
) -> Result<Prediction, PredictError> {
    let row1 = lookup(table, team1)?;
    let row2 = lookup(table, team2)?;

    let family = league.family();
    let total1 = team_total(family, row1)?;
    let total2 = team_total(family, row2)?;

    let predicted = (total1 + total2) / 2.0;
    if !predicted.is_finite() {
        return Err(PredictError::StatsLookup(format!(
            "prediction for {} vs {} is not a finite number",
            row1.name, row2.name
        )));
    }

    Ok(Prediction {
        league,
        team1: row1.name.clone(),
        team2: row2.name.clone(),
        predicted,
    })
}

fn lookup<'a>(table: &'a TeamStatsTable, team: &str) -> Result<&'a TeamRow, PredictError> {
    table.get(team).ok_or_else(|| {
        PredictError::StatsLookup(format!(
            "team '{}' not found in the {} stats",
            team,
            table.league()
        ))
    })
}

/// Average points scored plus average points conceded for one team
fn team_total(family: StatFamily, row: &TeamRow) -> Result<f64, PredictError> {
    match family {
        StatFamily::PointsPerGame => {
            Ok(stat(row, PPG_COLUMN)? + stat(row, OPP_PPG_COLUMN)?)
        }
        StatFamily::PerGameAverage => {
            let games = stat(row, GAMES_COLUMN)?;
            if games <= 0.0 {
                return Err(PredictError::StatsLookup(format!(
                    "'{}' has {} games played; cannot average points per game",
                    row.name, games
                )));
            }
            let avg_for = stat(row, POINTS_FOR_COLUMN)? / games;
            let avg_against = stat(row, POINTS_AGAINST_COLUMN)? / games;
            Ok(avg_for + avg_against)
        }
    }
}

fn stat(row: &TeamRow, column: &str) -> Result<f64, PredictError> {
    row.stat(column).ok_or_else(|| {
        PredictError::StatsLookup(format!("'{}' has no '{}' value", row.name, column))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(league: League, rows: &[&[&str]]) -> TeamStatsTable {
        TeamStatsTable::from_rows(
            league,
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn nfl() -> TeamStatsTable {
        table(
            League::Nfl,
            &[
                &["Team", "G", "PF", "PA"],
                &["Team A", "10", "280", "220"],
                &["Team B", "10", "300", "240"],
                &["Team C", "0", "0", "0"],
                &["Team D", "7", "181", "163"],
            ],
        )
    }

    fn nba() -> TeamStatsTable {
        table(
            League::Nba,
            &[
                &["Team", "PPG", "OPP PPG"],
                &["Lakers", "115", "110"],
                &["Celtics", "118", "108"],
                &["Heat", "109.3", "107.9"],
            ],
        )
    }

    #[test]
    fn test_per_game_average_formula() {
        let p = predict(League::Nfl, "Team A", "Team B", &nfl()).unwrap();
        assert_eq!(p.predicted, 52.0);
        assert_eq!(p.formatted(), "52.0");
    }

    #[test]
    fn test_points_per_game_formula() {
        let p = predict(League::Nba, "Lakers", "Celtics", &nba()).unwrap();
        assert_eq!(p.predicted, 225.5);
        assert_eq!(p.team1, "Lakers");
        assert_eq!(p.team2, "Celtics");
    }

    #[test]
    fn test_symmetric_under_swap() {
        let nfl = nfl();
        let ab = predict(League::Nfl, "Team A", "Team D", &nfl).unwrap();
        let ba = predict(League::Nfl, "Team D", "Team A", &nfl).unwrap();
        assert_eq!(ab.predicted, ba.predicted);

        let nba = nba();
        let ab = predict(League::Nba, "Heat", "Celtics", &nba).unwrap();
        let ba = predict(League::Nba, "Celtics", "Heat", &nba).unwrap();
        assert_eq!(ab.predicted, ba.predicted);
    }

    #[test]
    fn test_results_are_finite() {
        let nba = nba();
        for a in nba.teams() {
            for b in nba.teams() {
                if a != b {
                    assert!(predict(League::Nba, a, b, &nba).unwrap().predicted.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_zero_games_is_stats_lookup_error() {
        let err = predict(League::Nfl, "Team A", "Team C", &nfl()).unwrap_err();
        match err {
            PredictError::StatsLookup(msg) => assert!(msg.contains("Team C")),
            other => panic!("expected StatsLookup, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_team_is_stats_lookup_error() {
        let err = predict(League::Nba, "Lakers", "Knicks", &nba()).unwrap_err();
        assert!(matches!(err, PredictError::StatsLookup(ref m) if m.contains("Knicks")));
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_returns_canonical_names() {
        let p = predict(League::Nba, "lakers", "HEAT", &nba()).unwrap();
        assert_eq!(p.team1, "Lakers");
        assert_eq!(p.team2, "Heat");
        assert_eq!(p.formatted(), "221.1");
    }
}
