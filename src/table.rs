//! Validation and coercion of raw sheet rows into a [`TeamStatsTable`].
//!
//! This is the pure half of the data adapter: it never touches the network,
//! so it can be exercised directly with hand-built rows.
//!
//! Numeric policy: every column other than `Team` is coerced to `f64`.
//! Cells that do not parse (blank, `-`, `N/A`, ...) become `0.0` instead of
//! rejecting the row. Zero-filled stats still take part in the averages.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::PredictError;
use crate::league::{League, TEAM_COLUMN};

/// One team's numeric stats, keyed by header name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRow {
    pub name: String,
    pub stats: HashMap<String, f64>,
}

impl TeamRow {
    pub fn stat(&self, column: &str) -> Option<f64> {
        self.stats.get(column).copied()
    }
}

/// Validated stats for every team in one league tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamStatsTable {
    league: League,
    columns: Vec<String>,
    rows: Vec<TeamRow>,
    /// Lowercased team name -> position in `rows`.
    index: HashMap<String, usize>,
}

impl TeamStatsTable {
    /// Build a table from the raw cell grid returned by the sheet.
    ///
    /// The first row is the header. Every column the league schema requires
    /// must be present in it.
    pub fn from_rows(league: League, values: Vec<Vec<String>>) -> Result<Self, PredictError> {
        let mut rows_iter = values.into_iter();
        let header: Vec<String> = match rows_iter.next() {
            Some(header) => header.into_iter().map(|h| h.trim().to_string()).collect(),
            None => return Err(PredictError::EmptyDataset(league.name().to_string())),
        };

        for column in league.required_columns() {
            if !header.iter().any(|h| h == column) {
                return Err(PredictError::MissingColumn {
                    league: league.name().to_string(),
                    column: column.to_string(),
                });
            }
        }

        let team_idx = header
            .iter()
            .position(|h| h == TEAM_COLUMN)
            .ok_or_else(|| PredictError::MissingColumn {
                league: league.name().to_string(),
                column: TEAM_COLUMN.to_string(),
            })?;

        let mut rows = Vec::new();
        let mut index = HashMap::new();
        let mut zero_filled = 0usize;

        for (line, record) in rows_iter.enumerate() {
            let name = record
                .get(team_idx)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                warn!("{}: skipping row {} with blank team name", league, line + 2);
                continue;
            }

            let key = name.to_lowercase();
            if index.contains_key(&key) {
                warn!("{}: duplicate team '{}' at row {}, keeping first", league, name, line + 2);
                continue;
            }

            let mut stats = HashMap::with_capacity(header.len().saturating_sub(1));
            for (col, column) in header.iter().enumerate() {
                if col == team_idx || column.is_empty() {
                    continue;
                }
                // Short rows: the sheets API drops trailing empty cells.
                let cell = record.get(col).map(String::as_str).unwrap_or("");
                let value = coerce_numeric(cell).unwrap_or_else(|| {
                    zero_filled += 1;
                    0.0
                });
                stats.insert(column.clone(), value);
            }

            index.insert(key, rows.len());
            rows.push(TeamRow { name, stats });
        }

        if rows.is_empty() {
            return Err(PredictError::EmptyDataset(league.name().to_string()));
        }

        if zero_filled > 0 {
            debug!("{}: {} non-numeric cells coerced to 0", league, zero_filled);
        }

        Ok(Self {
            league,
            columns: header,
            rows,
            index,
        })
    }

    pub fn league(&self) -> League {
        self.league
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Case-insensitive row lookup.
    pub fn get(&self, team: &str) -> Option<&TeamRow> {
        self.index
            .get(&team.trim().to_lowercase())
            .map(|&i| &self.rows[i])
    }

    /// Canonical team names in sheet order.
    pub fn teams(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[TeamRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse a sheet cell as a finite number. `None` means "zero-fill".
///
/// Commas are only accepted as thousands separators in the integer part
/// (`1,234,567.5`); any other comma (`12,5`, `1,23`) zero-fills the cell.
pub fn coerce_numeric(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = if trimmed.contains(',') {
        strip_thousands(trimmed)?
    } else {
        trimmed.to_string()
    };
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Remove well-formed thousands separators: 1-3 leading digits, then
/// groups of exactly three.
fn strip_thousands(s: &str) -> Option<String> {
    let (sign, rest) = match s.strip_prefix(['-', '+']) {
        Some(rest) => (&s[..1], rest),
        None => ("", s),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (rest, None),
    };
    if frac_part.is_some_and(|f| f.contains(',')) {
        return None;
    }

    let mut groups = int_part.split(',');
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 || !lead.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits = lead.to_string();
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }

    Some(match frac_part {
        Some(frac) => format!("{}{}.{}", sign, digits, frac),
        None => format!("{}{}", sign, digits),
    })
}
