//! Remote tabular data source.
//!
//! [`SheetSource`] is the seam the pipeline reads through; production uses
//! [`GoogleSheetsClient`] (Sheets API v4 `values.get`), tests swap in stubs.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{error, info};

use crate::error::{PredictError, SourceError};
use crate::league::League;
use crate::table::TeamStatsTable;

/// A remote read of a rectangular cell range. The first row is the header.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError>;
}

/// How requests to the Sheets API are authorized. Tokens are obtained and
/// refreshed by an external credential provider.
#[derive(Clone)]
pub enum SheetsAuth {
    BearerToken(String),
    ApiKey(String),
}

impl std::fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsAuth::BearerToken(_) => f.write_str("BearerToken(***)"),
            SheetsAuth::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

/// `values.get` response body
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ValueRange {
    range: String,
    values: Vec<Vec<serde_json::Value>>,
}

type DirectLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Google Sheets API v4 client for one spreadsheet
pub struct GoogleSheetsClient {
    base_url: String,
    spreadsheet_id: String,
    auth: SheetsAuth,
    http_client: reqwest::Client,
    rate_limiter: DirectLimiter,
}

impl GoogleSheetsClient {
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        auth: SheetsAuth,
        requests_per_minute: NonZeroU32,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            auth,
            http_client,
            rate_limiter: RateLimiter::direct(Quota::per_minute(requests_per_minute)),
        })
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SourceError::Malformed(format!("bad base url '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Malformed(format!("base url '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.rate_limiter.until_ready().await;

        let url = self.values_url(range)?;
        let request = match &self.auth {
            SheetsAuth::BearerToken(token) => self.http_client.get(url).bearer_auth(token),
            SheetsAuth::ApiKey(key) => self.http_client.get(url).query(&[("key", key)]),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ValueRange =
            serde_json::from_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;

        info!("Read {} rows from {}", parsed.values.len(), parsed.range);
        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

/// Cells normally arrive as formatted strings; unformatted reads can
/// return raw numbers or booleans.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fetch one league's tab and validate it into a table.
///
/// Performs exactly one remote read, bounded by `timeout`. No retries.
pub async fn fetch_table(
    source: &dyn SheetSource,
    league: League,
    timeout: Duration,
) -> Result<TeamStatsTable, PredictError> {
    info!("Fetching {} stats from range {}", league, league.range());

    let values = match tokio::time::timeout(timeout, source.read_range(league.range())).await {
        Ok(Ok(values)) => values,
        Ok(Err(e)) => return Err(remote_failure(league, e)),
        Err(_) => return Err(remote_failure(league, SourceError::Timeout(timeout.as_secs()))),
    };

    TeamStatsTable::from_rows(league, values)
}

fn remote_failure(league: League, err: SourceError) -> PredictError {
    error!("An API error occurred while fetching {}: {}", league, err);
    PredictError::RemoteFetchFailed {
        league: league.name().to_string(),
        reason: err.to_string(),
    }
}
