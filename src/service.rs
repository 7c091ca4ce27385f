//! The query pipeline: dataset cache -> name resolution -> prediction ->
//! history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::DatasetCache;
use crate::error::{PredictError, UnresolvedName};
use crate::history::{HistoryEntry, QueryHistory};
use crate::league::League;
use crate::predict::{predict, Prediction};
use crate::resolver::TeamResolver;
use crate::sheets::{fetch_table, SheetSource};
use crate::table::TeamStatsTable;

/// One user request: a league key and two free-text team names
#[derive(Debug, Clone, Deserialize)]
pub struct MatchQuery {
    pub league: String,
    pub team1: String,
    pub team2: String,
}

/// Fetch bookkeeping for the health endpoint
#[derive(Clone)]
pub struct HealthState {
    pub last_fetch_time: Arc<RwLock<Option<DateTime<Utc>>>>,
    pub fetch_count: Arc<RwLock<usize>>,
    pub error_count: Arc<RwLock<usize>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            last_fetch_time: Arc::new(RwLock::new(None)),
            fetch_count: Arc::new(RwLock::new(0)),
            error_count: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn record_success(&self) {
        *self.last_fetch_time.write().await = Some(Utc::now());
        *self.fetch_count.write().await += 1;
        *self.error_count.write().await = 0;
    }

    pub async fn record_error(&self) {
        *self.error_count.write().await += 1;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub cached_leagues: Vec<League>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub fetch_count: usize,
    pub consecutive_errors: usize,
}

/// Over/under prediction service. Shared state is injected, not global.
pub struct OverUnderService {
    source: Arc<dyn SheetSource>,
    cache: DatasetCache,
    resolver: TeamResolver,
    fetch_timeout: Duration,
    health: HealthState,
}

impl OverUnderService {
    pub fn new(
        source: Arc<dyn SheetSource>,
        cache: DatasetCache,
        resolver: TeamResolver,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            resolver,
            fetch_timeout,
            health: HealthState::new(),
        }
    }

    pub fn leagues(&self) -> &'static [League] {
        &League::ALL
    }

    pub fn resolver(&self) -> &TeamResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Cached table for a league key, fetching it on first use.
    ///
    /// Unknown keys fail before any remote call. Concurrent first requests
    /// for one league may both fetch; the later `put` wins.
    pub async fn table(&self, league_key: &str) -> Result<Arc<TeamStatsTable>, PredictError> {
        let league = League::parse_key(league_key)?;

        if let Some(table) = self.cache.get(league).await {
            return Ok(table);
        }

        info!("{} not cached, fetching from sheet", league);
        match fetch_table(self.source.as_ref(), league, self.fetch_timeout).await {
            Ok(table) => {
                self.health.record_success().await;
                info!("Cached {} teams for {}", table.len(), league);
                Ok(self.cache.put(league, table).await)
            }
            Err(e) => {
                self.health.record_error().await;
                Err(e)
            }
        }
    }

    /// Canonical team names for a league, in sheet order
    pub async fn teams(&self, league_key: &str) -> Result<Vec<String>, PredictError> {
        let table = self.table(league_key).await?;
        Ok(table.teams().into_iter().map(str::to_string).collect())
    }

    /// Run one query end to end. History is appended only on success.
    pub async fn query(
        &self,
        query: &MatchQuery,
        history: &mut QueryHistory,
    ) -> Result<Prediction, PredictError> {
        let table = self.table(&query.league).await?;
        let league = table.league();
        let candidates = table.teams();

        let team1 = self.resolver.resolve(&query.team1, &candidates);
        let team2 = self.resolver.resolve(&query.team2, &candidates);

        let (team1, team2) = match (team1, team2) {
            (Some(t1), Some(t2)) => (t1, t2),
            (t1, t2) => {
                let unresolved = |raw: &str, found: Option<&str>| match found {
                    Some(_) => None,
                    None => Some(UnresolvedName {
                        input: raw.to_string(),
                        closest: self
                            .resolver
                            .closest(raw, &candidates)
                            .map(|(name, _)| name.to_string()),
                    }),
                };
                let err = PredictError::UnresolvedTeamName {
                    team1: unresolved(&query.team1, t1),
                    team2: unresolved(&query.team2, t2),
                };
                info!("{}: {}", league, err);
                return Err(err);
            }
        };

        if team1 == team2 {
            warn!("{}: both inputs resolved to '{}'", league, team1);
        }

        let prediction = predict(league, team1, team2, &table)?;
        info!(
            "{}: {} vs {} -> {}",
            league,
            prediction.team1,
            prediction.team2,
            prediction.formatted()
        );

        history.append(HistoryEntry::from(&prediction));
        Ok(prediction)
    }

    pub async fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            cached_leagues: self.cache.leagues().await,
            last_fetch: *self.health.last_fetch_time.read().await,
            fetch_count: *self.health.fetch_count.read().await,
            consecutive_errors: *self.health.error_count.read().await,
        }
    }
}
