//! Process-wide dataset cache.
//!
//! One validated table per league, filled on first use and kept for the
//! life of the process. No eviction, no TTL. Tables are shared as `Arc`s and
//! never mutated after insertion; `put` replaces the whole entry, so the
//! last writer wins when two requests fetch the same league at once.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::league::League;
use crate::table::TeamStatsTable;

#[derive(Clone, Default)]
pub struct DatasetCache {
    inner: Arc<RwLock<HashMap<League, Arc<TeamStatsTable>>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached table if this league was already fetched
    pub async fn get(&self, league: League) -> Option<Arc<TeamStatsTable>> {
        let cache = self.inner.read().await;
        cache.get(&league).cloned()
    }

    /// Store a table, replacing any earlier one for the same league
    pub async fn put(&self, league: League, table: TeamStatsTable) -> Arc<TeamStatsTable> {
        let table = Arc::new(table);
        let mut cache = self.inner.write().await;
        if cache.insert(league, Arc::clone(&table)).is_some() {
            debug!("Replaced cached {} table (concurrent fetch)", league);
        }
        table
    }

    /// Leagues currently held, in a stable order
    pub async fn leagues(&self) -> Vec<League> {
        let cache = self.inner.read().await;
        League::ALL
            .into_iter()
            .filter(|l| cache.contains_key(l))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nba_table(ppg: &str) -> TeamStatsTable {
        TeamStatsTable::from_rows(
            League::Nba,
            vec![
                vec!["Team".into(), "PPG".into(), "OPP PPG".into()],
                vec!["Lakers".into(), ppg.into(), "110".into()],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_after_put() {
        let cache = DatasetCache::new();
        assert!(cache.get(League::Nba).await.is_none());

        let stored = cache.put(League::Nba, nba_table("115")).await;
        let fetched = cache.get(League::Nba).await.unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));
        assert!(cache.get(League::Nfl).await.is_none());
        assert_eq!(cache.leagues().await, vec![League::Nba]);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = DatasetCache::new();
        cache.put(League::Nba, nba_table("100")).await;
        cache.put(League::Nba, nba_table("120")).await;

        let table = cache.get(League::Nba).await.unwrap();
        assert_eq!(table.get("lakers").unwrap().stat("PPG"), Some(120.0));
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn test_clones_share_state() {
        tokio_test::block_on(async {
            let cache = DatasetCache::new();
            let handle = cache.clone();
            handle.put(League::Nba, nba_table("115")).await;
            assert!(!cache.is_empty().await);
        });
    }
}
