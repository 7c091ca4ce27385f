use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use over_under::{
    DatasetCache, MatchQuery, OverUnderService, PredictError, QueryHistory, SheetSource,
    SourceError, TeamResolver,
};

/// Serves canned ranges and counts every remote read.
#[derive(Default)]
struct CountingSource {
    ranges: HashMap<String, Vec<Vec<String>>>,
    calls: AtomicUsize,
}

impl CountingSource {
    fn with(mut self, range: &str, rows: &[&[&str]]) -> Self {
        self.ranges.insert(
            range.to_string(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetSource for CountingSource {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.get(range).cloned().ok_or_else(|| SourceError::Status {
            status: 400,
            body: format!("Unable to parse range: {}", range),
        })
    }
}

fn source() -> CountingSource {
    CountingSource::default()
        .with(
            "NBA!A1:D31",
            &[
                &["Team", "PPG", "OPP PPG"],
                &["Lakers", "115", "110"],
                &["Celtics", "118", "108"],
            ],
        )
        .with(
            "NFL!A1:D135",
            &[
                &["Team", "G", "PF", "PA"],
                &["Team A", "10", "280", "220"],
                &["Team B", "10", "300", "240"],
                &["Expansion", "0", "", ""],
            ],
        )
        .with("NCAAF!A1:D135", &[&["Team", "G", "PF"], &["Alabama", "12", "480"]])
}

fn service(source: Arc<CountingSource>) -> OverUnderService {
    OverUnderService::new(
        source,
        DatasetCache::new(),
        TeamResolver::default(),
        Duration::from_secs(5),
    )
}

fn query(league: &str, team1: &str, team2: &str) -> MatchQuery {
    MatchQuery {
        league: league.into(),
        team1: team1.into(),
        team2: team2.into(),
    }
}

#[tokio::test]
async fn test_nba_end_to_end() {
    let service = service(Arc::new(source()));
    let mut history = QueryHistory::new();

    let p = service
        .query(&query("NBA", "lakers", "celtics"), &mut history)
        .await
        .unwrap();

    assert_eq!(p.team1, "Lakers");
    assert_eq!(p.team2, "Celtics");
    assert_eq!(p.predicted, 225.5);
}

#[tokio::test]
async fn test_nfl_end_to_end() {
    let service = service(Arc::new(source()));
    let mut history = QueryHistory::new();

    let p = service
        .query(&query("nfl", "team a", "Team B"), &mut history)
        .await
        .unwrap();

    assert_eq!(p.predicted, 52.0);
    assert_eq!(history.list()[0].result, "52.0");
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let source = Arc::new(source());
    let service = service(source.clone());

    let first = service.table("NBA").await.unwrap();
    let second = service.table("nba").await.unwrap();

    assert_eq!(source.calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[tokio::test]
async fn test_cache_is_per_league() {
    let source = Arc::new(source());
    let service = service(source.clone());

    service.table("NBA").await.unwrap();
    service.table("NFL").await.unwrap();
    service.table("NBA").await.unwrap();

    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_first_fetches_stay_consistent() {
    let source = Arc::new(source());
    let service = Arc::new(service(source.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.table("NBA").await.map(|t| t.len()) })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 2);
    }
    // Duplicate fetches are allowed, but never more than one per request.
    assert!((1..=4).contains(&source.calls()));
    assert_eq!(service.cache().len().await, 1);
}

#[tokio::test]
async fn test_unknown_league_makes_no_remote_call() {
    let source = Arc::new(source());
    let service = service(source.clone());
    let mut history = QueryHistory::new();

    let err = service
        .query(&query("MLB", "Yankees", "Mets"), &mut history)
        .await
        .unwrap_err();

    assert!(matches!(err, PredictError::UnknownLeague(ref l) if l == "MLB"));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_missing_column_is_reported_and_not_cached() {
    let source = Arc::new(source());
    let service = service(source.clone());
    let mut history = QueryHistory::new();

    for _ in 0..2 {
        let err = service
            .query(&query("NCAAF", "Alabama", "Alabama"), &mut history)
            .await
            .unwrap_err();
        match err {
            PredictError::MissingColumn { column, .. } => assert_eq!(column, "PA"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    assert_eq!(source.calls(), 2);
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_remote_failure_is_distinct_error() {
    let source = Arc::new(CountingSource::default());
    let service = service(source.clone());

    let err = service.table("NBA").await.unwrap_err();
    assert!(matches!(err, PredictError::RemoteFetchFailed { .. }));
    assert_eq!(service.health().await.consecutive_errors, 1);
}

#[tokio::test]
async fn test_zero_games_is_stats_lookup_error() {
    let service = service(Arc::new(source()));
    let mut history = QueryHistory::new();

    let err = service
        .query(&query("NFL", "Team A", "expansion"), &mut history)
        .await
        .unwrap_err();

    assert!(matches!(err, PredictError::StatsLookup(_)));
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_unresolved_name_reports_closest_candidate() {
    let service = service(Arc::new(CountingSource::default().with(
        "NBA!A1:D31",
        &[&["Team", "PPG", "OPP PPG"], &["Lakers", "115", "110"], &["Celtics", "118", "108"]],
    )));
    let resolver_strict = OverUnderService::new(
        Arc::new(source()),
        DatasetCache::new(),
        TeamResolver::new(0.95, Default::default()),
        Duration::from_secs(5),
    );
    let mut history = QueryHistory::new();

    // Default cutoff accepts the typo.
    assert!(service.query(&query("NBA", "lakrs", "celtics"), &mut history).await.is_ok());

    let err = resolver_strict
        .query(&query("NBA", "lakrs", "celtics"), &mut history)
        .await
        .unwrap_err();
    match err {
        PredictError::UnresolvedTeamName { team1, team2 } => {
            let team1 = team1.unwrap();
            assert_eq!(team1.input, "lakrs");
            assert_eq!(team1.closest.as_deref(), Some("Lakers"));
            assert!(team2.is_none());
        }
        other => panic!("expected UnresolvedTeamName, got {:?}", other),
    }
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_history_records_successes_in_order() {
    let service = service(Arc::new(source()));
    let mut history = QueryHistory::new();

    let queries = [
        query("NBA", "lakers", "celtics"),
        query("NFL", "team a", "team b"),
        query("NBA", "celtics", "lakers"),
    ];
    for q in &queries {
        service.query(q, &mut history).await.unwrap();
    }
    // A failure in between adds nothing.
    assert!(service.query(&query("NBA", "lakers", "zzz"), &mut history).await.is_err());

    let entries = history.list();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].team1, "Lakers");
    assert_eq!(entries[1].team1, "Team A");
    assert_eq!(entries[1].result, "52.0");
    assert_eq!(entries[2].team1, "Celtics");
    assert_eq!(entries[2].result, "225.5");

    history.reset();
    assert!(history.list().is_empty());
}
