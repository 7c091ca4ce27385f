//! Over/under line predictions from per-league team season stats.
//!
//! Team stats live in one spreadsheet tab per league. A query names a
//! league and two teams in free text; the pipeline loads (and caches) the
//! league's table, resolves both names to canonical teams, and averages
//! their scoring into a predicted combined total.

pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod league;
pub mod predict;
pub mod resolver;
pub mod server;
pub mod service;
pub mod sheets;
pub mod table;

pub use cache::DatasetCache;
pub use error::{PredictError, SourceError, UnresolvedName};
pub use history::{HistoryEntry, QueryHistory, SessionStore};
pub use league::{League, StatFamily};
pub use predict::{predict, Prediction};
pub use resolver::{SimilarityMetric, TeamResolver};
pub use service::{MatchQuery, OverUnderService};
pub use sheets::{GoogleSheetsClient, SheetSource, SheetsAuth};
pub use table::TeamStatsTable;
