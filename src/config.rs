use anyhow::{anyhow, Context, Result};
use std::env;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::history::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE};
use crate::resolver::{SimilarityMetric, DEFAULT_CUTOFF};
use crate::sheets::SheetsAuth;

pub const DEFAULT_SPREADSHEET_ID: &str = "1ub_a9jetvc9BB6paGVIQ_0N_ETXLMEG43tD7zeE3Ljg";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const ACCESS_TOKEN_SECRET: &str = "/run/secrets/sheets_access_token";

/// Configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub spreadsheet_id: String,
    pub sheets_base_url: String,
    pub auth: SheetsAuth,
    pub port: u16,
    pub fetch_timeout: Duration,
    pub match_cutoff: f64,
    pub match_metric: SimilarityMetric,
    pub requests_per_minute: NonZeroU32,
    pub session_idle: Duration,
    pub max_sessions: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), read_secret_file)
    }

    /// Build from any key lookup; `secret` reads a mounted secret file.
    pub fn from_lookup<F, S>(var: F, secret: S) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        S: Fn(&str) -> Result<String>,
    {
        // Credentials come from the external identity provider:
        // - access token via env or a mounted secret file
        // - or a plain API key for publicly shared sheets
        let auth = match (var("SHEETS_ACCESS_TOKEN"), var("SHEETS_API_KEY")) {
            (Some(v), _) if !v.trim().is_empty() => SheetsAuth::BearerToken(v.trim().to_string()),
            (Some(_), _) => return Err(anyhow!("SHEETS_ACCESS_TOKEN is set but empty")),
            (None, Some(v)) if !v.trim().is_empty() => SheetsAuth::ApiKey(v.trim().to_string()),
            (None, Some(_)) => return Err(anyhow!("SHEETS_API_KEY is set but empty")),
            (None, None) => SheetsAuth::BearerToken(secret(ACCESS_TOKEN_SECRET)?),
        };

        let spreadsheet_id = match var("SPREADSHEET_ID") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            Some(_) => return Err(anyhow!("SPREADSHEET_ID is set but empty")),
            None => DEFAULT_SPREADSHEET_ID.to_string(),
        };

        let sheets_base_url = var("SHEETS_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string());

        let port: u16 = parse_or(&var, "PORT", 5000)?;

        let timeout_secs: u64 = parse_or(&var, "FETCH_TIMEOUT_SECONDS", 30)?;
        if timeout_secs == 0 {
            return Err(anyhow!("FETCH_TIMEOUT_SECONDS must be greater than 0"));
        }

        let match_cutoff: f64 = parse_or(&var, "MATCH_CUTOFF", DEFAULT_CUTOFF)?;
        if !(0.0..=1.0).contains(&match_cutoff) {
            return Err(anyhow!(
                "MATCH_CUTOFF must be between 0 and 1, got {}",
                match_cutoff
            ));
        }

        let match_metric = match var("MATCH_METRIC") {
            Some(v) => v.parse::<SimilarityMetric>().map_err(|e| anyhow!(e))?,
            None => SimilarityMetric::default(),
        };

        let requests_per_minute: u32 = parse_or(&var, "SHEETS_REQUESTS_PER_MINUTE", 60)?;
        let requests_per_minute = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| anyhow!("SHEETS_REQUESTS_PER_MINUTE must be greater than 0"))?;

        let session_idle_secs: u64 =
            parse_or(&var, "SESSION_IDLE_SECONDS", DEFAULT_SESSION_IDLE.as_secs())?;
        if session_idle_secs == 0 {
            return Err(anyhow!("SESSION_IDLE_SECONDS must be greater than 0"));
        }

        let max_sessions: usize = parse_or(&var, "MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        if max_sessions == 0 {
            return Err(anyhow!("MAX_SESSIONS must be greater than 0"));
        }

        Ok(Self {
            spreadsheet_id,
            sheets_base_url,
            auth,
            port,
            fetch_timeout: Duration::from_secs(timeout_secs),
            match_cutoff,
            match_metric,
            requests_per_minute,
            session_idle: Duration::from_secs(session_idle_secs),
            max_sessions,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, v)),
        _ => Ok(default),
    }
}

/// Read a secret from a mounted secret file
fn read_secret_file(file_path: &str) -> Result<String> {
    let value = std::fs::read_to_string(file_path)
        .map(|s| s.trim().to_string())
        .with_context(|| {
            format!(
                "No sheets credentials: set SHEETS_ACCESS_TOKEN or SHEETS_API_KEY, or mount {}",
                file_path
            )
        })?;
    if value.is_empty() {
        return Err(anyhow!("Secret file {} is empty", file_path));
    }
    Ok(value)
}
