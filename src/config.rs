use crate::error::{AppError, Result};

/// Alerts per dashboard page.
pub const PAGE_SIZE: i64 = 20;

/// Row limit for the latest-signal and recent-performance summaries.
pub const SUMMARY_LIMIT: i64 = 25;

/// The scanner counts as healthy while its last run is younger than this.
pub const HEALTHY_WINDOW_SECS: i64 = 900;

/// Performance horizons tracked by the scanner, in hours.
pub const DEFAULT_HORIZONS: &[i32] = &[1, 4, 24];

pub const API_PORT: u16 = 8000;

/// Which optional dashboard sections are queried and rendered.
/// The filtered alert feed and the scanner health are always shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryModes {
    /// Horizons joined into the alert feed (PERF_HORIZONS). Empty means the
    /// schema has a single horizon and `alert_performance` has no
    /// `horizon_hours` column.
    pub horizons: Vec<i32>,
    /// Latest alert per (symbol, type) (SHOW_LATEST_SIGNALS)
    pub latest_signals: bool,
    /// Most recently evaluated alerts (SHOW_RECENT_PERFORMANCE)
    pub recent_performance: bool,
    /// Count / mean return / hit rate per rating (SHOW_RATING_ROLLUP)
    pub rating_rollup: bool,
}

impl Default for QueryModes {
    fn default() -> Self {
        Self {
            horizons: DEFAULT_HORIZONS.to_vec(),
            latest_signals: true,
            recent_performance: true,
            rating_rollup: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub api_port: u16,
    pub page_size: i64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub modes: QueryModes,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't touch the process env.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_string()))?;

        let page_size = match var("PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| AppError::Config("PAGE_SIZE must be a positive integer".to_string()))?,
            None => PAGE_SIZE,
        };

        let horizons = match var("PERF_HORIZONS") {
            Some(raw) => parse_horizons(&raw)?,
            None => DEFAULT_HORIZONS.to_vec(),
        };

        Ok(Self {
            database_url,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: var("API_PORT")
                .unwrap_or_else(|| API_PORT.to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            page_size,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(5),
            db_acquire_timeout_secs: var("DB_ACQUIRE_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(5),
            modes: QueryModes {
                horizons,
                latest_signals: flag(var("SHOW_LATEST_SIGNALS")),
                recent_performance: flag(var("SHOW_RECENT_PERFORMANCE")),
                rating_rollup: flag(var("SHOW_RATING_ROLLUP")),
            },
        })
    }
}

/// Comma-separated positive hour counts, e.g. "1,4,24". Empty disables the join.
fn parse_horizons(raw: &str) -> Result<Vec<i32>> {
    let mut horizons = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let h = part
            .parse::<i32>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| AppError::Config(format!("PERF_HORIZONS entry {part:?} is not a positive integer")))?;
        if !horizons.contains(&h) {
            horizons.push(h);
        }
    }
    Ok(horizons)
}

/// Sections default to on; only an explicit false-ish value turns one off.
fn flag(raw: Option<String>) -> bool {
    match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        Some(v) => !matches!(v.as_str(), "0" | "false" | "no" | "off"),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_database_url_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/scanner")])).unwrap();
        assert_eq!(cfg.api_port, API_PORT);
        assert_eq!(cfg.page_size, PAGE_SIZE);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.modes, QueryModes::default());
    }

    #[test]
    fn sections_toggle_independently() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/scanner"),
            ("PERF_HORIZONS", ""),
            ("SHOW_RATING_ROLLUP", "false"),
            ("SHOW_LATEST_SIGNALS", "yes"),
        ]))
        .unwrap();
        assert!(cfg.modes.horizons.is_empty());
        assert!(!cfg.modes.rating_rollup);
        assert!(cfg.modes.latest_signals);
        assert!(cfg.modes.recent_performance);
    }

    #[test]
    fn horizons_are_parsed_and_deduplicated() {
        assert_eq!(parse_horizons(" 4, 1,4 ,24").unwrap(), vec![4, 1, 24]);
        assert!(parse_horizons("1,x").is_err());
        assert!(parse_horizons("0").is_err());
    }

    #[test]
    fn invalid_port_and_page_size_are_rejected() {
        let bad_port = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/scanner"),
            ("API_PORT", "http"),
        ]));
        assert!(bad_port.is_err());

        let bad_page = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/scanner"),
            ("PAGE_SIZE", "0"),
        ]));
        assert!(bad_page.is_err());
    }
}
