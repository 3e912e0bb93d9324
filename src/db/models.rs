/// Row types read from the scanner's schema (scanner_status, alerts,
/// alert_performance). The dashboard never writes to these tables.
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AlertRow {
    pub symbol: String,
    #[sqlx(rename = "type")]
    pub alert_type: String,
    pub signal_time: DateTime<Utc>,
    pub price: Option<f64>,
    pub rating: Option<String>,
}

/// An alert from the filtered feed with its return at each tracked horizon.
/// `returns[i]` pairs with `QueryModes::horizons[i]`; None means not yet evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertFeedRow {
    pub alert: AlertRow,
    pub returns: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PerformanceRow {
    pub alert_id: i64,
    pub symbol: String,
    #[sqlx(rename = "type")]
    pub alert_type: String,
    pub rating: Option<String>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub return_pct: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    /// NULL on single-horizon schemas.
    pub horizon_hours: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RatingRollup {
    pub rating: Option<String>,
    pub horizon_hours: Option<i32>,
    /// Rows with a known return_pct.
    pub evaluated: i64,
    pub avg_return: Option<f64>,
    /// Evaluated rows with a positive return.
    pub wins: i64,
}

impl RatingRollup {
    /// Fraction of evaluated alerts with a positive return, to 2 decimals.
    /// None when nothing under this rating has been evaluated yet.
    pub fn hit_rate(&self) -> Option<f64> {
        if self.evaluated == 0 {
            return None;
        }
        Some(round2(self.wins as f64 / self.evaluated as f64))
    }

    pub fn mean_return(&self) -> Option<f64> {
        self.avg_return.map(round2)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
