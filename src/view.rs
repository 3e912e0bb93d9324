//! Everything the dashboard page renders, gathered in one typed struct.

use chrono::{DateTime, Utc};

use crate::db::filter::{AlertFilter, Pagination};
use crate::db::models::{AlertFeedRow, AlertRow, PerformanceRow, RatingRollup};
use crate::health::ScannerHealth;

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub health: ScannerHealth,
    /// Effective filters, echoed back into the form.
    pub filter: AlertFilter,
    /// Column order for `AlertFeedRow::returns`.
    pub horizons: Vec<i32>,
    pub alerts: Vec<AlertFeedRow>,
    pub pagination: Pagination,
    /// None when the section is switched off.
    pub latest_signals: Option<Vec<AlertRow>>,
    pub recent_performance: Option<Vec<PerformanceRow>>,
    pub rating_rollup: Option<Vec<RatingRollup>>,
}
