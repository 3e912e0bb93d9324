use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::{QueryModes, SUMMARY_LIMIT};
use crate::db::filter::{AlertFilter, DashboardQuery, Pagination};
use crate::db::queries;
use crate::error::AppError;
use crate::health::ScannerHealth;
use crate::render;
use crate::view::DashboardView;

#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub modes: Arc<QueryModes>,
    pub page_size: i64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Liveness for process supervisors. Never touches the database.
async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_dashboard(
    State(state): State<ApiState>,
    query: Option<Query<DashboardQuery>>,
) -> Result<Html<String>, AppError> {
    // An unparseable query string is treated like an empty one.
    let params = query.map(|Query(q)| q).unwrap_or_default();
    let filter = AlertFilter::from_query(&params);
    let modes = &state.modes;
    debug!(?filter, "dashboard request");

    // One connection per request; it goes back to the pool when dropped,
    // whichever way this handler returns.
    let mut conn = state.pool.acquire().await?;

    let last_run = queries::fetch_last_run(&mut conn).await?;
    let total = queries::count_alerts(&mut conn, &filter).await?;
    let pagination = Pagination::new(filter.page, state.page_size, total);
    let alerts = queries::fetch_alert_page(&mut conn, &filter, &modes.horizons, &pagination).await?;

    let latest_signals = if modes.latest_signals {
        Some(queries::fetch_latest_signals(&mut conn, SUMMARY_LIMIT).await?)
    } else {
        None
    };
    let recent_performance = if modes.recent_performance {
        Some(queries::fetch_recent_performance(&mut conn, !modes.horizons.is_empty(), SUMMARY_LIMIT).await?)
    } else {
        None
    };
    let rating_rollup = if modes.rating_rollup {
        Some(queries::fetch_rating_rollup(&mut conn, &modes.horizons).await?)
    } else {
        None
    };
    drop(conn);

    let now = Utc::now();
    let view = DashboardView {
        generated_at: now,
        health: ScannerHealth::evaluate(last_run, now),
        filter,
        horizons: modes.horizons.clone(),
        alerts,
        pagination,
        latest_signals,
        recent_performance,
        rating_rollup,
    };
    debug!(
        healthy = view.health.healthy,
        total = view.pagination.total,
        page = view.pagination.page,
        "dashboard rendered"
    );

    Ok(Html(render::dashboard(&view)?))
}
