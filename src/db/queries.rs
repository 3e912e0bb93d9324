use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder, Row, TypeInfo, ValueRef};

use crate::db::filter::{AlertFilter, Pagination};
use crate::db::models::{AlertFeedRow, AlertRow, PerformanceRow, RatingRollup};
use crate::error::Result;
use crate::health::LastRun;

// Numeric columns are cast to float8 and ratings to text so integer, numeric
// and text variants of the scanner schema all decode the same way.

/// Reads the scanner's freshness marker. None when the table is empty or the value is NULL.
pub async fn fetch_last_run(conn: &mut PgConnection) -> Result<Option<LastRun>> {
    let Some(row) = sqlx::query("SELECT last_run FROM scanner_status LIMIT 1")
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let raw = row.try_get_raw("last_run")?;
    if raw.is_null() {
        return Ok(None);
    }
    let last_run = match raw.type_info().name() {
        "DATE" => LastRun::Date(row.try_get("last_run")?),
        "TIMESTAMP" => LastRun::Naive(row.try_get("last_run")?),
        _ => LastRun::Utc(row.try_get("last_run")?),
    };
    Ok(Some(last_run))
}

pub async fn count_alerts(conn: &mut PgConnection, filter: &AlertFilter) -> Result<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM alerts a");
    filter.push_where(&mut qb);
    let total = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(total)
}

/// Builds the page query: newest first, one LEFT JOIN per horizon so alerts
/// without performance rows are kept with NULL returns.
fn alert_page_query<'a>(
    filter: &AlertFilter,
    horizons: &[i32],
    pagination: &Pagination,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT a.symbol, a.type, a.signal_time::timestamptz AS signal_time, \
         a.price::float8 AS price, a.rating::text AS rating",
    );
    for i in 0..horizons.len() {
        qb.push(format!(", p{i}.return_pct::float8 AS ret_{i}"));
    }
    qb.push(" FROM alerts a");
    for (i, hours) in horizons.iter().enumerate() {
        qb.push(format!(
            " LEFT JOIN alert_performance p{i} ON p{i}.alert_id = a.id AND p{i}.horizon_hours = "
        ))
        .push_bind(*hours);
    }
    filter.push_where(&mut qb);
    qb.push(" ORDER BY a.signal_time DESC, a.id DESC LIMIT ")
        .push_bind(pagination.page_size)
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    qb
}

pub async fn fetch_alert_page(
    conn: &mut PgConnection,
    filter: &AlertFilter,
    horizons: &[i32],
    pagination: &Pagination,
) -> Result<Vec<AlertFeedRow>> {
    let mut qb = alert_page_query(filter, horizons, pagination);
    let rows = qb.build().fetch_all(&mut *conn).await?;

    let mut feed = Vec::with_capacity(rows.len());
    for row in &rows {
        let alert = AlertRow::from_row(row)?;
        let returns = (0..horizons.len())
            .map(|i| row.try_get::<Option<f64>, _>(format!("ret_{i}").as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        feed.push(AlertFeedRow { alert, returns });
    }
    Ok(feed)
}

/// Most recent alert per (symbol, type), newest first.
pub async fn fetch_latest_signals(conn: &mut PgConnection, limit: i64) -> Result<Vec<AlertRow>> {
    let rows = sqlx::query_as::<_, AlertRow>(
        r#"
        SELECT symbol, type, signal_time, price, rating
        FROM (
            SELECT DISTINCT ON (symbol, type)
                symbol,
                type,
                signal_time::timestamptz AS signal_time,
                price::float8 AS price,
                rating::text AS rating
            FROM alerts
            ORDER BY symbol, type, signal_time DESC
        ) t
        ORDER BY signal_time DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

fn recent_performance_sql(horizons_enabled: bool) -> String {
    let horizon = if horizons_enabled {
        "horizon_hours::int4"
    } else {
        "NULL::int4"
    };
    format!(
        "SELECT alert_id::int8 AS alert_id, symbol, type, rating::text AS rating, \
         entry_price::float8 AS entry_price, exit_price::float8 AS exit_price, \
         return_pct::float8 AS return_pct, exit_time::timestamptz AS exit_time, \
         {horizon} AS horizon_hours \
         FROM alert_performance \
         ORDER BY exit_time DESC NULLS LAST \
         LIMIT $1"
    )
}

/// Latest evaluated outcomes; rows still awaiting an exit sort last.
pub async fn fetch_recent_performance(
    conn: &mut PgConnection,
    horizons_enabled: bool,
    limit: i64,
) -> Result<Vec<PerformanceRow>> {
    let sql = recent_performance_sql(horizons_enabled);
    let rows = sqlx::query_as::<_, PerformanceRow>(&sql)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

const ROLLUP_BY_RATING: &str = r#"
    SELECT
        p.rating::text AS rating,
        NULL::int4 AS horizon_hours,
        COUNT(p.return_pct) AS evaluated,
        AVG(p.return_pct)::float8 AS avg_return,
        COUNT(*) FILTER (WHERE p.return_pct > 0) AS wins
    FROM alert_performance p
    GROUP BY p.rating
    ORDER BY p.rating
"#;

const ROLLUP_BY_RATING_AND_HORIZON: &str = r#"
    SELECT
        p.rating::text AS rating,
        p.horizon_hours::int4 AS horizon_hours,
        COUNT(p.return_pct) AS evaluated,
        AVG(p.return_pct)::float8 AS avg_return,
        COUNT(*) FILTER (WHERE p.return_pct > 0) AS wins
    FROM alert_performance p
    WHERE p.horizon_hours = ANY($1)
    GROUP BY p.rating, p.horizon_hours
    ORDER BY p.rating, p.horizon_hours
"#;

/// Per-rating counts and mean return; split by horizon when horizons are tracked.
/// Hit rate is derived in `RatingRollup::hit_rate` so an empty group never divides.
pub async fn fetch_rating_rollup(conn: &mut PgConnection, horizons: &[i32]) -> Result<Vec<RatingRollup>> {
    let rows = if horizons.is_empty() {
        sqlx::query_as::<_, RatingRollup>(ROLLUP_BY_RATING)
            .fetch_all(&mut *conn)
            .await?
    } else {
        sqlx::query_as::<_, RatingRollup>(ROLLUP_BY_RATING_AND_HORIZON)
            .bind(horizons)
            .fetch_all(&mut *conn)
            .await?
    };
    Ok(rows)
}
