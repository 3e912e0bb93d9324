use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

/// Widest recency window honoured, in hours (about 100 years). Anything wider
/// is no constraint on real data, and would push the cutoff past the range
/// Postgres timestamps can represent.
pub const MAX_RECENCY_HOURS: i32 = 876_000;

/// Raw dashboard query string. Every field stays a string so a malformed
/// `hours` or `page` never rejects the request.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub symbol: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub hours: Option<String>,
    pub page: Option<String>,
}

/// Normalized alert filters. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    /// Case-insensitive substring of the symbol.
    pub symbol: Option<String>,
    /// Exact alert type.
    pub alert_type: Option<String>,
    /// Only alerts signalled within this many hours, 1..=MAX_RECENCY_HOURS.
    pub hours: Option<i32>,
    /// 1-based, already clamped below. `Pagination::new` clamps it above.
    pub page: i64,
}

impl AlertFilter {
    pub fn from_query(q: &DashboardQuery) -> Self {
        Self {
            symbol: non_empty(q.symbol.as_deref()),
            alert_type: non_empty(q.alert_type.as_deref()),
            hours: non_empty(q.hours.as_deref())
                .and_then(|s| s.parse::<i32>().ok())
                .filter(|h| (1..=MAX_RECENCY_HOURS).contains(h)),
            page: non_empty(q.page.as_deref())
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(1)
                .max(1),
        }
    }

    /// Appends ` WHERE ...` (or nothing) for the alerts table aliased `a`.
    /// Values are always bound, never written into the SQL text.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut sep = " WHERE ";
        if let Some(symbol) = &self.symbol {
            qb.push(sep)
                .push("a.symbol ILIKE ")
                .push_bind(format!("%{}%", escape_like(symbol)));
            sep = " AND ";
        }
        if let Some(alert_type) = &self.alert_type {
            qb.push(sep).push("a.type = ").push_bind(alert_type.clone());
            sep = " AND ";
        }
        if let Some(hours) = self.hours {
            qb.push(sep)
                .push("a.signal_time >= NOW() - make_interval(hours => ")
                .push_bind(hours)
                .push(")");
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Makes LIKE wildcards in user input match literally (Postgres' default escape is `\`).
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Pages past the end land on the last page.
    pub fn new(page: i64, page_size: i64, total: i64) -> Self {
        let page_size = page_size.max(1);
        let total = total.max(0);
        let total_pages = (total / page_size + i64::from(total % page_size != 0)).max(1);
        Self {
            page: page.clamp(1, total_pages),
            page_size,
            total,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(symbol: &str, alert_type: &str, hours: &str, page: &str) -> DashboardQuery {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        DashboardQuery {
            symbol: opt(symbol),
            alert_type: opt(alert_type),
            hours: opt(hours),
            page: opt(page),
        }
    }

    #[test]
    fn absent_params_give_empty_filter_on_page_one() {
        let f = AlertFilter::from_query(&DashboardQuery::default());
        assert_eq!(f, AlertFilter { page: 1, ..Default::default() });
    }

    #[test]
    fn page_below_one_is_clamped() {
        for raw in ["0", "-3", "-9999"] {
            assert_eq!(AlertFilter::from_query(&query("", "", "", raw)).page, 1);
        }
        assert_eq!(AlertFilter::from_query(&query("", "", "", "4")).page, 4);
    }

    #[test]
    fn malformed_numbers_are_ignored() {
        let f = AlertFilter::from_query(&query("btc", "", "soon", "two"));
        assert_eq!(f.hours, None);
        assert_eq!(f.page, 1);
        assert_eq!(f.symbol.as_deref(), Some("btc"));

        assert_eq!(AlertFilter::from_query(&query("", "", "-5", "")).hours, None);
        assert_eq!(AlertFilter::from_query(&query("", "", " 6 ", "")).hours, Some(6));
    }

    #[test]
    fn recency_beyond_timestamp_range_is_ignored() {
        assert_eq!(AlertFilter::from_query(&query("", "", "2000000000", "")).hours, None);
        assert_eq!(
            AlertFilter::from_query(&query("", "", &MAX_RECENCY_HOURS.to_string(), "")).hours,
            Some(MAX_RECENCY_HOURS)
        );
        assert_eq!(
            AlertFilter::from_query(&query("", "", &(MAX_RECENCY_HOURS + 1).to_string(), "")).hours,
            None
        );
        // Past i32 range: fails to parse and is dropped too.
        assert_eq!(AlertFilter::from_query(&query("", "", "99999999999", "")).hours, None);
    }

    #[test]
    fn blank_strings_are_absent() {
        let q = DashboardQuery {
            symbol: Some("   ".to_string()),
            alert_type: Some(String::new()),
            ..Default::default()
        };
        let f = AlertFilter::from_query(&q);
        assert!(f.symbol.is_none());
        assert!(f.alert_type.is_none());
    }

    #[test]
    fn no_filters_push_no_where_clause() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM alerts a");
        AlertFilter::from_query(&DashboardQuery::default()).push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM alerts a");
    }

    #[test]
    fn filters_are_anded_and_bound() {
        let hostile = "x'; DROP TABLE alerts; --";
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM alerts a");
        AlertFilter::from_query(&query(hostile, "buy", "24", "")).push_where(&mut qb);
        let sql = qb.sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM alerts a WHERE a.symbol ILIKE $1 AND a.type = $2 \
             AND a.signal_time >= NOW() - make_interval(hours => $3)"
        );
        assert!(!sql.contains("DROP"));
        assert!(!sql.contains("buy"));
    }

    #[test]
    fn single_filter_has_no_dangling_and() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM alerts a");
        AlertFilter::from_query(&query("", "", "12", "")).push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM alerts a WHERE a.signal_time >= NOW() - make_interval(hours => $1)"
        );
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("BTC_USD"), "BTC\\_USD");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("eth"), "eth");
    }

    #[test]
    fn total_pages_has_a_floor_of_one() {
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 1).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).total_pages, 2);
        assert_eq!(Pagination::new(1, 20, 400).total_pages, 20);
    }

    #[test]
    fn offset_and_navigation() {
        let p = Pagination::new(3, 20, 95);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.total_pages, 5);
        assert!(p.has_prev());
        assert!(p.has_next());

        let first = Pagination::new(0, 20, 5);
        assert_eq!(first.page, 1);
        assert_eq!(first.offset(), 0);
        assert!(!first.has_prev());
        assert!(!first.has_next());
    }

    #[test]
    fn huge_page_lands_on_last_page() {
        let f = AlertFilter::from_query(&query("", "", "", &i64::MAX.to_string()));
        assert_eq!(f.page, i64::MAX);

        let p = Pagination::new(f.page, 20, 3);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(f.page, 20, 95);
        assert_eq!(p.page, 5);
        assert_eq!(p.offset(), 80);
        assert!(!p.has_next());
    }

    #[test]
    fn offset_never_goes_negative() {
        let p = Pagination::new(i64::MAX, i64::MAX, i64::MAX);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(i64::MAX, 1, i64::MAX);
        assert_eq!(p.total_pages, i64::MAX);
        assert!(p.offset() >= 0);
    }
}
