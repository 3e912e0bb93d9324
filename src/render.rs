//! HTML rendering for the dashboard page. Every string that reaches the page
//! goes through `Escaped`, including values echoed back from the query string.

use std::fmt::{self, Display, Write};

use chrono::{DateTime, Utc};

use crate::db::filter::{AlertFilter, Pagination};
use crate::db::models::{AlertFeedRow, AlertRow, PerformanceRow, RatingRollup};
use crate::error::Result;
use crate::view::DashboardView;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem; color: #222; }
table { border-collapse: collapse; margin-bottom: 2rem; }
th, td { border: 1px solid #ccc; padding: 0.25rem 0.6rem; text-align: left; }
th { background: #f3f3f3; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.status { font-weight: bold; padding: 0.4rem 0.8rem; display: inline-block; }
.healthy { background: #d7f5dd; color: #135c22; }
.stale { background: #fadcdc; color: #7a1212; }
.pos { color: #135c22; }
.neg { color: #7a1212; }
form.filters input { margin-right: 0.5rem; }
form.pager { display: inline-block; margin-right: 0.5rem; }
"#;

/// HTML-escapes the wrapped text when displayed.
pub struct Escaped<'a>(pub &'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#x27;")?,
                _ => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

/// Number cell contents; blank when the value is not known yet.
struct Num(Option<f64>, usize);

impl Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.prec$}", prec = self.1),
            None => Ok(()),
        }
    }
}

fn return_class(v: Option<f64>) -> &'static str {
    match v {
        Some(v) if v > 0.0 => "num pos",
        Some(v) if v < 0.0 => "num neg",
        _ => "num",
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn dashboard(view: &DashboardView) -> Result<String> {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Scanner Dashboard</title>\n<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<h1>Scanner Dashboard</h1>\n");

    write_status(&mut out, view)?;
    write_filter_form(&mut out, &view.filter)?;
    write_alert_feed(&mut out, view)?;
    write_pager(&mut out, &view.filter, &view.pagination)?;

    if let Some(latest) = &view.latest_signals {
        write_latest_signals(&mut out, latest)?;
    }
    if let Some(perf) = &view.recent_performance {
        write_recent_performance(&mut out, perf)?;
    }
    if let Some(rollup) = &view.rating_rollup {
        write_rating_rollup(&mut out, rollup)?;
    }

    writeln!(
        out,
        "<footer>Generated {}</footer>\n</body>\n</html>",
        timestamp(&view.generated_at)
    )?;
    Ok(out)
}

fn write_status(out: &mut String, view: &DashboardView) -> fmt::Result {
    let (class, label) = if view.health.healthy {
        ("healthy", "Scanner healthy")
    } else {
        ("stale", "Scanner stale")
    };
    write!(out, "<p><span class=\"status {class}\" data-healthy=\"{}\">{label}</span> ", view.health.healthy)?;
    match &view.health.last_run {
        Some(t) => writeln!(out, "Last run: {}</p>", timestamp(t)),
        None => writeln!(out, "No scanner run recorded</p>"),
    }
}

fn write_filter_form(out: &mut String, filter: &AlertFilter) -> fmt::Result {
    let symbol = filter.symbol.as_deref().unwrap_or("");
    let alert_type = filter.alert_type.as_deref().unwrap_or("");
    let hours = filter.hours.map(|h| h.to_string()).unwrap_or_default();
    writeln!(
        out,
        "<form class=\"filters\" method=\"get\" action=\"/\">\
         <input name=\"symbol\" placeholder=\"symbol\" value=\"{}\">\
         <input name=\"type\" placeholder=\"type\" value=\"{}\">\
         <input name=\"hours\" placeholder=\"hours\" value=\"{}\">\
         <button type=\"submit\">Filter</button></form>",
        Escaped(symbol),
        Escaped(alert_type),
        Escaped(&hours),
    )
}

fn write_alert_feed(out: &mut String, view: &DashboardView) -> fmt::Result {
    writeln!(out, "<h2>Alerts ({} matching)</h2>", view.pagination.total)?;
    out.push_str("<table id=\"alerts\">\n<tr><th>Time</th><th>Symbol</th><th>Type</th><th>Price</th><th>Rating</th>");
    for h in &view.horizons {
        write!(out, "<th>{h}h return %</th>")?;
    }
    out.push_str("</tr>\n");

    if view.alerts.is_empty() {
        writeln!(
            out,
            "<tr><td colspan=\"{}\">No alerts match the current filters.</td></tr>",
            5 + view.horizons.len()
        )?;
    }
    for AlertFeedRow { alert, returns } in &view.alerts {
        out.push_str("<tr>");
        write_alert_cells(out, alert)?;
        for ret in returns {
            write!(out, "<td class=\"{}\">{}</td>", return_class(*ret), Num(*ret, 2))?;
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    Ok(())
}

fn write_alert_cells(out: &mut String, alert: &AlertRow) -> fmt::Result {
    write!(
        out,
        "<td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td>{}</td>",
        timestamp(&alert.signal_time),
        Escaped(&alert.symbol),
        Escaped(&alert.alert_type),
        Num(alert.price, 4),
        Escaped(alert.rating.as_deref().unwrap_or("")),
    )
}

fn write_pager(out: &mut String, filter: &AlertFilter, p: &Pagination) -> fmt::Result {
    write!(out, "<div class=\"pager\">")?;
    if p.has_prev() {
        write_pager_form(out, filter, p.page - 1, "Previous")?;
    }
    write!(out, "<span>Page {} of {}</span>", p.page, p.total_pages)?;
    if p.has_next() {
        write_pager_form(out, filter, p.page + 1, "Next")?;
    }
    writeln!(out, "</div>")
}

/// Re-submits the current filters with a different page.
fn write_pager_form(out: &mut String, filter: &AlertFilter, page: i64, label: &str) -> fmt::Result {
    write!(out, "<form class=\"pager\" method=\"get\" action=\"/\">")?;
    if let Some(symbol) = &filter.symbol {
        write!(out, "<input type=\"hidden\" name=\"symbol\" value=\"{}\">", Escaped(symbol))?;
    }
    if let Some(alert_type) = &filter.alert_type {
        write!(out, "<input type=\"hidden\" name=\"type\" value=\"{}\">", Escaped(alert_type))?;
    }
    if let Some(hours) = filter.hours {
        write!(out, "<input type=\"hidden\" name=\"hours\" value=\"{hours}\">")?;
    }
    write!(
        out,
        "<button type=\"submit\" name=\"page\" value=\"{page}\">{label}</button></form>"
    )
}

fn write_latest_signals(out: &mut String, rows: &[AlertRow]) -> fmt::Result {
    out.push_str("<h2>Latest signal per symbol and type</h2>\n");
    out.push_str("<table id=\"latest\">\n<tr><th>Time</th><th>Symbol</th><th>Type</th><th>Price</th><th>Rating</th></tr>\n");
    for alert in rows {
        out.push_str("<tr>");
        write_alert_cells(out, alert)?;
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    Ok(())
}

fn write_recent_performance(out: &mut String, rows: &[PerformanceRow]) -> fmt::Result {
    out.push_str("<h2>Recent performance</h2>\n");
    out.push_str(
        "<table id=\"performance\">\n<tr><th>Alert</th><th>Symbol</th><th>Type</th><th>Rating</th>\
         <th>Horizon</th><th>Entry</th><th>Exit</th><th>Return %</th><th>Exit time</th></tr>\n",
    );
    for row in rows {
        let horizon = row.horizon_hours.map(|h| format!("{h}h")).unwrap_or_default();
        let exit_time = row.exit_time.as_ref().map(timestamp).unwrap_or_default();
        writeln!(
            out,
            "<tr><td class=\"num\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"{}\">{}</td><td>{}</td></tr>",
            row.alert_id,
            Escaped(&row.symbol),
            Escaped(&row.alert_type),
            Escaped(row.rating.as_deref().unwrap_or("")),
            horizon,
            Num(row.entry_price, 4),
            Num(row.exit_price, 4),
            return_class(row.return_pct),
            Num(row.return_pct, 2),
            exit_time,
        )?;
    }
    out.push_str("</table>\n");
    Ok(())
}

fn write_rating_rollup(out: &mut String, rows: &[RatingRollup]) -> fmt::Result {
    out.push_str("<h2>Performance by rating</h2>\n");
    out.push_str(
        "<table id=\"ratings\">\n<tr><th>Rating</th><th>Horizon</th><th>Evaluated</th>\
         <th>Avg return %</th><th>Hit rate</th></tr>\n",
    );
    for row in rows {
        let horizon = row.horizon_hours.map(|h| format!("{h}h")).unwrap_or_default();
        let mean = row.mean_return();
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"{}\">{}</td>\
             <td class=\"num\">{}</td></tr>",
            Escaped(row.rating.as_deref().unwrap_or("")),
            horizon,
            row.evaluated,
            return_class(mean),
            Num(mean, 2),
            Num(row.hit_rate(), 2),
        )?;
    }
    out.push_str("</table>\n");
    Ok(())
}
