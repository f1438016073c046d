//! Self-contained HTML rendering of one day's gate activity.

use chrono::DateTime;
use gatelog_core::LogRecord;
use std::fmt::Write;

/// Per-day counters shown at the top of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// Entries recorded on the day.
    pub total: usize,
    /// Entries with an exit stamp.
    pub exited: usize,
    /// Entries still without an exit stamp.
    pub inside: usize,
}

impl ReportStats {
    /// Derives the counters from the day's records.
    pub fn from_logs(logs: &[LogRecord]) -> Self {
        let exited = logs.iter().filter(|l| l.exit_at.is_some()).count();
        Self {
            total: logs.len(),
            exited,
            inside: logs.len() - exited,
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn opt(field: &Option<String>) -> String {
    field.as_deref().map(escape).unwrap_or_else(|| "-".into())
}

/// Renders an RFC 3339 timestamp as `HH:MM`, `-` when absent or
/// unparseable.
fn time_of(ts: Option<&str>) -> String {
    ts.and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

/// Formats the on-site duration as `Xh Ym` (`Ym` under an hour), or a
/// highlighted "inside" marker when the record has no exit yet.
fn duration(entry: &str, exit: Option<&str>) -> String {
    let Some(exit) = exit else {
        return r#"<span style="color:#22c55e;font-weight:bold">inside</span>"#.into();
    };
    let parsed = (
        DateTime::parse_from_rfc3339(entry),
        DateTime::parse_from_rfc3339(exit),
    );
    let (Ok(entry), Ok(exit)) = parsed else {
        return "-".into();
    };
    let minutes = (exit - entry).num_minutes().max(0);
    let (h, m) = (minutes / 60, minutes % 60);
    if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

/// Renders the report as one self-contained HTML document with inline
/// styles, suitable as an email body.
pub fn render_report(logs: &[LogRecord], date_label: &str, stats: ReportStats) -> String {
    let mut rows = String::new();
    for log in logs {
        let _ = write!(
            rows,
            r#"
    <tr style="border-bottom:1px solid #334155">
      <td style="padding:10px;font-size:12px;color:#94a3b8">{category}</td>
      <td style="padding:10px;font-weight:bold;color:#fff">{subject}</td>
      <td style="padding:10px;font-size:12px;color:#94a3b8">{driver}</td>
      <td style="padding:10px;font-size:12px;color:#94a3b8">{host}</td>
      <td style="padding:10px;font-size:12px;color:#22c55e">{entry}</td>
      <td style="padding:10px;font-size:12px;color:#ef4444">{exit}</td>
      <td style="padding:10px;font-size:12px;color:#94a3b8">{duration}</td>
    </tr>"#,
            category = opt(&log.sub_category),
            subject = opt(&log.plate.clone().or_else(|| log.name.clone())),
            driver = opt(&log.driver),
            host = opt(&log.host),
            entry = time_of(Some(&log.created_at)),
            exit = time_of(log.exit_at.as_deref()),
            duration = duration(&log.created_at, log.exit_at.as_deref()),
        );
    }
    if rows.is_empty() {
        rows = r#"<tr><td colspan="7" style="padding:30px;text-align:center;color:#64748b">No records found</td></tr>"#
            .into();
    }

    let inside: Vec<&LogRecord> = logs.iter().filter(|l| l.exit_at.is_none()).collect();
    let inside_section = if inside.is_empty() {
        String::new()
    } else {
        let mut items = String::new();
        for log in &inside {
            let _ = write!(
                items,
                "<li>{} - {} ({})</li>",
                opt(&log.plate.clone().or_else(|| log.name.clone())),
                opt(&log.sub_category),
                time_of(Some(&log.created_at)),
            );
        }
        format!(
            r#"
    <div style="background:#7f1d1d;border:1px solid #ef4444;border-radius:8px;padding:16px;margin-top:20px">
      <h3 style="color:#fca5a5;margin:0 0 10px 0;font-size:14px">Still inside ({count})</h3>
      <ul style="margin:0;padding-left:20px;color:#fecaca;font-size:13px">{items}</ul>
    </div>"#,
            count = inside.len(),
        )
    };

    let inside_bg = if stats.inside > 0 { "#7f1d1d" } else { "#1e293b" };
    let inside_border = if stats.inside > 0 { "#ef4444" } else { "#334155" };
    let inside_color = if stats.inside > 0 { "#fca5a5" } else { "#64748b" };

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:20px;background:#0f172a;font-family:Arial,sans-serif;color:#e2e8f0">
  <div style="max-width:800px;margin:auto">
    <div style="background:#1e293b;border-radius:12px;padding:20px;margin-bottom:20px;border:1px solid #334155">
      <h1 style="color:#fff;margin:0 0 5px 0;font-size:22px">Gate Security Report</h1>
      <p style="color:#94a3b8;margin:0;font-size:14px">{date}</p>
    </div>

    <div style="display:flex;gap:12px;margin-bottom:20px">
      <div style="flex:1;background:#1e293b;border-radius:8px;padding:16px;text-align:center;border:1px solid #334155">
        <div style="font-size:28px;font-weight:bold;color:#3b82f6">{total}</div>
        <div style="font-size:11px;color:#94a3b8">Total entries</div>
      </div>
      <div style="flex:1;background:#1e293b;border-radius:8px;padding:16px;text-align:center;border:1px solid #334155">
        <div style="font-size:28px;font-weight:bold;color:#22c55e">{exited}</div>
        <div style="font-size:11px;color:#94a3b8">Exited</div>
      </div>
      <div style="flex:1;background:{inside_bg};border-radius:8px;padding:16px;text-align:center;border:1px solid {inside_border}">
        <div style="font-size:28px;font-weight:bold;color:{inside_color}">{inside}</div>
        <div style="font-size:11px;color:#94a3b8">Still inside</div>
      </div>
    </div>

    <div style="background:#1e293b;border-radius:8px;overflow:hidden;border:1px solid #334155">
      <table style="width:100%;border-collapse:collapse">
        <thead>
          <tr style="background:#0f172a">
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Category</th>
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Plate/Name</th>
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Driver</th>
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Host</th>
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Entry</th>
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Exit</th>
            <th style="padding:12px 10px;text-align:left;font-size:11px;color:#64748b">Duration</th>
          </tr>
        </thead>
        <tbody>{rows}</tbody>
      </table>
    </div>
{inside_section}
    <p style="margin-top:20px;font-size:11px;color:#64748b;text-align:center">
      This report was generated automatically by the gate security panel.
    </p>
  </div>
</body>
</html>"#,
        date = escape(date_label),
        total = stats.total,
        exited = stats.exited,
        inside = stats.inside,
    )
}
