//! Report rendering command.

use super::{CliDispatcher, CliResult};
use gatelog_report::{render_report, ReportStats};
use std::path::Path;

/// Renders the daily HTML report for `date` (default yesterday) to
/// stdout or a file.
pub fn run(dispatcher: &CliDispatcher, date: Option<&str>, out: Option<&Path>) -> CliResult {
    let date = match date {
        Some(d) => d.to_string(),
        None => {
            let yesterday = chrono::Local::now() - chrono::Duration::days(1);
            yesterday.format("%Y-%m-%d").to_string()
        }
    };

    let logs = dispatcher.logs_by_date_range(&date, &date)?;
    let stats = ReportStats::from_logs(&logs);
    let html = render_report(&logs, &date, stats);

    match out {
        Some(path) => {
            std::fs::write(path, &html)?;
            println!(
                "Report for {date} written to {} ({} record(s), {} still inside)",
                path.display(),
                stats.total,
                stats.inside
            );
        }
        None => println!("{html}"),
    }
    Ok(())
}
