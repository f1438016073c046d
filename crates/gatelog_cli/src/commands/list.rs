//! Listing and search commands.

use super::{CliDispatcher, CliResult};
use gatelog_core::LogRecord;

fn cell(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("-")
}

fn print_table(records: &[LogRecord]) {
    if records.is_empty() {
        println!("No records");
        return;
    }

    println!(
        "{:>6}  {:<8}  {:<16}  {:<16}  {:<16}  {:<24}  {:<24}",
        "ID", "KIND", "PLATE/NAME", "DRIVER", "HOST", "ENTRY", "EXIT"
    );
    for r in records {
        let subject = r.plate.as_deref().or(r.name.as_deref()).unwrap_or("-");
        println!(
            "{:>6}  {:<8}  {:<16}  {:<16}  {:<16}  {:<24}  {:<24}",
            r.id,
            r.kind.as_str(),
            subject,
            cell(&r.driver),
            cell(&r.host),
            r.created_at,
            r.exit_at.as_deref().unwrap_or("-"),
        );
    }
    println!("{} record(s)", records.len());
}

/// Lists records still on site.
pub fn run_active(dispatcher: &CliDispatcher) -> CliResult {
    print_table(&dispatcher.active_logs()?);
    Ok(())
}

/// Lists all records, newest first.
pub fn run_all(dispatcher: &CliDispatcher, limit: usize) -> CliResult {
    print_table(&dispatcher.all_logs(limit)?);
    Ok(())
}

/// Lists records in an inclusive date range.
pub fn run_range(dispatcher: &CliDispatcher, from: &str, to: &str) -> CliResult {
    print_table(&dispatcher.logs_by_date_range(from, to)?);
    Ok(())
}

/// Substring search across plate, name, host and driver.
pub fn run_search(dispatcher: &CliDispatcher, term: &str, limit: usize) -> CliResult {
    print_table(&dispatcher.search_logs(term, limit)?);
    Ok(())
}
