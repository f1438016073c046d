//! Queue inspection command.

use super::{CliDispatcher, CliResult};

/// Prints the pending sync queue, oldest first.
pub fn run(dispatcher: &CliDispatcher) -> CliResult {
    let entries = dispatcher.queue().entries();
    if entries.is_empty() {
        println!("Sync queue is empty");
        return Ok(());
    }

    println!("{:>4}  {:<8}  {:>7}  {:<24}", "#", "ACTION", "RETRIES", "KEY");
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>4}  {:<8}  {:>7}  {:<24}",
            i + 1,
            entry.op.action(),
            entry.retries,
            entry.op.correlation_key().unwrap_or("-"),
        );
    }
    println!("{} operation(s) pending", entries.len());
    Ok(())
}
