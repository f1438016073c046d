//! Stats command implementation.

use super::{CliDispatcher, CliResult};

/// Prints today's counters.
pub fn run(dispatcher: &CliDispatcher) -> CliResult {
    let stats = dispatcher.stats()?;
    println!("Today:        {}", stats.today);
    println!("  vehicles:   {}", stats.today_vehicle);
    println!("  visitors:   {}", stats.today_visitor);
    println!("Active now:   {}", stats.active_now);
    Ok(())
}
