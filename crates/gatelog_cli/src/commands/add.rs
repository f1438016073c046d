//! Add command implementation.

use super::{CliDispatcher, CliResult};
use gatelog_core::NewLog;
use tracing::info;

/// Records a new entry and queues its mirror operation.
pub fn run(dispatcher: &CliDispatcher, new: NewLog) -> CliResult {
    let record = dispatcher.add_log(new)?;
    info!("Recorded {} entry #{}", record.kind.as_str(), record.id);
    println!(
        "Recorded {} entry #{} at {}",
        record.kind.as_str(),
        record.id,
        record.created_at
    );
    println!("{} operation(s) pending sync", dispatcher.queue().pending());
    Ok(())
}
