//! Exit command implementation.

use super::{CliDispatcher, CliResult};
use gatelog_core::LogPatch;
use tracing::info;

/// Stamps an exit on the record.
pub fn run(
    dispatcher: &CliDispatcher,
    id: i64,
    seal: Option<String>,
    note: Option<String>,
) -> CliResult {
    let extra = LogPatch {
        seal_number_exit: seal,
        note,
        ..LogPatch::default()
    };
    info!("Stamping exit on record #{id}");
    if dispatcher.exit_log(id, &extra)? {
        // The stamp was merged locally; read it back for display.
        let exit_at = dispatcher
            .get_log(id)?
            .and_then(|r| r.exit_at)
            .unwrap_or_else(|| "?".into());
        println!("Exit stamped on record #{id} at {exit_at}");
    } else {
        println!("No record with id {id}");
    }
    Ok(())
}
