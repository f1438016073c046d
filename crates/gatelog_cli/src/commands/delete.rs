//! Delete command implementation.

use super::{CliDispatcher, CliResult};
use tracing::info;

/// Removes a record and queues the remote removal.
pub fn run(dispatcher: &CliDispatcher, id: i64) -> CliResult {
    info!("Deleting record #{id}");
    if dispatcher.delete_log(id)? {
        println!("Deleted record #{id}");
    } else {
        println!("No record with id {id}");
    }
    Ok(())
}
