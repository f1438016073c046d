//! Settings commands.

use super::{CliDispatcher, CliResult};
use serde_json::Value;

/// Prints the stored JSON value for a key.
pub fn run_get(dispatcher: &CliDispatcher, key: &str) -> CliResult {
    match dispatcher.get_setting(key)? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("Setting '{key}' is not set"),
    }
    Ok(())
}

/// Stores a JSON value under a key.
pub fn run_set(dispatcher: &CliDispatcher, key: &str, value: &str) -> CliResult {
    let value: Value = serde_json::from_str(value)
        .map_err(|e| format!("value is not valid JSON: {e}"))?;
    dispatcher.set_setting(key, &value)?;
    println!("Setting '{key}' saved");
    Ok(())
}
