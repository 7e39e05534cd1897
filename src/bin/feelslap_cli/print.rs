#![deny(clippy::all, clippy::pedantic)]

use serde::Serialize;
use serde_json::json;

use crate::context::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{out}");
    Ok(())
}

/// Acknowledge a mutation that returns nothing.
pub fn done(action: &str) -> Result<(), CliError> {
    print_json(&json!({ "ok": true, "action": action }))
}
