//! JSON output for the CLI
//!
//! Results go to stdout, one JSON object per line. Log events go to stderr.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&mut io::stdout().lock(), &response)
}

/// Write one JSON value followed by a newline
pub fn write_line(out: &mut impl Write, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
