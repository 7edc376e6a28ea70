//! JSON I/O handling for CLI
//!
//! - Input: JSON documents read from files
//! - Output: one JSON document per line, or plain explain text
//! - UTF-8 only

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::CliResult;

/// Read and parse a JSON document from a file
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write one value as a single JSON line
pub fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write plain text followed by a newline, then flush
pub fn write_text<W: Write>(out: &mut W, text: &str) -> CliResult<()> {
    writeln!(out, "{}", text)?;
    out.flush()?;
    Ok(())
}
