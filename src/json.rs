//! Pretty JSON output shared by the descriptor and the generated manifest.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::Result;

const INDENT: &[u8] = b"    ";

/// Serialize `value` with four-space indentation and a trailing newline.
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `value` to `path` as pretty JSON, replacing any existing file.
pub fn write_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, to_pretty_string(value)?)?;
    Ok(())
}
