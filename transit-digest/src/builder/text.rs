//! Decoding of agency exports into UTF-8 text.
//!
//! Agency CSV exports are Windows-1252 and are always decoded as such.
//! Pages of unknown charset are taken as UTF-8 when they are valid UTF-8
//! and as Windows-1252 otherwise.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{UTF_8, WINDOWS_1252};

use super::error::BuildError;

/// Decode a Windows-1252 export. A UTF-8 byte order mark overrides.
pub fn decode_export(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text
}

/// Decode bytes as UTF-8, falling back to Windows-1252.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .unwrap_or_else(|| WINDOWS_1252.decode_without_bom_handling(bytes).0)
}

/// Read a local page or feed as text.
pub fn read_text(path: &Path) -> Result<String, BuildError> {
    let bytes = std::fs::read(path).map_err(|e| BuildError::io(path, e))?;
    Ok(decode(&bytes).into_owned())
}

/// Read a local agency CSV export as text.
pub fn read_export(path: &Path) -> Result<String, BuildError> {
    let bytes = std::fs::read(path).map_err(|e| BuildError::io(path, e))?;
    Ok(decode_export(&bytes).into_owned())
}
