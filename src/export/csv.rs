//! Minimal CSV reader for diagnostics exports
//!
//! The exports this crate reads back are machine-written, comma-separated
//! and RFC 4180 shaped: fields may be double-quoted, quotes are escaped by
//! doubling, and quoted fields may contain commas and newlines. That is the
//! whole dialect; anything beyond it is rejected.

use super::ExportError;

/// Parse CSV text into records of raw string fields.
///
/// Accepts both `\n` and `\r\n` record separators and ignores one trailing
/// newline. Returns an error for a quote opening mid-field or an unclosed
/// quoted field.
pub fn parse(contents: &str) -> Result<Vec<Vec<String>>, ExportError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;

    let mut chars = contents.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                if field_started {
                    return Err(ExportError::Malformed(format!(
                        "unexpected quote inside unquoted field (record {})",
                        records.len() + 1
                    )));
                }
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' => {
                // Only meaningful as part of a CRLF separator
                if chars.peek() == Some(&'\n') {
                    continue;
                }
                field.push('\r');
                field_started = true;
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                field_started = false;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(ExportError::Malformed(format!(
            "unclosed quoted field (record {})",
            records.len() + 1
        )));
    }

    // Final record without a trailing newline
    if !field.is_empty() || !record.is_empty() || field_started {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
