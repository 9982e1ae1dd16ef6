//! RFC 4180 text for the CSV audit layout.
//!
//! One record per changed column: `column,old,new`. SQL NULL is an empty
//! unquoted field; an empty string is `""`.

use crate::{
    command::ColumnChange,
    error::{Error, ErrorOrigin},
    value::Value,
};

const RECORD_SEPARATOR: &str = "\r\n";

/// Encode one field.
#[must_use]
pub fn field(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(text) if text.is_empty() || text.contains([',', '"', '\r', '\n']) => {
            format!("\"{}\"", text.replace('"', "\"\""))
        }
        Some(text) => text.to_string(),
    }
}

/// Encode a change list as CSV records.
#[must_use]
pub fn encode_changes(changes: &[ColumnChange]) -> String {
    changes
        .iter()
        .map(|change| {
            [
                field(Some(&change.column)),
                field(change.old.to_text().as_deref()),
                field(change.new.to_text().as_deref()),
            ]
            .join(",")
        })
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}

/// Decode CSV records back into changes. Values come back as text.
pub fn decode_changes(text: &str) -> Result<Vec<ColumnChange>, Error> {
    parse(text)?
        .into_iter()
        .map(|record| match <[Option<String>; 3]>::try_from(record) {
            Ok([Some(column), old, new]) => Ok(ColumnChange::new(
                column,
                old.map_or(Value::Null, Value::Text),
                new.map_or(Value::Null, Value::Text),
            )),
            _ => Err(Error::conversion(
                ErrorOrigin::Audit,
                "audit payload record is not `column,old,new`",
            )),
        })
        .collect()
}

/// Split CSV text into records of fields. `None` marks an empty unquoted
/// field.
pub fn parse(text: &str) -> Result<Vec<Vec<Option<String>>>, Error> {
    let mut records = Vec::new();
    if text.is_empty() {
        return Ok(records);
    }

    let mut record: Vec<Option<String>> = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    loop {
        let Some(c) = chars.next() else {
            record.push(finish_field(&mut current, quoted));
            records.push(record);
            return Ok(records);
        };

        match c {
            '"' if current.is_empty() && !quoted => {
                quoted = true;
                read_quoted(&mut chars, &mut current)?;
            }
            ',' => {
                record.push(finish_field(&mut current, quoted));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(finish_field(&mut current, quoted));
                records.push(std::mem::take(&mut record));
                quoted = false;
            }
            c if quoted => {
                return Err(Error::conversion(
                    ErrorOrigin::Audit,
                    format!("unexpected '{c}' after quoted audit field"),
                ));
            }
            c => current.push(c),
        }
    }
}

fn finish_field(current: &mut String, quoted: bool) -> Option<String> {
    let text = std::mem::take(current);
    if text.is_empty() && !quoted {
        None
    } else {
        Some(text)
    }
}

// Consume up to and including the closing quote.
fn read_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
) -> Result<(), Error> {
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return Ok(());
            }
        } else {
            out.push(c);
        }
    }

    Err(Error::conversion(
        ErrorOrigin::Audit,
        "unterminated quoted audit field",
    ))
}
