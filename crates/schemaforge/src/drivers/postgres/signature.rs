//! Parsing of `pg_get_function_result` text.
//!
//! A table-returning function reports its projection as
//! `TABLE(id integer, name character varying, "Total" numeric(10,2))`.
//! The columns come back in declaration order; PostgreSQL does not record
//! nullability for them, so every column is nullable.

use crate::core::schema::ResultColumnRow;

/// Parse the columns of a `TABLE(...)` result signature.
///
/// Returns `None` when the text is not a table signature (scalar, `SETOF x`,
/// `record`, `void`).
pub fn parse_table_signature(signature: &str) -> Option<Vec<ResultColumnRow>> {
    let trimmed = signature.trim();
    let head = trimmed.get(..5)?;
    if !head.eq_ignore_ascii_case("table") {
        return None;
    }
    let body = trimmed[5..].trim_start();
    let inner = body.strip_prefix('(')?.strip_suffix(')')?;

    let columns = split_top_level(inner)
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .enumerate()
        .filter_map(|(i, part)| parse_column(part.trim(), i as i32 + 1))
        .collect();
    Some(columns)
}

/// Split on commas outside parentheses and double quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_column(column: &str, ordinal: i32) -> Option<ResultColumnRow> {
    let (name, native_type) = if let Some(rest) = column.strip_prefix('"') {
        let (name, tail) = quoted_identifier(rest)?;
        (name, tail.trim())
    } else {
        let split = column.find(char::is_whitespace)?;
        (column[..split].to_string(), column[split..].trim())
    };

    if native_type.is_empty() {
        return None;
    }

    Some(ResultColumnRow {
        name,
        ordinal,
        native_type: native_type.to_string(),
        is_nullable: true,
        size: type_size(native_type),
    })
}

/// Read a quoted identifier up to its closing quote, collapsing `""`.
///
/// `rest` starts after the opening quote. Returns the name and the text
/// after the closing quote.
fn quoted_identifier(rest: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            name.push('"');
        } else {
            return Some((name, &rest[i + 1..]));
        }
    }
    None
}

/// Length modifier of a character type (`character varying(50)` -> 50).
fn type_size(native_type: &str) -> Option<i32> {
    let lower = native_type.to_lowercase();
    if !(lower.starts_with("character") || lower.starts_with("varchar") || lower.starts_with("char"))
    {
        return None;
    }
    let open = lower.find('(')?;
    let close = lower[open..].find(')')? + open;
    lower[open + 1..close].trim().parse().ok()
}
