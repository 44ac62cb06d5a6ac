use std::io::{self, Write};

use serde_json::Value;

use crate::error::ExportError;

const SEP: char = ',';
/// Joins array elements inside a single cell.
pub const LIST_DELIMITER: &str = "; ";

/// Render homogeneous flat records as CSV with a header row.
///
/// Headers come from the first record's keys. Every record must be an object
/// with the same key set.
pub fn to_csv_string(records: &[Value], name: &str) -> Result<String, ExportError> {
    let first = records
        .first()
        .ok_or_else(|| ExportError::Empty(name.to_string()))?;
    let headers: Vec<String> = first
        .as_object()
        .ok_or(ExportError::NotARecord { index: 0 })?
        .keys()
        .cloned()
        .collect();

    let mut expected = headers.clone();
    expected.sort();

    let mut buf: Vec<u8> = Vec::new();
    write_row(&mut buf, &headers)?;

    for (index, record) in records.iter().enumerate() {
        let obj = record
            .as_object()
            .ok_or(ExportError::NotARecord { index })?;

        let mut found: Vec<String> = obj.keys().cloned().collect();
        found.sort();
        if found != expected {
            return Err(ExportError::MismatchedKeys {
                index,
                expected,
                found,
            });
        }

        let row: Vec<String> = headers
            .iter()
            .map(|h| obj.get(h).map(flatten_cell).unwrap_or_default())
            .collect();
        write_row(&mut buf, &row)?;
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// One cell: scalars as text, arrays joined with [`LIST_DELIMITER`], objects as compact JSON.
pub fn flatten_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Object(_) | Value::Array(_) => v.to_string(),
                other => flatten_cell(other),
            })
            .collect::<Vec<_>>()
            .join(LIST_DELIMITER),
        Value::Object(_) => value.to_string(),
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", SEP)?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    /// Quote-aware reader, enough to check what the writer produces.
    fn parse_rows(text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '"' if in_quotes && chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = !in_quotes,
                c if c == SEP && !in_quotes => row.push(std::mem::take(&mut field)),
                '\n' if !in_quotes => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                c => field.push(c),
            }
        }
        rows
    }

    #[test]
    fn headers_follow_first_record() {
        let records = vec![
            json!({"url": "https://a.example/", "verified": true, "status_code": 200}),
            json!({"status_code": 0, "url": "https://b.example/", "verified": false}),
        ];
        let csv = to_csv_string(&records, "t").unwrap();
        assert_eq!(
            csv,
            "url,verified,status_code\nhttps://a.example/,true,200\nhttps://b.example/,false,0\n"
        );
    }

    #[test]
    fn arrays_join_and_round_trip() {
        let records = vec![json!({
            "url": "https://a.example/",
            "unique_domains": ["x.example", "y.example"],
            "title": "Hello, \"world\"\nagain",
            "error": null,
        })];
        let csv = to_csv_string(&records, "t").unwrap();
        let rows = parse_rows(&csv);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["url", "unique_domains", "title", "error"]);
        assert_eq!(rows[1][1], "x.example; y.example");
        assert_eq!(rows[1][2], "Hello, \"world\"\nagain");
        assert_eq!(rows[1][3], "");
    }

    #[test]
    fn nested_objects_become_json() {
        let cell = flatten_cell(&json!([{"href": "https://t.example/", "is_nofollow": true}]));
        assert_eq!(cell, r#"{"href":"https://t.example/","is_nofollow":true}"#);
        assert_eq!(flatten_cell(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn empty_is_an_error() {
        assert!(matches!(
            to_csv_string(&[], "backlinks"),
            Err(ExportError::Empty(n)) if n == "backlinks"
        ));
    }

    #[test]
    fn non_records_and_mixed_shapes_rejected() {
        assert!(matches!(
            to_csv_string(&[json!({"a": 1}), json!([1, 2])], "t"),
            Err(ExportError::NotARecord { index: 1 })
        ));
        assert!(matches!(
            to_csv_string(&[json!("x")], "t"),
            Err(ExportError::NotARecord { index: 0 })
        ));
        assert!(matches!(
            to_csv_string(&[json!({"a": 1}), json!({"b": 1})], "t"),
            Err(ExportError::MismatchedKeys { index: 1, .. })
        ));
    }
}
