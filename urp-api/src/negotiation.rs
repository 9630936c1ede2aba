//! Content negotiation and row encoding
//!
//! Supported request types (compared case-insensitively):
//! - `*/*`, `application/json` → JSON array of row objects
//! - `text/csv` → header line plus one line per row
//!
//! The `Accept` value is matched as a whole: quality lists such as
//! `text/csv, application/json;q=0.9` are not parsed and are rejected.

use tracing::debug;
use urp_common::db::Row;

use crate::error::{DispatchError, Result};

pub const JSON_MIME: &str = "application/json";
pub const CSV_MIME: &str = "text/csv";

/// Encoded response body with its mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub body: String,
    pub mime_type: &'static str,
}

/// Row encoders known to the negotiator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Csv,
}

impl Encoding {
    /// Select an encoder for a requested content type (`None` means JSON)
    pub fn negotiate(content_type: Option<&str>) -> Result<Self> {
        let Some(requested) = content_type else {
            return Ok(Encoding::Json);
        };

        match requested.to_ascii_lowercase().as_str() {
            "*/*" | JSON_MIME => Ok(Encoding::Json),
            CSV_MIME => Ok(Encoding::Csv),
            _ => Err(DispatchError::UnsupportedContentType(requested.to_string())),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Encoding::Json => JSON_MIME,
            Encoding::Csv => CSV_MIME,
        }
    }

    pub fn encode_rows(self, rows: &[Row]) -> Result<String> {
        match self {
            Encoding::Json => encode_json(rows),
            Encoding::Csv => encode_csv(rows),
        }
    }
}

/// Encode rows in the requested content type
pub fn encode(content_type: &str, rows: &[Row]) -> Result<EncodedBody> {
    let encoding = Encoding::negotiate(Some(content_type))?;
    debug!("Creating {} body from {} rows", encoding.mime_type(), rows.len());
    Ok(EncodedBody {
        body: encoding.encode_rows(rows)?,
        mime_type: encoding.mime_type(),
    })
}

/// Encode only the first row as a JSON object, `null` when there is none
pub fn encode_single(rows: &[Row]) -> Result<String> {
    serde_json::to_string(&rows.first()).map_err(|e| DispatchError::Encode(e.to_string()))
}

fn encode_json(rows: &[Row]) -> Result<String> {
    serde_json::to_string(rows).map_err(|e| DispatchError::Encode(e.to_string()))
}

/// Header from the first row's columns; lines joined by `\n` with no trailing
/// newline; fields quoted only when they contain a delimiter, quote or line break
fn encode_csv(rows: &[Row]) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    writer.write_record(&columns).map_err(csv_error)?;

    for row in rows {
        let record = columns
            .iter()
            .map(|column| row.get(*column).map(|v| v.to_text()).unwrap_or_default());
        writer.write_record(record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DispatchError::Encode(e.to_string()))?;
    let mut body = String::from_utf8(bytes).map_err(|e| DispatchError::Encode(e.to_string()))?;
    if body.ends_with('\n') {
        body.pop();
    }
    Ok(body)
}

fn csv_error(e: csv::Error) -> DispatchError {
    DispatchError::Encode(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use urp_common::db::SqlValue;

    fn row(pairs: &[(&str, SqlValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn two_rows() -> Vec<Row> {
        vec![
            row(&[("id", SqlValue::Int(1)), ("name", "a".into())]),
            row(&[("id", SqlValue::Int(2)), ("name", "b".into())]),
        ]
    }

    #[test]
    fn test_json_round_trip() {
        let rows = two_rows();
        let encoded = encode("application/json", &rows).unwrap();

        assert_eq!(encoded.mime_type, JSON_MIME);
        let parsed: Value = serde_json::from_str(&encoded.body).unwrap();
        assert_eq!(parsed, json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));
        assert_eq!(parsed, serde_json::to_value(&rows).unwrap());
    }

    #[test]
    fn test_json_preserves_column_order() {
        let rows = vec![row(&[("zeta", SqlValue::Int(1)), ("alpha", SqlValue::Null)])];
        let encoded = encode("application/json", &rows).unwrap();
        assert_eq!(encoded.body, r#"[{"zeta":1,"alpha":null}]"#);
    }

    #[test]
    fn test_json_empty_is_empty_array() {
        assert_eq!(encode("application/json", &[]).unwrap().body, "[]");
    }

    #[test]
    fn test_content_type_case_insensitive() {
        let rows = two_rows();
        assert_eq!(
            encode("APPLICATION/JSON", &rows).unwrap(),
            encode("application/json", &rows).unwrap()
        );
        assert_eq!(encode("Text/CSV", &rows).unwrap().mime_type, CSV_MIME);
    }

    #[test]
    fn test_wildcard_selects_json() {
        let rows = two_rows();
        assert_eq!(encode("*/*", &rows).unwrap(), encode("application/json", &rows).unwrap());
    }

    #[test]
    fn test_absent_type_selects_json() {
        assert_eq!(Encoding::negotiate(None).unwrap(), Encoding::Json);
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let result = encode("text/xml", &two_rows());
        assert!(matches!(result, Err(DispatchError::UnsupportedContentType(t)) if t == "text/xml"));

        let result = encode("text/csv, application/json;q=0.9", &two_rows());
        assert!(matches!(result, Err(DispatchError::UnsupportedContentType(_))));
    }

    #[test]
    fn test_csv_basic() {
        let encoded = encode("text/csv", &two_rows()).unwrap();
        assert_eq!(encoded.body, "id,name\n1,a\n2,b");
        assert_eq!(encoded.mime_type, CSV_MIME);
    }

    #[test]
    fn test_csv_quoting() {
        let rows = vec![row(&[
            ("street", "Main St, Upper".into()),
            ("note", "said \"hi\"".into()),
            ("multi", "line1\nline2".into()),
            ("missing", SqlValue::Null),
        ])];
        let body = encode("text/csv", &rows).unwrap().body;
        assert_eq!(
            body,
            "street,note,multi,missing\n\"Main St, Upper\",\"said \"\"hi\"\"\",\"line1\nline2\","
        );
    }

    #[test]
    fn test_csv_empty_rows() {
        assert_eq!(encode("text/csv", &[]).unwrap().body, "");
    }

    #[test]
    fn test_csv_columns_follow_first_row() {
        let rows = vec![
            row(&[("a", SqlValue::Int(1)), ("b", SqlValue::Int(2))]),
            row(&[("b", SqlValue::Int(4)), ("c", SqlValue::Int(5))]),
        ];
        let body = encode("text/csv", &rows).unwrap().body;
        assert_eq!(body, "a,b\n1,2\n,4");
    }

    #[test]
    fn test_single_row() {
        let rows = two_rows();
        assert_eq!(encode_single(&rows).unwrap(), r#"{"id":1,"name":"a"}"#);
        assert_eq!(encode_single(&[]).unwrap(), "null");
    }
}
