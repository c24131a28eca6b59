//! Value coercion between JSON values and MySQL column values
//!
//! `date` columns are written as `YYYY-MM-DD HH:MM:SS` (UTC) and read back as
//! RFC 3339 strings; `json` columns are written as JSON text (strings included) and
//! parsed on read. Untyped columns pass through unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use crate::metadata::TableMetadata;
use crate::query::DataObject;
use crate::types::ColumnType;

/// SQL datetime layout used on write
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a date value in any accepted shape
///
/// Accepts RFC 3339 strings, SQL datetime strings (with optional fraction),
/// bare `YYYY-MM-DD` dates and epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Convert a value for writing into a column of the given type
pub fn to_db(column_type: Option<ColumnType>, value: &Value) -> Value {
    match (column_type, value) {
        (_, Value::Null) => Value::Null,
        (Some(ColumnType::Date), v) => match parse_date(v) {
            Some(dt) => Value::String(dt.format(SQL_DATETIME_FORMAT).to_string()),
            None => v.clone(),
        },
        (Some(ColumnType::Json), v) => Value::String(v.to_string()),
        (_, v) => v.clone(),
    }
}

/// Convert a value read from a column of the given type
///
/// `json` strings are parsed as JSON text. A native JSON column holding the
/// string `"123"` arrives from `JSON_OBJECT` as that bare string and therefore
/// reads back as the number 123.
pub fn from_db(column_type: Option<ColumnType>, value: Value) -> Value {
    match (column_type, value) {
        (_, Value::Null) => Value::Null,
        (Some(ColumnType::Date), v) => match parse_date(&v) {
            Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => v,
        },
        (Some(ColumnType::Json), Value::String(s)) => {
            serde_json::from_str(&s).unwrap_or(Value::String(s))
        }
        (_, v) => v,
    }
}

/// Convert every typed column of a fetched row
///
/// Non-object rows become an empty object.
pub fn row_from_db(metadata: &TableMetadata, row: Value) -> DataObject {
    match row {
        Value::Object(obj) => obj
            .into_iter()
            .map(|(column, value)| {
                let converted = from_db(metadata.column_type(&column), value);
                (column, converted)
            })
            .collect(),
        _ => DataObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{create_metadata, TableModel};
    use crate::types::ColumnDescriptor;
    use serde_json::json;

    #[test]
    fn test_date_to_db_format() {
        let v = to_db(Some(ColumnType::Date), &json!("2024-03-05T10:20:30+02:00"));
        assert_eq!(v, json!("2024-03-05 08:20:30"));
    }

    #[test]
    fn test_date_from_epoch_millis() {
        let v = to_db(Some(ColumnType::Date), &json!(0));
        assert_eq!(v, json!("1970-01-01 00:00:00"));
    }

    #[test]
    fn test_date_round_trip_to_the_second() {
        let original = Utc.with_ymd_and_hms(2023, 11, 2, 17, 45, 9).unwrap();
        let written = to_db(Some(ColumnType::Date), &json!(original.to_rfc3339()));
        let read = from_db(Some(ColumnType::Date), written);

        assert_eq!(parse_date(&read), Some(original));
    }

    #[test]
    fn test_unparseable_date_passes_through() {
        assert_eq!(to_db(Some(ColumnType::Date), &json!("soon")), json!("soon"));
        assert_eq!(from_db(Some(ColumnType::Date), json!("soon")), json!("soon"));
    }

    #[test]
    fn test_json_round_trip() {
        let doc = json!({"tags": ["a", "b"], "n": 1});
        let written = to_db(Some(ColumnType::Json), &doc);
        assert!(written.is_string());
        assert_eq!(from_db(Some(ColumnType::Json), written), doc);
    }

    #[test]
    fn test_json_strings_are_encoded() {
        let written = to_db(Some(ColumnType::Json), &json!("hello"));
        assert_eq!(written, json!("\"hello\""));
        assert_eq!(from_db(Some(ColumnType::Json), written), json!("hello"));

        let written = to_db(Some(ColumnType::Json), &json!("123"));
        assert_eq!(from_db(Some(ColumnType::Json), written), json!("123"));
    }

    #[test]
    fn test_json_invalid_text_kept() {
        assert_eq!(from_db(Some(ColumnType::Json), json!("{oops")), json!("{oops"));
    }

    #[test]
    fn test_untyped_and_null_pass_through() {
        assert_eq!(to_db(None, &json!({"a": 1})), json!({"a": 1}));
        assert_eq!(to_db(Some(ColumnType::Json), &Value::Null), Value::Null);
        assert_eq!(from_db(Some(ColumnType::Date), Value::Null), Value::Null);
    }

    #[test]
    fn test_row_from_db() {
        let metadata = create_metadata(
            "events",
            TableModel::new()
                .column("id", ColumnDescriptor::new().auto_increment())
                .column("at", ColumnDescriptor::typed(ColumnType::Date))
                .column("payload", ColumnDescriptor::typed(ColumnType::Json)),
        )
        .unwrap();

        let row = row_from_db(
            &metadata,
            json!({"id": 1, "at": "2024-01-02 03:04:05.000000", "payload": "[1,2]"}),
        );

        assert_eq!(row["id"], json!(1));
        assert_eq!(row["at"], json!("2024-01-02T03:04:05Z"));
        assert_eq!(row["payload"], json!([1, 2]));
    }
}
