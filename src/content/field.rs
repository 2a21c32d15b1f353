//! Field kinds and JSON to SQL value conversion

use crate::error::{validation_error, AppError};
use chrono::{DateTime, NaiveDate, Utc};
use postgres_types::ToSql;
use serde::Serialize;
use serde_json::Value;

/// Column type of a writable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    BigInt,
    Float,
    Boolean,
    Json,
    Timestamp,
}

impl FieldKind {
    /// PostgreSQL column type used by the schema bootstrap
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::BigInt => "BIGINT",
            FieldKind::Float => "DOUBLE PRECISION",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::Json => "JSONB",
            FieldKind::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// A writable column of a resource
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Typed SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i32>),
    BigInt(Option<i64>),
    Float(Option<f64>),
    Boolean(Option<bool>),
    Json(Option<Value>),
    Timestamp(Option<DateTime<Utc>>),
}

impl SqlValue {
    pub fn as_param(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlValue::Text(v) => v,
            SqlValue::Integer(v) => v,
            SqlValue::BigInt(v) => v,
            SqlValue::Float(v) => v,
            SqlValue::Boolean(v) => v,
            SqlValue::Json(v) => v,
            SqlValue::Timestamp(v) => v,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Integer(v) => v.is_none(),
            SqlValue::BigInt(v) => v.is_none(),
            SqlValue::Float(v) => v.is_none(),
            SqlValue::Boolean(v) => v.is_none(),
            SqlValue::Json(v) => v.is_none(),
            SqlValue::Timestamp(v) => v.is_none(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(Some(value.into()))
    }
}

impl Field {
    /// Convert a request value for this field, enforcing `required`
    pub fn convert(&self, value: &Value) -> Result<SqlValue, AppError> {
        let converted = convert_value(self.name, self.kind, value)?;
        if self.required {
            let blank = match &converted {
                SqlValue::Text(Some(s)) => s.trim().is_empty(),
                other => other.is_null(),
            };
            if blank {
                return Err(validation_error(format!("`{}` is required", self.name)));
            }
        }
        Ok(converted)
    }
}

fn invalid(name: &str, expected: &str) -> AppError {
    validation_error(format!("`{}` must be {}", name, expected))
}

fn blank_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.trim().is_empty())
}

/// Convert a JSON value into a typed SQL value of the given kind
pub fn convert_value(name: &str, kind: FieldKind, value: &Value) -> Result<SqlValue, AppError> {
    match kind {
        FieldKind::Text => match value {
            Value::Null => Ok(SqlValue::Text(None)),
            Value::String(s) => Ok(SqlValue::Text(Some(s.clone()))),
            Value::Number(n) => Ok(SqlValue::Text(Some(n.to_string()))),
            Value::Bool(b) => Ok(SqlValue::Text(Some(b.to_string()))),
            _ => Err(invalid(name, "a string")),
        },
        FieldKind::Integer => {
            if value.is_null() || blank_string(value) {
                return Ok(SqlValue::Integer(None));
            }
            let n = parse_i64(value).ok_or_else(|| invalid(name, "an integer"))?;
            let n = i32::try_from(n).map_err(|_| invalid(name, "a 32-bit integer"))?;
            Ok(SqlValue::Integer(Some(n)))
        }
        FieldKind::BigInt => {
            if value.is_null() || blank_string(value) {
                return Ok(SqlValue::BigInt(None));
            }
            let n = parse_i64(value).ok_or_else(|| invalid(name, "an integer"))?;
            Ok(SqlValue::BigInt(Some(n)))
        }
        FieldKind::Float => {
            if value.is_null() || blank_string(value) {
                return Ok(SqlValue::Float(None));
            }
            let n = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
                _ => None,
            };
            n.map(|f| SqlValue::Float(Some(f)))
                .ok_or_else(|| invalid(name, "a number"))
        }
        FieldKind::Boolean => match value {
            Value::Null => Ok(SqlValue::Boolean(None)),
            Value::Bool(b) => Ok(SqlValue::Boolean(Some(*b))),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(SqlValue::Boolean(Some(false))),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(SqlValue::Boolean(Some(true))),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(SqlValue::Boolean(Some(true))),
                "false" | "0" | "no" | "off" => Ok(SqlValue::Boolean(Some(false))),
                "" => Ok(SqlValue::Boolean(None)),
                _ => Err(invalid(name, "a boolean")),
            },
            _ => Err(invalid(name, "a boolean")),
        },
        FieldKind::Json => match value {
            Value::Null => Ok(SqlValue::Json(None)),
            Value::Array(_) | Value::Object(_) => Ok(SqlValue::Json(Some(value.clone()))),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.starts_with('[') || trimmed.starts_with('{') {
                    let parsed: Value = serde_json::from_str(trimmed)
                        .map_err(|_| invalid(name, "valid JSON"))?;
                    Ok(SqlValue::Json(Some(parsed)))
                } else {
                    let items: Vec<Value> = trimmed
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect();
                    Ok(SqlValue::Json(Some(Value::Array(items))))
                }
            }
            _ => Err(invalid(name, "an array, an object or a comma-separated list")),
        },
        FieldKind::Timestamp => match value {
            Value::Null => Ok(SqlValue::Timestamp(None)),
            Value::String(s) if s.trim().is_empty() => Ok(SqlValue::Timestamp(None)),
            Value::String(s) => parse_timestamp(s.trim())
                .map(|ts| SqlValue::Timestamp(Some(ts)))
                .ok_or_else(|| invalid(name, "an RFC 3339 timestamp or a YYYY-MM-DD date")),
            _ => Err(invalid(name, "a timestamp string")),
        },
    }
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn field(kind: FieldKind, required: bool) -> Field {
        Field { name: "f", kind, required }
    }

    #[test]
    fn test_text_conversion() {
        let f = field(FieldKind::Text, false);
        assert_eq!(f.convert(&json!("hello")).unwrap(), SqlValue::text("hello"));
        assert_eq!(f.convert(&json!(42)).unwrap(), SqlValue::text("42"));
        assert_eq!(f.convert(&Value::Null).unwrap(), SqlValue::Text(None));
        assert!(f.convert(&json!(["a"])).is_err());
    }

    #[test]
    fn test_required_rejects_blank() {
        let f = field(FieldKind::Text, true);
        assert!(f.convert(&json!("   ")).is_err());
        assert!(f.convert(&Value::Null).is_err());
        assert!(field(FieldKind::Integer, true).convert(&json!("")).is_err());
    }

    #[test]
    fn test_integer_conversion() {
        let f = field(FieldKind::Integer, false);
        assert_eq!(f.convert(&json!(7)).unwrap(), SqlValue::Integer(Some(7)));
        assert_eq!(f.convert(&json!("12")).unwrap(), SqlValue::Integer(Some(12)));
        assert_eq!(f.convert(&json!(3.0)).unwrap(), SqlValue::Integer(Some(3)));
        assert_eq!(f.convert(&json!("")).unwrap(), SqlValue::Integer(None));
        assert!(f.convert(&json!(3.5)).is_err());
        assert!(f.convert(&json!("abc")).is_err());
        assert!(f.convert(&json!(5_000_000_000i64)).is_err());

        let big = field(FieldKind::BigInt, false);
        assert_eq!(big.convert(&json!(5_000_000_000i64)).unwrap(), SqlValue::BigInt(Some(5_000_000_000)));
    }

    #[test]
    fn test_boolean_conversion() {
        let f = field(FieldKind::Boolean, false);
        assert_eq!(f.convert(&json!(true)).unwrap(), SqlValue::Boolean(Some(true)));
        assert_eq!(f.convert(&json!("false")).unwrap(), SqlValue::Boolean(Some(false)));
        assert_eq!(f.convert(&json!(1)).unwrap(), SqlValue::Boolean(Some(true)));
        assert!(f.convert(&json!("maybe")).is_err());
        assert!(f.convert(&json!(2)).is_err());
    }

    #[test]
    fn test_json_conversion() {
        let f = field(FieldKind::Json, false);
        assert_eq!(
            f.convert(&json!(["rust", "web"])).unwrap(),
            SqlValue::Json(Some(json!(["rust", "web"])))
        );
        assert_eq!(
            f.convert(&json!("[\"a\",\"b\"]")).unwrap(),
            SqlValue::Json(Some(json!(["a", "b"])))
        );
        assert_eq!(
            f.convert(&json!("linux, bash ,, networking")).unwrap(),
            SqlValue::Json(Some(json!(["linux", "bash", "networking"])))
        );
        assert_eq!(f.convert(&json!("")).unwrap(), SqlValue::Json(Some(json!([]))));
        assert!(f.convert(&json!("[broken")).is_err());
        assert!(f.convert(&json!(5)).is_err());
    }

    #[test]
    fn test_timestamp_conversion() {
        let f = field(FieldKind::Timestamp, false);
        let SqlValue::Timestamp(Some(ts)) = f.convert(&json!("2024-03-01T10:30:00+02:00")).unwrap() else {
            panic!("expected timestamp");
        };
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");

        let SqlValue::Timestamp(Some(day)) = f.convert(&json!("2024-03-01")).unwrap() else {
            panic!("expected timestamp");
        };
        assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(f.convert(&json!("yesterday")).is_err());
    }

    #[test]
    fn test_error_names_field() {
        let f = Field { name: "reading_time", kind: FieldKind::Integer, required: false };
        let err = f.convert(&json!("soon")).unwrap_err();
        assert!(err.to_string().contains("reading_time"));
    }
}
