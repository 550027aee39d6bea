use serde_json::Value;

/// How a field of a partial-update body was supplied.
#[derive(Debug, PartialEq, Eq)]
pub enum NullableValue {
    Omitted,
    Null,
    String(String),
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

/// An optional integer field; `null` is rejected because the column is not
/// nullable.
pub fn optional_integer(field: &str, optional_value: Option<&Value>) -> Result<Option<i64>, String> {
    match optional_value {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{field} must be an integer")),
        Some(other) => Err(format!("{field} must be an integer, got {other}")),
    }
}
