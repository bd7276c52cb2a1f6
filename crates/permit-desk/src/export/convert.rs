use crate::db::DbValue;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// String form of a database value for files and tables; defined for every value.
pub fn display_value(value: &DbValue) -> String {
    match value {
        DbValue::Null => String::new(),
        DbValue::Integer(value) => value.to_string(),
        DbValue::Numeric(value) => value.to_string(),
        DbValue::Float(value) => value.to_string(),
        DbValue::Text(value) => value.clone(),
        DbValue::Boolean(value) => value.to_string(),
        DbValue::Date(value) => value.format(crate::forms::DATE_FORMAT).to_string(),
        DbValue::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
        DbValue::TimestampTz(value) => value.format(TIMESTAMP_FORMAT).to_string(),
        DbValue::Bytes(value) => String::from_utf8_lossy(value).into_owned(),
    }
}

/// Like [`display_value`] but keeps SQL NULL distinct from empty text.
pub fn optional_display(value: Option<&DbValue>) -> Option<String> {
    match value {
        None | Some(DbValue::Null) => None,
        Some(value) => Some(display_value(value)),
    }
}
