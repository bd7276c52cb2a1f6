use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Declared type of a routine parameter, output slot, or function result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    BigInt,
    Numeric,
    Double,
    Text,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Bytes,
    Cursor,
}

impl SqlType {
    /// Type name used when casting placeholders and typed NULLs.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::BigInt => "bigint",
            Self::Numeric => "numeric",
            Self::Double => "double precision",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Bytes => "bytea",
            Self::Cursor => "refcursor",
        }
    }
}

/// A single value read from, or sent to, the database.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Numeric(Decimal),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Type used to bind this value; NULL binds as text unless wrapped in [`Param::Null`].
    pub const fn sql_type(&self) -> SqlType {
        match self {
            Self::Null | Self::Text(_) => SqlType::Text,
            Self::Integer(_) => SqlType::BigInt,
            Self::Numeric(_) => SqlType::Numeric,
            Self::Float(_) => SqlType::Double,
            Self::Boolean(_) => SqlType::Boolean,
            Self::Date(_) => SqlType::Date,
            Self::Timestamp(_) => SqlType::Timestamp,
            Self::TimestampTz(_) => SqlType::TimestampTz,
            Self::Bytes(_) => SqlType::Bytes,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Numeric(value) => value.trunc().to_i64(),
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Self::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(value) => Some(Decimal::from(*value)),
            Self::Numeric(value) => Some(*value),
            Self::Float(value) => Decimal::try_from(*value).ok(),
            Self::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for DbValue {
    fn from(value: Decimal) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for DbValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// Positional input to a query or routine.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Value(DbValue),
    /// NULL carrying the type the routine signature expects.
    Null(SqlType),
}

impl Param {
    pub fn sql_type(&self) -> SqlType {
        match self {
            Self::Value(value) => value.sql_type(),
            Self::Null(sql_type) => *sql_type,
        }
    }

    /// `Some(value)` binds the value, `None` binds a NULL of `sql_type`.
    pub fn optional<T: Into<DbValue>>(value: Option<T>, sql_type: SqlType) -> Self {
        match value {
            Some(value) => Self::Value(value.into()),
            None => Self::Null(sql_type),
        }
    }
}

impl From<DbValue> for Param {
    fn from(value: DbValue) -> Self {
        Self::Value(value)
    }
}

macro_rules! param_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Param {
                fn from(value: $source) -> Self {
                    Self::Value(DbValue::from(value))
                }
            }
        )*
    };
}

param_from!(i64, Decimal, &str, String, NaiveDate, NaiveDateTime);

/// Positional stored-procedure argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcArg {
    In(Param),
    /// Output slot read back after the call.
    Out(SqlType),
}

impl ProcArg {
    pub fn input(value: impl Into<Param>) -> Self {
        Self::In(value.into())
    }
}

/// Rows returned from a query or drained from a cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DbValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<DbValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// First column of the first row, the shape of every COUNT/SUM query.
    pub fn scalar(&self) -> Option<&DbValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Value produced by an output slot or a function call.
#[derive(Debug, Clone, PartialEq)]
pub enum OutValue {
    Scalar(DbValue),
    Rows(RowSet),
}

impl OutValue {
    pub fn scalar(&self) -> Option<&DbValue> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Rows(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<RowSet> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Scalar(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_params_keep_their_declared_type() {
        let param = Param::optional(None::<i64>, SqlType::BigInt);
        assert_eq!(param, Param::Null(SqlType::BigInt));
        assert_eq!(param.sql_type().sql_name(), "bigint");

        let param = Param::optional(Some("notes"), SqlType::Text);
        assert_eq!(param, Param::Value(DbValue::Text("notes".to_string())));
    }

    #[test]
    fn numeric_outputs_convert_to_identifiers() {
        assert_eq!(DbValue::Numeric(Decimal::new(42, 0)).as_i64(), Some(42));
        assert_eq!(DbValue::Integer(7).as_i64(), Some(7));
        assert_eq!(DbValue::Text(" 19 ".to_string()).as_i64(), Some(19));
        assert_eq!(DbValue::Null.as_i64(), None);
        assert_eq!(DbValue::Boolean(true).as_i64(), None);
    }

    #[test]
    fn scalar_reads_first_cell() {
        let rows = RowSet::new(
            vec!["count".to_string()],
            vec![vec![DbValue::Integer(12)]],
        );
        assert_eq!(rows.scalar(), Some(&DbValue::Integer(12)));
        assert_eq!(RowSet::default().scalar(), None);
    }
}
