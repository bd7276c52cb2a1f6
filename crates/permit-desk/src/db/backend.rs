use std::fmt;

use super::value::{OutValue, Param, ProcArg, RowSet, SqlType};

/// Connection-level operations the data access shim is built on.
///
/// Implementations always propagate failures; turning them into notices is
/// the job of [`Database`](super::Database).
pub trait Backend {
    fn query(&mut self, sql: &str, params: &[Param]) -> Result<RowSet, DbError>;

    /// Invoke a stored procedure and return one value per `ProcArg::Out` slot, in order.
    fn call_procedure(
        &mut self,
        routine: &RoutineName,
        args: &[ProcArg],
    ) -> Result<Vec<OutValue>, DbError>;

    /// Invoke a function; a `SqlType::Cursor` return is drained into rows.
    fn call_function(
        &mut self,
        routine: &RoutineName,
        returns: SqlType,
        args: &[Param],
    ) -> Result<OutValue, DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;

    /// Release the connection, discarding uncommitted work.
    fn close(&mut self) -> Result<(), DbError>;
}

/// Failure raised by a backend call.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("database runtime unavailable: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("'{0}' is not a valid routine name")]
    InvalidRoutine(String),
    #[error("{routine} did not return a value for output {position}")]
    MissingOutput { routine: String, position: usize },
    #[error("unable to decode column {column}: {detail}")]
    Decode { column: String, detail: String },
    #[error("database connection is closed")]
    Closed,
}

/// Validated, optionally schema-qualified routine name (`pkg_analytics.get_top_permit_types`).
///
/// Routine names are spliced into SQL text, so only plain identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutineName(String);

impl RoutineName {
    pub fn parse(raw: &str) -> Result<Self, DbError> {
        let trimmed = raw.trim();
        let mut parts = 0;
        for part in trimmed.split('.') {
            parts += 1;
            if parts > 2 || !is_identifier(part) {
                return Err(DbError::InvalidRoutine(raw.to_string()));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    part.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_package_qualified_names() {
        let plain = RoutineName::parse("sp_register_citizen").expect("plain name");
        assert_eq!(plain.as_str(), "sp_register_citizen");

        let qualified =
            RoutineName::parse(" pkg_analytics.get_top_permit_types ").expect("qualified name");
        assert_eq!(qualified.to_string(), "pkg_analytics.get_top_permit_types");
    }

    #[test]
    fn rejects_names_that_would_alter_the_statement() {
        for raw in [
            "",
            "sp_x; DROP TABLE citizen",
            "sp_x()",
            "a.b.c",
            "1fn",
            "fn-name",
            "pkg.",
            "\"quoted\"",
        ] {
            let err = RoutineName::parse(raw).expect_err(raw);
            assert!(matches!(err, DbError::InvalidRoutine(_)), "{raw}");
        }
    }
}
