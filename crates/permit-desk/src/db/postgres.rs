//! PostgreSQL backend over a single `sqlx` connection.
//!
//! The connection is driven by a private current-thread runtime so every call
//! blocks the caller until the server answers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, Postgres, Row, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use super::backend::{Backend, DbError, RoutineName};
use super::value::{DbValue, OutValue, Param, ProcArg, RowSet, SqlType};

pub struct PgBackend {
    connection: Option<PgConnection>,
    runtime: Runtime,
    in_transaction: bool,
}

impl PgBackend {
    pub fn connect(url: &str) -> Result<Self, DbError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(DbError::Runtime)?;
        let connection = runtime.block_on(PgConnection::connect(url))?;
        info!("database connection established");

        Ok(Self {
            connection: Some(connection),
            runtime,
            in_transaction: false,
        })
    }

    fn fetch_all(&mut self, sql: &str, params: &[&Param]) -> Result<Vec<PgRow>, DbError> {
        let connection = self.connection.as_mut().ok_or(DbError::Closed)?;
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind(query, param);
        }
        Ok(self.runtime.block_on(query.fetch_all(&mut *connection))?)
    }

    fn execute(&mut self, sql: &str) -> Result<(), DbError> {
        let connection = self.connection.as_mut().ok_or(DbError::Closed)?;
        self.runtime.block_on(connection.execute(sql))?;
        Ok(())
    }

    fn begin_if_idle(&mut self) -> Result<(), DbError> {
        if !self.in_transaction {
            self.execute("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn end_transaction(&mut self, statement: &str) -> Result<(), DbError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.execute(statement)
    }

    /// Drain an open refcursor; must run inside the transaction that opened it.
    fn fetch_cursor(&mut self, name: &str) -> Result<RowSet, DbError> {
        let sql = format!("FETCH ALL FROM \"{}\"", name.replace('"', "\"\""));
        let rows = self.fetch_all(&sql, &[])?;
        decode_rows(&rows)
    }

    fn resolve(&mut self, output: ServerOutput) -> Result<OutValue, DbError> {
        match output {
            ServerOutput::Ready(value) => Ok(value),
            ServerOutput::Cursor(name) => Ok(OutValue::Rows(self.fetch_cursor(&name)?)),
        }
    }
}

/// An out-value as the server returned it; cursors still have to be drained.
#[derive(Debug, PartialEq)]
enum ServerOutput {
    Ready(OutValue),
    Cursor(String),
}

fn server_output(value: DbValue, sql_type: SqlType) -> ServerOutput {
    match (sql_type, value) {
        (SqlType::Cursor, DbValue::Text(name)) => ServerOutput::Cursor(name),
        (SqlType::Cursor, DbValue::Null) => ServerOutput::Ready(OutValue::Rows(RowSet::default())),
        (_, value) => ServerOutput::Ready(OutValue::Scalar(value)),
    }
}

fn out_slots(args: &[ProcArg]) -> Vec<SqlType> {
    args.iter()
        .filter_map(|arg| match arg {
            ProcArg::Out(sql_type) => Some(*sql_type),
            ProcArg::In(_) => None,
        })
        .collect()
}

/// Pair the first result row of a `CALL` with the declared out-slots.
fn procedure_outputs(
    routine: &RoutineName,
    row: Option<Vec<DbValue>>,
    slots: &[SqlType],
) -> Result<Vec<ServerOutput>, DbError> {
    let missing = |position| DbError::MissingOutput {
        routine: routine.to_string(),
        position,
    };
    let row = row.ok_or_else(|| missing(0))?;
    if row.len() < slots.len() {
        return Err(missing(row.len()));
    }
    Ok(row
        .into_iter()
        .zip(slots)
        .map(|(value, sql_type)| server_output(value, *sql_type))
        .collect())
}

fn decode_row(row: &PgRow) -> Result<Vec<DbValue>, DbError> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

impl Backend for PgBackend {
    fn query(&mut self, sql: &str, params: &[Param]) -> Result<RowSet, DbError> {
        let params: Vec<&Param> = params.iter().collect();
        let rows = self.fetch_all(sql, &params)?;
        decode_rows(&rows)
    }

    fn call_procedure(
        &mut self,
        routine: &RoutineName,
        args: &[ProcArg],
    ) -> Result<Vec<OutValue>, DbError> {
        let (sql, inputs) = procedure_statement(routine, args);
        let slots = out_slots(args);

        self.begin_if_idle()?;
        debug!(%routine, "CALL");
        let rows = self.fetch_all(&sql, &inputs)?;
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let row = rows.first().map(decode_row).transpose()?;
        procedure_outputs(routine, row, &slots)?
            .into_iter()
            .map(|output| self.resolve(output))
            .collect()
    }

    fn call_function(
        &mut self,
        routine: &RoutineName,
        returns: SqlType,
        args: &[Param],
    ) -> Result<OutValue, DbError> {
        let sql = function_statement(routine, returns, args);
        let inputs: Vec<&Param> = args.iter().collect();

        self.begin_if_idle()?;
        debug!(%routine, "SELECT");
        let rows = self.fetch_all(&sql, &inputs)?;
        let row = rows.first().ok_or_else(|| DbError::MissingOutput {
            routine: routine.to_string(),
            position: 0,
        })?;
        let value = decode_value(row, 0)?;
        self.resolve(server_output(value, returns))
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.end_transaction("ROLLBACK")
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.rollback()?;
        if let Some(connection) = self.connection.take() {
            self.runtime.block_on(connection.close())?;
            info!("database connection closed");
        }
        Ok(())
    }
}

fn placeholder(position: usize, sql_type: SqlType) -> String {
    format!("${position}::{}", sql_type.sql_name())
}

/// `CALL routine($1::bigint, ..., NULL::bigint)` plus the inputs in bind order.
pub(crate) fn procedure_statement<'a>(
    routine: &RoutineName,
    args: &'a [ProcArg],
) -> (String, Vec<&'a Param>) {
    let mut inputs = Vec::new();
    let slots: Vec<String> = args
        .iter()
        .map(|arg| match arg {
            ProcArg::In(param) => {
                inputs.push(param);
                placeholder(inputs.len(), param.sql_type())
            }
            ProcArg::Out(sql_type) => format!("NULL::{}", sql_type.sql_name()),
        })
        .collect();
    (format!("CALL {routine}({})", slots.join(", ")), inputs)
}

/// `SELECT routine($1::bigint, ...)::numeric`; cursors are returned uncast.
pub(crate) fn function_statement(
    routine: &RoutineName,
    returns: SqlType,
    args: &[Param],
) -> String {
    let slots: Vec<String> = args
        .iter()
        .enumerate()
        .map(|(index, param)| placeholder(index + 1, param.sql_type()))
        .collect();
    let call = format!("{routine}({})", slots.join(", "));
    match returns {
        SqlType::Cursor => format!("SELECT {call}"),
        other => format!("SELECT {call}::{}", other.sql_name()),
    }
}

fn bind<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &Param,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        Param::Value(DbValue::Null) => bind_null(query, SqlType::Text),
        Param::Null(sql_type) => bind_null(query, *sql_type),
        Param::Value(DbValue::Integer(value)) => query.bind(*value),
        Param::Value(DbValue::Numeric(value)) => query.bind(*value),
        Param::Value(DbValue::Float(value)) => query.bind(*value),
        Param::Value(DbValue::Text(value)) => query.bind(value.clone()),
        Param::Value(DbValue::Boolean(value)) => query.bind(*value),
        Param::Value(DbValue::Date(value)) => query.bind(*value),
        Param::Value(DbValue::Timestamp(value)) => query.bind(*value),
        Param::Value(DbValue::TimestampTz(value)) => query.bind(*value),
        Param::Value(DbValue::Bytes(value)) => query.bind(value.clone()),
    }
}

fn bind_null<'q>(
    query: Query<'q, Postgres, PgArguments>,
    sql_type: SqlType,
) -> Query<'q, Postgres, PgArguments> {
    match sql_type {
        SqlType::BigInt => query.bind(None::<i64>),
        SqlType::Numeric => query.bind(None::<Decimal>),
        SqlType::Double => query.bind(None::<f64>),
        SqlType::Text | SqlType::Cursor => query.bind(None::<String>),
        SqlType::Boolean => query.bind(None::<bool>),
        SqlType::Date => query.bind(None::<NaiveDate>),
        SqlType::Timestamp => query.bind(None::<NaiveDateTime>),
        SqlType::TimestampTz => query.bind(None::<DateTime<Utc>>),
        SqlType::Bytes => query.bind(None::<Vec<u8>>),
    }
}

fn decode_rows(rows: &[PgRow]) -> Result<RowSet, DbError> {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let decoded = rows
        .iter()
        .map(|row| (0..row.len()).map(|index| decode_value(row, index)).collect())
        .collect::<Result<Vec<Vec<DbValue>>, DbError>>()?;

    Ok(RowSet::new(columns, decoded))
}

fn decode_value(row: &PgRow, index: usize) -> Result<DbValue, DbError> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(DbValue::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };

    let value = match type_name.as_str() {
        "INT2" => DbValue::Integer(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => DbValue::Integer(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => DbValue::Integer(row.try_get::<i64, _>(index)?),
        "NUMERIC" => DbValue::Numeric(row.try_get::<Decimal, _>(index)?),
        "FLOAT4" => DbValue::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => DbValue::Float(row.try_get::<f64, _>(index)?),
        "BOOL" => DbValue::Boolean(row.try_get::<bool, _>(index)?),
        "DATE" => DbValue::Date(row.try_get::<NaiveDate, _>(index)?),
        "TIMESTAMP" => DbValue::Timestamp(row.try_get::<NaiveDateTime, _>(index)?),
        "TIMESTAMPTZ" => DbValue::TimestampTz(row.try_get::<DateTime<Utc>, _>(index)?),
        "BYTEA" => DbValue::Bytes(row.try_get::<Vec<u8>, _>(index)?),
        _ => decode_fallback(row, index, &type_name)?,
    };
    Ok(value)
}

/// Text-like and unknown types: read as UTF-8 text, else keep the raw bytes.
fn decode_fallback(row: &PgRow, index: usize, type_name: &str) -> Result<DbValue, DbError> {
    if let Ok(text) = row.try_get_unchecked::<String, _>(index) {
        return Ok(DbValue::Text(text));
    }
    row.try_get_unchecked::<Vec<u8>, _>(index)
        .map(DbValue::Bytes)
        .map_err(|err| DbError::Decode {
            column: format!("{index} ({type_name})"),
            detail: err.to_string(),
        })
}
