//! Data access: the value model, the backend seam, the PostgreSQL backend,
//! and the reporting shim the rest of the crate talks to.

mod backend;
pub mod postgres;
mod shim;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, DbError, RoutineName};
pub use postgres::PgBackend;
pub use shim::Database;
pub use value::{DbValue, OutValue, Param, ProcArg, RowSet, SqlType};
