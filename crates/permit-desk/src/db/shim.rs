use tracing::{debug, warn};

use super::backend::{Backend, DbError, RoutineName};
use super::value::{OutValue, Param, ProcArg, RowSet, SqlType};
use crate::notice::{Notice, Notifier};

/// The single owned connection plus the notice channel its failures are reported on.
///
/// Every operation is one blocking round trip. Failures never escape the
/// reporting variants: they become a notice and an empty/absent result.
pub struct Database<B, N> {
    backend: B,
    notifier: N,
}

impl<B, N> Database<B, N>
where
    B: Backend,
    N: Notifier,
{
    pub fn open(backend: B, notifier: N) -> Self {
        Self { backend, notifier }
    }

    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Run a read query; on failure the error is shown and an empty set returned.
    pub fn run_query(&mut self, sql: &str, params: &[Param]) -> RowSet {
        match self.try_query(sql, params) {
            Ok(rows) => rows,
            Err(err) => {
                self.report("Query Error", &err);
                RowSet::default()
            }
        }
    }

    /// Propagating variant of [`run_query`](Self::run_query) for callers that
    /// account for failures themselves.
    pub fn try_query(&mut self, sql: &str, params: &[Param]) -> Result<RowSet, DbError> {
        debug!(params = params.len(), "running query");
        let result = self.backend.query(sql, params);
        if result.is_err() {
            self.abandon();
        }
        result
    }

    /// Invoke a stored procedure, returning its output slots in order.
    ///
    /// Nothing is committed here; mutating callers follow up with [`commit`](Self::commit).
    pub fn call_procedure(&mut self, name: &str, args: &[ProcArg]) -> Option<Vec<OutValue>> {
        match self.try_call_procedure(name, args) {
            Ok(outputs) => Some(outputs),
            Err(err) => {
                self.report("Error", &err);
                None
            }
        }
    }

    pub fn try_call_procedure(
        &mut self,
        name: &str,
        args: &[ProcArg],
    ) -> Result<Vec<OutValue>, DbError> {
        let routine = RoutineName::parse(name)?;
        debug!(%routine, args = args.len(), "calling procedure");
        let result = self.backend.call_procedure(&routine, args);
        if result.is_err() {
            self.abandon();
        }
        result
    }

    /// Invoke a function returning a scalar, or rows when `returns` is a cursor.
    pub fn call_function(
        &mut self,
        name: &str,
        returns: SqlType,
        args: &[Param],
    ) -> Option<OutValue> {
        match self.try_call_function(name, returns, args) {
            Ok(value) => Some(value),
            Err(err) => {
                self.report("Error", &err);
                None
            }
        }
    }

    pub fn try_call_function(
        &mut self,
        name: &str,
        returns: SqlType,
        args: &[Param],
    ) -> Result<OutValue, DbError> {
        let routine = RoutineName::parse(name)?;
        debug!(%routine, args = args.len(), ?returns, "calling function");
        let result = self.backend.call_function(&routine, returns, args);
        if result.is_err() {
            self.abandon();
        }
        result
    }

    /// Commit work done since the last commit; `false` when the commit failed.
    pub fn commit(&mut self) -> bool {
        match self.backend.commit() {
            Ok(()) => true,
            Err(err) => {
                self.abandon();
                self.report("Error", &err);
                false
            }
        }
    }

    /// Close the connection, discarding uncommitted work.
    pub fn close(mut self) -> Result<(), DbError> {
        self.backend.close()
    }

    fn abandon(&mut self) {
        if let Err(err) = self.backend.rollback() {
            warn!(error = %err, "rollback after failed call did not complete");
        }
    }

    fn report(&self, title: &str, err: &DbError) {
        warn!(error = %err, "{title}");
        self.notifier.notify(Notice::error(title, err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{Call, ScriptedBackend};
    use crate::db::value::DbValue;
    use crate::notice::{NoticeLevel, RecordingNotifier};

    type TestDatabase = Database<ScriptedBackend, RecordingNotifier>;

    fn database(backend: &ScriptedBackend) -> (TestDatabase, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        (Database::open(backend.clone(), notifier.clone()), notifier)
    }

    #[test]
    fn failed_query_returns_empty_rows_and_notifies() {
        let backend = ScriptedBackend::default();
        backend.fail_query("FROM citizen", "relation \"citizen\" does not exist");
        let (mut db, notifier) = database(&backend);

        let rows = db.run_query("SELECT COUNT(*) FROM citizen", &[]);

        assert!(rows.is_empty());
        let notice = notifier.last().expect("error surfaced");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Query Error");
        assert!(notice.message.contains("does not exist"));
    }

    #[test]
    fn successful_query_passes_rows_through_silently() {
        let backend = ScriptedBackend::default();
        backend.on_query(
            "FROM audit_log",
            RowSet::new(vec!["count".into()], vec![vec![DbValue::Integer(3)]]),
        );
        let (mut db, notifier) = database(&backend);

        let rows = db.run_query("SELECT COUNT(*) FROM audit_log", &[]);

        assert_eq!(rows.scalar(), Some(&DbValue::Integer(3)));
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn failed_procedure_rolls_back_and_yields_nothing() {
        let backend = ScriptedBackend::default();
        backend.fail_procedure("sp_process_payment", "payment already recorded");
        let (mut db, notifier) = database(&backend);

        let outputs = db.call_procedure("sp_process_payment", &[ProcArg::input(7_i64)]);

        assert!(outputs.is_none());
        assert!(backend.calls().contains(&Call::Rollback));
        assert!(!backend.calls().contains(&Call::Commit));
        assert_eq!(notifier.last().expect("notice").title, "Error");
    }

    #[test]
    fn invalid_routine_name_never_reaches_the_backend() {
        let backend = ScriptedBackend::default();
        let (mut db, notifier) = database(&backend);

        let result = db.call_function("fn_x; DELETE FROM citizen", SqlType::Text, &[]);

        assert!(result.is_none());
        assert!(backend
            .calls()
            .iter()
            .all(|call| !matches!(call, Call::Function { .. })));
        let notice = notifier.last().expect("notice");
        assert!(notice.message.contains("not a valid routine name"));
    }

    #[test]
    fn failed_commit_is_reported() {
        let backend = ScriptedBackend::default();
        backend.fail_commit("could not serialize access");
        let (mut db, notifier) = database(&backend);

        assert!(!db.commit());
        assert!(notifier.last().expect("notice").message.contains("serialize"));
    }
}
