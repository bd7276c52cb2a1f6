//! Scripted in-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::backend::{Backend, DbError, RoutineName};
use super::value::{OutValue, Param, ProcArg, RowSet, SqlType};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Query { sql: String, params: Vec<Param> },
    Procedure { name: String, args: Vec<ProcArg> },
    Function { name: String, returns: SqlType, args: Vec<Param> },
    Commit,
    Rollback,
    Close,
}

#[derive(Default)]
struct Script {
    queries: Vec<(String, Result<RowSet, String>)>,
    procedures: HashMap<String, Result<Vec<OutValue>, String>>,
    functions: HashMap<String, Result<OutValue, String>>,
    commit_failure: Option<String>,
    calls: Vec<Call>,
}

#[derive(Default, Clone)]
pub(crate) struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    /// Answer any query whose SQL contains `fragment`; first match wins.
    pub(crate) fn on_query(&self, fragment: &str, rows: RowSet) {
        self.lock().queries.push((fragment.to_string(), Ok(rows)));
    }

    pub(crate) fn fail_query(&self, fragment: &str, message: &str) {
        self.lock()
            .queries
            .push((fragment.to_string(), Err(message.to_string())));
    }

    pub(crate) fn on_procedure(&self, name: &str, outputs: Vec<OutValue>) {
        self.lock().procedures.insert(name.to_string(), Ok(outputs));
    }

    pub(crate) fn fail_procedure(&self, name: &str, message: &str) {
        self.lock()
            .procedures
            .insert(name.to_string(), Err(message.to_string()));
    }

    pub(crate) fn on_function(&self, name: &str, value: OutValue) {
        self.lock().functions.insert(name.to_string(), Ok(value));
    }

    pub(crate) fn fail_function(&self, name: &str, message: &str) {
        self.lock()
            .functions
            .insert(name.to_string(), Err(message.to_string()));
    }

    pub(crate) fn fail_commit(&self, message: &str) {
        self.lock().commit_failure = Some(message.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn procedure_args(&self, name: &str) -> Option<Vec<ProcArg>> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Procedure { name: called, args } if called == name => Some(args),
            _ => None,
        })
    }

    pub(crate) fn function_args(&self, name: &str) -> Option<Vec<Param>> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Function {
                name: called, args, ..
            } if called == name => Some(args),
            _ => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script mutex poisoned")
    }
}

fn rejected(message: &str) -> DbError {
    DbError::Sqlx(sqlx::Error::Protocol(message.to_string()))
}

impl Backend for ScriptedBackend {
    fn query(&mut self, sql: &str, params: &[Param]) -> Result<RowSet, DbError> {
        let mut script = self.lock();
        script.calls.push(Call::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let response = script
            .queries
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());
        match response {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(rejected(&message)),
            None => Ok(RowSet::default()),
        }
    }

    fn call_procedure(
        &mut self,
        routine: &RoutineName,
        args: &[ProcArg],
    ) -> Result<Vec<OutValue>, DbError> {
        let mut script = self.lock();
        script.calls.push(Call::Procedure {
            name: routine.to_string(),
            args: args.to_vec(),
        });
        match script.procedures.get(routine.as_str()) {
            Some(Ok(outputs)) => Ok(outputs.clone()),
            Some(Err(message)) => Err(rejected(message)),
            None => Ok(Vec::new()),
        }
    }

    fn call_function(
        &mut self,
        routine: &RoutineName,
        returns: SqlType,
        args: &[Param],
    ) -> Result<OutValue, DbError> {
        let mut script = self.lock();
        script.calls.push(Call::Function {
            name: routine.to_string(),
            returns,
            args: args.to_vec(),
        });
        match script.functions.get(routine.as_str()) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(rejected(message)),
            None => Ok(OutValue::Scalar(super::value::DbValue::Null)),
        }
    }

    fn commit(&mut self) -> Result<(), DbError> {
        let mut script = self.lock();
        script.calls.push(Call::Commit);
        match script.commit_failure.clone() {
            Some(message) => Err(rejected(&message)),
            None => Ok(()),
        }
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.lock().calls.push(Call::Rollback);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.lock().calls.push(Call::Close);
        Ok(())
    }
}
