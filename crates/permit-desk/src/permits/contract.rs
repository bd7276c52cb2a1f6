//! Typed wrappers for the procedural contract with the permit database.
//!
//! Each wrapper builds the positional argument list in the order the routine
//! declares it and extracts the out-parameters. Failures are reported by the
//! shim; a wrapper returns `None` when nothing usable came back.

use tracing::info;

use super::domain::{
    ApplicationId, ApplicationRequest, AuditFilter, BulkStatusUpdate, Choice, CitizenId,
    CitizenRegistration, DepartmentId, LicenseId, NewReviewStep, Payment, PermitTypeId,
    ReviewCompletion, RevenueQuery,
};
use crate::db::{Backend, Database, DbError, DbValue, OutValue, Param, ProcArg, RowSet, SqlType};
use crate::notice::{Notice, Notifier};

pub mod routines {
    pub const REGISTER_CITIZEN: &str = "sp_register_citizen";
    pub const SUBMIT_APPLICATION: &str = "sp_submit_application";
    pub const PROCESS_PAYMENT: &str = "sp_process_payment";
    pub const ADD_REVIEW_STEP: &str = "sp_add_review_step";
    pub const COMPLETE_REVIEW_STEP: &str = "sp_complete_review_step";
    pub const BULK_UPDATE_STATUS: &str = "sp_bulk_update_status";
    pub const EXPORT_AUDIT_LOG: &str = "sp_export_audit_log";
    pub const CHECK_OPERATION_ALLOWED: &str = "check_operation_allowed";
    pub const CITIZEN_AGE: &str = "fn_calculate_citizen_age";
    pub const VALIDATE_ELIGIBILITY: &str = "fn_validate_eligibility";
    pub const APP_STATUS_SUMMARY: &str = "fn_get_app_status_summary";
    pub const PERMIT_DETAILS: &str = "fn_get_permit_details";
    pub const COUNT_PENDING_REVIEWS: &str = "fn_count_pending_reviews";
    pub const RENEWAL_FEE: &str = "fn_calculate_renewal_fee";
    pub const CALCULATE_REVENUE: &str = "fn_calculate_revenue";
    pub const DEPARTMENT_PERFORMANCE: &str = "pkg_analytics.get_department_performance";
    pub const TOP_PERMIT_TYPES: &str = "pkg_analytics.get_top_permit_types";
}

impl<B, N> Database<B, N>
where
    B: Backend,
    N: Notifier,
{
    pub fn register_citizen(&mut self, registration: &CitizenRegistration) -> Option<CitizenId> {
        let args = [
            ProcArg::input(registration.first_name.as_str()),
            ProcArg::input(registration.last_name.as_str()),
            ProcArg::input(registration.date_of_birth),
            ProcArg::input(registration.national_id.as_str()),
            ProcArg::input(registration.email.as_str()),
            ProcArg::input(registration.phone.as_str()),
            ProcArg::input(registration.address.as_str()),
            ProcArg::input(registration.residency.label()),
            ProcArg::Out(SqlType::BigInt),
        ];
        let id = self.call_committed_for_id(routines::REGISTER_CITIZEN, &args)?;
        info!(citizen_id = id, "citizen registered");
        Some(CitizenId(id))
    }

    pub fn submit_application(&mut self, request: &ApplicationRequest) -> Option<ApplicationId> {
        let args = [
            ProcArg::input(request.citizen_id.0),
            ProcArg::input(request.permit_type_id.0),
            ProcArg::input(request.priority.label()),
            ProcArg::In(Param::optional(request.notes.clone(), SqlType::Text)),
            ProcArg::Out(SqlType::BigInt),
        ];
        let id = self.call_committed_for_id(routines::SUBMIT_APPLICATION, &args)?;
        info!(application_id = id, "application submitted");
        Some(ApplicationId(id))
    }

    pub fn process_payment(&mut self, payment: &Payment) -> bool {
        let args = [
            ProcArg::input(payment.application_id.0),
            ProcArg::input(payment.amount),
            ProcArg::input(payment.method.label()),
        ];
        self.call_committed(routines::PROCESS_PAYMENT, &args).is_some()
    }

    pub fn add_review_step(&mut self, step: &NewReviewStep) -> bool {
        let args = [
            ProcArg::input(step.application_id.0),
            ProcArg::input(step.department_id.0),
            ProcArg::input(step.reviewer_name.as_str()),
            ProcArg::input(step.comments.as_str()),
        ];
        self.call_committed(routines::ADD_REVIEW_STEP, &args).is_some()
    }

    pub fn complete_review_step(&mut self, completion: &ReviewCompletion) -> bool {
        let args = [
            ProcArg::input(completion.step_id.0),
            ProcArg::input(completion.decision.label()),
            ProcArg::input(completion.comments.as_str()),
        ];
        self.call_committed(routines::COMPLETE_REVIEW_STEP, &args)
            .is_some()
    }

    /// Move every application in `from` for longer than the threshold to `to`.
    pub fn bulk_update_status(&mut self, update: &BulkStatusUpdate) -> Option<i64> {
        let args = [
            ProcArg::input(update.from.label()),
            ProcArg::input(update.to.label()),
            ProcArg::input(update.older_than_days),
            ProcArg::Out(SqlType::BigInt),
        ];
        let updated = self.call_committed_for_id(routines::BULK_UPDATE_STATUS, &args)?;
        info!(updated, from = update.from.label(), to = update.to.label(), "bulk status update");
        Some(updated)
    }

    /// Audit rows drained from the procedure's output cursor.
    pub fn export_audit_log(&mut self, filter: &AuditFilter) -> Option<RowSet> {
        let args = [
            ProcArg::In(Param::optional(filter.from, SqlType::Date)),
            ProcArg::In(Param::optional(filter.to, SqlType::Date)),
            ProcArg::In(Param::optional(filter.table_name.clone(), SqlType::Text)),
            ProcArg::In(Param::optional(filter.operation.clone(), SqlType::Text)),
            ProcArg::Out(SqlType::Cursor),
        ];
        let outputs = self.call_procedure(routines::EXPORT_AUDIT_LOG, &args)?;
        match outputs.into_iter().next() {
            Some(OutValue::Rows(rows)) => Some(rows),
            _ => {
                self.missing_output(routines::EXPORT_AUDIT_LOG, 0);
                None
            }
        }
    }

    pub fn check_operation_allowed(&mut self) -> Option<String> {
        self.text_function(routines::CHECK_OPERATION_ALLOWED, &[])
    }

    pub fn citizen_age(&mut self, citizen: CitizenId) -> Option<DbValue> {
        self.numeric_function(routines::CITIZEN_AGE, &[Param::from(citizen.0)])
    }

    pub fn validate_eligibility(
        &mut self,
        citizen: CitizenId,
        permit_type: PermitTypeId,
    ) -> Option<String> {
        self.text_function(
            routines::VALIDATE_ELIGIBILITY,
            &[Param::from(citizen.0), Param::from(permit_type.0)],
        )
    }

    pub fn application_status_summary(&mut self, application: ApplicationId) -> Option<String> {
        self.text_function(routines::APP_STATUS_SUMMARY, &[Param::from(application.0)])
    }

    pub fn permit_details(&mut self, permit_type: PermitTypeId) -> Option<String> {
        self.text_function(routines::PERMIT_DETAILS, &[Param::from(permit_type.0)])
    }

    pub fn pending_review_count(&mut self, department: DepartmentId) -> Option<DbValue> {
        self.numeric_function(routines::COUNT_PENDING_REVIEWS, &[Param::from(department.0)])
    }

    pub fn renewal_fee(&mut self, license: LicenseId) -> Option<DbValue> {
        self.numeric_function(routines::RENEWAL_FEE, &[Param::from(license.0)])
    }

    pub fn calculate_revenue(&mut self, query: &RevenueQuery) -> Option<DbValue> {
        let args = revenue_args(query);
        self.numeric_function(routines::CALCULATE_REVENUE, &args)
    }

    pub fn department_performance(&mut self, department: DepartmentId) -> Option<DbValue> {
        self.numeric_function(routines::DEPARTMENT_PERFORMANCE, &[Param::from(department.0)])
    }

    pub fn top_permit_types(&mut self, limit: i64) -> Option<RowSet> {
        self.call_function(routines::TOP_PERMIT_TYPES, SqlType::Cursor, &[Param::from(limit)])?
            .into_rows()
    }

    /// Performance score and pending count without raising notices, for
    /// reports that mark failing rows instead.
    pub fn try_department_scores(
        &mut self,
        department: DepartmentId,
    ) -> Result<(DbValue, DbValue), DbError> {
        let id = [Param::from(department.0)];
        let score =
            self.try_call_function(routines::DEPARTMENT_PERFORMANCE, SqlType::Numeric, &id)?;
        let pending =
            self.try_call_function(routines::COUNT_PENDING_REVIEWS, SqlType::Numeric, &id)?;
        Ok((scalar_or_null(score), scalar_or_null(pending)))
    }

    fn call_committed(&mut self, routine: &str, args: &[ProcArg]) -> Option<Vec<OutValue>> {
        let outputs = self.call_procedure(routine, args)?;
        if self.commit() {
            Some(outputs)
        } else {
            None
        }
    }

    fn call_committed_for_id(&mut self, routine: &str, args: &[ProcArg]) -> Option<i64> {
        let outputs = self.call_committed(routine, args)?;
        let id = outputs
            .first()
            .and_then(OutValue::scalar)
            .and_then(DbValue::as_i64);
        if id.is_none() {
            self.missing_output(routine, 0);
        }
        id
    }

    fn text_function(&mut self, routine: &str, args: &[Param]) -> Option<String> {
        let value = self.call_function(routine, SqlType::Text, args)?;
        Some(match scalar_or_null(value) {
            DbValue::Text(text) => text,
            DbValue::Null => String::new(),
            other => crate::export::display_value(&other),
        })
    }

    fn numeric_function(&mut self, routine: &str, args: &[Param]) -> Option<DbValue> {
        self.call_function(routine, SqlType::Numeric, args)
            .map(scalar_or_null)
    }

    fn missing_output(&self, routine: &str, position: usize) {
        let err = DbError::MissingOutput {
            routine: routine.to_string(),
            position,
        };
        self.notify(Notice::error("Error", err.to_string()));
    }
}

fn revenue_args(query: &RevenueQuery) -> [Param; 3] {
    [
        Param::optional(query.start, SqlType::Date),
        Param::optional(query.end, SqlType::Date),
        Param::optional(query.permit_type_id.map(|id| id.0), SqlType::BigInt),
    ]
}

fn scalar_or_null(value: OutValue) -> DbValue {
    match value {
        OutValue::Scalar(value) => value,
        OutValue::Rows(_) => DbValue::Null,
    }
}
