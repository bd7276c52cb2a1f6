//! The action table: every user-facing operation and the handler it runs.
//!
//! Handlers never fail outward. Validation problems and database errors end
//! up as notices and the action yields whatever screen it could build.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::db::{Backend, Database, DbError, DbValue, Param};
use crate::export::{self, display_value, ExportFormat, ExportOutcome, ExportSummary};
use crate::forms::{
    parse_id, parse_year, ApplicationForm, AuditFilterForm, BulkUpdateForm, CitizenForm,
    CompleteReviewForm, EligibilityForm, FormError, PaymentForm, RevenueForm, ReviewStepForm,
};
use crate::notice::{Notice, Notifier};
use crate::permits::{ApplicationId, CitizenId, DepartmentId, LicenseId, PermitTypeId};
use crate::reports::{self, format_rwf};
use crate::screen::{Screen, TableView};
use crate::views::{lookup, ListingView, Lookup};

pub const ABOUT: &str = "Permit & License Management System
Administration desk for the permit and license database

Features:
- Citizen registration and permit applications
- Payments and multi-department review routing
- License renewal fees and eligibility checks
- Revenue, department and permit type reports
- Audit log and full data exports
- Bulk status operations";

const APPLICATION_FEE: &str = "SELECT payment_amount FROM application WHERE application_id = $1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Dashboard,
    List(ListingView),
    Lookup(Lookup),
    RegisterCitizen(CitizenForm),
    CitizenAge { citizen: String },
    CheckEligibility(EligibilityForm),
    SubmitApplication(ApplicationForm),
    ApplicationSummary { application: String },
    ProcessPayment(PaymentForm),
    /// Pay a listed application; a blank amount means the recorded fee.
    PayApplication(PaymentForm),
    PermitDetails { permit_type: String },
    PendingReviews { department: String },
    RenewalFee { license: String },
    AddReviewStep(ReviewStepForm),
    CompleteReviewStep(CompleteReviewForm),
    CheckOperationAllowed,
    BulkUpdateStatus(BulkUpdateForm),
    MonthlyRevenue { year: String },
    DepartmentPerformance,
    TopPermitTypes,
    CalculateRevenue(RevenueForm),
    ExportAuditLog {
        format: ExportFormat,
        path: PathBuf,
        filter: AuditFilterForm,
    },
    ExportAll { dir: PathBuf },
    About,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::List(_) => "list",
            Self::Lookup(_) => "lookup",
            Self::RegisterCitizen(_) => "register_citizen",
            Self::CitizenAge { .. } => "citizen_age",
            Self::CheckEligibility(_) => "check_eligibility",
            Self::SubmitApplication(_) => "submit_application",
            Self::ApplicationSummary { .. } => "application_summary",
            Self::ProcessPayment(_) => "process_payment",
            Self::PayApplication(_) => "pay_application",
            Self::PermitDetails { .. } => "permit_details",
            Self::PendingReviews { .. } => "pending_reviews",
            Self::RenewalFee { .. } => "renewal_fee",
            Self::AddReviewStep(_) => "add_review_step",
            Self::CompleteReviewStep(_) => "complete_review_step",
            Self::CheckOperationAllowed => "check_operation_allowed",
            Self::BulkUpdateStatus(_) => "bulk_update_status",
            Self::MonthlyRevenue { .. } => "monthly_revenue",
            Self::DepartmentPerformance => "department_performance",
            Self::TopPermitTypes => "top_permit_types",
            Self::CalculateRevenue(_) => "calculate_revenue",
            Self::ExportAuditLog { .. } => "export_audit_log",
            Self::ExportAll { .. } => "export_all",
            Self::About => "about",
        }
    }
}

/// Owns the connection for the session and dispatches actions against it.
pub struct Desk<B, N> {
    db: Database<B, N>,
    audit_limit: u32,
    today: NaiveDate,
}

impl<B, N> Desk<B, N>
where
    B: Backend,
    N: Notifier,
{
    pub fn new(db: Database<B, N>, audit_limit: u32, today: NaiveDate) -> Self {
        Self {
            db,
            audit_limit,
            today,
        }
    }

    pub fn perform(&mut self, action: Action) -> Screen {
        debug!(action = action.name(), "performing action");
        match self.dispatch(action) {
            Ok(screen) => screen,
            Err(err) => {
                self.db.notify(Notice::error("Error", err.to_string()));
                Screen::Nothing
            }
        }
    }

    /// End the session, discarding anything left uncommitted.
    pub fn close(self) -> Result<(), DbError> {
        self.db.close()
    }

    fn dispatch(&mut self, action: Action) -> Result<Screen, FormError> {
        match action {
            Action::Dashboard => Ok(Screen::Stats(reports::dashboard(&mut self.db))),
            Action::List(view) => Ok(self.listing(view)),
            Action::Lookup(kind) => Ok(self.lookup_table(kind)),
            Action::RegisterCitizen(form) => self.register_citizen(&form),
            Action::CitizenAge { citizen } => self.citizen_age(&citizen),
            Action::CheckEligibility(form) => self.check_eligibility(&form),
            Action::SubmitApplication(form) => self.submit_application(&form),
            Action::ApplicationSummary { application } => {
                let id = ApplicationId(parse_id("application", &application)?);
                let summary = self.db.application_status_summary(id);
                Ok(self.show("Application Summary", summary))
            }
            Action::ProcessPayment(form) => {
                let payment = form.validate()?;
                let processed = self.db.process_payment(&payment);
                Ok(self.confirm(processed, "Payment processed!"))
            }
            Action::PayApplication(form) => self.pay_application(form),
            Action::PermitDetails { permit_type } => {
                let id = PermitTypeId(parse_id("permit_type", &permit_type)?);
                let details = self.db.permit_details(id);
                Ok(self.show("Permit Details", details))
            }
            Action::PendingReviews { department } => self.pending_reviews(&department),
            Action::RenewalFee { license } => {
                let id = LicenseId(parse_id("license", &license)?);
                let message = self.db.renewal_fee(id).map(|fee| {
                    format!("License ID {id}\nRenewal Fee: {} RWF", rwf_of(&fee))
                });
                Ok(self.show("Renewal Fee", message))
            }
            Action::AddReviewStep(form) => {
                let step = form.validate()?;
                let department = step.department_id.0;
                self.ensure_listed(Lookup::ActiveDepartments, "department", department)?;
                let added = self.db.add_review_step(&step);
                Ok(self.confirm(added, "Review step added!"))
            }
            Action::CompleteReviewStep(form) => {
                let completion = form.validate()?;
                let completed = self.db.complete_review_step(&completion);
                Ok(self.confirm(completed, "Review step completed!"))
            }
            Action::CheckOperationAllowed => {
                let verdict = self.db.check_operation_allowed();
                Ok(self.show("Operation Check", verdict))
            }
            Action::BulkUpdateStatus(form) => {
                let update = form.validate()?;
                let message = self
                    .db
                    .bulk_update_status(&update)
                    .map(|count| format!("Updated {count} applications"));
                Ok(self.show("Success", message))
            }
            Action::MonthlyRevenue { year } => {
                let year = parse_year(&year, self.today.year())?;
                Ok(reports::monthly_revenue(&mut self.db, year)
                    .map(|report| Screen::Table(report.to_table()))
                    .unwrap_or(Screen::Nothing))
            }
            Action::DepartmentPerformance => Ok(reports::department_performance(&mut self.db)
                .map(|scores| Screen::Table(reports::department_table(&scores)))
                .unwrap_or(Screen::Nothing)),
            Action::TopPermitTypes => Ok(reports::top_permit_types(&mut self.db)
                .map(Screen::Table)
                .unwrap_or(Screen::Nothing)),
            Action::CalculateRevenue(form) => {
                let query = form.validate()?;
                let message = reports::revenue_summary(&mut self.db, &query);
                Ok(self.show("Revenue Calculation", message))
            }
            Action::ExportAuditLog {
                format,
                path,
                filter,
            } => {
                let filter = filter.validate()?;
                match export::export_audit_log(&mut self.db, &filter, format, &path) {
                    ExportOutcome::Written { path, rows } => {
                        info!(path = %path.display(), rows, "export written");
                    }
                    ExportOutcome::Empty | ExportOutcome::Failed => {}
                }
                Ok(Screen::Nothing)
            }
            Action::ExportAll { dir } => {
                let summary = export::export_all(&mut self.db, &dir);
                Ok(export_table(&summary))
            }
            Action::About => Ok(Screen::Text {
                title: "About".to_string(),
                body: ABOUT.to_string(),
            }),
        }
    }

    fn listing(&mut self, view: ListingView) -> Screen {
        let (sql, params) = view.query(self.audit_limit);
        let rows = self.db.run_query(sql, &params);
        Screen::Table(TableView::from_rows(view.title(), view.columns(), &rows))
    }

    fn lookup_table(&mut self, kind: Lookup) -> Screen {
        let rows = lookup(&mut self.db, kind)
            .into_iter()
            .map(|option| vec![option.id.to_string(), option.name])
            .collect();
        Screen::Table(TableView::new(kind.title(), &["ID", "Name"], rows))
    }

    fn register_citizen(&mut self, form: &CitizenForm) -> Result<Screen, FormError> {
        let registration = form.validate()?;
        let message = self
            .db
            .register_citizen(&registration)
            .map(|id| format!("Citizen registered! ID: {id}"));
        Ok(self.show("Success", message))
    }

    fn citizen_age(&mut self, citizen: &str) -> Result<Screen, FormError> {
        let id = CitizenId(parse_id("citizen", citizen)?);
        let message = self.db.citizen_age(id).map(|age| {
            format!("Citizen ID {id} is {} years old", display_or_zero(&age))
        });
        Ok(self.show("Age Calculation", message))
    }

    fn check_eligibility(&mut self, form: &EligibilityForm) -> Result<Screen, FormError> {
        let (citizen, permit_type) = form.validate()?;
        self.ensure_listed(Lookup::ActivePermitTypes, "permit_type", permit_type.0)?;
        let verdict = self.db.validate_eligibility(citizen, permit_type);
        Ok(self.show("Eligibility Check", verdict))
    }

    fn submit_application(&mut self, form: &ApplicationForm) -> Result<Screen, FormError> {
        let request = form.validate()?;
        self.ensure_listed(Lookup::ActiveCitizens, "citizen", request.citizen_id.0)?;
        self.ensure_listed(
            Lookup::ActivePermitTypes,
            "permit_type",
            request.permit_type_id.0,
        )?;
        let message = self
            .db
            .submit_application(&request)
            .map(|id| format!("Application submitted! ID: {id}"));
        Ok(self.show("Success", message))
    }

    fn pay_application(&mut self, mut form: PaymentForm) -> Result<Screen, FormError> {
        let id = parse_id("application", &form.application)?;
        let rows = self.db.run_query(APPLICATION_FEE, &[Param::from(id)]);
        let Some(fee) = rows.scalar().cloned() else {
            self.db.notify(Notice::error("Error", "Application not found"));
            return Ok(Screen::Nothing);
        };
        if form.amount.trim().is_empty() && !fee.is_null() {
            form.amount = display_value(&fee);
        }

        let payment = form.validate()?;
        info!(
            application_id = id,
            required_fee = %rwf_of(&fee),
            "paying listed application"
        );
        let processed = self.db.process_payment(&payment);
        Ok(self.confirm(processed, "Payment processed successfully!"))
    }

    fn pending_reviews(&mut self, department: &str) -> Result<Screen, FormError> {
        let id = DepartmentId(parse_id("department", department)?);
        let Some(count) = self.db.pending_review_count(id) else {
            return Ok(Screen::Nothing);
        };
        let name = lookup(&mut self.db, Lookup::ActiveDepartments)
            .into_iter()
            .find(|option| option.id == id.0)
            .map(|option| option.name)
            .unwrap_or_else(|| id.to_string());
        let message = format!(
            "Department: {name}\nPending Reviews: {}",
            display_or_zero(&count)
        );
        Ok(self.show("Pending Reviews", Some(message)))
    }

    /// Reject an id that is not among the active records, when any are listed.
    fn ensure_listed(
        &mut self,
        kind: Lookup,
        field: &'static str,
        id: i64,
    ) -> Result<(), FormError> {
        let options = lookup(&mut self.db, kind);
        if options.is_empty() || options.iter().any(|option| option.id == id) {
            return Ok(());
        }
        Err(FormError::InvalidChoice {
            field,
            value: id.to_string(),
            allowed: options
                .iter()
                .map(|option| option.label())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn show(&self, title: &str, message: Option<String>) -> Screen {
        if let Some(message) = message {
            self.db.notify(Notice::info(title, message));
        }
        Screen::Nothing
    }

    fn confirm(&self, done: bool, message: &str) -> Screen {
        if done {
            self.db.notify(Notice::info("Success", message));
        }
        Screen::Nothing
    }
}

fn display_or_zero(value: &DbValue) -> String {
    if value.is_null() {
        "0".to_string()
    } else {
        display_value(value)
    }
}

fn rwf_of(value: &DbValue) -> String {
    format_rwf(value.as_decimal().unwrap_or_default())
}

fn export_table(summary: &ExportSummary) -> Screen {
    let mut rows: Vec<Vec<String>> = summary
        .written
        .iter()
        .map(|path| vec![path.display().to_string(), "written".to_string()])
        .collect();
    rows.extend(
        summary
            .skipped
            .iter()
            .map(|table| vec![table.to_string(), "no rows".to_string()]),
    );
    rows.extend(
        summary
            .failed
            .iter()
            .map(|failure| vec![failure.clone(), "failed".to_string()]),
    );
    Screen::Table(TableView::new("Export All Data", &["Target", "Result"], rows))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::testing::{Call, ScriptedBackend};
    use crate::db::{OutValue, ProcArg, RowSet};
    use crate::notice::{NoticeLevel, RecordingNotifier};
    use crate::permits::routines;

    type TestDesk = Desk<ScriptedBackend, RecordingNotifier>;

    fn desk(backend: &ScriptedBackend) -> (TestDesk, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let db = Database::open(backend.clone(), notifier.clone());
        let today = NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid date");
        (Desk::new(db, 500, today), notifier)
    }

    fn ids(column: &str, values: &[(i64, &str)]) -> RowSet {
        RowSet::new(
            vec![column.to_string(), "name".to_string()],
            values
                .iter()
                .map(|(id, name)| vec![DbValue::Integer(*id), DbValue::Text(name.to_string())])
                .collect(),
        )
    }

    #[test]
    fn form_errors_become_notices_without_database_calls() {
        let backend = ScriptedBackend::default();
        let (mut desk, notifier) = desk(&backend);

        let screen = desk.perform(Action::RegisterCitizen(CitizenForm::default()));

        assert_eq!(screen, Screen::Nothing);
        assert!(backend.calls().is_empty());
        let notice = notifier.last().expect("notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Please fill first_name");
    }

    #[test]
    fn listing_renders_converted_cells() {
        let backend = ScriptedBackend::default();
        backend.on_query(
            "FROM holidays",
            RowSet::new(
                vec!["holiday_id".into(), "name".into(), "date".into(), "type".into()],
                vec![vec![
                    DbValue::Integer(1),
                    DbValue::Text("Liberation Day".into()),
                    DbValue::Text("2026-07-04".into()),
                    DbValue::Null,
                ]],
            ),
        );
        let (mut desk, _) = desk(&backend);

        match desk.perform(Action::List(ListingView::Holidays)) {
            Screen::Table(table) => {
                assert_eq!(table.title, "Public Holidays");
                assert_eq!(table.rows, vec![vec!["1", "Liberation Day", "2026-07-04", ""]]);
            }
            other => panic!("unexpected screen: {other:?}"),
        }
    }

    #[test]
    fn audit_listing_is_capped_by_configuration() {
        let backend = ScriptedBackend::default();
        let (mut desk, _) = desk(&backend);

        desk.perform(Action::List(ListingView::AuditLogs));

        assert!(backend.calls().iter().any(|call| matches!(
            call,
            Call::Query { params, .. } if params == &vec![Param::from(500_i64)]
        )));
    }

    #[test]
    fn submit_application_rejects_inactive_citizen() {
        let backend = ScriptedBackend::default();
        backend.on_query("FROM citizen", ids("citizen_id", &[(1, "Aline Uwase")]));
        let (mut desk, notifier) = desk(&backend);

        desk.perform(Action::SubmitApplication(ApplicationForm {
            citizen: "7".to_string(),
            permit_type: "2".to_string(),
            ..ApplicationForm::default()
        }));

        assert!(backend.procedure_args(routines::SUBMIT_APPLICATION).is_none());
        let notice = notifier.last().expect("notice");
        assert!(notice.message.contains("1: Aline Uwase"));
    }

    #[test]
    fn submit_application_reports_the_new_id() {
        let backend = ScriptedBackend::default();
        backend.on_procedure(
            routines::SUBMIT_APPLICATION,
            vec![OutValue::Scalar(DbValue::Integer(900))],
        );
        let (mut desk, notifier) = desk(&backend);

        desk.perform(Action::SubmitApplication(ApplicationForm {
            citizen: "7: Jean".to_string(),
            permit_type: "2: Building Permit".to_string(),
            ..ApplicationForm::default()
        }));

        assert_eq!(
            notifier.last().expect("notice").message,
            "Application submitted! ID: 900"
        );
    }

    #[test]
    fn paying_a_listed_application_defaults_to_its_fee() {
        let backend = ScriptedBackend::default();
        backend.on_query(
            "SELECT payment_amount",
            RowSet::new(
                vec!["payment_amount".into()],
                vec![vec![DbValue::Numeric(Decimal::new(50_000, 0))]],
            ),
        );
        let (mut desk, notifier) = desk(&backend);

        desk.perform(Action::PayApplication(PaymentForm {
            application: "12".to_string(),
            ..PaymentForm::default()
        }));

        let args = backend
            .procedure_args(routines::PROCESS_PAYMENT)
            .expect("payment processed");
        assert_eq!(args[1], ProcArg::input(Decimal::new(50_000, 0)));
        assert_eq!(args[2], ProcArg::input("Cash"));
        assert_eq!(
            notifier.last().expect("notice").message,
            "Payment processed successfully!"
        );
    }

    #[test]
    fn paying_an_unknown_application_stops_early() {
        let backend = ScriptedBackend::default();
        let (mut desk, notifier) = desk(&backend);

        desk.perform(Action::PayApplication(PaymentForm {
            application: "404".to_string(),
            ..PaymentForm::default()
        }));

        assert!(backend.procedure_args(routines::PROCESS_PAYMENT).is_none());
        assert_eq!(notifier.last().expect("notice").message, "Application not found");
    }

    #[test]
    fn bulk_update_reports_the_count() {
        let backend = ScriptedBackend::default();
        backend.on_procedure(
            routines::BULK_UPDATE_STATUS,
            vec![OutValue::Scalar(DbValue::Integer(6))],
        );
        let (mut desk, notifier) = desk(&backend);

        desk.perform(Action::BulkUpdateStatus(BulkUpdateForm::default()));

        assert_eq!(notifier.last().expect("notice").message, "Updated 6 applications");
        assert!(backend.calls().contains(&Call::Commit));
    }

    #[test]
    fn monthly_revenue_defaults_to_the_current_year() {
        let backend = ScriptedBackend::default();
        let (mut desk, notifier) = desk(&backend);

        let screen = desk.perform(Action::MonthlyRevenue {
            year: String::new(),
        });

        assert_eq!(screen, Screen::Nothing);
        assert!(backend.calls().iter().any(|call| matches!(
            call,
            Call::Query { params, .. } if params == &vec![Param::from("2026")]
        )));
        assert_eq!(notifier.last().expect("notice").message, "No data found");
    }

    #[test]
    fn pending_reviews_names_the_department() {
        let backend = ScriptedBackend::default();
        backend.on_function(
            routines::COUNT_PENDING_REVIEWS,
            OutValue::Scalar(DbValue::Integer(3)),
        );
        backend.on_query("FROM department", ids("department_id", &[(4, "Lands")]));
        let (mut desk, notifier) = desk(&backend);

        desk.perform(Action::PendingReviews {
            department: "4".to_string(),
        });

        assert_eq!(
            notifier.last().expect("notice").message,
            "Department: Lands\nPending Reviews: 3"
        );
    }

    #[test]
    fn about_is_static_text() {
        let (mut desk, _) = desk(&ScriptedBackend::default());
        match desk.perform(Action::About) {
            Screen::Text { title, body } => {
                assert_eq!(title, "About");
                assert!(body.starts_with("Permit & License Management System"));
            }
            other => panic!("unexpected screen: {other:?}"),
        }
    }

    #[test]
    fn close_releases_the_connection() {
        let backend = ScriptedBackend::default();
        let (desk, _) = desk(&backend);

        desk.close().expect("closed");

        assert_eq!(backend.calls(), vec![Call::Close]);
    }
}
