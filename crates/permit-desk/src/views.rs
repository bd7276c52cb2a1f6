//! Fixed tabular projections over the permit schema.

use serde::Serialize;

use crate::db::{Backend, Database, DbValue, Param};
use crate::notice::Notifier;

/// One of the entity listings the desk can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingView {
    Citizens,
    Applications,
    PermitTypes,
    Departments,
    Licenses,
    ReviewSteps,
    Documents,
    Holidays,
    AuditLogs,
}

impl ListingView {
    pub const ALL: [Self; 9] = [
        Self::Citizens,
        Self::Applications,
        Self::PermitTypes,
        Self::Departments,
        Self::Licenses,
        Self::ReviewSteps,
        Self::Documents,
        Self::Holidays,
        Self::AuditLogs,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Citizens => "Citizens Management",
            Self::Applications => "Applications Management",
            Self::PermitTypes => "Permit Types",
            Self::Departments => "Departments",
            Self::Licenses => "Issued Licenses",
            Self::ReviewSteps => "Review Steps",
            Self::Documents => "Documents",
            Self::Holidays => "Public Holidays",
            Self::AuditLogs => "Audit Logs",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Citizens => &[
                "ID",
                "Name",
                "National ID",
                "Email",
                "Phone",
                "DOB",
                "Residency",
                "Status",
            ],
            Self::Applications => &[
                "ID", "App #", "Citizen", "Permit", "Status", "Priority", "Payment", "Amount",
                "Date",
            ],
            Self::PermitTypes => &[
                "ID",
                "Name",
                "Category",
                "Fee (RWF)",
                "Validity",
                "Est. Days",
                "Active",
            ],
            Self::Departments => &["ID", "Name", "Code", "Head Officer", "Email", "Active"],
            Self::Licenses => &[
                "ID",
                "License #",
                "App #",
                "Issued",
                "Expires",
                "Status",
                "Renewable",
            ],
            Self::ReviewSteps => &[
                "ID", "App ID", "Dept", "Step#", "Status", "Reviewer", "Decision", "Date",
            ],
            Self::Documents => &[
                "ID",
                "App ID",
                "Type",
                "File Name",
                "Size (KB)",
                "Date",
                "Verified",
            ],
            Self::Holidays => &["ID", "Holiday Name", "Date", "Type"],
            Self::AuditLogs => &[
                "ID",
                "Table",
                "Operation",
                "Date",
                "User",
                "Status",
                "Record ID",
            ],
        }
    }

    /// SQL and parameters; only the audit listing is parameterized (by its row cap).
    pub fn query(self, audit_limit: u32) -> (&'static str, Vec<Param>) {
        match self {
            Self::Citizens => (CITIZENS, Vec::new()),
            Self::Applications => (APPLICATIONS, Vec::new()),
            Self::PermitTypes => (PERMIT_TYPES, Vec::new()),
            Self::Departments => (DEPARTMENTS, Vec::new()),
            Self::Licenses => (LICENSES, Vec::new()),
            Self::ReviewSteps => (REVIEW_STEPS, Vec::new()),
            Self::Documents => (DOCUMENTS, Vec::new()),
            Self::Holidays => (HOLIDAYS, Vec::new()),
            Self::AuditLogs => (AUDIT_LOGS, vec![Param::from(i64::from(audit_limit))]),
        }
    }
}

const CITIZENS: &str = "SELECT citizen_id, first_name || ' ' || last_name, national_id, \
     email, phone, TO_CHAR(date_of_birth, 'YYYY-MM-DD'), residency_status, status \
     FROM citizen ORDER BY citizen_id DESC";

const APPLICATIONS: &str = "SELECT a.application_id, a.application_number, \
     c.first_name || ' ' || c.last_name, pt.permit_name, a.status, a.priority_level, \
     a.payment_status, a.payment_amount, TO_CHAR(a.submission_date, 'YYYY-MM-DD') \
     FROM application a \
     JOIN citizen c ON a.citizen_id = c.citizen_id \
     JOIN permit_type pt ON a.permit_type_id = pt.permit_type_id \
     ORDER BY a.application_id DESC";

const PERMIT_TYPES: &str = "SELECT permit_type_id, permit_name, category, processing_fee, \
     validity_period, estimated_days, is_active \
     FROM permit_type ORDER BY permit_name";

const DEPARTMENTS: &str = "SELECT department_id, department_name, department_code, \
     head_officer, contact_email, is_active \
     FROM department ORDER BY department_name";

const LICENSES: &str = "SELECT l.license_id, l.license_number, a.application_number, \
     TO_CHAR(l.issue_date, 'YYYY-MM-DD'), TO_CHAR(l.expiration_date, 'YYYY-MM-DD'), \
     l.license_status, l.renewal_eligible \
     FROM issued_license l \
     JOIN application a ON l.application_id = a.application_id \
     ORDER BY l.license_id DESC";

const REVIEW_STEPS: &str = "SELECT r.step_id, r.application_id, d.department_name, \
     r.step_number, r.step_status, r.reviewer_name, r.decision, \
     TO_CHAR(r.review_date, 'YYYY-MM-DD') \
     FROM review_step r \
     JOIN department d ON r.department_id = d.department_id \
     ORDER BY r.step_id DESC";

const DOCUMENTS: &str = "SELECT document_id, application_id, document_type, file_name, \
     ROUND(file_size / 1024.0, 2), TO_CHAR(upload_date, 'YYYY-MM-DD'), verified \
     FROM document ORDER BY document_id DESC";

const HOLIDAYS: &str = "SELECT holiday_id, holiday_name, TO_CHAR(holiday_date, 'YYYY-MM-DD'), \
     holiday_type FROM holidays ORDER BY holiday_date";

const AUDIT_LOGS: &str = "SELECT audit_id, table_name, operation_type, \
     TO_CHAR(operation_date, 'YYYY-MM-DD HH24:MI:SS'), username, status, record_id \
     FROM audit_log ORDER BY audit_id DESC LIMIT $1";

/// Active records offered as selections on the input forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    ActiveCitizens,
    ActivePermitTypes,
    ActiveDepartments,
}

impl Lookup {
    pub fn title(self) -> &'static str {
        match self {
            Self::ActiveCitizens => "Active Citizens",
            Self::ActivePermitTypes => "Active Permit Types",
            Self::ActiveDepartments => "Active Departments",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::ActiveCitizens => {
                "SELECT citizen_id, first_name || ' ' || last_name FROM citizen \
                 WHERE status = 'Active' ORDER BY citizen_id"
            }
            Self::ActivePermitTypes => {
                "SELECT permit_type_id, permit_name FROM permit_type \
                 WHERE is_active = 'Y' ORDER BY permit_name"
            }
            Self::ActiveDepartments => {
                "SELECT department_id, department_name FROM department \
                 WHERE is_active = 'Y' ORDER BY department_name"
            }
        }
    }
}

/// An `id: name` selection entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupOption {
    pub id: i64,
    pub name: String,
}

impl LookupOption {
    pub fn label(&self) -> String {
        format!("{}: {}", self.id, self.name)
    }
}

pub fn lookup<B: Backend, N: Notifier>(
    db: &mut Database<B, N>,
    kind: Lookup,
) -> Vec<LookupOption> {
    db.run_query(kind.sql(), &[])
        .rows
        .into_iter()
        .filter_map(|row| {
            let mut cells = row.into_iter();
            let id = cells.next()?.as_i64()?;
            let name = match cells.next() {
                Some(DbValue::Text(name)) => name,
                Some(other) => crate::export::display_value(&other),
                None => String::new(),
            };
            Some(LookupOption { id, name })
        })
        .collect()
}
