//! Raw form input and its validation into the typed routine arguments.
//!
//! Fields arrive as the user typed them. Validation runs before any remote
//! call: required fields must be non-blank, dates are `YYYY-MM-DD`, numbers
//! must parse.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::permits::{
    ApplicationId, ApplicationRequest, ApplicationStatus, AuditFilter, BulkStatusUpdate, Choice,
    CitizenId, CitizenRegistration, DepartmentId, NewReviewStep, Payment, PaymentMethod,
    PermitTypeId, Priority, ResidencyCategory, RevenueQuery, ReviewCompletion, ReviewDecision,
    StepId,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_BULK_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please fill {field}")]
    Required { field: &'static str },
    #[error("{field} must be a date in YYYY-MM-DD format, got '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("{field} must be a number, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} must be one of {allowed}, got '{value}'")]
    InvalidChoice {
        field: &'static str,
        value: String,
        allowed: String,
    },
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenForm {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub national_id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Blank means `Citizen`.
    pub residency: String,
}

impl CitizenForm {
    pub fn validate(&self) -> Result<CitizenRegistration, FormError> {
        let first_name = required("first_name", &self.first_name)?;
        let last_name = required("last_name", &self.last_name)?;
        let dob = required("date_of_birth", &self.date_of_birth)?;
        let national_id = required("national_id", &self.national_id)?;
        let email = required("email", &self.email)?;
        let phone = required("phone", &self.phone)?;
        let address = required("address", &self.address)?;

        Ok(CitizenRegistration {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            date_of_birth: parse_date("date_of_birth", dob)?,
            national_id: national_id.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
            residency: choice_or("residency", &self.residency, ResidencyCategory::Citizen)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationForm {
    /// `5` or a lookup label such as `5: Aline Uwase`.
    pub citizen: String,
    pub permit_type: String,
    pub priority: String,
    pub notes: String,
}

impl ApplicationForm {
    pub fn validate(&self) -> Result<ApplicationRequest, FormError> {
        let notes = self.notes.trim();
        Ok(ApplicationRequest {
            citizen_id: CitizenId(parse_id("citizen", &self.citizen)?),
            permit_type_id: PermitTypeId(parse_id("permit_type", &self.permit_type)?),
            priority: choice_or("priority", &self.priority, Priority::default())?,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentForm {
    pub application: String,
    pub amount: String,
    pub method: String,
}

impl PaymentForm {
    pub fn validate(&self) -> Result<Payment, FormError> {
        Ok(Payment {
            application_id: ApplicationId(parse_id("application", &self.application)?),
            amount: parse_amount("amount", &self.amount)?,
            method: choice_or("method", &self.method, PaymentMethod::default())?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewStepForm {
    pub application: String,
    pub department: String,
    pub reviewer_name: String,
    pub comments: String,
}

impl ReviewStepForm {
    pub fn validate(&self) -> Result<NewReviewStep, FormError> {
        Ok(NewReviewStep {
            application_id: ApplicationId(parse_id("application", &self.application)?),
            department_id: DepartmentId(parse_id("department", &self.department)?),
            reviewer_name: required("reviewer_name", &self.reviewer_name)?.to_string(),
            comments: self.comments.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteReviewForm {
    pub step: String,
    pub decision: String,
    pub comments: String,
}

impl CompleteReviewForm {
    pub fn validate(&self) -> Result<ReviewCompletion, FormError> {
        Ok(ReviewCompletion {
            step_id: StepId(parse_id("step", &self.step)?),
            decision: choice_or("decision", &self.decision, ReviewDecision::default())?,
            comments: self.comments.trim().to_string(),
        })
    }
}

/// Blank fields fall back to Submitted → Cancelled after 30 days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUpdateForm {
    pub from: String,
    pub to: String,
    pub days: String,
}

impl BulkUpdateForm {
    pub fn validate(&self) -> Result<BulkStatusUpdate, FormError> {
        let older_than_days = match self.days.trim() {
            "" => DEFAULT_BULK_DAYS,
            raw => raw.parse::<i64>().map_err(|_| FormError::InvalidNumber {
                field: "days",
                value: raw.to_string(),
            })?,
        };
        if older_than_days < 0 {
            return Err(FormError::OutOfRange {
                field: "days",
                value: older_than_days.to_string(),
            });
        }

        Ok(BulkStatusUpdate {
            from: choice_or("from", &self.from, ApplicationStatus::Submitted)?,
            to: choice_or("to", &self.to, ApplicationStatus::Cancelled)?,
            older_than_days,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevenueForm {
    pub start: String,
    pub end: String,
    pub permit_type: String,
}

impl RevenueForm {
    pub fn validate(&self) -> Result<RevenueQuery, FormError> {
        Ok(RevenueQuery {
            start: optional_date("start", &self.start)?,
            end: optional_date("end", &self.end)?,
            permit_type_id: optional_id("permit_type", &self.permit_type)?.map(PermitTypeId),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityForm {
    pub citizen: String,
    pub permit_type: String,
}

impl EligibilityForm {
    pub fn validate(&self) -> Result<(CitizenId, PermitTypeId), FormError> {
        Ok((
            CitizenId(parse_id("citizen", &self.citizen)?),
            PermitTypeId(parse_id("permit_type", &self.permit_type)?),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilterForm {
    pub from: String,
    pub to: String,
    pub table_name: String,
    pub operation: String,
}

impl AuditFilterForm {
    pub fn validate(&self) -> Result<AuditFilter, FormError> {
        Ok(AuditFilter {
            from: optional_date("from", &self.from)?,
            to: optional_date("to", &self.to)?,
            table_name: optional_text(&self.table_name),
            operation: optional_text(&self.operation),
        })
    }
}

/// Report year; blank means `default`.
pub fn parse_year(raw: &str, default: i32) -> Result<i32, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    let year = raw.parse::<i32>().map_err(|_| FormError::InvalidNumber {
        field: "year",
        value: raw.to_string(),
    })?;
    if !(1000..=9999).contains(&year) {
        return Err(FormError::OutOfRange {
            field: "year",
            value: raw.to_string(),
        });
    }
    Ok(year)
}

pub fn required<'a>(field: &'static str, raw: &'a str) -> Result<&'a str, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(FormError::Required { field })
    } else {
        Ok(trimmed)
    }
}

pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, FormError> {
    let raw = required(field, raw)?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| FormError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

/// Identifier typed directly or picked from a lookup label (`12: Building Permit`).
pub fn parse_id(field: &'static str, raw: &str) -> Result<i64, FormError> {
    let raw = required(field, raw)?;
    let head = raw.split(':').next().unwrap_or(raw).trim();
    head.parse::<i64>().map_err(|_| FormError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

pub fn parse_amount(field: &'static str, raw: &str) -> Result<Decimal, FormError> {
    let raw = required(field, raw)?;
    let amount = raw
        .replace(',', "")
        .parse::<Decimal>()
        .map_err(|_| FormError::InvalidNumber {
            field,
            value: raw.to_string(),
        })?;
    if amount.is_sign_negative() {
        return Err(FormError::OutOfRange {
            field,
            value: raw.to_string(),
        });
    }
    Ok(amount)
}

pub fn parse_choice<C: Choice>(field: &'static str, raw: &str) -> Result<C, FormError> {
    let raw = required(field, raw)?;
    C::parse(raw).ok_or_else(|| FormError::InvalidChoice {
        field,
        value: raw.to_string(),
        allowed: C::labels().join(", "),
    })
}

fn choice_or<C: Choice>(field: &'static str, raw: &str, default: C) -> Result<C, FormError> {
    if raw.trim().is_empty() {
        Ok(default)
    } else {
        parse_choice(field, raw)
    }
}

fn optional_date(field: &'static str, raw: &str) -> Result<Option<NaiveDate>, FormError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(field, raw).map(Some)
    }
}

fn optional_id(field: &'static str, raw: &str) -> Result<Option<i64>, FormError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_id(field, raw).map(Some)
    }
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citizen_form() -> CitizenForm {
        CitizenForm {
            first_name: "Jean".to_string(),
            last_name: "Habimana".to_string(),
            date_of_birth: "1988-07-01".to_string(),
            national_id: "1198880011122233".to_string(),
            email: "jean@example.rw".to_string(),
            phone: "+250788123456".to_string(),
            address: "Musanze".to_string(),
            residency: String::new(),
        }
    }

    #[test]
    fn citizen_form_rejects_each_blank_required_field() {
        let blanks: [(&str, fn(&mut CitizenForm)); 7] = [
            ("first_name", |f| f.first_name.clear()),
            ("last_name", |f| f.last_name = "   ".to_string()),
            ("date_of_birth", |f| f.date_of_birth.clear()),
            ("national_id", |f| f.national_id.clear()),
            ("email", |f| f.email.clear()),
            ("phone", |f| f.phone.clear()),
            ("address", |f| f.address.clear()),
        ];

        for (field, blank) in blanks {
            let mut form = citizen_form();
            blank(&mut form);
            assert_eq!(form.validate(), Err(FormError::Required { field }), "{field}");
        }
    }

    #[test]
    fn citizen_form_defaults_residency_and_trims_values() {
        let mut form = citizen_form();
        form.first_name = "  Jean ".to_string();

        let registration = form.validate().expect("valid form");

        assert_eq!(registration.first_name, "Jean");
        assert_eq!(registration.residency, ResidencyCategory::Citizen);
        assert_eq!(
            registration.date_of_birth,
            NaiveDate::from_ymd_opt(1988, 7, 1).expect("valid date")
        );
    }

    #[test]
    fn unparsable_dates_are_reported_not_panicked() {
        for raw in ["01/07/1988", "1988-13-01", "yesterday"] {
            let mut form = citizen_form();
            form.date_of_birth = raw.to_string();
            let err = form.validate().expect_err(raw);
            assert!(matches!(err, FormError::InvalidDate { field: "date_of_birth", .. }));
        }
    }

    #[test]
    fn application_form_accepts_lookup_labels_and_drops_blank_notes() {
        let form = ApplicationForm {
            citizen: "14: Jean Habimana".to_string(),
            permit_type: "3".to_string(),
            priority: "high".to_string(),
            notes: "  \n".to_string(),
        };

        let request = form.validate().expect("valid form");

        assert_eq!(request.citizen_id, CitizenId(14));
        assert_eq!(request.permit_type_id, PermitTypeId(3));
        assert_eq!(request.priority, Priority::High);
        assert_eq!(request.notes, None);
    }

    #[test]
    fn application_form_requires_a_selection() {
        let form = ApplicationForm {
            permit_type: "3".to_string(),
            ..ApplicationForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(FormError::Required { field: "citizen" })
        );
    }

    #[test]
    fn payment_amounts_must_be_non_negative_numbers() {
        let mut form = PaymentForm {
            application: "9".to_string(),
            amount: "25,000.50".to_string(),
            method: "Mobile Money".to_string(),
        };
        let payment = form.validate().expect("valid payment");
        assert_eq!(payment.amount, Decimal::new(2_500_050, 2));
        assert_eq!(payment.method, PaymentMethod::MobileMoney);

        form.amount = "abc".to_string();
        assert!(matches!(form.validate(), Err(FormError::InvalidNumber { field: "amount", .. })));

        form.amount = "-10".to_string();
        assert!(matches!(form.validate(), Err(FormError::OutOfRange { field: "amount", .. })));
    }

    #[test]
    fn unknown_choice_lists_the_allowed_labels() {
        let form = PaymentForm {
            application: "9".to_string(),
            amount: "100".to_string(),
            method: "cheque".to_string(),
        };
        match form.validate() {
            Err(FormError::InvalidChoice { allowed, .. }) => {
                assert_eq!(allowed, "Cash, Mobile Money, Bank Transfer");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bulk_update_defaults_and_bounds() {
        let update = BulkUpdateForm::default().validate().expect("defaults apply");
        assert_eq!(update.from, ApplicationStatus::Submitted);
        assert_eq!(update.to, ApplicationStatus::Cancelled);
        assert_eq!(update.older_than_days, DEFAULT_BULK_DAYS);

        let negative = BulkUpdateForm {
            days: "-1".to_string(),
            ..BulkUpdateForm::default()
        };
        assert!(matches!(negative.validate(), Err(FormError::OutOfRange { .. })));

        let words = BulkUpdateForm {
            days: "thirty".to_string(),
            ..BulkUpdateForm::default()
        };
        assert!(matches!(words.validate(), Err(FormError::InvalidNumber { .. })));
    }

    #[test]
    fn revenue_form_leaves_blank_filters_open() {
        let query = RevenueForm {
            start: "2024-01-01".to_string(),
            ..RevenueForm::default()
        }
        .validate()
        .expect("valid form");

        assert_eq!(query.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(query.end, None);
        assert_eq!(query.permit_type_id, None);
    }

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year("", 2026), Ok(2026));
        assert_eq!(parse_year(" 2024 ", 2026), Ok(2024));
        assert!(matches!(parse_year("24", 2026), Err(FormError::OutOfRange { .. })));
        assert!(matches!(parse_year("MMXXIV", 2026), Err(FormError::InvalidNumber { .. })));
    }

    #[test]
    fn messages_name_the_field() {
        assert_eq!(
            FormError::Required { field: "email" }.to_string(),
            "Please fill email"
        );
    }
}
