use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

identifier!(
    /// Database-generated citizen identifier.
    CitizenId,
    /// Database-generated application identifier.
    ApplicationId,
    PermitTypeId,
    DepartmentId,
    LicenseId,
    /// Identifier of one department's review stage.
    StepId,
);

/// Closed pick-list whose label is the value sent to the database.
pub trait Choice: Copy + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    /// Match a label ignoring case, with `-` or `_` accepted in place of spaces.
    fn parse(raw: &str) -> Option<Self> {
        let wanted = normalize(raw);
        Self::ALL
            .iter()
            .copied()
            .find(|choice| normalize(choice.label()) == wanted)
    }

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|choice| choice.label()).collect()
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | '_' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidencyCategory {
    Citizen,
    Resident,
    Foreigner,
}

impl Choice for ResidencyCategory {
    const ALL: &'static [Self] = &[Self::Citizen, Self::Resident, Self::Foreigner];

    fn label(self) -> &'static str {
        match self {
            Self::Citizen => "Citizen",
            Self::Resident => "Resident",
            Self::Foreigner => "Foreigner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Choice for Priority {
    const ALL: &'static [Self] = &[Self::Low, Self::Normal, Self::High, Self::Urgent];

    fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    MobileMoney,
    BankTransfer,
}

impl Choice for PaymentMethod {
    const ALL: &'static [Self] = &[Self::Cash, Self::MobileMoney, Self::BankTransfer];

    fn label(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::MobileMoney => "Mobile Money",
            Self::BankTransfer => "Bank Transfer",
        }
    }
}

/// Application lifecycle states as stored by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    DocumentationRequired,
    Approved,
    Rejected,
    Cancelled,
    OnHold,
}

impl Choice for ApplicationStatus {
    const ALL: &'static [Self] = &[
        Self::Submitted,
        Self::UnderReview,
        Self::DocumentationRequired,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
        Self::OnHold,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::DocumentationRequired => "Documentation Required",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::OnHold => "On Hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    #[default]
    Approved,
    Rejected,
    RevisionRequired,
}

impl Choice for ReviewDecision {
    const ALL: &'static [Self] = &[Self::Approved, Self::Rejected, Self::RevisionRequired];

    fn label(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::RevisionRequired => "Revision Required",
        }
    }
}

/// Validated input for `sp_register_citizen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenRegistration {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub national_id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub residency: ResidencyCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    pub citizen_id: CitizenId,
    pub permit_type_id: PermitTypeId,
    pub priority: Priority,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub application_id: ApplicationId,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReviewStep {
    pub application_id: ApplicationId,
    pub department_id: DepartmentId,
    pub reviewer_name: String,
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCompletion {
    pub step_id: StepId,
    pub decision: ReviewDecision,
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStatusUpdate {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub older_than_days: i64,
}

/// Optional window and permit filter for `fn_calculate_revenue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub permit_type_id: Option<PermitTypeId>,
}

/// Filter slots accepted by `sp_export_audit_log`; all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub table_name: Option<String>,
    pub operation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_labels_loosely() {
        assert_eq!(PaymentMethod::parse("mobile-money"), Some(PaymentMethod::MobileMoney));
        assert_eq!(PaymentMethod::parse("Bank Transfer"), Some(PaymentMethod::BankTransfer));
        assert_eq!(
            ApplicationStatus::parse(" under_review "),
            Some(ApplicationStatus::UnderReview)
        );
        assert_eq!(
            ReviewDecision::parse("REVISION REQUIRED"),
            Some(ReviewDecision::RevisionRequired)
        );
        assert_eq!(ResidencyCategory::parse("tourist"), None);
    }

    #[test]
    fn defaults_match_the_desk_forms() {
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
        assert_eq!(ReviewDecision::default(), ReviewDecision::Approved);
        assert_eq!(
            ApplicationStatus::labels(),
            vec![
                "Submitted",
                "Under Review",
                "Documentation Required",
                "Approved",
                "Rejected",
                "Cancelled",
                "On Hold"
            ]
        );
    }
}
