//! Vocabulary of the permit domain and the typed routine contract.

mod contract;
pub mod domain;

pub use contract::routines;
pub use domain::{
    ApplicationId, ApplicationRequest, ApplicationStatus, AuditFilter, BulkStatusUpdate, Choice,
    CitizenId, CitizenRegistration, DepartmentId, LicenseId, NewReviewStep, Payment,
    PaymentMethod, PermitTypeId, Priority, ResidencyCategory, RevenueQuery, ReviewCompletion,
    ReviewDecision, StepId,
};
