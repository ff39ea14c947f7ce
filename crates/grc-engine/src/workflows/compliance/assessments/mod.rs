//! Assessment lifecycle: onboarding, evidence and maturity mutations, reporting, closure.
//!
//! Storage and notifications are injected through [`ComplianceRepository`] and
//! [`NotificationPublisher`], so the services run unchanged against in-memory fakes.

pub mod domain;
pub mod onboarding;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Assessment, AssessmentControl, AssessmentId, AssessmentStatus, ClosureReason,
    EvidenceSubmission, MaturityUpdate, ProfileRecord,
};
pub use onboarding::{
    OnboardingError, OnboardingOrchestrator, OnboardingOutcome, OnboardingRequest,
    ProfileUpdateOutcome,
};
pub use repository::{
    AssessmentSummaryView, ComplianceNotification, ComplianceRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};
pub use router::{compliance_router, ComplianceState};
pub use service::{AssessmentService, AssessmentServiceError};
