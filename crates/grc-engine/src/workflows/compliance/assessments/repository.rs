use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::OrganizationId;
use super::domain::{Assessment, AssessmentId, ClosureReason, ProfileRecord};

/// Storage abstraction for profiles and assessments so services can be exercised in isolation.
pub trait ComplianceRepository: Send + Sync {
    /// Store a new profile version; an existing `(organization, version)` pair is a conflict.
    fn insert_profile(&self, record: ProfileRecord) -> Result<ProfileRecord, RepositoryError>;
    fn latest_profile(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<ProfileRecord>, RepositoryError>;
    /// All versions, oldest first.
    fn profile_history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ProfileRecord>, RepositoryError>;

    fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment, RepositoryError>;
    fn fetch_assessment(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;
    /// Compare-and-swap on `revision`: the write only lands when the stored revision still
    /// equals `expected_revision`. The stored copy carries the incremented revision.
    fn update_assessment(
        &self,
        assessment: Assessment,
        expected_revision: u64,
    ) -> Result<Assessment, RepositoryError>;
    fn assessments_for(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Assessment>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale revision: expected {expected}, stored {actual}")]
    StaleRevision { expected: u64, actual: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, chat, webhook adapters live behind it).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: ComplianceNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceNotification {
    pub template: String,
    pub organization_id: OrganizationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<AssessmentId>,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Compact assessment status for list and close responses.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSummaryView {
    pub assessment_id: AssessmentId,
    pub organization_id: OrganizationId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure: Option<ClosureReason>,
    pub profile_version: u32,
    pub revision: u64,
    pub control_count: usize,
    pub passed_count: usize,
    pub mandatory_count: usize,
    pub mandatory_passed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn summary_view(&self) -> AssessmentSummaryView {
        AssessmentSummaryView {
            assessment_id: self.id.clone(),
            organization_id: self.organization_id.clone(),
            status: self.status.label(),
            closure: self.closure,
            profile_version: self.profile_version,
            revision: self.revision,
            control_count: self.controls.len(),
            passed_count: self.controls.iter().filter(|control| control.passed()).count(),
            mandatory_count: self.mandatory_controls().count(),
            mandatory_passed: self
                .mandatory_controls()
                .filter(|control| control.passed())
                .count(),
            deadline: self.deadline,
        }
    }
}
