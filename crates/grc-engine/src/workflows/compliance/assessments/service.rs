use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::super::domain::{ControlId, EvidenceId, EvidenceItem, OrganizationId};
use super::super::report::{build_report, AssessmentReport};
use super::domain::{
    Assessment, AssessmentControl, AssessmentId, EvidenceSubmission, MaturityUpdate,
};
use super::repository::{
    AssessmentSummaryView, ComplianceNotification, ComplianceRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};

/// Service owning every mutation of a seeded assessment.
pub struct AssessmentService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
}

impl<R, N> AssessmentService<R, N>
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    pub fn get(&self, assessment_id: &AssessmentId) -> Result<Assessment, AssessmentServiceError> {
        self.repository
            .fetch_assessment(assessment_id)?
            .ok_or_else(|| AssessmentServiceError::NotFound(assessment_id.clone()))
    }

    pub fn for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<AssessmentSummaryView>, AssessmentServiceError> {
        let assessments = self.repository.assessments_for(organization_id)?;
        Ok(assessments.iter().map(Assessment::summary_view).collect())
    }

    /// Attach evidence to a control and rescore it. The evidence id is derived from the
    /// control version, so ids stay unique per control without a global counter.
    pub fn add_evidence(
        &self,
        assessment_id: &AssessmentId,
        control_id: &ControlId,
        submission: EvidenceSubmission,
    ) -> Result<AssessmentControl, AssessmentServiceError> {
        let source = submission.source.trim();
        if source.is_empty() {
            return Err(AssessmentServiceError::InvalidSubmission(
                "evidence source must not be blank".to_string(),
            ));
        }
        let source = source.to_string();

        self.mutate_control(
            assessment_id,
            control_id,
            submission.expected_version,
            |control| {
                let id = EvidenceId(format!("{}-ev{}", control.control_id, control.version + 1));
                control.add_evidence(EvidenceItem {
                    id,
                    evidence_type: submission.evidence_type,
                    source,
                    trusted: submission.trusted,
                    submitted_at: submission.submitted_at.unwrap_or_else(Utc::now),
                });
                Ok(())
            },
        )
    }

    pub fn remove_evidence(
        &self,
        assessment_id: &AssessmentId,
        control_id: &ControlId,
        evidence_id: &EvidenceId,
        expected_version: Option<u64>,
    ) -> Result<AssessmentControl, AssessmentServiceError> {
        self.mutate_control(assessment_id, control_id, expected_version, |control| {
            control
                .remove_evidence(evidence_id)
                .map(|_| ())
                .ok_or_else(|| AssessmentServiceError::UnknownEvidence {
                    control_id: control.control_id.clone(),
                    evidence_id: evidence_id.clone(),
                })
        })
    }

    pub fn set_maturity(
        &self,
        assessment_id: &AssessmentId,
        control_id: &ControlId,
        update: MaturityUpdate,
    ) -> Result<AssessmentControl, AssessmentServiceError> {
        self.mutate_control(assessment_id, control_id, update.expected_version, |control| {
            control.set_maturity(update.maturity);
            Ok(())
        })
    }

    pub fn report(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<AssessmentReport, AssessmentServiceError> {
        let assessment = self.get(assessment_id)?;
        Ok(build_report(&assessment))
    }

    pub fn close(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Assessment, AssessmentServiceError> {
        self.close_at(assessment_id, Utc::now())
    }

    /// Close once every mandatory control passes or the deadline has been reached.
    pub fn close_at(
        &self,
        assessment_id: &AssessmentId,
        now: DateTime<Utc>,
    ) -> Result<Assessment, AssessmentServiceError> {
        let mut assessment = self.get(assessment_id)?;
        if !assessment.is_open() {
            return Err(AssessmentServiceError::Closed(assessment_id.clone()));
        }

        let reason = assessment
            .closure_reason(now)
            .ok_or_else(|| AssessmentServiceError::NotClosable(assessment_id.clone()))?;

        let revision = assessment.revision;
        assessment.close(reason, now);
        let stored = self.repository.update_assessment(assessment, revision)?;

        let report = build_report(&stored);
        let mut details = BTreeMap::new();
        details.insert("reason".to_string(), reason.label().to_string());
        details.insert(
            "overall_score".to_string(),
            format!("{:.1}", report.overall_score),
        );
        self.notifications.publish(ComplianceNotification {
            template: "assessment_closed".to_string(),
            organization_id: stored.organization_id.clone(),
            assessment_id: Some(stored.id.clone()),
            details,
        })?;

        info!(
            assessment = %stored.id,
            reason = ?reason,
            overall_score = report.overall_score,
            "assessment closed"
        );
        Ok(stored)
    }

    fn mutate_control<F>(
        &self,
        assessment_id: &AssessmentId,
        control_id: &ControlId,
        expected_version: Option<u64>,
        apply: F,
    ) -> Result<AssessmentControl, AssessmentServiceError>
    where
        F: FnOnce(&mut AssessmentControl) -> Result<(), AssessmentServiceError>,
    {
        let mut assessment = self.get(assessment_id)?;
        if !assessment.is_open() {
            return Err(AssessmentServiceError::Closed(assessment_id.clone()));
        }
        let revision = assessment.revision;

        let control = assessment.control_mut(control_id).ok_or_else(|| {
            AssessmentServiceError::UnknownControl {
                assessment_id: assessment_id.clone(),
                control_id: control_id.clone(),
            }
        })?;

        if let Some(expected) = expected_version {
            if expected != control.version {
                return Err(AssessmentServiceError::StaleVersion {
                    control_id: control_id.clone(),
                    expected,
                    actual: control.version,
                });
            }
        }

        apply(control)?;
        let updated = control.clone();

        self.repository.update_assessment(assessment, revision)?;
        debug!(
            assessment = %assessment_id,
            control = %control_id,
            version = updated.version,
            score = updated.score.score,
            passed = updated.score.passed,
            "control rescored"
        );
        Ok(updated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("assessment {0} not found")]
    NotFound(AssessmentId),
    #[error("control {control_id} is not part of assessment {assessment_id}")]
    UnknownControl {
        assessment_id: AssessmentId,
        control_id: ControlId,
    },
    #[error("evidence {evidence_id} not found on control {control_id}")]
    UnknownEvidence {
        control_id: ControlId,
        evidence_id: EvidenceId,
    },
    #[error("control {control_id} is at version {actual}, request expected {expected}")]
    StaleVersion {
        control_id: ControlId,
        expected: u64,
        actual: u64,
    },
    #[error("assessment {0} is closed")]
    Closed(AssessmentId),
    #[error("assessment {0} cannot close while mandatory controls fail before the deadline")]
    NotClosable(AssessmentId),
    #[error("invalid evidence submission: {0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
