use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::super::applicability::{ApplicabilityEngine, ApplicableFrameworksMatrix, RuleSet};
use super::super::catalog::ReferenceCatalog;
use super::super::domain::{OrganizationId, OrganizationProfile};
use super::super::template::{AssessmentTemplate, TemplateGenerator};
use super::domain::{Assessment, AssessmentId, ProfileRecord};
use super::repository::{
    ComplianceNotification, ComplianceRepository, NotificationError, NotificationPublisher,
    RepositoryError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub organization_id: OrganizationId,
    pub profile: OrganizationProfile,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingOutcome {
    pub profile: ProfileRecord,
    pub matrix: ApplicableFrameworksMatrix,
    pub template: AssessmentTemplate,
    pub assessment: Assessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdateOutcome {
    pub profile: ProfileRecord,
    pub matrix: ApplicableFrameworksMatrix,
}

/// Sequences profile storage, applicability, template generation and assessment seeding
/// for newly registered organizations.
pub struct OnboardingOrchestrator<R, N> {
    catalog: Arc<ReferenceCatalog>,
    rules: Arc<RuleSet>,
    repository: Arc<R>,
    notifications: Arc<N>,
    assessment_sequence: AtomicU64,
}

impl<R, N> OnboardingOrchestrator<R, N>
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        catalog: Arc<ReferenceCatalog>,
        rules: Arc<RuleSet>,
        repository: Arc<R>,
        notifications: Arc<N>,
    ) -> Self {
        Self {
            catalog,
            rules,
            repository,
            notifications,
            assessment_sequence: AtomicU64::new(1),
        }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn onboard(
        &self,
        request: OnboardingRequest,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        self.onboard_at(request, Utc::now())
    }

    pub fn onboard_at(
        &self,
        request: OnboardingRequest,
        now: DateTime<Utc>,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let OnboardingRequest {
            organization_id,
            profile,
            deadline,
        } = request;

        if organization_id.0.trim().is_empty() {
            return Err(OnboardingError::InvalidOrganizationId);
        }
        // A stored profile without an assessment is an onboarding that failed after the
        // profile write; resume it from the stored version.
        let profile = match self.repository.latest_profile(&organization_id)? {
            Some(stored) => {
                if !self.repository.assessments_for(&organization_id)?.is_empty() {
                    return Err(OnboardingError::AlreadyOnboarded(organization_id));
                }
                info!(
                    organization = %organization_id,
                    version = stored.version,
                    "resuming onboarding from stored profile"
                );
                stored
            }
            None => self.repository.insert_profile(ProfileRecord {
                organization_id: organization_id.clone(),
                version: 1,
                profile,
                recorded_at: now,
            })?,
        };

        let matrix = self.evaluate(&profile.profile);
        let template = TemplateGenerator::new(&self.catalog).generate(&matrix);
        let assessment =
            self.seed_assessment(&organization_id, profile.version, &template, deadline, now)?;

        let mut details = BTreeMap::new();
        details.insert(
            "control_count".to_string(),
            assessment.controls.len().to_string(),
        );
        details.insert(
            "mandatory_count".to_string(),
            template.mandatory_count().to_string(),
        );
        self.notifications.publish(ComplianceNotification {
            template: "assessment_seeded".to_string(),
            organization_id: organization_id.clone(),
            assessment_id: Some(assessment.id.clone()),
            details,
        })?;

        info!(
            organization = %organization_id,
            assessment = %assessment.id,
            frameworks = matrix.applicable_frameworks().count(),
            controls = assessment.controls.len(),
            issues = matrix.issues.len(),
            "organization onboarded"
        );

        Ok(OnboardingOutcome {
            profile,
            matrix,
            template,
            assessment,
        })
    }

    pub fn update_profile(
        &self,
        organization_id: &OrganizationId,
        profile: OrganizationProfile,
    ) -> Result<ProfileUpdateOutcome, OnboardingError> {
        self.update_profile_at(organization_id, profile, Utc::now())
    }

    /// Record a new profile version and recompute applicability. Existing assessments are
    /// left untouched; reseeding is the caller's decision.
    pub fn update_profile_at(
        &self,
        organization_id: &OrganizationId,
        profile: OrganizationProfile,
        now: DateTime<Utc>,
    ) -> Result<ProfileUpdateOutcome, OnboardingError> {
        let latest = self
            .repository
            .latest_profile(organization_id)?
            .ok_or_else(|| OnboardingError::UnknownOrganization(organization_id.clone()))?;

        let record = self.repository.insert_profile(ProfileRecord {
            organization_id: organization_id.clone(),
            version: latest.version + 1,
            profile,
            recorded_at: now,
        })?;
        let matrix = self.evaluate(&record.profile);

        info!(
            organization = %organization_id,
            version = record.version,
            applicable_controls = matrix.applicable_controls().count(),
            "profile updated"
        );

        Ok(ProfileUpdateOutcome {
            profile: record,
            matrix,
        })
    }

    /// Applicability of the organization's latest profile version.
    pub fn applicability(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<ApplicableFrameworksMatrix, OnboardingError> {
        let latest = self
            .repository
            .latest_profile(organization_id)?
            .ok_or_else(|| OnboardingError::UnknownOrganization(organization_id.clone()))?;
        Ok(self.evaluate(&latest.profile))
    }

    /// Every stored profile version, oldest first.
    pub fn profile_history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ProfileRecord>, OnboardingError> {
        let history = self.repository.profile_history(organization_id)?;
        if history.is_empty() {
            return Err(OnboardingError::UnknownOrganization(organization_id.clone()));
        }
        Ok(history)
    }

    fn evaluate(&self, profile: &OrganizationProfile) -> ApplicableFrameworksMatrix {
        ApplicabilityEngine::new(&self.catalog).evaluate(profile, &self.rules)
    }

    /// Store a fresh assessment, skipping ids another writer already took in the shared
    /// repository.
    fn seed_assessment(
        &self,
        organization_id: &OrganizationId,
        profile_version: u32,
        template: &AssessmentTemplate,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Assessment, OnboardingError> {
        loop {
            let id = self.next_assessment_id();
            let seeded = Assessment::seed(
                id.clone(),
                organization_id.clone(),
                profile_version,
                template,
                deadline,
                now,
            );
            match self.repository.insert_assessment(seeded) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::Conflict) => {
                    if self.repository.fetch_assessment(&id)?.is_none() {
                        return Err(RepositoryError::Conflict.into());
                    }
                    debug!(assessment = %id, "assessment id taken, drawing the next one");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn next_assessment_id(&self) -> AssessmentId {
        let id = self.assessment_sequence.fetch_add(1, Ordering::Relaxed);
        AssessmentId(format!("asm-{id:06}"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("organization id must not be blank")]
    InvalidOrganizationId,
    #[error("organization {0} is already onboarded")]
    AlreadyOnboarded(OrganizationId),
    #[error("organization {0} has not been onboarded")]
    UnknownOrganization(OrganizationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
