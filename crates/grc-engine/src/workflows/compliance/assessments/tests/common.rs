use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::compliance::applicability::RuleSet;
use crate::workflows::compliance::assessments::{
    compliance_router, Assessment, AssessmentControl, AssessmentId, AssessmentService,
    ComplianceNotification, ComplianceRepository, EvidenceSubmission, MaturityUpdate,
    NotificationError, NotificationPublisher, OnboardingOrchestrator, OnboardingRequest,
    ProfileRecord, RepositoryError,
};
use crate::workflows::compliance::catalog::ReferenceCatalog;
use crate::workflows::compliance::domain::{
    DataCategory, EvidenceType, LegalType, MaturityLevel, OrganizationId, OrganizationProfile,
    RevenueBand, Sector,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 14, 9, 30, 0).unwrap()
}

pub(super) fn fintech_profile() -> OrganizationProfile {
    OrganizationProfile {
        sector: Some(Sector::Technology),
        sub_sector: Some("Payments".to_string()),
        employee_count: Some(35),
        revenue_band: Some(RevenueBand::Micro),
        legal_type: Some(LegalType::PrivateCompany),
        data_sensitivity: BTreeSet::from([
            DataCategory::PaymentCardData,
            DataCategory::PersonalData,
        ]),
        geographic_operations: BTreeSet::from(["DE".to_string()]),
        technology_stack: BTreeSet::from(["saas".to_string()]),
    }
}

pub(super) fn quiet_profile() -> OrganizationProfile {
    OrganizationProfile {
        sector: Some(Sector::Other),
        employee_count: Some(4),
        revenue_band: Some(RevenueBand::Small),
        legal_type: Some(LegalType::SoleProprietorship),
        ..OrganizationProfile::default()
    }
}

pub(super) fn request(organization: &str, profile: OrganizationProfile) -> OnboardingRequest {
    OnboardingRequest {
        organization_id: OrganizationId(organization.to_string()),
        profile,
        deadline: None,
    }
}

pub(super) fn submission(kind: EvidenceType, source: &str) -> EvidenceSubmission {
    EvidenceSubmission {
        evidence_type: kind,
        source: source.to_string(),
        trusted: false,
        submitted_at: Some(now()),
        expected_version: None,
    }
}

pub(super) fn maturity(level: MaturityLevel) -> MaturityUpdate {
    MaturityUpdate {
        maturity: level,
        expected_version: None,
    }
}

pub(super) type Orchestrator = OnboardingOrchestrator<MemoryRepository, MemoryNotifications>;
pub(super) type Service = AssessmentService<MemoryRepository, MemoryNotifications>;

pub(super) struct Harness {
    pub(super) onboarding: Arc<Orchestrator>,
    pub(super) assessments: Arc<Service>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) notifications: Arc<MemoryNotifications>,
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        compliance_router(self.onboarding.clone(), self.assessments.clone())
    }
}

pub(super) fn harness() -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let onboarding = Arc::new(OnboardingOrchestrator::new(
        Arc::new(ReferenceCatalog::standard()),
        Arc::new(RuleSet::standard()),
        repository.clone(),
        notifications.clone(),
    ));
    let assessments = Arc::new(AssessmentService::new(
        repository.clone(),
        notifications.clone(),
    ));

    Harness {
        onboarding,
        assessments,
        repository,
        notifications,
    }
}

/// Onboards the fintech fixture and returns its seeded assessment id.
pub(super) fn onboarded(harness: &Harness) -> AssessmentId {
    harness
        .onboarding
        .onboard_at(request("org-fintech", fintech_profile()), now())
        .expect("fintech onboards")
        .assessment
        .id
}

/// Brings a control to a passing state: declared maturity `Defined`, every required type
/// covered, minimum count met and one trusted item.
pub(super) fn satisfy(
    service: &Service,
    assessment_id: &AssessmentId,
    control: &AssessmentControl,
) {
    service
        .set_maturity(assessment_id, &control.control_id, maturity(MaturityLevel::Defined))
        .expect("maturity set");

    let mut kinds: Vec<EvidenceType> = control
        .evidence_policy
        .required_types
        .iter()
        .copied()
        .collect();
    while (kinds.len() as u32) < control.verdict.required_count {
        kinds.push(kinds[0]);
    }

    for (index, kind) in kinds.into_iter().enumerate() {
        let mut item = submission(kind, "internal");
        item.trusted = index == 0;
        service
            .add_evidence(assessment_id, &control.control_id, item)
            .expect("evidence added");
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    profiles: Arc<Mutex<BTreeMap<OrganizationId, Vec<ProfileRecord>>>>,
    assessments: Arc<Mutex<BTreeMap<AssessmentId, Assessment>>>,
}

impl ComplianceRepository for MemoryRepository {
    fn insert_profile(&self, record: ProfileRecord) -> Result<ProfileRecord, RepositoryError> {
        let mut guard = self.profiles.lock().expect("profile mutex poisoned");
        let versions = guard.entry(record.organization_id.clone()).or_default();
        if versions.iter().any(|existing| existing.version == record.version) {
            return Err(RepositoryError::Conflict);
        }
        versions.push(record.clone());
        Ok(record)
    }

    fn latest_profile(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<ProfileRecord>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard
            .get(organization_id)
            .and_then(|versions| versions.iter().max_by_key(|record| record.version))
            .cloned())
    }

    fn profile_history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ProfileRecord>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.get(organization_id).cloned().unwrap_or_default())
    }

    fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment, RepositoryError> {
        let mut guard = self.assessments.lock().expect("assessment mutex poisoned");
        if guard.contains_key(&assessment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(assessment.id.clone(), assessment.clone());
        Ok(assessment)
    }

    fn fetch_assessment(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().expect("assessment mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_assessment(
        &self,
        mut assessment: Assessment,
        expected_revision: u64,
    ) -> Result<Assessment, RepositoryError> {
        let mut guard = self.assessments.lock().expect("assessment mutex poisoned");
        let stored = guard
            .get(&assessment.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::StaleRevision {
                expected: expected_revision,
                actual: stored.revision,
            });
        }
        assessment.revision = expected_revision + 1;
        guard.insert(assessment.id.clone(), assessment.clone());
        Ok(assessment)
    }

    fn assessments_for(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().expect("assessment mutex poisoned");
        Ok(guard
            .values()
            .filter(|assessment| &assessment.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<ComplianceNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<ComplianceNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: ComplianceNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: ComplianceNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ComplianceRepository for UnavailableRepository {
    fn insert_profile(&self, _record: ProfileRecord) -> Result<ProfileRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest_profile(
        &self,
        _organization_id: &OrganizationId,
    ) -> Result<Option<ProfileRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn profile_history(
        &self,
        _organization_id: &OrganizationId,
    ) -> Result<Vec<ProfileRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_assessment(&self, _assessment: Assessment) -> Result<Assessment, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_assessment(&self, _id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_assessment(
        &self,
        _assessment: Assessment,
        _expected_revision: u64,
    ) -> Result<Assessment, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assessments_for(
        &self,
        _organization_id: &OrganizationId,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
