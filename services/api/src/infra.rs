use grc_engine::config::ReferenceDataConfig;
use grc_engine::error::AppError;
use grc_engine::workflows::compliance::applicability::RuleSet;
use grc_engine::workflows::compliance::assessments::{
    Assessment, AssessmentId, ComplianceNotification, ComplianceRepository, NotificationError,
    NotificationPublisher, ProfileRecord, RepositoryError,
};
use grc_engine::workflows::compliance::catalog::{CatalogImporter, ReferenceCatalog};
use grc_engine::workflows::compliance::domain::{OrganizationId, OrganizationProfile};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock_poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("in-memory store lock poisoned".to_string())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryComplianceRepository {
    profiles: Arc<Mutex<HashMap<OrganizationId, Vec<ProfileRecord>>>>,
    assessments: Arc<Mutex<HashMap<AssessmentId, Assessment>>>,
}

impl ComplianceRepository for InMemoryComplianceRepository {
    fn insert_profile(&self, record: ProfileRecord) -> Result<ProfileRecord, RepositoryError> {
        let mut guard = self.profiles.lock().map_err(lock_poisoned)?;
        let versions = guard.entry(record.organization_id.clone()).or_default();
        if versions
            .iter()
            .any(|existing| existing.version == record.version)
        {
            return Err(RepositoryError::Conflict);
        }
        versions.push(record.clone());
        versions.sort_by_key(|existing| existing.version);
        Ok(record)
    }

    fn latest_profile(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<ProfileRecord>, RepositoryError> {
        let guard = self.profiles.lock().map_err(lock_poisoned)?;
        Ok(guard
            .get(organization_id)
            .and_then(|versions| versions.last())
            .cloned())
    }

    fn profile_history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ProfileRecord>, RepositoryError> {
        let guard = self.profiles.lock().map_err(lock_poisoned)?;
        Ok(guard.get(organization_id).cloned().unwrap_or_default())
    }

    fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment, RepositoryError> {
        let mut guard = self.assessments.lock().map_err(lock_poisoned)?;
        if guard.contains_key(&assessment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(assessment.id.clone(), assessment.clone());
        Ok(assessment)
    }

    fn fetch_assessment(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().map_err(lock_poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn update_assessment(
        &self,
        mut assessment: Assessment,
        expected_revision: u64,
    ) -> Result<Assessment, RepositoryError> {
        let mut guard = self.assessments.lock().map_err(lock_poisoned)?;
        let stored = guard
            .get_mut(&assessment.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::StaleRevision {
                expected: expected_revision,
                actual: stored.revision,
            });
        }
        assessment.revision = expected_revision + 1;
        *stored = assessment.clone();
        Ok(assessment)
    }

    fn assessments_for(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = self.assessments.lock().map_err(lock_poisoned)?;
        let mut assessments: Vec<Assessment> = guard
            .values()
            .filter(|assessment| &assessment.organization_id == organization_id)
            .cloned()
            .collect();
        assessments.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(assessments)
    }
}

/// Keeps published notifications in memory and mirrors them to the log.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifications {
    events: Arc<Mutex<Vec<ComplianceNotification>>>,
}

impl NotificationPublisher for InMemoryNotifications {
    fn publish(&self, notification: ComplianceNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            organization = %notification.organization_id,
            assessment = ?notification.assessment_id.as_ref().map(|id| id.0.as_str()),
            "compliance notification queued"
        );
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NotificationError::Transport("notification lock poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotifications {
    pub(crate) fn events(&self) -> Vec<ComplianceNotification> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Catalog and rules from the configured files, falling back to the built-in standards.
pub(crate) fn load_reference_data(
    config: &ReferenceDataConfig,
) -> Result<(ReferenceCatalog, RuleSet), AppError> {
    let catalog = match &config.catalog_path {
        Some(path) => CatalogImporter::from_path(path)?,
        None => ReferenceCatalog::standard(),
    };
    let rules = match &config.rules_path {
        Some(path) => RuleSet::from_path(path)?,
        None => RuleSet::standard(),
    };

    info!(
        frameworks = catalog.framework_count(),
        controls = catalog.control_count(),
        rules = rules.len(),
        custom_catalog = config.catalog_path.is_some(),
        custom_rules = config.rules_path.is_some(),
        "reference data loaded"
    );
    Ok((catalog, rules))
}

pub(crate) fn read_profile(path: &Path) -> Result<OrganizationProfile, AppError> {
    let file = std::fs::File::open(path)?;
    let profile = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(std::io::Error::from)?;
    Ok(profile)
}
