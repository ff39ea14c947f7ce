use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::super::domain::{ControlId, EvidenceId, OrganizationId, OrganizationProfile};
use super::domain::{AssessmentId, EvidenceSubmission, MaturityUpdate};
use super::onboarding::{OnboardingError, OnboardingOrchestrator, OnboardingRequest};
use super::repository::{ComplianceRepository, NotificationPublisher, RepositoryError};
use super::service::{AssessmentService, AssessmentServiceError};

/// Shared handler state; both services usually sit on the same repository.
pub struct ComplianceState<R, N> {
    pub onboarding: Arc<OnboardingOrchestrator<R, N>>,
    pub assessments: Arc<AssessmentService<R, N>>,
}

impl<R, N> Clone for ComplianceState<R, N> {
    fn clone(&self) -> Self {
        Self {
            onboarding: Arc::clone(&self.onboarding),
            assessments: Arc::clone(&self.assessments),
        }
    }
}

/// Router builder exposing onboarding, applicability and assessment endpoints.
pub fn compliance_router<R, N>(
    onboarding: Arc<OnboardingOrchestrator<R, N>>,
    assessments: Arc<AssessmentService<R, N>>,
) -> Router
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let state = ComplianceState {
        onboarding,
        assessments,
    };

    Router::new()
        .route("/api/v1/organizations", post(onboard_handler::<R, N>))
        .route(
            "/api/v1/organizations/:organization_id/profile",
            put(update_profile_handler::<R, N>),
        )
        .route(
            "/api/v1/organizations/:organization_id/profiles",
            get(profile_history_handler::<R, N>),
        )
        .route(
            "/api/v1/organizations/:organization_id/applicability",
            get(applicability_handler::<R, N>),
        )
        .route(
            "/api/v1/organizations/:organization_id/assessments",
            get(organization_assessments_handler::<R, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id",
            get(assessment_handler::<R, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/controls/:control_id/maturity",
            put(maturity_handler::<R, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/controls/:control_id/evidence",
            post(add_evidence_handler::<R, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/controls/:control_id/evidence/:evidence_id",
            delete(remove_evidence_handler::<R, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/report",
            get(report_handler::<R, N>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/close",
            post(close_handler::<R, N>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionQuery {
    expected_version: Option<u64>,
}

pub(crate) async fn onboard_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    axum::Json(request): axum::Json<OnboardingRequest>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.onboarding.onboard(request) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => onboarding_error_response(error),
    }
}

pub(crate) async fn update_profile_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(organization_id): Path<String>,
    axum::Json(profile): axum::Json<OrganizationProfile>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = OrganizationId(organization_id);
    match state.onboarding.update_profile(&id, profile) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => onboarding_error_response(error),
    }
}

pub(crate) async fn profile_history_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(organization_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state
        .onboarding
        .profile_history(&OrganizationId(organization_id))
    {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(error) => onboarding_error_response(error),
    }
}

pub(crate) async fn applicability_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(organization_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state
        .onboarding
        .applicability(&OrganizationId(organization_id))
    {
        Ok(matrix) => (StatusCode::OK, axum::Json(matrix)).into_response(),
        Err(error) => onboarding_error_response(error),
    }
}

pub(crate) async fn organization_assessments_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(organization_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state
        .assessments
        .for_organization(&OrganizationId(organization_id))
    {
        Ok(summaries) => (StatusCode::OK, axum::Json(summaries)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn assessment_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.assessments.get(&AssessmentId(assessment_id)) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn maturity_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path((assessment_id, control_id)): Path<(String, String)>,
    axum::Json(update): axum::Json<MaturityUpdate>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.assessments.set_maturity(
        &AssessmentId(assessment_id),
        &ControlId(control_id),
        update,
    ) {
        Ok(control) => (StatusCode::OK, axum::Json(control)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn add_evidence_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path((assessment_id, control_id)): Path<(String, String)>,
    axum::Json(submission): axum::Json<EvidenceSubmission>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.assessments.add_evidence(
        &AssessmentId(assessment_id),
        &ControlId(control_id),
        submission,
    ) {
        Ok(control) => (StatusCode::CREATED, axum::Json(control)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn remove_evidence_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path((assessment_id, control_id, evidence_id)): Path<(String, String, String)>,
    Query(query): Query<VersionQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.assessments.remove_evidence(
        &AssessmentId(assessment_id),
        &ControlId(control_id),
        &EvidenceId(evidence_id),
        query.expected_version,
    ) {
        Ok(control) => (StatusCode::OK, axum::Json(control)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn report_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.assessments.report(&AssessmentId(assessment_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn close_handler<R, N>(
    State(state): State<ComplianceState<R, N>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match state.assessments.close(&AssessmentId(assessment_id)) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment.summary_view())).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

fn onboarding_error_response(error: OnboardingError) -> Response {
    let status = match &error {
        OnboardingError::InvalidOrganizationId => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingError::AlreadyOnboarded(_)
        | OnboardingError::Repository(RepositoryError::Conflict)
        | OnboardingError::Repository(RepositoryError::StaleRevision { .. }) => {
            StatusCode::CONFLICT
        }
        OnboardingError::UnknownOrganization(_)
        | OnboardingError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        OnboardingError::Repository(RepositoryError::Unavailable(_))
        | OnboardingError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, error.to_string())
}

fn assessment_error_response(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::NotFound(_)
        | AssessmentServiceError::UnknownControl { .. }
        | AssessmentServiceError::UnknownEvidence { .. }
        | AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::StaleVersion { .. }
        | AssessmentServiceError::Closed(_)
        | AssessmentServiceError::Repository(RepositoryError::Conflict)
        | AssessmentServiceError::Repository(RepositoryError::StaleRevision { .. }) => {
            StatusCode::CONFLICT
        }
        AssessmentServiceError::NotClosable(_) | AssessmentServiceError::InvalidSubmission(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_))
        | AssessmentServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, error.to_string())
}

fn error_payload(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (status, axum::Json(payload)).into_response()
}
