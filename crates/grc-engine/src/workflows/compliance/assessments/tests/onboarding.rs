use super::common::*;
use crate::workflows::compliance::applicability::RuleSet;
use crate::workflows::compliance::assessments::{
    ClosureReason, ComplianceRepository, NotificationError, OnboardingError,
    OnboardingOrchestrator, ProfileRecord,
};
use crate::workflows::compliance::catalog::ReferenceCatalog;
use crate::workflows::compliance::domain::{
    ControlId, DataCategory, FrameworkId, OrganizationId, Sector,
};
use chrono::Duration;
use std::sync::Arc;

#[test]
fn onboarding_seeds_an_assessment_from_the_applicable_controls() {
    let harness = harness();

    let outcome = harness
        .onboarding
        .onboard_at(request("org-fintech", fintech_profile()), now())
        .expect("onboarding succeeds");

    assert_eq!(outcome.profile.version, 1);
    assert_eq!(outcome.assessment.id.0, "asm-000001");
    assert_eq!(outcome.assessment.profile_version, 1);
    assert_eq!(outcome.assessment.created_at, now());
    assert_eq!(outcome.template.controls.len(), 15);
    assert_eq!(outcome.assessment.controls.len(), 15);
    assert_eq!(outcome.template.mandatory_count(), 9);
    assert!(outcome
        .assessment
        .control(&ControlId("ISO-A.8.28".to_string()))
        .is_none());

    let frameworks: Vec<_> = outcome
        .matrix
        .applicable_frameworks()
        .map(|framework| framework.framework_id.0.as_str())
        .collect();
    assert_eq!(frameworks, vec!["GDPR", "ISO27001", "PCIDSS", "SOC2"]);

    let stored = harness
        .repository
        .fetch_assessment(&outcome.assessment.id)
        .expect("fetch succeeds")
        .expect("assessment stored");
    assert_eq!(stored, outcome.assessment);

    let events = harness.notifications.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].template, "assessment_seeded");
    assert_eq!(events[0].assessment_id.as_ref(), Some(&outcome.assessment.id));
    assert_eq!(
        events[0].details.get("control_count").map(String::as_str),
        Some("15")
    );
    assert_eq!(
        events[0].details.get("mandatory_count").map(String::as_str),
        Some("9")
    );
}

#[test]
fn assessment_ids_follow_the_onboarding_sequence() {
    let harness = harness();

    let first = harness
        .onboarding
        .onboard_at(request("org-a", fintech_profile()), now())
        .expect("first onboarding");
    let second = harness
        .onboarding
        .onboard_at(request("org-b", quiet_profile()), now())
        .expect("second onboarding");

    assert_eq!(first.assessment.id.0, "asm-000001");
    assert_eq!(second.assessment.id.0, "asm-000002");
}

#[test]
fn organizations_cannot_onboard_twice() {
    let harness = harness();
    onboarded(&harness);

    match harness
        .onboarding
        .onboard_at(request("org-fintech", quiet_profile()), now())
    {
        Err(OnboardingError::AlreadyOnboarded(id)) => assert_eq!(id.0, "org-fintech"),
        other => panic!("expected already onboarded, got {other:?}"),
    }
    assert_eq!(harness.notifications.events().len(), 1);
}

#[test]
fn blank_organization_ids_are_rejected() {
    let harness = harness();

    let result = harness
        .onboarding
        .onboard_at(request("  ", fintech_profile()), now());

    assert!(matches!(result, Err(OnboardingError::InvalidOrganizationId)));
    assert!(harness.notifications.events().is_empty());
}

#[test]
fn out_of_scope_organizations_get_an_empty_assessment() {
    let harness = harness();

    let outcome = harness
        .onboarding
        .onboard_at(request("org-bakery", quiet_profile()), now())
        .expect("onboarding succeeds");

    assert!(outcome.matrix.is_empty_scope());
    assert!(outcome.matrix.issues.is_empty());
    assert!(outcome.template.is_empty());
    assert!(outcome.assessment.controls.is_empty());
    assert_eq!(
        outcome.assessment.closure_reason(now()),
        Some(ClosureReason::AllMandatoryPassed)
    );
}

#[test]
fn profile_updates_add_versions_without_touching_assessments() {
    let harness = harness();
    let assessment_id = onboarded(&harness);
    let organization = OrganizationId("org-fintech".to_string());

    let mut profile = fintech_profile();
    profile.sector = Some(Sector::Healthcare);
    profile.data_sensitivity.insert(DataCategory::HealthRecords);
    profile.geographic_operations.insert("US".to_string());

    let outcome = harness
        .onboarding
        .update_profile(&organization, profile)
        .expect("profile updated");

    assert_eq!(outcome.profile.version, 2);
    let hipaa = outcome
        .matrix
        .frameworks
        .get(&FrameworkId("HIPAA".to_string()))
        .expect("hipaa evaluated");
    assert!(hipaa.applicable);

    let history = harness
        .onboarding
        .profile_history(&organization)
        .expect("history available");
    let versions: Vec<u32> = history.iter().map(|record| record.version).collect();
    assert_eq!(versions, vec![1, 2]);

    let applicability = harness
        .onboarding
        .applicability(&organization)
        .expect("latest applicability");
    assert_eq!(applicability, outcome.matrix);

    let assessment = harness
        .assessments
        .get(&assessment_id)
        .expect("assessment stored");
    assert_eq!(assessment.profile_version, 1);
    assert_eq!(assessment.controls.len(), 15);
}

#[test]
fn unknown_organizations_have_no_profile_or_applicability() {
    let harness = harness();
    let organization = OrganizationId("org-ghost".to_string());

    assert!(matches!(
        harness.onboarding.update_profile(&organization, fintech_profile()),
        Err(OnboardingError::UnknownOrganization(_))
    ));
    assert!(matches!(
        harness.onboarding.applicability(&organization),
        Err(OnboardingError::UnknownOrganization(_))
    ));
    assert!(matches!(
        harness.onboarding.profile_history(&organization),
        Err(OnboardingError::UnknownOrganization(_))
    ));
}

#[test]
fn notification_failures_are_reported() {
    let repository = Arc::new(MemoryRepository::default());
    let orchestrator = OnboardingOrchestrator::new(
        Arc::new(ReferenceCatalog::standard()),
        Arc::new(RuleSet::standard()),
        repository.clone(),
        Arc::new(OfflineNotifications),
    );

    match orchestrator.onboard_at(request("org-fintech", fintech_profile()), now()) {
        Err(OnboardingError::Notification(NotificationError::Transport(_))) => {}
        other => panic!("expected notification failure, got {other:?}"),
    }
    assert!(repository
        .latest_profile(&OrganizationId("org-fintech".to_string()))
        .expect("lookup succeeds")
        .is_some());
}

#[test]
fn orchestrators_sharing_a_repository_do_not_reuse_assessment_ids() {
    let repository = Arc::new(MemoryRepository::default());
    let orchestrator = || {
        OnboardingOrchestrator::new(
            Arc::new(ReferenceCatalog::standard()),
            Arc::new(RuleSet::standard()),
            repository.clone(),
            Arc::new(MemoryNotifications::default()),
        )
    };
    let first = orchestrator();
    let second = orchestrator();

    let a = first
        .onboard_at(request("org-a", fintech_profile()), now())
        .expect("first orchestrator onboards");
    let b = second
        .onboard_at(request("org-b", quiet_profile()), now())
        .expect("second orchestrator onboards");

    assert_eq!(a.assessment.id.0, "asm-000001");
    assert_eq!(b.assessment.id.0, "asm-000002");
    for organization in ["org-a", "org-b"] {
        let stored = repository
            .assessments_for(&OrganizationId(organization.to_string()))
            .expect("lookup succeeds");
        assert_eq!(stored.len(), 1);
    }
    let original = repository
        .fetch_assessment(&a.assessment.id)
        .expect("fetch succeeds")
        .expect("first assessment kept");
    assert_eq!(original.organization_id.0, "org-a");
}

#[test]
fn onboarding_resumes_when_the_profile_was_stored_without_an_assessment() {
    let harness = harness();
    let organization = OrganizationId("org-fintech".to_string());
    harness
        .repository
        .insert_profile(ProfileRecord {
            organization_id: organization.clone(),
            version: 1,
            profile: fintech_profile(),
            recorded_at: now(),
        })
        .expect("profile stored");

    let outcome = harness
        .onboarding
        .onboard_at(request("org-fintech", fintech_profile()), now())
        .expect("onboarding resumes");

    assert_eq!(outcome.profile.version, 1);
    assert_eq!(outcome.assessment.profile_version, 1);
    assert_eq!(outcome.assessment.controls.len(), 15);
    let versions: Vec<u32> = harness
        .onboarding
        .profile_history(&organization)
        .expect("history available")
        .iter()
        .map(|record| record.version)
        .collect();
    assert_eq!(versions, vec![1]);
    assert_eq!(
        harness
            .repository
            .assessments_for(&organization)
            .expect("lookup succeeds")
            .len(),
        1
    );

    match harness
        .onboarding
        .onboard_at(request("org-fintech", fintech_profile()), now())
    {
        Err(OnboardingError::AlreadyOnboarded(id)) => assert_eq!(id, organization),
        other => panic!("expected already onboarded, got {other:?}"),
    }
}

#[test]
fn profile_updates_record_the_supplied_time() {
    let harness = harness();
    onboarded(&harness);
    let organization = OrganizationId("org-fintech".to_string());
    let later = now() + Duration::days(1);

    let outcome = harness
        .onboarding
        .update_profile_at(&organization, quiet_profile(), later)
        .expect("profile updated");

    assert_eq!(outcome.profile.version, 2);
    assert_eq!(outcome.profile.recorded_at, later);
    assert!(outcome.matrix.is_empty_scope());
}
