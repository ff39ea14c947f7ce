use crate::infra::{
    load_reference_data, read_profile, InMemoryComplianceRepository, InMemoryNotifications,
};
use chrono::{Duration, Utc};
use clap::Args;
use grc_engine::config::ReferenceDataConfig;
use grc_engine::error::AppError;
use grc_engine::workflows::compliance::applicability::{
    ApplicabilityIssue, ApplicableFrameworksMatrix, RuleSet, RuleTarget,
};
use grc_engine::workflows::compliance::assessments::{
    AssessmentControl, AssessmentId, AssessmentService, EvidenceSubmission, MaturityUpdate,
    OnboardingOrchestrator, OnboardingRequest,
};
use grc_engine::workflows::compliance::catalog::{CatalogImporter, ReferenceCatalog};
use grc_engine::workflows::compliance::domain::{
    DataCategory, LegalType, MaturityLevel, OrganizationId, OrganizationProfile, RevenueBand,
    Sector,
};
use grc_engine::workflows::compliance::{compute_applicability, AssessmentReport};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ApplicabilityArgs {
    /// Organization profile as JSON
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Catalog CSV export to evaluate against (defaults to the built-in catalog)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Applicability rules as a JSON array (defaults to the built-in rules)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Print the matrix as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogValidateArgs {
    /// Catalog CSV export, one row per control
    #[arg(long)]
    pub(crate) path: PathBuf,
    /// Rule set whose targets are checked against the catalog (defaults to the built-in rules)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Organization identifier used for the walkthrough
    #[arg(long, default_value = "demo-fintech")]
    pub(crate) organization: String,
    /// Organization profile as JSON (defaults to a card-processing SaaS provider)
    #[arg(long)]
    pub(crate) profile: Option<PathBuf>,
    /// Catalog CSV export (defaults to the built-in catalog)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Applicability rules JSON (defaults to the built-in rules)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Days until the assessment deadline
    #[arg(long, default_value_t = 90)]
    pub(crate) deadline_days: i64,
    /// Stop after onboarding without submitting evidence
    #[arg(long)]
    pub(crate) skip_evidence: bool,
}

pub(crate) fn run_applicability(args: ApplicabilityArgs) -> Result<(), AppError> {
    let ApplicabilityArgs {
        profile,
        catalog,
        rules,
        json,
    } = args;

    let (catalog, rules) = load_reference_data(&ReferenceDataConfig {
        catalog_path: catalog,
        rules_path: rules,
    })?;
    let profile = read_profile(&profile)?;
    let matrix = compute_applicability(&profile, &rules, &catalog);

    if json {
        let rendered = serde_json::to_string_pretty(&matrix).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_matrix(&matrix);
    }
    Ok(())
}

pub(crate) fn run_catalog_validation(args: CatalogValidateArgs) -> Result<(), AppError> {
    let CatalogValidateArgs { path, rules } = args;

    let catalog = CatalogImporter::from_path(&path)?;
    let rules = match rules {
        Some(rules_path) => RuleSet::from_path(rules_path)?,
        None => RuleSet::standard(),
    };

    println!("Catalog {} is valid", path.display());
    println!(
        "- {} frameworks | {} controls",
        catalog.framework_count(),
        catalog.control_count()
    );
    for framework in catalog.frameworks() {
        let controls: Vec<_> = catalog.controls_for(&framework.id).collect();
        let mandatory = controls.iter().filter(|control| control.mandatory).count();
        println!(
            "  - {} ({}){}: {} controls, {} mandatory",
            framework.id,
            framework.name,
            if framework.mandatory { " [mandatory]" } else { "" },
            controls.len(),
            mandatory
        );
    }

    let dangling = dangling_rule_targets(&catalog, &rules);
    if dangling.is_empty() {
        println!("- all {} rules reference known targets", rules.len());
    } else {
        println!(
            "- {} of {} rules reference targets missing from this catalog:",
            dangling.len(),
            rules.len()
        );
        for line in dangling {
            println!("  - {line}");
        }
    }
    Ok(())
}

fn dangling_rule_targets(catalog: &ReferenceCatalog, rules: &RuleSet) -> Vec<String> {
    rules
        .rules()
        .iter()
        .filter(|rule| match &rule.target {
            RuleTarget::Framework(id) => !catalog.contains_framework(id),
            RuleTarget::Control(id) => !catalog.contains_control(id),
        })
        .map(|rule| format!("{} -> {}", rule.id, rule.target))
        .collect()
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        organization,
        profile,
        catalog,
        rules,
        deadline_days,
        skip_evidence,
    } = args;

    let (catalog, rules) = load_reference_data(&ReferenceDataConfig {
        catalog_path: catalog,
        rules_path: rules,
    })?;
    let profile = match profile {
        Some(path) => read_profile(&path)?,
        None => demo_profile(),
    };

    let repository = Arc::new(InMemoryComplianceRepository::default());
    let notifications = Arc::new(InMemoryNotifications::default());
    let onboarding = OnboardingOrchestrator::new(
        Arc::new(catalog),
        Arc::new(rules),
        repository.clone(),
        notifications.clone(),
    );
    let assessments = AssessmentService::new(repository, notifications.clone());

    println!("GRC assessment demo");
    let outcome = onboarding.onboard(OnboardingRequest {
        organization_id: OrganizationId(organization),
        profile,
        deadline: Some(Utc::now() + Duration::days(deadline_days)),
    })?;
    println!(
        "- Onboarded {} (profile v{}) -> assessment {}",
        outcome.profile.organization_id, outcome.profile.version, outcome.assessment.id
    );
    if let Some(deadline) = outcome.assessment.deadline {
        println!("- Assessment deadline {}", deadline.format("%Y-%m-%d"));
    }
    render_matrix(&outcome.matrix);
    println!(
        "\nAssessment template: {} controls ({} mandatory)",
        outcome.template.controls.len(),
        outcome.template.mandatory_count()
    );

    if skip_evidence || outcome.assessment.controls.is_empty() {
        return Ok(());
    }

    println!("\nEvidence intake");
    let assessment_id = outcome.assessment.id.clone();
    for control in &outcome.assessment.controls {
        let scored = submit_demo_evidence(&assessments, &assessment_id, control)?;
        println!(
            "  - {:<14} maturity {} | {} items | score {:>3} {}{}",
            scored.control_id.0,
            scored.maturity.value(),
            scored.evidence.len(),
            scored.score.score,
            if scored.passed() { "PASS" } else { "FAIL" },
            scored
                .score
                .cap
                .map(|cap| format!(" (capped: {})", cap.label()))
                .unwrap_or_default()
        );
    }

    let report = assessments.report(&assessment_id)?;
    render_report(&report);

    match assessments.close(&assessment_id) {
        Ok(closed) => println!(
            "\nAssessment {} closed ({})",
            closed.id,
            closed
                .closure
                .map(|reason| reason.label())
                .unwrap_or("unknown")
        ),
        Err(err) => println!("\nAssessment remains open: {err}"),
    }
    println!("Notifications queued: {}", notifications.events().len());

    Ok(())
}

/// Mandatory controls receive a complete evidence set; optional ones a single internal item,
/// which leaves them capped so the report has gaps to show.
fn submit_demo_evidence(
    assessments: &AssessmentService<InMemoryComplianceRepository, InMemoryNotifications>,
    assessment_id: &AssessmentId,
    control: &AssessmentControl,
) -> Result<AssessmentControl, AppError> {
    let declared = if control.is_mandatory {
        MaturityLevel::Managed
    } else {
        MaturityLevel::Optimized
    };
    let mut scored = assessments.set_maturity(
        assessment_id,
        &control.control_id,
        MaturityUpdate {
            maturity: declared,
            expected_version: Some(control.version),
        },
    )?;

    let kinds: Vec<_> = control.evidence_policy.required_types.iter().copied().collect();
    let Some(&first) = kinds.first() else {
        return Ok(scored);
    };
    let items = if control.is_mandatory {
        control.verdict.required_count.max(kinds.len() as u32) as usize
    } else {
        1
    };

    for index in 0..items {
        let evidence_type = kinds.get(index).copied().unwrap_or(first);
        let source = match control.evidence_policy.trusted_sources.iter().next() {
            Some(trusted) if index == 0 => trusted.clone(),
            _ => "internal".to_string(),
        };
        scored = assessments.add_evidence(
            assessment_id,
            &control.control_id,
            EvidenceSubmission {
                evidence_type,
                source,
                trusted: false,
                submitted_at: None,
                expected_version: Some(scored.version),
            },
        )?;
    }
    Ok(scored)
}

fn render_matrix(matrix: &ApplicableFrameworksMatrix) {
    if matrix.is_empty_scope() {
        println!("\nNo frameworks apply to this profile");
    } else {
        println!("\nApplicable frameworks");
    }

    for framework in matrix.applicable_frameworks() {
        println!(
            "- {} {}{}: {} controls in scope",
            framework.framework_id,
            framework.name,
            if framework.mandatory { " [mandatory]" } else { "" },
            framework.applicable_control_count()
        );
        for control in framework.controls.iter().filter(|control| control.applicable) {
            println!("  - {}", control.control_id);
            for reason in &control.reasons {
                println!("      {reason}");
            }
        }
    }

    if !matrix.issues.is_empty() {
        println!("Rules skipped during evaluation:");
        for issue in &matrix.issues {
            match issue {
                ApplicabilityIssue::InvalidProfile { rule_id, attribute } => {
                    println!("  - {rule_id}: profile is missing {}", attribute.label())
                }
                ApplicabilityIssue::UnknownControlReference { rule_id, target } => {
                    println!("  - {rule_id}: unknown target {target}")
                }
            }
        }
    }
}

fn render_report(report: &AssessmentReport) {
    println!(
        "\nReport for {}: overall {:.1} | {}/{} controls passing | {}/{} mandatory",
        report.assessment_id,
        report.overall_score,
        report.passed_controls,
        report.total_controls,
        report.mandatory_passed,
        report.mandatory_total
    );
    for framework in &report.frameworks {
        println!(
            "  - {:<9} {:>5.1} ({}/{} passing)",
            framework.framework_id.0, framework.weighted_score, framework.passed, framework.total
        );
    }

    if report.gaps.is_empty() {
        println!("No gaps remaining");
        return;
    }
    println!("Top gaps:");
    for gap in report.gaps.iter().take(5) {
        println!(
            "  - [{}] {} {} (score {}, deficit {})",
            gap.severity.label(),
            gap.control_id,
            gap.title,
            gap.score,
            gap.deficit
        );
    }
    println!("Suggested remediation:");
    for suggestion in report.remediations.iter().take(5) {
        println!("  - {}: {}", suggestion.control_id, suggestion.detail);
    }
}

fn demo_profile() -> OrganizationProfile {
    OrganizationProfile {
        sector: Some(Sector::Technology),
        sub_sector: Some("Payments".to_string()),
        employee_count: Some(85),
        revenue_band: Some(RevenueBand::Medium),
        legal_type: Some(LegalType::PrivateCompany),
        data_sensitivity: BTreeSet::from([
            DataCategory::PaymentCardData,
            DataCategory::PersonalData,
        ]),
        geographic_operations: BTreeSet::from(["DE".to_string(), "IE".to_string()]),
        technology_stack: BTreeSet::from([
            "saas".to_string(),
            "in_house_development".to_string(),
        ]),
    }
}
