//! Assessment-level scoring, gap analysis and remediation suggestions.

mod remediation;

pub use remediation::{suggest, RemediationAction, RemediationSuggestion};

use serde::{Deserialize, Serialize};

use super::assessments::{Assessment, AssessmentControl, AssessmentId};
use super::domain::{ControlId, FrameworkId, OrganizationId};
use super::evaluation::ScoreCap;

const MANDATORY_WEIGHT: u32 = 2;
const OPTIONAL_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GapSeverity {
    /// Mandatory gaps are always critical; optional ones are graded by deficit.
    pub fn classify(is_mandatory: bool, score: u8) -> Self {
        if is_mandatory {
            return Self::Critical;
        }
        match 100u8.saturating_sub(score) {
            deficit if deficit >= 90 => Self::High,
            deficit if deficit >= 70 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub control_id: ControlId,
    pub framework_id: FrameworkId,
    pub title: String,
    pub severity: GapSeverity,
    pub score: u8,
    pub deficit: u8,
    pub is_mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<ScoreCap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkScore {
    pub framework_id: FrameworkId,
    pub weighted_score: f64,
    pub passed: usize,
    pub total: usize,
    pub mandatory_passed: usize,
    pub mandatory_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub assessment_id: AssessmentId,
    pub organization_id: OrganizationId,
    pub overall_score: f64,
    pub passed_controls: usize,
    pub total_controls: usize,
    pub mandatory_passed: usize,
    pub mandatory_total: usize,
    pub frameworks: Vec<FrameworkScore>,
    /// Most severe first; assessment order within a severity.
    pub gaps: Vec<Gap>,
    pub remediations: Vec<RemediationSuggestion>,
}

/// Weighted mean of control scores rounded to one decimal; empty input scores 0.
pub fn weighted_score<'a, I>(controls: I) -> f64
where
    I: IntoIterator<Item = &'a AssessmentControl>,
{
    let (total, weights) = controls
        .into_iter()
        .fold((0u32, 0u32), |(total, weights), control| {
            let weight = if control.is_mandatory {
                MANDATORY_WEIGHT
            } else {
                OPTIONAL_WEIGHT
            };
            (total + u32::from(control.score.score) * weight, weights + weight)
        });

    if weights == 0 {
        return 0.0;
    }
    round_one_decimal(f64::from(total) / f64::from(weights))
}

pub fn build_report(assessment: &Assessment) -> AssessmentReport {
    let pass_threshold = assessment.requirements.pass_threshold;

    let mut gaps: Vec<Gap> = assessment
        .controls
        .iter()
        .filter(|control| !control.passed())
        .map(gap_for)
        .collect();
    gaps.sort_by(|left, right| right.severity.cmp(&left.severity));

    let remediations = assessment
        .controls
        .iter()
        .flat_map(|control| suggest(control, pass_threshold))
        .collect();

    AssessmentReport {
        assessment_id: assessment.id.clone(),
        organization_id: assessment.organization_id.clone(),
        overall_score: weighted_score(&assessment.controls),
        passed_controls: assessment.controls.iter().filter(|c| c.passed()).count(),
        total_controls: assessment.controls.len(),
        mandatory_passed: assessment
            .mandatory_controls()
            .filter(|control| control.passed())
            .count(),
        mandatory_total: assessment.mandatory_controls().count(),
        frameworks: framework_scores(&assessment.controls),
        gaps,
        remediations,
    }
}

fn gap_for(control: &AssessmentControl) -> Gap {
    let score = control.score.score;
    Gap {
        control_id: control.control_id.clone(),
        framework_id: control.framework_id.clone(),
        title: control.title.clone(),
        severity: GapSeverity::classify(control.is_mandatory, score),
        score,
        deficit: 100u8.saturating_sub(score),
        is_mandatory: control.is_mandatory,
        cap: control.score.cap,
    }
}

fn framework_scores(controls: &[AssessmentControl]) -> Vec<FrameworkScore> {
    let mut framework_ids: Vec<&FrameworkId> =
        controls.iter().map(|control| &control.framework_id).collect();
    framework_ids.sort();
    framework_ids.dedup();

    framework_ids
        .into_iter()
        .map(|framework_id| {
            let members: Vec<&AssessmentControl> = controls
                .iter()
                .filter(|control| &control.framework_id == framework_id)
                .collect();
            let mandatory: Vec<&&AssessmentControl> =
                members.iter().filter(|control| control.is_mandatory).collect();

            FrameworkScore {
                framework_id: framework_id.clone(),
                weighted_score: weighted_score(members.iter().copied()),
                passed: members.iter().filter(|control| control.passed()).count(),
                total: members.len(),
                mandatory_passed: mandatory.iter().filter(|control| control.passed()).count(),
                mandatory_total: mandatory.len(),
            }
        })
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::compliance::domain::{
        EvidenceId, EvidenceItem, EvidencePolicy, EvidenceType, MaturityLevel, RiskLevel,
    };
    use crate::workflows::compliance::template::{
        AssessmentTemplate, ScoringRequirements, TemplateControl,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn placeholder(id: &str, framework: &str, mandatory: bool) -> TemplateControl {
        TemplateControl {
            control_id: ControlId(id.to_string()),
            framework_id: FrameworkId(framework.to_string()),
            title: format!("{id} title"),
            category: "Governance".to_string(),
            risk_level: RiskLevel::High,
            is_mandatory: mandatory,
            evidence_policy: EvidencePolicy {
                required_types: BTreeSet::from([EvidenceType::Policy, EvidenceType::Report]),
                minimum_count: 1,
                trusted_sources: BTreeSet::from(["External Auditor".to_string()]),
            },
            reasons: Vec::new(),
            maturity: MaturityLevel::NotImplemented,
            score: 0,
        }
    }

    fn item(index: u32, kind: EvidenceType, source: &str) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId(format!("ev-{index}")),
            evidence_type: kind,
            source: source.to_string(),
            trusted: false,
            submitted_at: Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    fn assessment(controls: Vec<TemplateControl>) -> Assessment {
        Assessment::seed(
            AssessmentId("asm-7".to_string()),
            OrganizationId("org-7".to_string()),
            1,
            &AssessmentTemplate {
                requirements: ScoringRequirements::default(),
                controls,
            },
            None,
            Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap(),
        )
    }

    fn complete(control: &mut AssessmentControl, maturity: MaturityLevel) {
        control.set_maturity(maturity);
        control.add_evidence(item(1, EvidenceType::Policy, "internal"));
        control.add_evidence(item(2, EvidenceType::Report, "internal"));
        control.add_evidence(item(3, EvidenceType::Report, "External Auditor"));
    }

    #[test]
    fn mandatory_controls_weigh_double() {
        let mut assessment = assessment(vec![
            placeholder("GDPR-ART32", "GDPR", true),
            placeholder("GDPR-ART37", "GDPR", false),
        ]);
        complete(&mut assessment.controls[0], MaturityLevel::Optimized);

        let report = build_report(&assessment);

        assert_eq!(report.overall_score, 66.7);
        assert_eq!(report.mandatory_passed, 1);
        assert_eq!(report.mandatory_total, 1);
        assert_eq!(report.passed_controls, 1);
        assert_eq!(report.frameworks.len(), 1);
        assert_eq!(report.frameworks[0].weighted_score, 66.7);
    }

    #[test]
    fn empty_assessment_scores_zero() {
        let report = build_report(&assessment(Vec::new()));

        assert_eq!(report.overall_score, 0.0);
        assert!(report.gaps.is_empty());
        assert!(report.remediations.is_empty());
        assert!(report.frameworks.is_empty());
    }

    #[test]
    fn gap_severity_follows_mandatoriness_then_deficit() {
        assert_eq!(GapSeverity::classify(true, 80), GapSeverity::Critical);
        assert_eq!(GapSeverity::classify(false, 0), GapSeverity::High);
        assert_eq!(GapSeverity::classify(false, 10), GapSeverity::High);
        assert_eq!(GapSeverity::classify(false, 20), GapSeverity::Medium);
        assert_eq!(GapSeverity::classify(false, 30), GapSeverity::Medium);
        assert_eq!(GapSeverity::classify(false, 40), GapSeverity::Low);
    }

    #[test]
    fn gaps_are_ordered_by_severity() {
        let mut assessment = assessment(vec![
            placeholder("ISO-A.5.1", "ISO27001", false),
            placeholder("PCI-3.4", "PCIDSS", true),
            placeholder("SOC2-CC6.1", "SOC2", false),
        ]);
        complete(&mut assessment.controls[2], MaturityLevel::Developing);

        let report = build_report(&assessment);

        let ordered: Vec<(&str, GapSeverity)> = report
            .gaps
            .iter()
            .map(|gap| (gap.control_id.0.as_str(), gap.severity))
            .collect();
        assert_eq!(
            ordered,
            vec![
                ("PCI-3.4", GapSeverity::Critical),
                ("ISO-A.5.1", GapSeverity::High),
                ("SOC2-CC6.1", GapSeverity::Low),
            ]
        );
        assert_eq!(report.gaps[0].cap, Some(ScoreCap::NoEvidence));
        assert_eq!(report.frameworks.len(), 3);
    }

    #[test]
    fn remediation_names_each_missing_ingredient() {
        let mut assessment = assessment(vec![placeholder("ISO-A.5.1", "ISO27001", false)]);
        {
            let control = &mut assessment.controls[0];
            control.set_maturity(MaturityLevel::Initial);
            control.add_evidence(item(1, EvidenceType::Policy, "internal"));
        }

        let actions: Vec<RemediationAction> = build_report(&assessment)
            .remediations
            .into_iter()
            .map(|suggestion| suggestion.action)
            .collect();

        assert_eq!(
            actions,
            vec![
                RemediationAction::AddEvidenceItems { count: 2 },
                RemediationAction::AddEvidenceOfType {
                    evidence_type: EvidenceType::Report
                },
                RemediationAction::AddTrustedSourceEvidence,
                RemediationAction::RaiseMaturity {
                    current: MaturityLevel::Initial,
                    target: MaturityLevel::Defined,
                },
            ]
        );
    }

    #[test]
    fn empty_controls_ask_for_evidence_first() {
        let assessment = assessment(vec![placeholder("PCI-3.4", "PCIDSS", true)]);

        let remediations = build_report(&assessment).remediations;

        assert_eq!(
            remediations[0].action,
            RemediationAction::SubmitEvidence { minimum: 3 }
        );
        assert_eq!(
            remediations[0].detail,
            "No evidence on file; submit at least 3 item(s) covering: Policy, Report"
        );
        assert!(matches!(
            remediations[1].action,
            RemediationAction::RaiseMaturity { .. }
        ));
    }

    #[test]
    fn complete_evidence_with_low_maturity_only_needs_maturity() {
        let mut assessment = assessment(vec![placeholder("SOC2-CC6.1", "SOC2", false)]);
        complete(&mut assessment.controls[0], MaturityLevel::Developing);

        let remediations = build_report(&assessment).remediations;

        assert_eq!(remediations.len(), 1);
        assert_eq!(
            remediations[0].action,
            RemediationAction::RaiseMaturity {
                current: MaturityLevel::Developing,
                target: MaturityLevel::Defined,
            }
        );
    }
}
