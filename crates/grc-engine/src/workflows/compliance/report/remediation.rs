use serde::{Deserialize, Serialize};

use super::super::assessments::AssessmentControl;
use super::super::domain::{ControlId, EvidenceType, MaturityLevel};

/// Concrete next step that moves a failing control toward a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemediationAction {
    SubmitEvidence { minimum: u32 },
    AddEvidenceItems { count: u32 },
    AddEvidenceOfType { evidence_type: EvidenceType },
    AddTrustedSourceEvidence,
    RaiseMaturity {
        current: MaturityLevel,
        target: MaturityLevel,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationSuggestion {
    pub control_id: ControlId,
    #[serde(flatten)]
    pub action: RemediationAction,
    pub detail: String,
}

/// Suggestions for one control, evidence first, maturity last. Passing controls get none.
pub fn suggest(control: &AssessmentControl, pass_threshold: u8) -> Vec<RemediationSuggestion> {
    if control.passed() {
        return Vec::new();
    }

    let verdict = &control.verdict;
    let mut actions = Vec::new();

    if !verdict.has_any_evidence {
        let wanted: Vec<&str> = control
            .evidence_policy
            .required_types
            .iter()
            .map(|kind| kind.label())
            .collect();
        actions.push((
            RemediationAction::SubmitEvidence {
                minimum: verdict.required_count,
            },
            format!(
                "No evidence on file; submit at least {} item(s) covering: {}",
                verdict.required_count,
                wanted.join(", ")
            ),
        ));
    } else {
        if !verdict.meets_minimum_count {
            let count = verdict.shortfall();
            actions.push((
                RemediationAction::AddEvidenceItems { count },
                format!(
                    "Add {count} more evidence item(s) to reach the minimum of {}",
                    verdict.required_count
                ),
            ));
        }
        for kind in &verdict.missing_types {
            actions.push((
                RemediationAction::AddEvidenceOfType {
                    evidence_type: *kind,
                },
                format!("Provide {} evidence", kind.label().to_lowercase()),
            ));
        }
        if !verdict.has_trusted_source {
            let detail = if control.evidence_policy.trusted_sources.is_empty() {
                "Obtain evidence from an independent, trusted source".to_string()
            } else {
                let sources: Vec<&str> = control
                    .evidence_policy
                    .trusted_sources
                    .iter()
                    .map(String::as_str)
                    .collect();
                format!("Obtain evidence from a trusted source ({})", sources.join(", "))
            };
            actions.push((RemediationAction::AddTrustedSourceEvidence, detail));
        }
    }

    if let Some(target) = passing_level(pass_threshold) {
        if control.maturity < target {
            actions.push((
                RemediationAction::RaiseMaturity {
                    current: control.maturity,
                    target,
                },
                format!(
                    "Declared maturity {} ({}) cannot pass; implement the control to at least {} ({})",
                    control.maturity.value(),
                    control.maturity.label(),
                    target.value(),
                    target.label()
                ),
            ));
        }
    }

    actions
        .into_iter()
        .map(|(action, detail)| RemediationSuggestion {
            control_id: control.control_id.clone(),
            action,
            detail,
        })
        .collect()
}

fn passing_level(pass_threshold: u8) -> Option<MaturityLevel> {
    MaturityLevel::ordered()
        .into_iter()
        .find(|level| level.percentage() >= pass_threshold)
}
