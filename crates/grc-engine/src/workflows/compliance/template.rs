use serde::{Deserialize, Serialize};
use tracing::warn;

use super::applicability::ApplicableFrameworksMatrix;
use super::catalog::ReferenceCatalog;
use super::domain::{ControlId, EvidencePolicy, FrameworkId, MaturityLevel, RiskLevel};
use super::evaluation::{MINIMUM_EVIDENCE_FOR_FULL_CREDIT, PASS_THRESHOLD};

/// Bars every control in a template is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRequirements {
    pub pass_threshold: u8,
    pub mandatory_minimum_evidence: u32,
}

impl Default for ScoringRequirements {
    fn default() -> Self {
        Self {
            pass_threshold: PASS_THRESHOLD,
            mandatory_minimum_evidence: MINIMUM_EVIDENCE_FOR_FULL_CREDIT,
        }
    }
}

/// Unscored placeholder for one applicable control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateControl {
    pub control_id: ControlId,
    pub framework_id: FrameworkId,
    pub title: String,
    pub category: String,
    pub risk_level: RiskLevel,
    pub is_mandatory: bool,
    pub evidence_policy: EvidencePolicy,
    pub reasons: Vec<String>,
    pub maturity: MaturityLevel,
    pub score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentTemplate {
    pub requirements: ScoringRequirements,
    /// Ordered by framework, then category, then control id.
    pub controls: Vec<TemplateControl>,
}

impl AssessmentTemplate {
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn mandatory_count(&self) -> usize {
        self.controls
            .iter()
            .filter(|control| control.is_mandatory)
            .count()
    }
}

pub struct TemplateGenerator<'a> {
    catalog: &'a ReferenceCatalog,
    requirements: ScoringRequirements,
}

impl<'a> TemplateGenerator<'a> {
    pub fn new(catalog: &'a ReferenceCatalog) -> Self {
        Self {
            catalog,
            requirements: ScoringRequirements::default(),
        }
    }

    pub fn generate(&self, matrix: &ApplicableFrameworksMatrix) -> AssessmentTemplate {
        let mut controls = Vec::new();

        for entry in matrix.applicable_controls() {
            let control = match self.catalog.control(&entry.control_id) {
                Ok(control) => control,
                Err(err) => {
                    warn!(control = %entry.control_id, error = %err, "skipping template entry");
                    continue;
                }
            };

            controls.push(TemplateControl {
                control_id: control.id.clone(),
                framework_id: control.framework_id.clone(),
                title: control.title.clone(),
                category: control.category.clone(),
                risk_level: control.risk_level,
                is_mandatory: entry.is_mandatory,
                evidence_policy: control.evidence_policy.clone(),
                reasons: entry.reasons.clone(),
                maturity: MaturityLevel::NotImplemented,
                score: 0,
            });
        }

        controls.sort_by(|left, right| {
            (&left.framework_id, &left.category, &left.control_id).cmp(&(
                &right.framework_id,
                &right.category,
                &right.control_id,
            ))
        });

        AssessmentTemplate {
            requirements: self.requirements,
            controls,
        }
    }
}
