use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{
    ControlId, EvidenceId, EvidenceItem, EvidencePolicy, EvidenceType, FrameworkId, MaturityLevel,
    OrganizationId, OrganizationProfile, RiskLevel,
};
use super::super::evaluation::{evaluate_control, ControlScore, EvidenceVerdict};
use super::super::template::{AssessmentTemplate, ScoringRequirements, TemplateControl};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Open,
    Closed,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    AllMandatoryPassed,
    DeadlineReached,
}

impl ClosureReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AllMandatoryPassed => "all_mandatory_passed",
            Self::DeadlineReached => "deadline_reached",
        }
    }
}

/// Immutable, numbered snapshot of an organization's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub organization_id: OrganizationId,
    pub version: u32,
    pub profile: OrganizationProfile,
    pub recorded_at: DateTime<Utc>,
}

/// One applicable control inside an assessment, with its evidence and derived score.
///
/// `verdict` and `score` are derived state: every mutation goes through a method that
/// recomputes them and bumps `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentControl {
    pub control_id: ControlId,
    pub framework_id: FrameworkId,
    pub title: String,
    pub category: String,
    pub risk_level: RiskLevel,
    pub is_mandatory: bool,
    pub evidence_policy: EvidencePolicy,
    pub reasons: Vec<String>,
    pub maturity: MaturityLevel,
    pub evidence: Vec<EvidenceItem>,
    pub verdict: EvidenceVerdict,
    pub score: ControlScore,
    pub version: u64,
}

impl AssessmentControl {
    pub fn from_template(placeholder: &TemplateControl) -> Self {
        let (verdict, score) = evaluate_control(
            &[],
            &placeholder.evidence_policy,
            placeholder.maturity,
            placeholder.is_mandatory,
        );

        Self {
            control_id: placeholder.control_id.clone(),
            framework_id: placeholder.framework_id.clone(),
            title: placeholder.title.clone(),
            category: placeholder.category.clone(),
            risk_level: placeholder.risk_level,
            is_mandatory: placeholder.is_mandatory,
            evidence_policy: placeholder.evidence_policy.clone(),
            reasons: placeholder.reasons.clone(),
            maturity: placeholder.maturity,
            evidence: Vec::new(),
            verdict,
            score,
            version: 0,
        }
    }

    pub fn passed(&self) -> bool {
        self.score.passed
    }

    pub fn add_evidence(&mut self, item: EvidenceItem) {
        self.evidence.push(item);
        self.touch();
    }

    /// Returns the removed item, or `None` when the control holds no such evidence.
    pub fn remove_evidence(&mut self, evidence_id: &EvidenceId) -> Option<EvidenceItem> {
        let index = self
            .evidence
            .iter()
            .position(|item| &item.id == evidence_id)?;
        let removed = self.evidence.remove(index);
        self.touch();
        Some(removed)
    }

    pub fn set_maturity(&mut self, maturity: MaturityLevel) {
        self.maturity = maturity;
        self.touch();
    }

    pub fn recompute(&mut self) {
        let (verdict, score) = evaluate_control(
            &self.evidence,
            &self.evidence_policy,
            self.maturity,
            self.is_mandatory,
        );
        self.verdict = verdict;
        self.score = score;
    }

    fn touch(&mut self) {
        self.recompute();
        self.version += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub organization_id: OrganizationId,
    pub profile_version: u32,
    pub status: AssessmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure: Option<ClosureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Bumped by the repository on every successful write.
    pub revision: u64,
    pub requirements: ScoringRequirements,
    pub controls: Vec<AssessmentControl>,
}

impl Assessment {
    pub fn seed(
        id: AssessmentId,
        organization_id: OrganizationId,
        profile_version: u32,
        template: &AssessmentTemplate,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            profile_version,
            status: AssessmentStatus::Open,
            closure: None,
            deadline,
            created_at: now,
            closed_at: None,
            revision: 0,
            requirements: template.requirements,
            controls: template
                .controls
                .iter()
                .map(AssessmentControl::from_template)
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AssessmentStatus::Open
    }

    pub fn control(&self, control_id: &ControlId) -> Option<&AssessmentControl> {
        self.controls
            .iter()
            .find(|control| &control.control_id == control_id)
    }

    pub fn control_mut(&mut self, control_id: &ControlId) -> Option<&mut AssessmentControl> {
        self.controls
            .iter_mut()
            .find(|control| &control.control_id == control_id)
    }

    pub fn mandatory_controls(&self) -> impl Iterator<Item = &AssessmentControl> {
        self.controls.iter().filter(|control| control.is_mandatory)
    }

    /// Why the assessment may close now, if it may. Passing mandatory controls take
    /// precedence over an elapsed deadline; with no mandatory controls that holds trivially.
    pub fn closure_reason(&self, now: DateTime<Utc>) -> Option<ClosureReason> {
        if self.mandatory_controls().all(AssessmentControl::passed) {
            return Some(ClosureReason::AllMandatoryPassed);
        }
        match self.deadline {
            Some(deadline) if now >= deadline => Some(ClosureReason::DeadlineReached),
            _ => None,
        }
    }

    pub fn close(&mut self, reason: ClosureReason, now: DateTime<Utc>) {
        self.status = AssessmentStatus::Closed;
        self.closure = Some(reason);
        self.closed_at = Some(now);
    }
}

/// Evidence payload accepted by the service; the id is assigned on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSubmission {
    pub evidence_type: EvidenceType,
    pub source: String,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Control version the caller last saw; a mismatch is rejected as stale.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityUpdate {
    pub maturity: MaturityLevel,
    #[serde(default)]
    pub expected_version: Option<u64>,
}
