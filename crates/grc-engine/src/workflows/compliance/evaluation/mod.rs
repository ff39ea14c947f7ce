//! Evidence quality judgement and per-control maturity scoring.
//!
//! Both stages are pure functions of their inputs: the same evidence set, declared maturity,
//! and mandatoriness always produce the same verdict and score.

mod evidence;
mod scoring;

pub use evidence::{validate, EvidenceVerdict, MINIMUM_EVIDENCE_FOR_FULL_CREDIT};
pub use scoring::{passes, score, ControlScore, ScoreCap, PASS_THRESHOLD};

use super::domain::{EvidenceItem, EvidencePolicy, MaturityLevel};

/// Validate evidence against a policy and score the control in one step.
pub fn evaluate_control(
    evidence: &[EvidenceItem],
    policy: &EvidencePolicy,
    declared: MaturityLevel,
    is_mandatory: bool,
) -> (EvidenceVerdict, ControlScore) {
    let verdict = validate(evidence, policy);
    let score = score(verdict.has_any_evidence, declared, &verdict, is_mandatory);
    (verdict, score)
}
