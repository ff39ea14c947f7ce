use serde::{Deserialize, Serialize};

use super::super::domain::MaturityLevel;
use super::evidence::EvidenceVerdict;

/// Minimum score for a control to pass.
pub const PASS_THRESHOLD: u8 = 60;

/// Evidence-quality ceiling that limited the effective maturity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCap {
    NoEvidence,
    InsufficientEvidenceCount,
    MissingRequiredTypes,
    MissingTrustedSource,
}

impl ScoreCap {
    pub const fn ceiling(self) -> MaturityLevel {
        match self {
            Self::NoEvidence => MaturityLevel::NotImplemented,
            Self::InsufficientEvidenceCount => MaturityLevel::Developing,
            // Missing types and a missing trusted source share the same ceiling.
            Self::MissingRequiredTypes | Self::MissingTrustedSource => MaturityLevel::Defined,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NoEvidence => "no evidence submitted",
            Self::InsufficientEvidenceCount => "too few evidence items",
            Self::MissingRequiredTypes => "required evidence types missing",
            Self::MissingTrustedSource => "no evidence from a trusted source",
        }
    }
}

/// Derived score for one control; never stored as a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlScore {
    pub score: u8,
    pub level: MaturityLevel,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<ScoreCap>,
}

impl ControlScore {
    pub const fn unscored() -> Self {
        Self {
            score: 0,
            level: MaturityLevel::NotImplemented,
            passed: false,
            cap: None,
        }
    }
}

pub fn score(
    has_evidence: bool,
    declared: MaturityLevel,
    verdict: &EvidenceVerdict,
    is_mandatory: bool,
) -> ControlScore {
    if !has_evidence {
        return ControlScore {
            cap: Some(ScoreCap::NoEvidence),
            ..ControlScore::unscored()
        };
    }

    let cap = if !verdict.meets_minimum_count {
        Some(ScoreCap::InsufficientEvidenceCount)
    } else if !verdict.covers_required_types {
        Some(ScoreCap::MissingRequiredTypes)
    } else if !verdict.has_trusted_source {
        Some(ScoreCap::MissingTrustedSource)
    } else {
        None
    };

    let level = match cap {
        Some(cap) => declared.min(cap.ceiling()),
        None => declared,
    };
    let score = level.percentage();

    ControlScore {
        score,
        level,
        passed: passes(score, verdict, is_mandatory),
        cap,
    }
}

/// Mandatory controls also need the minimum evidence count, not just the score.
pub fn passes(score: u8, verdict: &EvidenceVerdict, is_mandatory: bool) -> bool {
    score >= PASS_THRESHOLD && (!is_mandatory || verdict.meets_minimum_count)
}
