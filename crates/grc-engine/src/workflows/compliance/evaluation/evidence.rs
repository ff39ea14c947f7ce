use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::domain::{EvidenceItem, EvidencePolicy, EvidenceType};

/// Evidence count below which a control cannot score above the "developing" tier,
/// regardless of a lower policy minimum.
pub const MINIMUM_EVIDENCE_FOR_FULL_CREDIT: u32 = 3;

/// Quality judgement over the evidence submitted for one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceVerdict {
    pub has_any_evidence: bool,
    pub count: u32,
    /// Items needed for `meets_minimum_count`.
    pub required_count: u32,
    pub meets_minimum_count: bool,
    pub covers_required_types: bool,
    pub has_trusted_source: bool,
    /// Required types with no submitted item, in policy order.
    pub missing_types: Vec<EvidenceType>,
}

impl EvidenceVerdict {
    /// Additional items required to meet the minimum count.
    pub fn shortfall(&self) -> u32 {
        self.required_count.saturating_sub(self.count)
    }

    pub fn is_complete(&self) -> bool {
        self.has_any_evidence
            && self.meets_minimum_count
            && self.covers_required_types
            && self.has_trusted_source
    }
}

pub fn validate(evidence: &[EvidenceItem], policy: &EvidencePolicy) -> EvidenceVerdict {
    let required_count = policy.minimum_count.max(MINIMUM_EVIDENCE_FOR_FULL_CREDIT);

    if evidence.is_empty() {
        return EvidenceVerdict {
            has_any_evidence: false,
            count: 0,
            required_count,
            meets_minimum_count: false,
            covers_required_types: false,
            has_trusted_source: false,
            missing_types: policy.required_types.iter().copied().collect(),
        };
    }

    let count = u32::try_from(evidence.len()).unwrap_or(u32::MAX);
    let submitted: BTreeSet<EvidenceType> =
        evidence.iter().map(|item| item.evidence_type).collect();
    let missing_types: Vec<EvidenceType> = policy
        .required_types
        .difference(&submitted)
        .copied()
        .collect();
    let has_trusted_source = evidence
        .iter()
        .any(|item| item.trusted || policy.is_trusted_source(&item.source));

    EvidenceVerdict {
        has_any_evidence: true,
        count,
        required_count,
        meets_minimum_count: count >= required_count,
        covers_required_types: missing_types.is_empty(),
        has_trusted_source,
        missing_types,
    }
}
