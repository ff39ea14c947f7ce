mod import;
mod standard;

pub use import::{CatalogImportError, CatalogImporter};

use std::collections::{BTreeMap, BTreeSet};

use super::domain::{Control, ControlId, EvidencePolicy, Framework, FrameworkId};

/// Reference data errors. Policy problems are caught here, when the catalog is built,
/// so scoring never sees a malformed evidence policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("framework {0} is defined more than once")]
    DuplicateFramework(FrameworkId),
    #[error("control {0} is defined more than once")]
    DuplicateControl(ControlId),
    #[error("unknown framework reference {0}")]
    UnknownFramework(FrameworkId),
    #[error("unknown control reference {0}")]
    UnknownControl(ControlId),
    #[error("control {control_id} requires {minimum_count} evidence item(s) but lists no required evidence types")]
    InconsistentEvidencePolicy {
        control_id: ControlId,
        minimum_count: u32,
    },
    #[error("control {control_id} must require at least one evidence item")]
    ZeroMinimumEvidence { control_id: ControlId },
}

/// Frameworks and controls shared by every tenant, keyed for deterministic iteration.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    frameworks: BTreeMap<FrameworkId, Framework>,
    controls: BTreeMap<ControlId, Control>,
}

impl ReferenceCatalog {
    /// Built-in catalog covering the frameworks referenced by the standard rule set.
    pub fn standard() -> Self {
        let (frameworks, controls) = standard::standard_reference_data();
        Self::assemble(frameworks, controls)
    }

    /// Validate and index reference data; `total_control_count` is recomputed from the
    /// supplied controls.
    pub fn from_parts(
        frameworks: Vec<Framework>,
        controls: Vec<Control>,
    ) -> Result<Self, CatalogError> {
        let mut seen_frameworks = BTreeSet::new();
        for framework in &frameworks {
            if !seen_frameworks.insert(&framework.id) {
                return Err(CatalogError::DuplicateFramework(framework.id.clone()));
            }
        }

        let mut seen_controls = BTreeSet::new();
        for control in &controls {
            if !seen_frameworks.contains(&control.framework_id) {
                return Err(CatalogError::UnknownFramework(control.framework_id.clone()));
            }
            if !seen_controls.insert(&control.id) {
                return Err(CatalogError::DuplicateControl(control.id.clone()));
            }
            check_evidence_policy(&control.id, &control.evidence_policy)?;
        }

        Ok(Self::assemble(frameworks, controls))
    }

    fn assemble(frameworks: Vec<Framework>, controls: Vec<Control>) -> Self {
        let mut frameworks: BTreeMap<FrameworkId, Framework> = frameworks
            .into_iter()
            .map(|framework| (framework.id.clone(), framework))
            .collect();

        for framework in frameworks.values_mut() {
            framework.total_control_count = controls
                .iter()
                .filter(|control| control.framework_id == framework.id)
                .count();
        }

        let controls = controls
            .into_iter()
            .map(|control| (control.id.clone(), control))
            .collect();

        Self {
            frameworks,
            controls,
        }
    }

    pub fn framework(&self, id: &FrameworkId) -> Result<&Framework, CatalogError> {
        self.frameworks
            .get(id)
            .ok_or_else(|| CatalogError::UnknownFramework(id.clone()))
    }

    pub fn control(&self, id: &ControlId) -> Result<&Control, CatalogError> {
        self.controls
            .get(id)
            .ok_or_else(|| CatalogError::UnknownControl(id.clone()))
    }

    pub fn contains_framework(&self, id: &FrameworkId) -> bool {
        self.frameworks.contains_key(id)
    }

    pub fn contains_control(&self, id: &ControlId) -> bool {
        self.controls.contains_key(id)
    }

    pub fn frameworks(&self) -> impl Iterator<Item = &Framework> {
        self.frameworks.values()
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    /// Controls of one framework, ordered by control identifier.
    pub fn controls_for<'a>(
        &'a self,
        framework_id: &'a FrameworkId,
    ) -> impl Iterator<Item = &'a Control> + 'a {
        self.controls
            .values()
            .filter(move |control| &control.framework_id == framework_id)
    }

    pub fn framework_count(&self) -> usize {
        self.frameworks.len()
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }
}

pub(crate) fn check_evidence_policy(
    control_id: &ControlId,
    policy: &EvidencePolicy,
) -> Result<(), CatalogError> {
    if policy.minimum_count == 0 {
        return Err(CatalogError::ZeroMinimumEvidence {
            control_id: control_id.clone(),
        });
    }

    if policy.required_types.is_empty() {
        return Err(CatalogError::InconsistentEvidencePolicy {
            control_id: control_id.clone(),
            minimum_count: policy.minimum_count,
        });
    }

    Ok(())
}
