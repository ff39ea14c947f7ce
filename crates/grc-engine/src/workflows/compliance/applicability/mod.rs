//! Maps an organization profile onto the reference catalog.
//!
//! Rules are evaluated in declaration order. A control is in scope when a matching rule
//! marks it (or its framework) applicable; a matching exclusion removes it unless the
//! control or its framework is mandatory. Every matching rule leaves a reason line on
//! the controls it touches, so the matrix explains itself.

mod predicate;
mod rules;

pub use predicate::{MissingAttribute, RulePredicate};
pub use rules::{ApplicabilityRule, RuleId, RuleOutcome, RuleSet, RuleSetError, RuleTarget};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::catalog::ReferenceCatalog;
use super::domain::{
    Control, ControlId, Framework, FrameworkId, OrganizationProfile, ProfileAttribute,
};

/// Problems noticed while evaluating rules. None of them abort the evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicabilityIssue {
    /// The rule needed a profile attribute that was not provided; it was skipped.
    InvalidProfile {
        rule_id: RuleId,
        attribute: ProfileAttribute,
    },
    /// The rule targets a framework or control the catalog does not know.
    UnknownControlReference { rule_id: RuleId, target: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlApplicability {
    pub control_id: ControlId,
    pub framework_id: FrameworkId,
    pub applicable: bool,
    pub reasons: Vec<String>,
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkApplicability {
    pub framework_id: FrameworkId,
    pub name: String,
    pub applicable: bool,
    pub mandatory: bool,
    /// Framework-level reason lines only; control reasons live on each control.
    pub reasons: Vec<String>,
    /// Every catalog control of the framework, ordered by control id.
    pub controls: Vec<ControlApplicability>,
}

impl FrameworkApplicability {
    pub fn applicable_control_count(&self) -> usize {
        self.controls.iter().filter(|control| control.applicable).count()
    }
}

/// Applicability verdict for every framework and control in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicableFrameworksMatrix {
    pub frameworks: BTreeMap<FrameworkId, FrameworkApplicability>,
    pub issues: Vec<ApplicabilityIssue>,
}

impl ApplicableFrameworksMatrix {
    /// All controls, framework first then control id.
    pub fn controls(&self) -> impl Iterator<Item = &ControlApplicability> {
        self.frameworks
            .values()
            .flat_map(|framework| framework.controls.iter())
    }

    pub fn applicable_controls(&self) -> impl Iterator<Item = &ControlApplicability> {
        self.controls().filter(|control| control.applicable)
    }

    pub fn applicable_frameworks(&self) -> impl Iterator<Item = &FrameworkApplicability> {
        self.frameworks
            .values()
            .filter(|framework| framework.applicable)
    }

    pub fn control(&self, id: &ControlId) -> Option<&ControlApplicability> {
        self.controls().find(|control| &control.control_id == id)
    }

    pub fn is_empty_scope(&self) -> bool {
        self.applicable_controls().next().is_none()
    }
}

/// Evaluates rule sets against the reference catalog it borrows.
pub struct ApplicabilityEngine<'a> {
    catalog: &'a ReferenceCatalog,
}

impl<'a> ApplicabilityEngine<'a> {
    pub fn new(catalog: &'a ReferenceCatalog) -> Self {
        Self { catalog }
    }

    pub fn evaluate(
        &self,
        profile: &OrganizationProfile,
        rules: &RuleSet,
    ) -> ApplicableFrameworksMatrix {
        let mut issues = Vec::new();
        let mut matched = Vec::new();

        for rule in rules.rules() {
            if !self.knows_target(&rule.target) {
                warn!(rule = %rule.id, target = %rule.target, "skipping rule with unknown target");
                issues.push(ApplicabilityIssue::UnknownControlReference {
                    rule_id: rule.id.clone(),
                    target: rule.target.to_string(),
                });
                continue;
            }

            match rule.predicate.evaluate(profile) {
                Ok(true) => matched.push(rule),
                Ok(false) => {}
                Err(MissingAttribute(attribute)) => {
                    warn!(
                        rule = %rule.id,
                        attribute = attribute.label(),
                        "skipping rule; profile attribute missing"
                    );
                    issues.push(ApplicabilityIssue::InvalidProfile {
                        rule_id: rule.id.clone(),
                        attribute,
                    });
                }
            }
        }

        let frameworks = self
            .catalog
            .frameworks()
            .map(|framework| {
                let assessed = assess_framework(self.catalog, framework, &matched);
                (framework.id.clone(), assessed)
            })
            .collect();

        let matrix = ApplicableFrameworksMatrix { frameworks, issues };
        debug!(
            matched_rules = matched.len(),
            applicable_controls = matrix.applicable_controls().count(),
            issues = matrix.issues.len(),
            "applicability computed"
        );
        matrix
    }

    fn knows_target(&self, target: &RuleTarget) -> bool {
        match target {
            RuleTarget::Framework(id) => self.catalog.contains_framework(id),
            RuleTarget::Control(id) => self.catalog.contains_control(id),
        }
    }
}

/// Convenience wrapper over [`ApplicabilityEngine::evaluate`].
pub fn compute_applicability(
    profile: &OrganizationProfile,
    rules: &RuleSet,
    catalog: &ReferenceCatalog,
) -> ApplicableFrameworksMatrix {
    ApplicabilityEngine::new(catalog).evaluate(profile, rules)
}

#[derive(Default)]
struct Verdict {
    included: bool,
    excluded: bool,
    reasons: Vec<String>,
}

impl Verdict {
    fn record(&mut self, rule: &ApplicabilityRule) {
        match rule.outcome {
            RuleOutcome::Applicable => self.included = true,
            RuleOutcome::NotApplicable => self.excluded = true,
        }
        self.reasons.push(rule.reason_line());
    }

    fn resolve(&self, mandatory: bool) -> bool {
        self.included && (!self.excluded || mandatory)
    }
}

fn assess_framework(
    catalog: &ReferenceCatalog,
    framework: &Framework,
    matched: &[&ApplicabilityRule],
) -> FrameworkApplicability {
    let mut own = Verdict::default();
    for rule in matched {
        if matches!(&rule.target, RuleTarget::Framework(id) if id == &framework.id) {
            own.record(rule);
        }
    }

    let controls: Vec<ControlApplicability> = catalog
        .controls_for(&framework.id)
        .map(|control| assess_control(framework, control, matched))
        .collect();

    let applicable =
        own.resolve(framework.mandatory) || controls.iter().any(|control| control.applicable);

    FrameworkApplicability {
        framework_id: framework.id.clone(),
        name: framework.name.clone(),
        applicable,
        mandatory: framework.mandatory,
        reasons: own.reasons,
        controls,
    }
}

fn assess_control(
    framework: &Framework,
    control: &Control,
    matched: &[&ApplicabilityRule],
) -> ControlApplicability {
    let mut verdict = Verdict::default();
    for rule in matched {
        let touches = match &rule.target {
            RuleTarget::Framework(id) => id == &framework.id,
            RuleTarget::Control(id) => id == &control.id,
        };
        if touches {
            verdict.record(rule);
        }
    }

    ControlApplicability {
        control_id: control.id.clone(),
        framework_id: framework.id.clone(),
        applicable: verdict.resolve(control.mandatory || framework.mandatory),
        reasons: verdict.reasons,
        is_mandatory: control.mandatory,
    }
}
