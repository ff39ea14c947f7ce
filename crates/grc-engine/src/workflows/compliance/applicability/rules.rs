use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::super::domain::{ControlId, DataCategory, FrameworkId, RevenueBand, Sector};
use super::predicate::RulePredicate;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog entry a rule speaks about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    Framework(FrameworkId),
    Control(ControlId),
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Framework(id) => write!(f, "framework {id}"),
            RuleTarget::Control(id) => write!(f, "control {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Applicable,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicabilityRule {
    pub id: RuleId,
    pub predicate: RulePredicate,
    pub target: RuleTarget,
    pub outcome: RuleOutcome,
    pub reason: String,
}

impl ApplicabilityRule {
    /// Reason line recorded against every control the rule touches.
    pub fn reason_line(&self) -> String {
        format!("{}: {}", self.id, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("failed to read rule set: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rule set JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule {0} is defined more than once")]
    DuplicateRule(RuleId),
}

/// Ordered applicability rules; evaluation order is declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<ApplicabilityRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ApplicabilityRule>) -> Result<Self, RuleSetError> {
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(&rule.id) {
                return Err(RuleSetError::DuplicateRule(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Rules matching the built-in catalog. An empty profile matches none of them.
    pub fn standard() -> Self {
        Self {
            rules: standard_rules(),
        }
    }

    /// Parse a JSON array of rules.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, RuleSetError> {
        let rules: Vec<ApplicabilityRule> = serde_json::from_reader(reader)?;
        Self::new(rules)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RuleSetError> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    pub fn rules(&self) -> &[ApplicabilityRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn standard_rules() -> Vec<ApplicabilityRule> {
    use RulePredicate::{All, Any, HandlesData, Not, OperatesIn, SectorMatch, UsesTechnology};

    vec![
        rule(
            "ISO-SCALE",
            Any {
                predicates: vec![
                    RulePredicate::SizeThreshold {
                        min_employees: Some(50),
                        max_employees: None,
                    },
                    UsesTechnology {
                        tags: tags(&["cloud", "saas"]),
                    },
                ],
            },
            framework("ISO27001"),
            RuleOutcome::Applicable,
            "organizations at scale or running cloud services need a certified ISMS",
        ),
        rule(
            "SOC2-SERVICE-PROVIDER",
            All {
                predicates: vec![
                    SectorMatch {
                        sectors: vec![Sector::Technology],
                    },
                    UsesTechnology {
                        tags: tags(&["saas", "cloud"]),
                    },
                ],
            },
            framework("SOC2"),
            RuleOutcome::Applicable,
            "technology service providers are asked for SOC 2 attestation",
        ),
        rule(
            "GDPR-EU-PERSONAL-DATA",
            All {
                predicates: vec![
                    OperatesIn {
                        regions: tags(&["EU", "EEA", "DE", "FR", "NL", "IE", "ES", "IT"]),
                    },
                    HandlesData {
                        category: DataCategory::PersonalData,
                    },
                ],
            },
            framework("GDPR"),
            RuleOutcome::Applicable,
            "processes personal data of people in the European Union",
        ),
        rule(
            "HIPAA-US-HEALTH",
            All {
                predicates: vec![
                    Any {
                        predicates: vec![
                            SectorMatch {
                                sectors: vec![Sector::Healthcare, Sector::Insurance],
                            },
                            HandlesData {
                                category: DataCategory::HealthRecords,
                            },
                        ],
                    },
                    OperatesIn {
                        regions: tags(&["US"]),
                    },
                ],
            },
            framework("HIPAA"),
            RuleOutcome::Applicable,
            "handles protected health information in the United States",
        ),
        rule(
            "PCI-CARDHOLDER-DATA",
            HandlesData {
                category: DataCategory::PaymentCardData,
            },
            framework("PCIDSS"),
            RuleOutcome::Applicable,
            "stores, processes or transmits cardholder data",
        ),
        rule(
            "PCI-SMALL-MERCHANT",
            Not {
                predicate: Box::new(RulePredicate::RevenueAtLeast {
                    band: RevenueBand::Small,
                }),
            },
            control("PCI-11.3"),
            RuleOutcome::NotApplicable,
            "micro merchants may self-assess penetration testing",
        ),
        rule(
            "ISO-NO-DEVELOPMENT",
            Not {
                predicate: Box::new(UsesTechnology {
                    tags: tags(&["in_house_development"]),
                }),
            },
            control("ISO-A.8.28"),
            RuleOutcome::NotApplicable,
            "no software is developed in house",
        ),
        rule(
            "NIST-CRITICAL-SECTOR",
            Any {
                predicates: vec![
                    SectorMatch {
                        sectors: vec![
                            Sector::Banking,
                            Sector::Energy,
                            Sector::Government,
                            Sector::Healthcare,
                            Sector::Telecommunications,
                        ],
                    },
                    HandlesData {
                        category: DataCategory::CriticalInfrastructure,
                    },
                ],
            },
            framework("NISTCSF"),
            RuleOutcome::Applicable,
            "operates in a critical infrastructure sector",
        ),
    ]
}

fn rule(
    id: &str,
    predicate: RulePredicate,
    target: RuleTarget,
    outcome: RuleOutcome,
    reason: &str,
) -> ApplicabilityRule {
    ApplicabilityRule {
        id: RuleId(id.to_string()),
        predicate,
        target,
        outcome,
        reason: reason.to_string(),
    }
}

fn framework(id: &str) -> RuleTarget {
    RuleTarget::Framework(FrameworkId(id.to_string()))
}

fn control(id: &str) -> RuleTarget {
    RuleTarget::Control(ControlId(id.to_string()))
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::compliance::catalog::ReferenceCatalog;
    use std::io::Cursor;

    #[test]
    fn standard_rules_reference_the_standard_catalog() {
        let catalog = ReferenceCatalog::standard();
        let rules = RuleSet::standard();

        assert!(RuleSet::new(rules.rules().to_vec()).is_ok());
        for rule in rules.rules() {
            let known = match &rule.target {
                RuleTarget::Framework(id) => catalog.contains_framework(id),
                RuleTarget::Control(id) => catalog.contains_control(id),
            };
            assert!(known, "rule {} targets unknown {}", rule.id, rule.target);
        }
    }

    #[test]
    fn parses_rule_sets_from_json() {
        let json = r#"[
            {
                "id": "SAMA-BANKS",
                "predicate": {"kind": "sector_match", "sectors": ["banking"]},
                "target": {"framework": "SAMA"},
                "outcome": "applicable",
                "reason": "regulated by the central bank"
            },
            {
                "id": "SAMA-SMALL",
                "predicate": {"kind": "size_threshold", "max_employees": 20},
                "target": {"control": "SAMA-3.3.5"},
                "outcome": "not_applicable",
                "reason": "below headcount threshold"
            }
        ]"#;

        let rules = RuleSet::from_json_reader(Cursor::new(json)).expect("rule set parses");

        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules.rules()[0].target,
            RuleTarget::Framework(FrameworkId("SAMA".to_string()))
        );
        assert_eq!(rules.rules()[1].outcome, RuleOutcome::NotApplicable);
        assert_eq!(
            rules.rules()[1].reason_line(),
            "SAMA-SMALL: below headcount threshold"
        );
    }

    #[test]
    fn rejects_duplicate_rule_ids() {
        let json = r#"[
            {"id": "R1", "predicate": {"kind": "always"}, "target": {"framework": "GDPR"},
             "outcome": "applicable", "reason": "first"},
            {"id": "R1", "predicate": {"kind": "always"}, "target": {"framework": "SOC2"},
             "outcome": "applicable", "reason": "second"}
        ]"#;

        match RuleSet::from_json_reader(Cursor::new(json)) {
            Err(RuleSetError::DuplicateRule(id)) => assert_eq!(id, RuleId("R1".to_string())),
            other => panic!("expected duplicate rule error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_reported() {
        let result = RuleSet::from_json_reader(Cursor::new("[{\"id\": 3}]"));
        assert!(matches!(result, Err(RuleSetError::Json(_))));
    }
}
