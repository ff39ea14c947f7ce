use serde::{Deserialize, Serialize};

use super::super::domain::{
    DataCategory, LegalType, OrganizationProfile, ProfileAttribute, RevenueBand, Sector,
};

/// Profile attribute a predicate needed but the profile did not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("profile is missing its {}", .0.label())]
pub struct MissingAttribute(pub ProfileAttribute);

/// Condition over an organization profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RulePredicate {
    Always,
    SectorMatch {
        sectors: Vec<Sector>,
    },
    SubSectorMatch {
        sub_sectors: Vec<String>,
    },
    /// Inclusive employee-count band; an absent bound is open.
    SizeThreshold {
        #[serde(default)]
        min_employees: Option<u32>,
        #[serde(default)]
        max_employees: Option<u32>,
    },
    RevenueAtLeast {
        band: RevenueBand,
    },
    LegalTypeMatch {
        legal_types: Vec<LegalType>,
    },
    HandlesData {
        category: DataCategory,
    },
    OperatesIn {
        regions: Vec<String>,
    },
    UsesTechnology {
        tags: Vec<String>,
    },
    All {
        predicates: Vec<RulePredicate>,
    },
    Any {
        predicates: Vec<RulePredicate>,
    },
    Not {
        predicate: Box<RulePredicate>,
    },
}

impl RulePredicate {
    /// Three-valued evaluation: a decided `false` inside `All` (or `true` inside `Any`)
    /// wins over a missing attribute elsewhere in the composite.
    pub fn evaluate(&self, profile: &OrganizationProfile) -> Result<bool, MissingAttribute> {
        match self {
            RulePredicate::Always => Ok(true),
            RulePredicate::SectorMatch { sectors } => {
                let sector = require(profile.sector, ProfileAttribute::Sector)?;
                Ok(sectors.contains(&sector))
            }
            RulePredicate::SubSectorMatch { sub_sectors } => {
                let sub_sector =
                    require(profile.sub_sector.as_deref(), ProfileAttribute::SubSector)?;
                Ok(contains_ignore_case(sub_sectors, sub_sector))
            }
            RulePredicate::SizeThreshold {
                min_employees,
                max_employees,
            } => {
                let employees = require(profile.employee_count, ProfileAttribute::EmployeeCount)?;
                let above = min_employees.map_or(true, |min| employees >= min);
                let below = max_employees.map_or(true, |max| employees <= max);
                Ok(above && below)
            }
            RulePredicate::RevenueAtLeast { band } => {
                let revenue = require(profile.revenue_band, ProfileAttribute::RevenueBand)?;
                Ok(revenue >= *band)
            }
            RulePredicate::LegalTypeMatch { legal_types } => {
                let legal_type = require(profile.legal_type, ProfileAttribute::LegalType)?;
                Ok(legal_types.contains(&legal_type))
            }
            RulePredicate::HandlesData { category } => {
                Ok(profile.data_sensitivity.contains(category))
            }
            RulePredicate::OperatesIn { regions } => Ok(profile
                .geographic_operations
                .iter()
                .any(|region| contains_ignore_case(regions, region))),
            RulePredicate::UsesTechnology { tags } => Ok(profile
                .technology_stack
                .iter()
                .any(|tag| contains_ignore_case(tags, tag))),
            RulePredicate::All { predicates } => {
                let mut missing = None;
                for predicate in predicates {
                    match predicate.evaluate(profile) {
                        Ok(false) => return Ok(false),
                        Ok(true) => {}
                        Err(err) => {
                            missing.get_or_insert(err);
                        }
                    }
                }
                missing.map_or(Ok(true), Err)
            }
            RulePredicate::Any { predicates } => {
                let mut missing = None;
                for predicate in predicates {
                    match predicate.evaluate(profile) {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(err) => {
                            missing.get_or_insert(err);
                        }
                    }
                }
                missing.map_or(Ok(false), Err)
            }
            RulePredicate::Not { predicate } => predicate.evaluate(profile).map(|value| !value),
        }
    }
}

fn require<T>(value: Option<T>, attribute: ProfileAttribute) -> Result<T, MissingAttribute> {
    value.ok_or(MissingAttribute(attribute))
}

fn contains_ignore_case(haystack: &[String], needle: &str) -> bool {
    let needle = needle.trim();
    haystack
        .iter()
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(needle))
}
