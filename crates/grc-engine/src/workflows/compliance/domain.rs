use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for reference frameworks (e.g. `ISO27001`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameworkId(pub String);

/// Identifier wrapper for controls; unique across the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ControlId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub String);

macro_rules! display_id {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

display_id!(FrameworkId, ControlId, OrganizationId, EvidenceId);

/// Industry classification used by sector predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Banking,
    Insurance,
    CapitalMarkets,
    Healthcare,
    Government,
    Telecommunications,
    Energy,
    Retail,
    Technology,
    Education,
    Manufacturing,
    Other,
}

/// Annual revenue bands, ordered smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueBand {
    Micro,
    Small,
    Medium,
    Large,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalType {
    PublicListedCompany,
    PrivateCompany,
    GovernmentEntity,
    NonProfit,
    Partnership,
    SoleProprietorship,
}

/// Categories of regulated data an organization may process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    PersonalData,
    HealthRecords,
    PaymentCardData,
    FinancialRecords,
    ChildrenData,
    ClassifiedGovernment,
    CriticalInfrastructure,
}

/// Attribute bag describing an organization for applicability purposes.
///
/// Scalar attributes are optional so an incomplete onboarding form can still be stored;
/// rules that depend on a missing attribute are skipped rather than failing the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub sector: Option<Sector>,
    pub sub_sector: Option<String>,
    pub employee_count: Option<u32>,
    pub revenue_band: Option<RevenueBand>,
    pub legal_type: Option<LegalType>,
    #[serde(default)]
    pub data_sensitivity: BTreeSet<DataCategory>,
    #[serde(default)]
    pub geographic_operations: BTreeSet<String>,
    #[serde(default)]
    pub technology_stack: BTreeSet<String>,
}

/// Profile attributes that a predicate may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileAttribute {
    Sector,
    SubSector,
    EmployeeCount,
    RevenueBand,
    LegalType,
}

impl ProfileAttribute {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sector => "sector",
            Self::SubSector => "sub-sector",
            Self::EmployeeCount => "employee count",
            Self::RevenueBand => "revenue band",
            Self::LegalType => "legal type",
        }
    }
}

/// Named body of regulatory requirements shared by every tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub id: FrameworkId,
    pub name: String,
    pub jurisdiction: String,
    pub mandatory: bool,
    pub total_control_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Single compliance requirement belonging to exactly one framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    pub framework_id: FrameworkId,
    pub title: String,
    pub category: String,
    pub risk_level: RiskLevel,
    pub mandatory: bool,
    pub evidence_policy: EvidencePolicy,
}

/// Artifact kinds accepted as evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Policy,
    Procedure,
    Configuration,
    AuditLog,
    Screenshot,
    Report,
    Certificate,
    Contract,
    TrainingRecord,
    TestResult,
}

impl EvidenceType {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Policy,
            Self::Procedure,
            Self::Configuration,
            Self::AuditLog,
            Self::Screenshot,
            Self::Report,
            Self::Certificate,
            Self::Contract,
            Self::TrainingRecord,
            Self::TestResult,
        ]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Procedure => "procedure",
            Self::Configuration => "configuration",
            Self::AuditLog => "audit_log",
            Self::Screenshot => "screenshot",
            Self::Report => "report",
            Self::Certificate => "certificate",
            Self::Contract => "contract",
            Self::TrainingRecord => "training_record",
            Self::TestResult => "test_result",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Policy => "Policy",
            Self::Procedure => "Procedure",
            Self::Configuration => "Configuration",
            Self::AuditLog => "Audit Log",
            Self::Screenshot => "Screenshot",
            Self::Report => "Report",
            Self::Certificate => "Certificate",
            Self::Contract => "Contract",
            Self::TrainingRecord => "Training Record",
            Self::TestResult => "Test Result",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ordered()
            .into_iter()
            .find(|kind| kind.slug() == normalized)
    }
}

/// Evidence requirements attached to a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePolicy {
    pub required_types: BTreeSet<EvidenceType>,
    pub minimum_count: u32,
    #[serde(default)]
    pub trusted_sources: BTreeSet<String>,
}

impl EvidencePolicy {
    pub fn is_trusted_source(&self, source: &str) -> bool {
        self.trusted_sources
            .iter()
            .any(|trusted| trusted.eq_ignore_ascii_case(source.trim()))
    }
}

/// Artifact submitted against an assessment control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub evidence_type: EvidenceType,
    pub source: String,
    pub trusted: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Implementation maturity on the 0..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MaturityLevel {
    NotImplemented = 0,
    Initial = 1,
    Developing = 2,
    Defined = 3,
    Managed = 4,
    Optimized = 5,
}

/// Score percentage for each maturity level, indexed by level.
const MATURITY_PERCENTAGES: [u8; 6] = [0, 20, 40, 60, 80, 100];

impl MaturityLevel {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::NotImplemented,
            Self::Initial,
            Self::Developing,
            Self::Defined,
            Self::Managed,
            Self::Optimized,
        ]
    }

    pub const fn value(self) -> u8 {
        self as u8
    }

    pub const fn percentage(self) -> u8 {
        MATURITY_PERCENTAGES[self as usize]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotImplemented => "Not Implemented",
            Self::Initial => "Initial",
            Self::Developing => "Developing",
            Self::Defined => "Defined",
            Self::Managed => "Managed",
            Self::Optimized => "Optimized",
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ordered().get(value as usize).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("maturity level must be between 0 and 5 (found {0})")]
pub struct InvalidMaturityLevel(pub u8);

impl TryFrom<u8> for MaturityLevel {
    type Error = InvalidMaturityLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(InvalidMaturityLevel(value))
    }
}

impl From<MaturityLevel> for u8 {
    fn from(level: MaturityLevel) -> Self {
        level.value()
    }
}
