//! Governance, risk and compliance pipeline: reference catalog, applicability, evidence
//! scoring, assessment templates, reporting and the assessment lifecycle.

pub mod applicability;
pub mod assessments;
pub mod catalog;
pub mod domain;
pub mod evaluation;
pub mod report;
pub mod template;

pub use applicability::{
    compute_applicability, ApplicabilityEngine, ApplicabilityIssue, ApplicableFrameworksMatrix,
    RuleSet,
};
pub use catalog::{CatalogError, CatalogImportError, CatalogImporter, ReferenceCatalog};
pub use report::{build_report, AssessmentReport};
pub use template::{AssessmentTemplate, TemplateGenerator};
