use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::super::domain::{
    Control, ControlId, EvidencePolicy, EvidenceType, Framework, FrameworkId, RiskLevel,
};
use super::{CatalogError, ReferenceCatalog};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    UnknownEvidenceType { control_id: ControlId, value: String },
    FrameworkConflict { framework_id: FrameworkId },
    Catalog(CatalogError),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog export: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::UnknownEvidenceType { control_id, value } => write!(
                f,
                "control {} lists unknown evidence type '{}'",
                control_id, value
            ),
            CatalogImportError::FrameworkConflict { framework_id } => write!(
                f,
                "framework {} is described inconsistently across rows",
                framework_id
            ),
            CatalogImportError::Catalog(err) => write!(f, "catalog rejected: {}", err),
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::Catalog(err) => Some(err),
            CatalogImportError::UnknownEvidenceType { .. }
            | CatalogImportError::FrameworkConflict { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<CatalogError> for CatalogImportError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

/// Loads reference frameworks and controls from a flat CSV export, one row per control.
///
/// Expected headers: `framework_id, framework_name, jurisdiction, framework_mandatory,
/// control_id, title, category, risk_level, control_mandatory, required_evidence,
/// minimum_evidence, trusted_sources`. List columns are `;` separated.
pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ReferenceCatalog, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ReferenceCatalog, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut frameworks: Vec<Framework> = Vec::new();
        let mut controls = Vec::new();

        for row in csv_reader.deserialize::<CatalogRow>() {
            let row = row?;
            let framework = row.framework();

            match frameworks.iter().find(|known| known.id == framework.id) {
                Some(known) if !same_framework(known, &framework) => {
                    return Err(CatalogImportError::FrameworkConflict {
                        framework_id: framework.id,
                    });
                }
                Some(_) => {}
                None => frameworks.push(framework),
            }

            controls.push(row.into_control()?);
        }

        Ok(ReferenceCatalog::from_parts(frameworks, controls)?)
    }
}

fn same_framework(left: &Framework, right: &Framework) -> bool {
    left.name == right.name
        && left.jurisdiction == right.jurisdiction
        && left.mandatory == right.mandatory
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    framework_id: String,
    framework_name: String,
    jurisdiction: String,
    #[serde(deserialize_with = "loose_bool")]
    framework_mandatory: bool,
    control_id: String,
    title: String,
    category: String,
    risk_level: RiskLevel,
    #[serde(deserialize_with = "loose_bool")]
    control_mandatory: bool,
    #[serde(default)]
    required_evidence: String,
    minimum_evidence: u32,
    #[serde(default)]
    trusted_sources: String,
}

impl CatalogRow {
    fn framework(&self) -> Framework {
        Framework {
            id: FrameworkId(self.framework_id.clone()),
            name: self.framework_name.clone(),
            jurisdiction: self.jurisdiction.clone(),
            mandatory: self.framework_mandatory,
            total_control_count: 0,
        }
    }

    fn into_control(self) -> Result<Control, CatalogImportError> {
        let control_id = ControlId(self.control_id);

        let mut required_types = BTreeSet::new();
        for value in split_list(&self.required_evidence) {
            let kind = EvidenceType::from_slug(value).ok_or_else(|| {
                CatalogImportError::UnknownEvidenceType {
                    control_id: control_id.clone(),
                    value: value.to_string(),
                }
            })?;
            required_types.insert(kind);
        }

        let trusted_sources = split_list(&self.trusted_sources)
            .map(str::to_string)
            .collect();

        Ok(Control {
            id: control_id,
            framework_id: FrameworkId(self.framework_id),
            title: self.title,
            category: self.category,
            risk_level: self.risk_level,
            mandatory: self.control_mandatory,
            evidence_policy: EvidencePolicy {
                required_types,
                minimum_count: self.minimum_evidence,
                trusted_sources,
            },
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';')
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, found '{other}'"
        ))),
    }
}
