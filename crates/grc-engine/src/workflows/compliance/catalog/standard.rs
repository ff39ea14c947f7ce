use std::collections::BTreeSet;

use super::super::domain::{
    Control, ControlId, EvidencePolicy, EvidenceType, Framework, FrameworkId, RiskLevel,
};
use EvidenceType::{
    AuditLog, Certificate, Configuration, Contract, Policy, Procedure, Report, Screenshot,
    TestResult, TrainingRecord,
};

const AUDITORS: &[&str] = &["External Auditor", "Certification Body"];
const QSA: &[&str] = &["Qualified Security Assessor", "External Auditor"];

pub(super) fn standard_reference_data() -> (Vec<Framework>, Vec<Control>) {
    let frameworks = vec![
        framework("ISO27001", "ISO/IEC 27001:2022", "Global", false),
        framework("SOC2", "SOC 2 Type II", "United States", false),
        framework("GDPR", "General Data Protection Regulation", "European Union", true),
        framework("HIPAA", "HIPAA Security Rule", "United States", true),
        framework("PCIDSS", "PCI DSS 4.0", "Global", true),
        framework("NISTCSF", "NIST Cybersecurity Framework 2.0", "United States", false),
    ];

    let controls = vec![
        control("ISO-A.5.1", "ISO27001", "Policies for information security", "Governance", RiskLevel::High, true, &[Policy], 1, AUDITORS),
        control("ISO-A.5.15", "ISO27001", "Access control", "Access Control", RiskLevel::High, true, &[Policy, Configuration], 2, AUDITORS),
        control("ISO-A.5.24", "ISO27001", "Incident management planning and preparation", "Incident Response", RiskLevel::High, false, &[Procedure, Report], 2, AUDITORS),
        control("ISO-A.8.15", "ISO27001", "Logging", "Logging & Monitoring", RiskLevel::Medium, false, &[AuditLog, Configuration], 2, AUDITORS),
        control("ISO-A.8.28", "ISO27001", "Secure coding", "Secure Development", RiskLevel::Medium, false, &[Procedure, TestResult], 2, AUDITORS),
        control("SOC2-CC6.1", "SOC2", "Logical access security", "Access Control", RiskLevel::High, true, &[Configuration, Screenshot], 2, AUDITORS),
        control("SOC2-CC7.2", "SOC2", "System monitoring for anomalies", "Logging & Monitoring", RiskLevel::Medium, false, &[AuditLog], 1, AUDITORS),
        control("SOC2-CC9.2", "SOC2", "Vendor and business partner risk", "Third Party", RiskLevel::Medium, false, &[Contract, Report], 2, AUDITORS),
        control("GDPR-ART30", "GDPR", "Records of processing activities", "Privacy", RiskLevel::High, true, &[Report], 1, &["Data Protection Authority"]),
        control("GDPR-ART32", "GDPR", "Security of processing", "Data Protection", RiskLevel::Critical, true, &[Policy, Configuration, TestResult], 3, AUDITORS),
        control("GDPR-ART33", "GDPR", "Breach notification within 72 hours", "Incident Response", RiskLevel::Critical, true, &[Procedure], 1, &[]),
        control("GDPR-ART37", "GDPR", "Designation of a data protection officer", "Governance", RiskLevel::Medium, false, &[Contract, Policy], 1, &[]),
        control("HIPAA-164.308", "HIPAA", "Administrative safeguards", "Governance", RiskLevel::High, true, &[Policy, TrainingRecord], 2, AUDITORS),
        control("HIPAA-164.312", "HIPAA", "Technical safeguards", "Access Control", RiskLevel::Critical, true, &[Configuration, AuditLog], 2, AUDITORS),
        control("HIPAA-164.316", "HIPAA", "Policies and documentation retention", "Governance", RiskLevel::Medium, false, &[Procedure], 1, &[]),
        control("PCI-3.4", "PCIDSS", "Stored account data rendered unreadable", "Cryptography", RiskLevel::Critical, true, &[Configuration, Certificate], 2, QSA),
        control("PCI-8.4", "PCIDSS", "Multi-factor authentication", "Access Control", RiskLevel::Critical, true, &[Configuration, Screenshot], 2, QSA),
        control("PCI-11.3", "PCIDSS", "Vulnerability scans and penetration testing", "Security Testing", RiskLevel::High, true, &[Report, TestResult], 2, QSA),
        control("PCI-12.8", "PCIDSS", "Third-party service provider risk", "Third Party", RiskLevel::High, false, &[Contract], 1, QSA),
        control("NIST-DE.CM", "NISTCSF", "Continuous monitoring", "Logging & Monitoring", RiskLevel::High, false, &[AuditLog], 1, &[]),
        control("NIST-ID.AM", "NISTCSF", "Asset management", "Asset Management", RiskLevel::Medium, false, &[Report], 1, &[]),
        control("NIST-PR.AA", "NISTCSF", "Identity management and access control", "Access Control", RiskLevel::High, false, &[Policy, Configuration], 2, &[]),
        control("NIST-RC.RP", "NISTCSF", "Incident recovery plan execution", "Business Continuity", RiskLevel::Medium, false, &[Procedure, TestResult], 2, &[]),
    ];

    (frameworks, controls)
}

fn framework(id: &str, name: &str, jurisdiction: &str, mandatory: bool) -> Framework {
    Framework {
        id: FrameworkId(id.to_string()),
        name: name.to_string(),
        jurisdiction: jurisdiction.to_string(),
        mandatory,
        total_control_count: 0,
    }
}

#[allow(clippy::too_many_arguments)]
fn control(
    id: &str,
    framework_id: &str,
    title: &str,
    category: &str,
    risk_level: RiskLevel,
    mandatory: bool,
    required_types: &[EvidenceType],
    minimum_count: u32,
    trusted_sources: &[&str],
) -> Control {
    Control {
        id: ControlId(id.to_string()),
        framework_id: FrameworkId(framework_id.to_string()),
        title: title.to_string(),
        category: category.to_string(),
        risk_level,
        mandatory,
        evidence_policy: EvidencePolicy {
            required_types: required_types.iter().copied().collect(),
            minimum_count,
            trusted_sources: trusted_sources
                .iter()
                .map(|source| source.to_string())
                .collect::<BTreeSet<_>>(),
        },
    }
}
