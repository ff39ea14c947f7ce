//! Applicability, evidence scoring, and gap reporting for multi-tenant GRC assessments.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
