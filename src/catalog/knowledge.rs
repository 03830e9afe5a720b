//! Disease knowledge base records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::labels::LabelId;

/// How urgently a condition needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Farmer-readable explanation for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    /// Registry label this record explains
    pub label: LabelId,
    pub crop: String,
    pub disease_name: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub treatment: Vec<String>,
    #[serde(default)]
    pub prevention: Vec<String>,
    pub is_healthy: bool,
}

impl DiseaseRecord {
    /// Healthy records must not carry a disease severity, and vice versa
    pub fn severity_consistent(&self) -> bool {
        self.is_healthy == (self.severity == Severity::None)
    }
}

/// Knowledge base shipped with the binary
pub const EMBEDDED_KNOWLEDGE: &str = include_str!("../../assets/disease_knowledge.json");
