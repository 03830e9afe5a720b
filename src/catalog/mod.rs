//! Catalog: the label registry and the disease knowledge base, validated
//! together.
//!
//! A `Catalog` can only be constructed when every registry label has exactly
//! one record and no record names an unknown label. Lookups after
//! construction are therefore total over the registry.

pub mod knowledge;
pub mod labels;

use std::fs;
use std::path::Path;

use tracing::{info, warn};

pub use knowledge::{DiseaseRecord, Severity, EMBEDDED_KNOWLEDGE};
pub use labels::{LabelId, LabelRegistry, PLANTVILLAGE_LABELS};

use crate::utils::error::{DiagnosisError, Result};

/// Registry plus index-aligned knowledge records
#[derive(Debug, Clone)]
pub struct Catalog {
    registry: LabelRegistry,
    /// `records[i]` explains `registry.get(i)`
    records: Vec<DiseaseRecord>,
}

impl Catalog {
    /// Join a registry with knowledge records, failing on any drift
    pub fn new(registry: LabelRegistry, records: Vec<DiseaseRecord>) -> Result<Self> {
        let mut slots: Vec<Option<DiseaseRecord>> = vec![None; registry.len()];

        for record in records {
            let index = registry.position(record.label.as_str()).ok_or_else(|| {
                DiagnosisError::Config(format!(
                    "Knowledge base record '{}' does not match any registry label",
                    record.label
                ))
            })?;

            if record.is_healthy != record.label.is_healthy_name() {
                warn!(
                    "Record '{}' has is_healthy={} which disagrees with its label",
                    record.label, record.is_healthy
                );
            }

            if slots[index].is_some() {
                return Err(DiagnosisError::Config(format!(
                    "Duplicate knowledge base record for '{}'",
                    record.label
                )));
            }
            slots[index] = Some(record);
        }

        let records = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| DiagnosisError::KnowledgeBaseGap {
                    label: registry
                        .get(index)
                        .map(|l| l.to_string())
                        .unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { registry, records })
    }

    /// Parse records from JSON and join them with `registry`
    pub fn from_json_str(registry: LabelRegistry, json: &str) -> Result<Self> {
        let records: Vec<DiseaseRecord> = serde_json::from_str(json)?;
        Self::new(registry, records)
    }

    /// Load records from a JSON file
    pub fn from_path(registry: LabelRegistry, path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(registry, &json)?;
        info!(
            "Loaded knowledge base from {} ({} records)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// PlantVillage registry with the embedded knowledge base
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(LabelRegistry::plantvillage(), EMBEDDED_KNOWLEDGE)
    }

    /// PlantVillage registry with an optional knowledge base override
    pub fn load(knowledge_path: Option<&Path>) -> Result<Self> {
        match knowledge_path {
            Some(path) => Self::from_path(LabelRegistry::plantvillage(), path),
            None => Self::builtin(),
        }
    }

    pub fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    /// Label and record at a model output index
    pub fn entry(&self, index: usize) -> Option<(&LabelId, &DiseaseRecord)> {
        Some((self.registry.get(index)?, self.records.get(index)?))
    }

    /// Record for a label name
    pub fn record(&self, name: &str) -> Option<&DiseaseRecord> {
        self.registry
            .position(name)
            .and_then(|idx| self.records.get(idx))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LabelId, &DiseaseRecord)> {
        self.registry.iter().zip(self.records.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(label: &str, healthy: bool) -> DiseaseRecord {
        let label = LabelId::new(label);
        DiseaseRecord {
            crop: label.crop_part().to_string(),
            label,
            disease_name: if healthy { "Healthy" } else { "Blight" }.to_string(),
            severity: if healthy { Severity::None } else { Severity::High },
            description: String::new(),
            symptoms: vec![],
            causes: vec![],
            treatment: vec![],
            prevention: vec![],
            is_healthy: healthy,
        }
    }

    #[test]
    fn test_builtin_catalog_is_total() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), catalog.registry().len());

        for (index, label) in catalog.registry().iter().enumerate() {
            let (entry_label, record) = catalog.entry(index).unwrap();
            assert_eq!(entry_label, label);
            assert_eq!(&record.label, label);
            assert_eq!(record.is_healthy, label.is_healthy_name());
        }
    }

    #[test]
    fn test_builtin_records_are_filled_in() {
        let catalog = Catalog::builtin().unwrap();
        for (label, record) in catalog.iter() {
            assert!(!record.crop.is_empty(), "{label} has no crop");
            assert!(!record.description.is_empty(), "{label} has no description");
            assert!(!record.prevention.is_empty(), "{label} has no prevention");
            if !record.is_healthy {
                assert!(!record.symptoms.is_empty(), "{label} has no symptoms");
                assert!(!record.treatment.is_empty(), "{label} has no treatment");
            }
        }
    }

    #[test]
    fn test_tomato_late_blight_record() {
        let catalog = Catalog::builtin().unwrap();
        let record = catalog.record("Tomato___Late_blight").unwrap();
        assert_eq!(record.crop, "Tomato");
        assert_eq!(record.severity, Severity::High);
        assert!(!record.is_healthy);
    }

    #[test]
    fn test_missing_record_is_gap() {
        let registry = LabelRegistry::from_names(["Tomato___Late_blight", "Tomato___healthy"]).unwrap();
        let err = Catalog::new(registry, vec![record("Tomato___healthy", true)]).unwrap_err();
        match err {
            DiagnosisError::KnowledgeBaseGap { label } => assert_eq!(label, "Tomato___Late_blight"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_record_rejected() {
        let registry = LabelRegistry::from_names(["Tomato___healthy"]).unwrap();
        let err = Catalog::new(
            registry,
            vec![record("Tomato___healthy", true), record("Rice___Blast", false)],
        )
        .unwrap_err();
        assert!(matches!(err, DiagnosisError::Config(_)));
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let registry = LabelRegistry::from_names(["Tomato___healthy"]).unwrap();
        let err = Catalog::new(
            registry,
            vec![record("Tomato___healthy", true), record("Tomato___healthy", true)],
        )
        .unwrap_err();
        assert!(matches!(err, DiagnosisError::Config(_)));
    }

    #[test]
    fn test_records_follow_registry_order() {
        let registry = LabelRegistry::from_names(["Potato___Late_blight", "Potato___healthy"]).unwrap();
        let catalog = Catalog::new(
            registry,
            vec![record("Potato___healthy", true), record("Potato___Late_blight", false)],
        )
        .unwrap();
        assert_eq!(catalog.entry(0).unwrap().1.label.as_str(), "Potato___Late_blight");
        assert!(catalog.entry(1).unwrap().1.is_healthy);
        assert!(catalog.entry(2).is_none());
    }

    #[test]
    fn test_from_path_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kb.json");
        let records = vec![record("Corn___healthy", true)];
        fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let registry = LabelRegistry::from_names(["Corn___healthy"]).unwrap();
        let catalog = Catalog::from_path(registry, &path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.record("Corn___healthy").unwrap().is_healthy);
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = Catalog::from_json_str(LabelRegistry::plantvillage(), "{ not json").unwrap_err();
        assert!(matches!(err, DiagnosisError::Serialization(_)));
    }
}
