//! Response Composer
//!
//! Joins a ranking with the catalog into the result shown to the farmer.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, DiseaseRecord, LabelId, Severity};
use crate::utils::error::{DiagnosisError, Result};

use super::ranking::{confidence_pct, format_pct, Ranking};

/// One ranked alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    pub class: LabelId,
    /// Percentage with two decimals, e.g. `"87.12%"`
    pub confidence: String,
    #[serde(skip)]
    pub probability: f64,
}

/// Full diagnosis for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: LabelId,
    /// Top-1 probability as a percentage in `[0, 100]`
    pub confidence: f64,
    pub disease_name: String,
    pub crop: String,
    pub severity: Severity,
    pub description: String,
    pub symptoms: Vec<String>,
    pub causes: Vec<String>,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
    pub is_healthy: bool,
    pub top_predictions: Vec<TopPrediction>,
}

impl ClassificationResult {
    /// Pretty JSON for external display
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn resolve(catalog: &Catalog, index: usize) -> Result<(&LabelId, &DiseaseRecord)> {
    catalog.entry(index).ok_or_else(|| {
        DiagnosisError::Inference(format!(
            "Class index {} is outside the {}-label registry",
            index,
            catalog.len()
        ))
    })
}

/// Merge a ranking with the winning label's knowledge record
pub fn compose(catalog: &Catalog, ranking: &Ranking) -> Result<ClassificationResult> {
    let top = ranking
        .top()
        .ok_or_else(|| DiagnosisError::Inference("Ranking is empty".to_string()))?;
    let (label, record) = resolve(catalog, top.index)?;

    let top_predictions = ranking
        .ranked()
        .iter()
        .map(|r| {
            let (class, _) = resolve(catalog, r.index)?;
            Ok(TopPrediction {
                class: class.clone(),
                confidence: format_pct(r.probability),
                probability: r.probability,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ClassificationResult {
        prediction: label.clone(),
        confidence: confidence_pct(top.probability),
        disease_name: record.disease_name.clone(),
        crop: record.crop.clone(),
        severity: record.severity,
        description: record.description.clone(),
        symptoms: record.symptoms.clone(),
        causes: record.causes.clone(),
        treatment: record.treatment.clone(),
        prevention: record.prevention.clone(),
        is_healthy: record.is_healthy,
        top_predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ranking::{rank, TOP_K};

    fn late_blight_ranking(catalog: &Catalog) -> Ranking {
        let index = catalog.registry().position("Tomato___Late_blight").unwrap();
        let mut logits = vec![0.0f32; catalog.len()];
        logits[index] = 10.0;
        rank(&logits, TOP_K).unwrap()
    }

    #[test]
    fn test_compose_tomato_late_blight() {
        let catalog = Catalog::builtin().unwrap();
        let result = compose(&catalog, &late_blight_ranking(&catalog)).unwrap();

        assert_eq!(result.prediction.as_str(), "Tomato___Late_blight");
        assert_eq!(result.crop, "Tomato");
        assert!(!result.is_healthy);
        assert!(result.confidence > 99.0 && result.confidence <= 100.0);
        assert_eq!(result.severity, Severity::High);
        assert!(!result.treatment.is_empty());
    }

    #[test]
    fn test_top_predictions_ordered() {
        let catalog = Catalog::builtin().unwrap();
        let logits: Vec<f32> = (0..catalog.len()).map(|i| (i % 7) as f32 * 0.5).collect();
        let result = compose(&catalog, &rank(&logits, TOP_K).unwrap()).unwrap();

        assert_eq!(result.top_predictions.len(), 3);
        assert_eq!(result.top_predictions[0].class, result.prediction);
        for pair in result.top_predictions.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
        assert!((0.0..=100.0).contains(&result.confidence));
    }

    #[test]
    fn test_json_shape() {
        let catalog = Catalog::builtin().unwrap();
        let result = compose(&catalog, &late_blight_ranking(&catalog)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert_eq!(value["prediction"], "Tomato___Late_blight");
        assert_eq!(value["severity"], "high");
        assert_eq!(value["is_healthy"], false);
        let top = value["top_predictions"].as_array().unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0]["class"], "Tomato___Late_blight");
        assert!(top[0]["confidence"].as_str().unwrap().ends_with('%'));
        assert!(top[0].get("probability").is_none());
    }

    #[test]
    fn test_index_outside_registry_is_inference_error() {
        // a model with more outputs than the registry has labels
        let registry = crate::catalog::LabelRegistry::from_names(["Tomato___healthy"]).unwrap();
        let catalog = Catalog::from_json_str(
            registry,
            r#"[{
                "label": "Tomato___healthy",
                "crop": "Tomato",
                "disease_name": "Healthy",
                "severity": "none",
                "description": "No disease detected.",
                "is_healthy": true
            }]"#,
        )
        .unwrap();
        let ranking = rank(&[0.0, 0.0, 5.0], TOP_K).unwrap();

        let err = compose(&catalog, &ranking).unwrap_err();
        assert!(matches!(err, DiagnosisError::Inference(_)));
    }
}
