//! Label Registry
//!
//! The ordered list of class identifiers the model emits. Position in the
//! registry is the index into the model's output vector.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::error::{DiagnosisError, Result};

/// Separator between crop and condition in PlantVillage label names
pub const CROP_SEPARATOR: &str = "___";

/// PlantVillage class names in training order (case-sensitive sort of the
/// dataset folders). Changing the order breaks every existing checkpoint.
pub const PLANTVILLAGE_LABELS: [&str; 38] = [
    "Apple___Apple_scab",                                 // 0
    "Apple___Black_rot",                                  // 1
    "Apple___Cedar_apple_rust",                           // 2
    "Apple___healthy",                                    // 3
    "Blueberry___healthy",                                // 4
    "Cherry_(including_sour)___Powdery_mildew",           // 5
    "Cherry_(including_sour)___healthy",                  // 6
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot", // 7
    "Corn_(maize)___Common_rust_",                        // 8
    "Corn_(maize)___Northern_Leaf_Blight",                // 9
    "Corn_(maize)___healthy",                             // 10
    "Grape___Black_rot",                                  // 11
    "Grape___Esca_(Black_Measles)",                       // 12
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",         // 13
    "Grape___healthy",                                    // 14
    "Orange___Haunglongbing_(Citrus_greening)",           // 15
    "Peach___Bacterial_spot",                             // 16
    "Peach___healthy",                                    // 17
    "Pepper,_bell___Bacterial_spot",                      // 18
    "Pepper,_bell___healthy",                             // 19
    "Potato___Early_blight",                              // 20
    "Potato___Late_blight",                               // 21
    "Potato___healthy",                                   // 22
    "Raspberry___healthy",                                // 23
    "Soybean___healthy",                                  // 24
    "Squash___Powdery_mildew",                            // 25
    "Strawberry___Leaf_scorch",                           // 26
    "Strawberry___healthy",                               // 27
    "Tomato___Bacterial_spot",                            // 28
    "Tomato___Early_blight",                              // 29
    "Tomato___Late_blight",                               // 30
    "Tomato___Leaf_Mold",                                 // 31
    "Tomato___Septoria_leaf_spot",                        // 32
    "Tomato___Spider_mites Two-spotted_spider_mite",      // 33
    "Tomato___Target_Spot",                               // 34
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",             // 35
    "Tomato___Tomato_mosaic_virus",                       // 36
    "Tomato___healthy",                                   // 37
];

/// Identifier of one (crop, condition) classification outcome
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(String);

impl LabelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Crop part of the label, e.g. "Tomato" from "Tomato___Late_blight"
    pub fn crop_part(&self) -> &str {
        self.0.split(CROP_SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Whether the label names the healthy condition of its crop
    pub fn is_healthy_name(&self) -> bool {
        self.0.ends_with("healthy")
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LabelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered, duplicate-free set of labels
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    labels: Vec<LabelId>,
    positions: HashMap<LabelId, usize>,
}

impl LabelRegistry {
    /// Build a registry from names in model output order
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels = Vec::new();
        let mut positions = HashMap::new();

        for name in names {
            let label = LabelId::new(name);
            if label.as_str().trim().is_empty() {
                return Err(DiagnosisError::Config(format!(
                    "Empty label name at index {}",
                    labels.len()
                )));
            }
            if positions.insert(label.clone(), labels.len()).is_some() {
                return Err(DiagnosisError::Config(format!(
                    "Duplicate label '{}' in registry",
                    label
                )));
            }
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(DiagnosisError::Config(
                "Label registry must contain at least one label".to_string(),
            ));
        }

        Ok(Self { labels, positions })
    }

    /// The 38-class PlantVillage registry
    pub fn plantvillage() -> Self {
        let labels: Vec<LabelId> = PLANTVILLAGE_LABELS.iter().map(|&n| LabelId::new(n)).collect();
        let positions = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), idx))
            .collect();
        Self { labels, positions }
    }

    /// Label at a model output index
    pub fn get(&self, index: usize) -> Option<&LabelId> {
        self.labels.get(index)
    }

    /// Model output index of a label name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&LabelId::new(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelId> {
        self.labels.iter()
    }
}
