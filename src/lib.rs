//! # Plant Diagnosis
//!
//! Classifies a photographed plant leaf into one of the PlantVillage
//! crop/disease categories and explains the result in farmer-readable terms.
//!
//! ## Modules
//!
//! - `catalog`: Label registry and disease knowledge base, validated together
//! - `model`: CNN architecture built with Burn
//! - `inference`: Preprocessing, forward pass, ranking and result composition
//! - `backend`: Compile-time backend selection
//! - `utils`: Configuration, logging and errors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plant_diagnosis::backend::{default_device, InferenceBackend};
//! use plant_diagnosis::{AppConfig, Catalog, InferenceEngine, Predictor};
//!
//! let config = AppConfig::default();
//! let device = default_device();
//! let engine = InferenceEngine::<InferenceBackend>::load(
//!     "models/plant_classifier.mpk".as_ref(),
//!     &config.classifier_config(),
//!     &device,
//! )?;
//! let predictor = Predictor::new(
//!     Arc::new(engine),
//!     Arc::new(Catalog::builtin()?),
//!     config.preprocess_config(),
//! )?;
//! let result = predictor.classify_detailed("leaf.jpg".as_ref())?;
//! ```

pub mod backend;
pub mod catalog;
pub mod inference;
pub mod model;
pub mod utils;

// Re-export commonly used items for convenience
pub use catalog::{Catalog, DiseaseRecord, LabelId, LabelRegistry, Severity};
pub use inference::{ClassificationResult, InferenceEngine, Predictor};
pub use model::cnn::{PlantClassifier, PlantClassifierConfig};
pub use utils::config::AppConfig;
pub use utils::error::{DiagnosisError, Result};

/// PlantVillage disease classes (38 total)
pub const NUM_CLASSES: usize = 38;

/// Square input resolution the classifier was trained on
pub const IMAGE_SIZE: usize = 256;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
