//! Application configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! configuration for the 38-class PlantVillage checkpoint.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{DiagnosisError, Result};
use super::logging::LogLevel;
use crate::inference::preprocess::{Normalization, PreprocessConfig, ResizeFilter};
use crate::model::cnn::PlantClassifierConfig;
use crate::{IMAGE_SIZE, NUM_CLASSES};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub preprocess: PreprocessSettings,
    pub knowledge: KnowledgeSettings,
    pub logging: LoggingSettings,
}

/// Model checkpoint and architecture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the `.mpk` checkpoint
    pub checkpoint: Option<PathBuf>,
    /// Number of output classes (must equal the label registry size)
    pub num_classes: usize,
    /// Base number of convolutional filters
    pub base_filters: usize,
    /// Dropout rate the model was built with (inactive at inference)
    pub dropout_rate: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            checkpoint: None,
            num_classes: NUM_CLASSES,
            base_filters: 32,
            dropout_rate: 0.3,
        }
    }
}

/// Image preprocessing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    pub image_size: u32,
    pub filter: ResizeFilter,
    pub normalization: Normalization,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE as u32,
            filter: ResizeFilter::default(),
            normalization: Normalization::default(),
        }
    }
}

/// Knowledge base source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// Replacement JSON file; the embedded table is used when absent
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let config: AppConfig = load_toml_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.num_classes == 0 {
            return Err(DiagnosisError::Config(
                "model.num_classes must be greater than 0".to_string(),
            ));
        }
        if self.model.base_filters == 0 {
            return Err(DiagnosisError::Config(
                "model.base_filters must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.model.dropout_rate) {
            return Err(DiagnosisError::Config(
                "model.dropout_rate must be in range [0.0, 1.0)".to_string(),
            ));
        }
        if self.preprocess.image_size == 0 {
            return Err(DiagnosisError::Config(
                "preprocess.image_size must be greater than 0".to_string(),
            ));
        }
        self.logging.level.parse::<LogLevel>()?;
        Ok(())
    }

    /// Burn model configuration matching these settings
    pub fn classifier_config(&self) -> PlantClassifierConfig {
        PlantClassifierConfig::new()
            .with_num_classes(self.model.num_classes)
            .with_input_size(self.preprocess.image_size as usize)
            .with_base_filters(self.model.base_filters)
            .with_dropout_rate(self.model.dropout_rate)
    }

    /// Preprocessing configuration matching these settings
    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            image_size: self.preprocess.image_size,
            filter: self.preprocess.filter,
            normalization: self.preprocess.normalization,
        }
    }
}

pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = fs::read_to_string(path)
        .map_err(|e| DiagnosisError::Config(format!("Failed to read config {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| DiagnosisError::Config(format!("Failed to parse config {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model.num_classes, 38);
        assert_eq!(config.preprocess.image_size, 256);
        assert_eq!(config.preprocess.normalization, Normalization::UnitRange);
        assert!(config.knowledge.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("diagnosis.toml");
        fs::write(
            &path,
            r#"
[model]
checkpoint = "models/plant_classifier.mpk"
base_filters = 16

[preprocess]
filter = "lanczos3"
normalization = "imagenet"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(
            config.model.checkpoint.as_deref(),
            Some(Path::new("models/plant_classifier.mpk"))
        );
        assert_eq!(config.model.base_filters, 16);
        assert_eq!(config.model.num_classes, 38);
        assert_eq!(config.preprocess.filter, ResizeFilter::Lanczos3);
        assert_eq!(config.preprocess.normalization, Normalization::ImageNet);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_dropout_rejected() {
        let mut config = AppConfig::default();
        config.model.dropout_rate = 1.5;
        assert!(matches!(config.validate(), Err(DiagnosisError::Config(_))));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("diagnosis.toml");
        fs::write(&path, "[logging]\nlevel = \"warnn\"\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, DiagnosisError::Config(_)));
        assert!(err.to_string().contains("warnn"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AppConfig::load(Path::new("/nonexistent/diagnosis.toml")).unwrap_err();
        assert!(matches!(err, DiagnosisError::Config(_)));
    }

    #[test]
    fn test_classifier_config_follows_settings() {
        let mut config = AppConfig::default();
        config.model.base_filters = 8;
        let model_config = config.classifier_config();
        assert_eq!(model_config.base_filters, 8);
        assert_eq!(model_config.num_classes, 38);
        assert_eq!(model_config.input_size, 256);
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/diagnosis.toml");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.preprocess_config(), PreprocessConfig::default());
        assert!(config.model.checkpoint.is_some());
    }
}
