//! Inference Engine
//!
//! Owns a loaded `PlantClassifier` and turns one normalized image into a raw
//! logits vector. The model is fixed after loading; concurrent callers share
//! it through a mutex.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use burn::{
    module::{AutodiffModule, Module},
    record::CompactRecorder,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor, TensorData,
    },
};
use tracing::{debug, info};

use crate::model::{PlantClassifier, PlantClassifierConfig, CHECKPOINT_EXTENSION};
use crate::utils::error::{DiagnosisError, Result};

use super::preprocess::ImageTensor;

/// Raw class scores, index-aligned with the label registry
pub type Logits = Vec<f32>;

/// A frozen classifier ready for single-image forward passes
pub struct InferenceEngine<B: Backend> {
    model: Mutex<PlantClassifier<B>>,
    device: B::Device,
    num_classes: usize,
    input_shape: [usize; 4],
    checkpoint: Option<PathBuf>,
}

impl<B: Backend> InferenceEngine<B> {
    /// Load weights from a `CompactRecorder` checkpoint
    ///
    /// The `.mpk` extension is implied, so `model` and `model.mpk` name the
    /// same file.
    pub fn load(
        checkpoint: &Path,
        config: &PlantClassifierConfig,
        device: &B::Device,
    ) -> Result<Self> {
        let resolved = checkpoint.with_extension(CHECKPOINT_EXTENSION);
        if !resolved.is_file() {
            return Err(DiagnosisError::ModelLoad(format!(
                "Checkpoint not found: {}",
                resolved.display()
            )));
        }

        let start = Instant::now();
        let recorder = CompactRecorder::new();
        let model = config
            .init::<B>(device)
            .load_file(resolved.clone(), &recorder, device)
            .map_err(|e| {
                DiagnosisError::ModelLoad(format!(
                    "Failed to load {}: {:?}",
                    resolved.display(),
                    e
                ))
            })?;

        info!(
            "Loaded model from {} in {:.1} ms",
            resolved.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        let mut engine = Self::from_model(model, device);
        engine.checkpoint = Some(resolved);
        Ok(engine)
    }

    /// Wrap an in-memory model
    pub fn from_model(model: PlantClassifier<B>, device: &B::Device) -> Self {
        Self {
            num_classes: model.num_classes(),
            input_shape: model.input_shape(),
            model: Mutex::new(model),
            device: device.clone(),
            checkpoint: None,
        }
    }

    /// Strip autodiff from a trained model and wrap it
    pub fn from_trained<AB>(model: PlantClassifier<AB>, device: &B::Device) -> Self
    where
        AB: AutodiffBackend<InnerBackend = B>,
    {
        Self::from_model(model.valid(), device)
    }

    /// One forward pass, returning one logit per registry label
    pub fn logits(&self, image: &ImageTensor) -> Result<Logits> {
        let shape = image.shape();
        if shape != self.input_shape {
            return Err(DiagnosisError::Inference(format!(
                "Input shape {:?} does not match model input {:?}",
                shape, self.input_shape
            )));
        }

        let start = Instant::now();
        let data = TensorData::new(image.as_slice().to_vec(), shape);
        let input = Tensor::<B, 4>::from_data(data, &self.device);

        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| DiagnosisError::Inference("Model lock poisoned".to_string()))?;
            model.forward(input)
        };

        let logits = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| DiagnosisError::Inference(format!("Failed to read logits: {:?}", e)))?;

        if logits.len() != self.num_classes {
            return Err(DiagnosisError::Inference(format!(
                "Model produced {} logits, expected {}",
                logits.len(),
                self.num_classes
            )));
        }

        debug!(
            "Forward pass took {:.2} ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(logits)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Square input resolution
    pub fn input_size(&self) -> usize {
        self.input_shape[2]
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    /// Resolved checkpoint path, if loaded from disk
    pub fn checkpoint(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }
}
