//! Inference Predictor Module
//!
//! Entry points of the pipeline: image path in, label or full diagnosis out.
//! A `Predictor` is built once from an engine and a validated catalog and is
//! then shared by every request.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use burn::tensor::backend::Backend;
use image::DynamicImage;
use rayon::prelude::*;
use tracing::debug;

use crate::catalog::{Catalog, LabelId};
use crate::utils::error::{DiagnosisError, Result};

use super::composer::{compose, ClassificationResult};
use super::engine::InferenceEngine;
use super::preprocess::{normalize, normalize_path, ImageTensor, PreprocessConfig};
use super::ranking::{rank, Ranking, TOP_K};

/// Classification pipeline bound to one model and one catalog
pub struct Predictor<B: Backend> {
    engine: Arc<InferenceEngine<B>>,
    catalog: Arc<Catalog>,
    preprocess: PreprocessConfig,
    top_k: usize,
}

impl<B: Backend> Clone for Predictor<B> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            catalog: Arc::clone(&self.catalog),
            preprocess: self.preprocess,
            top_k: self.top_k,
        }
    }
}

impl<B: Backend> Predictor<B> {
    /// Check that model, catalog and preprocessing agree before serving
    pub fn new(
        engine: Arc<InferenceEngine<B>>,
        catalog: Arc<Catalog>,
        preprocess: PreprocessConfig,
    ) -> Result<Self> {
        if engine.num_classes() != catalog.len() {
            return Err(DiagnosisError::Config(format!(
                "Model emits {} classes but the label registry has {}",
                engine.num_classes(),
                catalog.len()
            )));
        }
        if engine.input_size() != preprocess.image_size as usize {
            return Err(DiagnosisError::Config(format!(
                "Model expects {}x{} input but preprocessing produces {}x{}",
                engine.input_size(),
                engine.input_size(),
                preprocess.image_size,
                preprocess.image_size
            )));
        }

        Ok(Self {
            engine,
            catalog,
            preprocess,
            top_k: TOP_K,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &InferenceEngine<B> {
        &self.engine
    }

    fn rank_tensor(&self, tensor: &ImageTensor) -> Result<Ranking> {
        let logits = self.engine.logits(tensor)?;
        rank(&logits, self.top_k)
    }

    /// Predicted label for an image file
    pub fn classify_basic(&self, path: &Path) -> Result<LabelId> {
        let tensor = normalize_path(path, &self.preprocess)?;
        let ranking = self.rank_tensor(&tensor)?;
        let index = ranking
            .top()
            .ok_or_else(|| DiagnosisError::Inference("Ranking is empty".to_string()))?
            .index;

        self.catalog
            .registry()
            .get(index)
            .cloned()
            .ok_or_else(|| DiagnosisError::Inference(format!("No label at index {}", index)))
    }

    /// Full diagnosis for an image file
    pub fn classify_detailed(&self, path: &Path) -> Result<ClassificationResult> {
        let start = Instant::now();
        let tensor = normalize_path(path, &self.preprocess)?;
        let ranking = self.rank_tensor(&tensor)?;
        let result = compose(&self.catalog, &ranking)?;

        debug!(
            "Classified {} as {} ({:.2}%, margin {:.3}) in {:.1} ms",
            path.display(),
            result.prediction,
            result.confidence,
            ranking.margin(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(result)
    }

    /// Full diagnosis for an already decoded image
    pub fn classify_image(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        let tensor = normalize(image, &self.preprocess)?;
        compose(&self.catalog, &self.rank_tensor(&tensor)?)
    }

    /// Rank and compose raw logits, skipping the model
    pub fn classify_logits(&self, logits: &[f32]) -> Result<ClassificationResult> {
        if logits.len() != self.catalog.len() {
            return Err(DiagnosisError::Inference(format!(
                "Got {} logits for a {}-label registry",
                logits.len(),
                self.catalog.len()
            )));
        }
        compose(&self.catalog, &rank(logits, self.top_k)?)
    }

    /// Classify many files in parallel; each entry succeeds or fails alone
    pub fn classify_batch(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<ClassificationResult>)>
    where
        Self: Sync,
    {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.classify_detailed(path)))
            .collect()
    }
}
