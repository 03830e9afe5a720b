//! Inference module: image in, diagnosis out
//!
//! This module provides:
//! - Image normalization into the model's input tensor
//! - A frozen Burn model behind `InferenceEngine`
//! - Softmax ranking with deterministic tie-breaking
//! - Composition of the ranking with the knowledge base
//! - `Predictor`, the `classify_basic` / `classify_detailed` entry points

pub mod composer;
pub mod engine;
pub mod predictor;
pub mod preprocess;
pub mod ranking;

// Re-export main types for convenience
pub use composer::{compose, ClassificationResult, TopPrediction};
pub use engine::{InferenceEngine, Logits};
pub use predictor::Predictor;
pub use preprocess::{ImageTensor, Normalization, PreprocessConfig, ResizeFilter};
pub use ranking::{rank, softmax, ProbabilityVector, RankedIndex, Ranking, TOP_K};
