//! Model module for the CNN architecture using the Burn framework
//!
//! The classifier is never trained here; it only needs to match the layout of
//! the checkpoints it loads.

pub mod cnn;

// Re-export main types for convenience
pub use cnn::{PlantClassifier, PlantClassifierConfig};

/// File extension `CompactRecorder` gives to checkpoints
pub const CHECKPOINT_EXTENSION: &str = "mpk";
