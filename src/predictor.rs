//! Predictor seam over serialized model artifacts.
//!
//! The application treats each per-species classifier as an opaque function
//! from a preprocessed image batch to a probability vector. [`Predictor`] is
//! the trait boundary; [`OnnxPredictor`] is the production implementation
//! backed by a tract-onnx plan. Tests substitute fixed-output stubs.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tract_onnx::prelude::*;

use crate::catalog::Category;

/// Side length of the square input the classifiers were trained on.
pub const INPUT_SIZE: u32 = 224;
/// Number of input channels (RGB).
pub const INPUT_CHANNELS: usize = 3;

/// Preprocessed input batch: NHWC, batch of 1, values already normalized.
pub type InputBatch = tract_ndarray::Array4<f32>;

/// MobileNetV2 channel normalization: map 0..=255 pixel values into -1.0..=1.0.
///
/// Must match the transform applied during training exactly; a mismatch
/// degrades accuracy silently instead of erroring.
pub fn normalize_channel(value: u8) -> f32 {
    f32::from(value) / 127.5 - 1.0
}

/// Errors raised while loading a predictor artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The artifact file does not exist at the configured path.
    #[error("Model artifact not found at {path}")]
    MissingArtifact {
        /// Expected artifact location.
        path: PathBuf,
    },
    /// The artifact exists but could not be parsed or prepared for inference.
    #[error("Failed to load model from {path}: {reason}")]
    Artifact {
        /// Artifact location.
        path: PathBuf,
        /// Cause text from the model reader or optimizer.
        reason: String,
    },
    /// The model's output width disagrees with the configured label list.
    #[error("{category} model emits {outputs} classes but {labels} labels are configured")]
    LabelCountMismatch {
        /// Category whose table entry is inconsistent.
        category: Category,
        /// Output-vector length reported by the model.
        outputs: usize,
        /// Number of labels configured in the catalog.
        labels: usize,
    },
}

/// Errors raised by a forward pass.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The underlying inference run failed.
    #[error("Forward pass failed: {reason}")]
    Forward {
        /// Cause text from the inference runtime.
        reason: String,
    },
}

/// An opaque classifier: one preprocessed batch in, one probability vector out.
pub trait Predictor {
    /// Length of the probability vector this predictor emits.
    fn class_count(&self) -> usize;

    /// Run one forward pass over a batch of one image.
    fn predict(&self, input: InputBatch) -> Result<Vec<f32>, PredictError>;
}

/// Predictor backed by an optimized tract-onnx plan loaded from disk.
#[derive(Debug)]
pub struct OnnxPredictor {
    plan: TypedRunnableModel<TypedModel>,
    class_count: usize,
}

impl OnnxPredictor {
    /// Load and optimize an ONNX artifact, pinning the input to one
    /// `224x224x3` f32 image in NHWC layout.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        let input_fact = f32::fact([
            1,
            INPUT_SIZE as usize,
            INPUT_SIZE as usize,
            INPUT_CHANNELS,
        ]);
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, input_fact.into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|error| LoadError::Artifact {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;
        let class_count = output_width(&plan).map_err(|reason| LoadError::Artifact {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(Self { plan, class_count })
    }
}

impl Predictor for OnnxPredictor {
    fn class_count(&self) -> usize {
        self.class_count
    }

    fn predict(&self, input: InputBatch) -> Result<Vec<f32>, PredictError> {
        let outputs = self
            .plan
            .run(tvec!(Tensor::from(input).into()))
            .map_err(|error| PredictError::Forward {
                reason: error.to_string(),
            })?;
        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|error| PredictError::Forward {
                reason: error.to_string(),
            })?;
        Ok(view.iter().copied().collect())
    }
}

/// Inspect the plan's output fact and return the per-sample vector length.
fn output_width(plan: &TypedRunnableModel<TypedModel>) -> Result<usize, String> {
    let fact = plan
        .model()
        .output_fact(0)
        .map_err(|error| error.to_string())?;
    let shape = fact
        .shape
        .as_concrete()
        .ok_or_else(|| "model output shape is not concrete".to_string())?;
    shape
        .last()
        .copied()
        .filter(|&width| width > 0)
        .ok_or_else(|| "model output has no class dimension".to_string())
}
