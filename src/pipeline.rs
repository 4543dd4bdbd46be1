//! Classification pipeline: image path + category in, ranked diseases out.
//!
//! [`classify`] is a pure function over an injected [`ModelRegistry`]; the
//! UI calls it from its event handler and renders whatever comes back. Every
//! failure mode is a [`ClassifyError`] variant so callers pattern-match
//! instead of parsing message text, and nothing in here panics across the
//! boundary.

use std::path::{Path, PathBuf};

use image::{DynamicImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    catalog::{self, Category},
    predictor::{INPUT_CHANNELS, INPUT_SIZE, InputBatch, normalize_channel},
    registry::ModelRegistry,
};

/// How a classification is rendered for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Sort results by descending probability instead of vocabulary order.
    #[serde(default = "default_sort")]
    pub sort_by_probability: bool,
    /// Decimal places in formatted percentages.
    #[serde(default = "default_decimals")]
    pub percent_decimals: u8,
}

fn default_sort() -> bool {
    true
}

fn default_decimals() -> u8 {
    1
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sort_by_probability: default_sort(),
            percent_decimals: default_decimals(),
        }
    }
}

/// One disease label with its predicted probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// Disease label from the category's vocabulary.
    pub label: &'static str,
    /// Probability assigned by the model, in 0.0..=1.0.
    pub probability: f32,
}

/// Most decimal places a percentage will ever render with; f32
/// probabilities carry no useful precision past this anyway.
pub const MAX_PERCENT_DECIMALS: u8 = 4;

impl Scored {
    /// Format the probability as a percentage string, e.g. `"70.0%"`.
    ///
    /// `decimals` comes straight from user configuration and is clamped to
    /// [`MAX_PERCENT_DECIMALS`].
    pub fn percent(&self, decimals: u8) -> String {
        format!(
            "{:.precision$}%",
            self.probability * 100.0,
            precision = decimals.min(MAX_PERCENT_DECIMALS) as usize
        )
    }
}

/// The outcome of one analysis request, discarded once superseded.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Category the image was classified against.
    pub category: Category,
    /// One entry per disease class, ordered per the report options.
    pub scores: Vec<Scored>,
}

/// Failure modes of a classification request.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// No category was selected before requesting analysis.
    #[error("Select a plant type before analyzing an image")]
    NoCategorySelected,
    /// The selected category has no loaded model.
    #[error("No model is available for {category}")]
    ModelUnavailable {
        /// The unavailable category.
        category: Category,
    },
    /// The selected file could not be opened or decoded as an image.
    #[error("Cannot open image {path}: {source}")]
    ImageLoad {
        /// Path the user selected.
        path: PathBuf,
        /// Decoder error.
        source: image::ImageError,
    },
    /// Preprocessing or the forward pass failed.
    #[error("Analysis failed for {category}: {reason}")]
    Inference {
        /// Category whose model was invoked.
        category: Category,
        /// Cause text.
        reason: String,
    },
}

/// Classify the image at `path` against `category`'s model.
///
/// Implements the fixed preprocessing contract the models were trained with:
/// deterministic 224x224 resize, MobileNetV2 channel normalization, batch of
/// one. The output vector is zipped positionally with the category's disease
/// vocabulary; that ordering is the load-time-validated contract between the
/// catalog and the model artifact.
pub fn classify(
    registry: &ModelRegistry,
    category: Option<Category>,
    path: &Path,
    options: &ReportOptions,
) -> Result<Classification, ClassifyError> {
    let category = category.ok_or(ClassifyError::NoCategorySelected)?;
    let predictor = registry
        .get(category)
        .ok_or(ClassifyError::ModelUnavailable { category })?;

    let image = image::open(path).map_err(|source| ClassifyError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let input = preprocess(&image);

    let probabilities = predictor
        .predict(input)
        .map_err(|error| ClassifyError::Inference {
            category,
            reason: error.to_string(),
        })?;

    let labels = catalog::disease_labels(category);
    if probabilities.len() != labels.len() {
        // The registry validates widths at load time; a mismatch here means
        // the predictor changed its output shape mid-flight.
        return Err(ClassifyError::Inference {
            category,
            reason: format!(
                "model emitted {} probabilities for {} labels",
                probabilities.len(),
                labels.len()
            ),
        });
    }

    let mut scores: Vec<Scored> = labels
        .iter()
        .copied()
        .zip(probabilities.iter().copied())
        .map(|(label, probability)| Scored { label, probability })
        .collect();
    if options.sort_by_probability {
        scores.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    }
    debug!(
        "Classified {} as {} with top score {:?}",
        path.display(),
        category,
        scores.first()
    );
    Ok(Classification { category, scores })
}

/// Resize to the model's fixed input resolution and normalize channels,
/// producing an NHWC batch of one.
fn preprocess(image: &DynamicImage) -> InputBatch {
    let resized = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();
    InputBatch::from_shape_fn(
        (1, INPUT_SIZE as usize, INPUT_SIZE as usize, INPUT_CHANNELS),
        |(_, y, x, channel)| {
            let pixel = resized.get_pixel(x as u32, y as u32);
            normalize_channel(pixel[channel])
        },
    )
}
