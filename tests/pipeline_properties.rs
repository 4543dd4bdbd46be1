//! End-to-end pipeline behavior with stub predictors.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use leafscope::catalog::{self, Category};
use leafscope::pipeline::{self, ClassifyError, ReportOptions};
use leafscope::predictor::{InputBatch, LoadError, PredictError, Predictor};
use leafscope::registry::ModelRegistry;

/// Predictor that always emits the same vector and counts invocations.
struct FixedPredictor {
    probabilities: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl FixedPredictor {
    fn new(probabilities: &[f32]) -> (Box<dyn Predictor>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = Box::new(Self {
            probabilities: probabilities.to_vec(),
            calls: Arc::clone(&calls),
        });
        (predictor, calls)
    }
}

impl Predictor for FixedPredictor {
    fn class_count(&self) -> usize {
        self.probabilities.len()
    }

    fn predict(&self, input: InputBatch) -> Result<Vec<f32>, PredictError> {
        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probabilities.clone())
    }
}

/// Predictor whose forward pass always fails.
struct FailingPredictor {
    classes: usize,
}

impl Predictor for FailingPredictor {
    fn class_count(&self) -> usize {
        self.classes
    }

    fn predict(&self, _input: InputBatch) -> Result<Vec<f32>, PredictError> {
        Err(PredictError::Forward {
            reason: "tensor allocation failed".into(),
        })
    }
}

fn uniform_probabilities(classes: usize) -> Vec<f32> {
    vec![1.0 / classes as f32; classes]
}

fn registry_for(category: Category, probabilities: &[f32]) -> (ModelRegistry, Arc<AtomicUsize>) {
    let (predictor, calls) = FixedPredictor::new(probabilities);
    let registry = ModelRegistry::with_predictors([(category, predictor)]).unwrap();
    (registry, calls)
}

fn write_leaf_image(dir: &Path) -> PathBuf {
    let path = dir.join("leaf.png");
    let mut image = RgbImage::new(64, 48);
    for (x, _y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgb([40, (80 + x) as u8, 30]);
    }
    DynamicImage::ImageRgb8(image).save(&path).unwrap();
    path
}

#[test]
fn fixed_stub_round_trip_is_sorted_with_percent_strings() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    // Vocabulary order is Healthy, Apple Rust, Apple Scab; feed probabilities
    // already aligned to it so sorting is observable but not identity-busting.
    let (registry, _calls) = registry_for(Category::Apple, &[0.7, 0.2, 0.1]);

    let result = pipeline::classify(
        &registry,
        Some(Category::Apple),
        &image_path,
        &ReportOptions::default(),
    )
    .unwrap();

    let rendered: Vec<(&str, String)> = result
        .scores
        .iter()
        .map(|scored| (scored.label, scored.percent(1)))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("Healthy", "70.0%".to_string()),
            ("Apple Rust", "20.0%".to_string()),
            ("Apple Scab", "10.0%".to_string()),
        ]
    );
}

#[test]
fn unsorted_results_preserve_vocabulary_order() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    let (registry, _calls) = registry_for(Category::Potato, &[0.1, 0.6, 0.3]);
    let options = ReportOptions {
        sort_by_probability: false,
        ..ReportOptions::default()
    };

    let result =
        pipeline::classify(&registry, Some(Category::Potato), &image_path, &options).unwrap();
    let labels: Vec<&str> = result.scores.iter().map(|scored| scored.label).collect();
    assert_eq!(labels, catalog::disease_labels(Category::Potato));
}

#[test]
fn label_set_matches_the_category_vocabulary_for_every_category() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    for category in Category::ALL {
        let classes = catalog::disease_labels(category).len();
        let (registry, _calls) = registry_for(category, &uniform_probabilities(classes));
        let options = ReportOptions {
            sort_by_probability: false,
            ..ReportOptions::default()
        };

        let result = pipeline::classify(&registry, Some(category), &image_path, &options).unwrap();
        let labels: Vec<&str> = result.scores.iter().map(|scored| scored.label).collect();
        assert_eq!(labels, catalog::disease_labels(category));
    }
}

#[test]
fn probabilities_sum_to_one_within_tolerance() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    let (registry, _calls) = registry_for(Category::Corn, &[0.62, 0.25, 0.13]);

    let result = pipeline::classify(
        &registry,
        Some(Category::Corn),
        &image_path,
        &ReportOptions::default(),
    )
    .unwrap();
    let total: f32 = result.scores.iter().map(|scored| scored.probability).sum();
    assert!((total - 1.0).abs() < 0.01, "sum was {total}");
}

#[test]
fn missing_category_selection_wins_over_everything_else() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    let (registry, calls) = registry_for(Category::Apple, &[0.7, 0.2, 0.1]);

    let error = pipeline::classify(&registry, None, &image_path, &ReportOptions::default())
        .unwrap_err();
    assert!(matches!(error, ClassifyError::NoCategorySelected));

    // Still NoCategorySelected when the image path is bogus too.
    let error = pipeline::classify(
        &registry,
        None,
        Path::new("/does/not/exist.png"),
        &ReportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(error, ClassifyError::NoCategorySelected));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unloaded_category_reports_model_unavailable() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    let (registry, _calls) = registry_for(Category::Apple, &[0.7, 0.2, 0.1]);

    let error = pipeline::classify(
        &registry,
        Some(Category::Tomato),
        &image_path,
        &ReportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        error,
        ClassifyError::ModelUnavailable {
            category: Category::Tomato
        }
    ));
}

#[test]
fn non_image_file_fails_before_the_model_is_invoked() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("leaf.png");
    std::fs::write(&bogus, b"definitely not a png").unwrap();
    let (registry, calls) = registry_for(Category::Apple, &[0.7, 0.2, 0.1]);

    let error = pipeline::classify(
        &registry,
        Some(Category::Apple),
        &bogus,
        &ReportOptions::default(),
    )
    .unwrap_err();
    match error {
        ClassifyError::ImageLoad { path, .. } => assert_eq!(path, bogus),
        other => panic!("expected ImageLoad, got {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn forward_pass_failure_becomes_an_inference_error() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    let registry = ModelRegistry::with_predictors([(
        Category::Corn,
        Box::new(FailingPredictor { classes: 3 }) as Box<dyn Predictor>,
    )])
    .unwrap();

    let error = pipeline::classify(
        &registry,
        Some(Category::Corn),
        &image_path,
        &ReportOptions::default(),
    )
    .unwrap_err();
    match error {
        ClassifyError::Inference { category, reason } => {
            assert_eq!(category, Category::Corn);
            assert!(reason.contains("tensor allocation failed"), "reason: {reason}");
        }
        other => panic!("expected Inference, got {other}"),
    }
}

#[test]
fn one_categorys_load_failure_leaves_another_usable() {
    let dir = TempDir::new().unwrap();
    let image_path = write_leaf_image(dir.path());
    let registry = ModelRegistry::load_with(dir.path(), |path| {
        if path.ends_with("best_potato.onnx") {
            let (predictor, _calls) = FixedPredictor::new(&[0.5, 0.3, 0.2]);
            Ok(predictor)
        } else {
            Err(LoadError::MissingArtifact {
                path: path.to_path_buf(),
            })
        }
    });

    assert!(registry.is_available(Category::Potato));
    assert!(!registry.is_available(Category::Apple));

    let result = pipeline::classify(
        &registry,
        Some(Category::Potato),
        &image_path,
        &ReportOptions::default(),
    )
    .unwrap();
    assert_eq!(result.scores.len(), 3);
}
