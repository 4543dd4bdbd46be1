//! Per-category model registry.
//!
//! Built once at startup from the catalog and a models directory, then
//! treated as read-only. Each category loads independently: a missing or
//! corrupt artifact marks that category unavailable and is reported, but the
//! remaining categories still load. A predictor whose output width does not
//! match the category's label list is rejected outright rather than allowed
//! to mis-label results.

use std::{collections::HashMap, path::Path};

use tracing::{info, warn};

use crate::{
    catalog::{self, Category},
    predictor::{LoadError, OnnxPredictor, Predictor},
};

/// Record of one category that failed to load.
#[derive(Debug)]
pub struct RegistryFailure {
    /// The category that is unavailable for this process lifetime.
    pub category: Category,
    /// Why loading failed.
    pub error: LoadError,
}

/// Immutable-after-construction map from category to loaded predictor.
#[derive(Default)]
pub struct ModelRegistry {
    predictors: HashMap<Category, Box<dyn Predictor>>,
    failures: Vec<RegistryFailure>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("predictors", &self.predictors.keys().collect::<Vec<_>>())
            .field("failures", &self.failures)
            .finish()
    }
}

impl ModelRegistry {
    /// Load every catalog entry from `models_dir` using the ONNX reader.
    pub fn load(models_dir: &Path) -> Self {
        Self::load_with(models_dir, |path| {
            OnnxPredictor::load(path).map(|predictor| Box::new(predictor) as Box<dyn Predictor>)
        })
    }

    /// Load every catalog entry using a caller-supplied artifact loader.
    ///
    /// The loader seam keeps registry semantics testable without real model
    /// files on disk.
    pub fn load_with<F>(models_dir: &Path, loader: F) -> Self
    where
        F: Fn(&Path) -> Result<Box<dyn Predictor>, LoadError>,
    {
        let mut registry = Self::default();
        for entry in &catalog::ENTRIES {
            let path = models_dir.join(entry.artifact);
            match loader(&path).and_then(|predictor| check_width(entry.category, predictor)) {
                Ok(predictor) => {
                    info!(
                        "Loaded {} model ({} classes) from {}",
                        entry.category,
                        entry.labels.len(),
                        path.display()
                    );
                    registry.predictors.insert(entry.category, predictor);
                }
                Err(error) => {
                    warn!("{} model unavailable: {error}", entry.category);
                    registry.failures.push(RegistryFailure {
                        category: entry.category,
                        error,
                    });
                }
            }
        }
        registry
    }

    /// Build a registry from explicit predictors, validating label counts.
    ///
    /// Used by tests and anywhere a predictor arrives from something other
    /// than the on-disk artifact store.
    pub fn with_predictors(
        predictors: impl IntoIterator<Item = (Category, Box<dyn Predictor>)>,
    ) -> Result<Self, LoadError> {
        let mut registry = Self::default();
        for (category, predictor) in predictors {
            let predictor = check_width(category, predictor)?;
            registry.predictors.insert(category, predictor);
        }
        Ok(registry)
    }

    /// Look up the loaded predictor for a category, if any.
    pub fn get(&self, category: Category) -> Option<&dyn Predictor> {
        self.predictors
            .get(&category)
            .map(|predictor| predictor.as_ref())
    }

    /// Whether a category has a usable predictor.
    pub fn is_available(&self, category: Category) -> bool {
        self.predictors.contains_key(&category)
    }

    /// Number of categories that loaded successfully.
    pub fn loaded_count(&self) -> usize {
        self.predictors.len()
    }

    /// Categories that failed to load, with their causes.
    pub fn failures(&self) -> &[RegistryFailure] {
        &self.failures
    }
}

/// Reject predictors whose output width disagrees with the catalog.
fn check_width(
    category: Category,
    predictor: Box<dyn Predictor>,
) -> Result<Box<dyn Predictor>, LoadError> {
    let labels = catalog::disease_labels(category).len();
    let outputs = predictor.class_count();
    if outputs != labels {
        return Err(LoadError::LabelCountMismatch {
            category,
            outputs,
            labels,
        });
    }
    Ok(predictor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{InputBatch, PredictError};

    struct FixedPredictor(Vec<f32>);

    impl Predictor for FixedPredictor {
        fn class_count(&self) -> usize {
            self.0.len()
        }

        fn predict(&self, _input: InputBatch) -> Result<Vec<f32>, PredictError> {
            Ok(self.0.clone())
        }
    }

    fn fixed(probabilities: &[f32]) -> Box<dyn Predictor> {
        Box::new(FixedPredictor(probabilities.to_vec()))
    }

    #[test]
    fn one_failing_category_does_not_block_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::load_with(dir.path(), |path| {
            if path.ends_with("best_corn.onnx") {
                Ok(fixed(&[0.2, 0.3, 0.5]))
            } else {
                Err(LoadError::MissingArtifact {
                    path: path.to_path_buf(),
                })
            }
        });

        assert!(registry.is_available(Category::Corn));
        assert!(!registry.is_available(Category::Apple));
        assert_eq!(registry.loaded_count(), 1);
        assert_eq!(registry.failures().len(), Category::ALL.len() - 1);
    }

    #[test]
    fn label_count_mismatch_is_rejected_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        // Apple expects 3 classes; offer 4.
        let registry =
            ModelRegistry::load_with(dir.path(), |_path| Ok(fixed(&[0.25, 0.25, 0.25, 0.25])));

        assert!(!registry.is_available(Category::Apple));
        let apple_failure = registry
            .failures()
            .iter()
            .find(|failure| failure.category == Category::Apple)
            .expect("apple failure recorded");
        assert!(matches!(
            apple_failure.error,
            LoadError::LabelCountMismatch {
                outputs: 4,
                labels: 3,
                ..
            }
        ));
        // Tomato has 7 labels, so the 4-wide stub fails there too.
        assert_eq!(registry.loaded_count(), 0);
    }

    #[test]
    fn explicit_predictors_are_validated_and_retrievable() {
        let registry = ModelRegistry::with_predictors([(
            Category::Apple,
            fixed(&[0.7, 0.2, 0.1]),
        )])
        .unwrap();
        assert!(registry.get(Category::Apple).is_some());
        assert!(registry.get(Category::Potato).is_none());

        let mismatch =
            ModelRegistry::with_predictors([(Category::Apple, fixed(&[1.0]))]).unwrap_err();
        assert!(matches!(mismatch, LoadError::LabelCountMismatch { .. }));
    }

    #[test]
    fn missing_models_directory_leaves_every_category_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::load(&dir.path().join("nope"));
        assert_eq!(registry.loaded_count(), 0);
        assert_eq!(registry.failures().len(), Category::ALL.len());
        for failure in registry.failures() {
            assert!(matches!(failure.error, LoadError::MissingArtifact { .. }));
        }
    }
}
