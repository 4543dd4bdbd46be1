//! Library exports for reuse in integration tests.
/// Application directory helpers.
pub mod app_dirs;
/// Plant categories and their disease vocabularies.
pub mod catalog;
/// Persisted application settings.
pub mod config;
/// Logging setup.
pub mod logging;
/// Image-to-ranked-diseases classification pipeline.
pub mod pipeline;
/// Predictor seam over serialized model artifacts.
pub mod predictor;
/// Per-category model registry.
pub mod registry;
/// Shared egui UI modules.
pub mod ui;
