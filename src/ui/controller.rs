//! Maintains app state and bridges pipeline results to the egui UI.
//!
//! Every user action lands here, gets turned into a pipeline or registry
//! call, and comes back as status text and result rows. Errors never leave
//! this layer as panics; they become user-facing messages.

use std::path::{Path, PathBuf};

use egui::Color32;
use rfd::FileDialog;
use tracing::{info, warn};

use crate::{
    catalog::Category,
    config::{self, AppConfig, ConfigError},
    pipeline::{self, ClassifyError},
    registry::ModelRegistry,
    ui::state::{PreviewImage, ResultRowView, StatusBarState, UiState, UnavailableRowView},
};

/// File extensions offered in the image picker, matching the decodable set.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Longest preview edge; larger images are downscaled before upload.
const PREVIEW_MAX_EDGE: u32 = 768;

/// Tone of a status message, mapped to a badge color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    /// Nothing happening.
    Idle,
    /// Result or neutral information.
    Info,
    /// Recoverable problem caused by input or environment.
    Warning,
    /// Analysis failure.
    Error,
}

fn status_badge(tone: StatusTone) -> (String, Color32) {
    match tone {
        StatusTone::Idle => ("Idle".into(), Color32::from_rgb(42, 42, 42)),
        StatusTone::Info => ("Result".into(), Color32::from_rgb(64, 140, 112)),
        StatusTone::Warning => ("Attention".into(), Color32::from_rgb(222, 155, 49)),
        StatusTone::Error => ("Error".into(), Color32::from_rgb(196, 72, 72)),
    }
}

/// Owns the registry and config; exposes the actions the renderer calls.
pub struct Controller {
    /// Render-friendly state consumed by the renderer every frame.
    pub ui: UiState,
    registry: ModelRegistry,
    config: AppConfig,
}

impl Controller {
    /// Load config, then load every model; model failures are non-fatal and
    /// end up as unavailable rows plus a status message.
    pub fn initialize() -> Result<Self, ConfigError> {
        let config = config::load_or_default()?;
        let models_dir = config.resolve_models_dir()?;
        let registry = ModelRegistry::load(&models_dir);
        Ok(Self::with_parts(registry, config, &models_dir))
    }

    /// Assemble a controller from preloaded parts. Used by `initialize` and
    /// by tests that inject stub registries.
    pub fn with_parts(registry: ModelRegistry, config: AppConfig, models_dir: &Path) -> Self {
        let mut ui = UiState {
            selected_category: config.last_category,
            models_dir: models_dir.display().to_string(),
            ..UiState::default()
        };
        ui.unavailable = registry
            .failures()
            .iter()
            .map(|failure| UnavailableRowView {
                category: failure.category,
                reason: failure.error.to_string(),
            })
            .collect();
        let mut controller = Self {
            ui,
            registry,
            config,
        };
        controller.report_startup_status();
        controller
    }

    fn report_startup_status(&mut self) {
        let loaded = self.registry.loaded_count();
        let failed = self.ui.unavailable.len();
        if failed == 0 {
            self.set_status(format!("{loaded} plant models ready"), StatusTone::Idle);
        } else {
            self.set_status(
                format!("{loaded} plant models ready, {failed} unavailable"),
                StatusTone::Warning,
            );
        }
    }

    /// Change the selected category and persist the choice.
    pub fn select_category(&mut self, category: Category) {
        if self.ui.selected_category == Some(category) {
            return;
        }
        self.ui.selected_category = Some(category);
        self.ui.results.clear();
        self.config.last_category = Some(category);
        self.persist_config();
    }

    /// Toggle descending-probability sorting and persist it.
    pub fn set_sort_by_probability(&mut self, enabled: bool) {
        if self.config.report.sort_by_probability == enabled {
            return;
        }
        self.config.report.sort_by_probability = enabled;
        self.persist_config();
    }

    /// Whether results are currently sorted by probability.
    pub fn sort_by_probability(&self) -> bool {
        self.config.report.sort_by_probability
    }

    /// Open the file picker and, if a file is chosen, preview and analyze it.
    ///
    /// Mirrors the selection flow: no category yet means we prompt instead of
    /// opening the dialog, and cancelling the dialog is not an error.
    pub fn pick_image_via_dialog(&mut self) {
        if self.ui.selected_category.is_none() {
            self.set_status(
                "Select a plant type from the list first".into(),
                StatusTone::Warning,
            );
            return;
        }
        let picked = FileDialog::new()
            .set_title("Choose a leaf image")
            .add_filter("Image files", &IMAGE_EXTENSIONS)
            .pick_file();
        match picked {
            Some(path) => self.open_image(&path),
            None => self.set_status("No file selected".into(), StatusTone::Info),
        }
    }

    /// Preview and analyze a concrete image path (picker and drag-and-drop).
    pub fn open_image(&mut self, path: &Path) {
        self.load_preview(path);
        self.analyze(path);
    }

    /// Run the classification pipeline and map the outcome to UI state.
    pub fn analyze(&mut self, path: &Path) {
        let outcome = pipeline::classify(
            &self.registry,
            self.ui.selected_category,
            path,
            &self.config.report,
        );
        match outcome {
            Ok(classification) => {
                let decimals = self.config.report.percent_decimals;
                self.ui.results = classification
                    .scores
                    .iter()
                    .map(|scored| ResultRowView {
                        label: scored.label.to_string(),
                        percent: scored.percent(decimals),
                        probability: scored.probability,
                    })
                    .collect();
                info!(
                    "Analyzed {} as {}: top {:?}",
                    path.display(),
                    classification.category,
                    self.ui.results.first().map(|row| &row.label)
                );
                self.set_status(
                    format!("Analysis complete for {}", classification.category),
                    StatusTone::Info,
                );
            }
            Err(error) => {
                self.ui.results.clear();
                let tone = match &error {
                    ClassifyError::NoCategorySelected | ClassifyError::ModelUnavailable { .. } => {
                        StatusTone::Warning
                    }
                    ClassifyError::ImageLoad { .. } | ClassifyError::Inference { .. } => {
                        StatusTone::Error
                    }
                };
                warn!("Analysis failed for {}: {error}", path.display());
                self.set_status(error.to_string(), tone);
            }
        }
    }

    fn load_preview(&mut self, path: &Path) {
        match image::open(path) {
            Ok(decoded) => {
                let scaled = decoded.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE).to_rgba8();
                let size = [scaled.width() as usize, scaled.height() as usize];
                self.ui.preview = Some(PreviewImage {
                    path: path.to_path_buf(),
                    size,
                    rgba: scaled.into_raw(),
                });
            }
            Err(error) => {
                // classify reports the decode failure in detail; the old
                // preview just must not linger under the new result.
                warn!("Preview failed for {}: {error}", path.display());
                self.ui.preview = None;
            }
        }
    }

    /// Path of the currently previewed image, if any.
    pub fn preview_path(&self) -> Option<&PathBuf> {
        self.ui.preview.as_ref().map(|preview| &preview.path)
    }

    fn persist_config(&mut self) {
        if let Err(error) = config::save(&self.config) {
            warn!("Failed to save configuration: {error}");
            self.set_status(format!("Failed to save settings: {error}"), StatusTone::Warning);
        }
    }

    /// Update the footer status line.
    pub fn set_status(&mut self, text: String, tone: StatusTone) {
        let (badge_label, badge_color) = status_badge(tone);
        self.ui.status = StatusBarState {
            text,
            badge_label,
            badge_color,
        };
    }
}
