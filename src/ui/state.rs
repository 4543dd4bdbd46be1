//! Shared state types for the egui UI.

use std::path::PathBuf;

use egui::Color32;

use crate::catalog::Category;

/// Top-level UI model consumed by the egui renderer.
#[derive(Clone, Debug, Default)]
pub struct UiState {
    /// Footer status badge and text.
    pub status: StatusBarState,
    /// Currently selected plant category, if any.
    pub selected_category: Option<Category>,
    /// Preview of the most recently picked image.
    pub preview: Option<PreviewImage>,
    /// Rows of the last classification, in display order.
    pub results: Vec<ResultRowView>,
    /// Categories whose models failed to load, with short causes.
    pub unavailable: Vec<UnavailableRowView>,
    /// Where models are being loaded from, for display.
    pub models_dir: String,
}

/// Status badge + text shown in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusBarState {
    /// Human-readable status line.
    pub text: String,
    /// Short badge label next to the colored dot.
    pub badge_label: String,
    /// Badge dot color.
    pub badge_color: Color32,
}

impl StatusBarState {
    /// Initial status before any interaction.
    pub fn idle() -> Self {
        Self {
            text: "Pick a plant type, then choose a leaf image".into(),
            badge_label: "Idle".into(),
            badge_color: Color32::from_rgb(42, 42, 42),
        }
    }
}

impl Default for StatusBarState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Decoded preview pixels ready for texture upload.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewImage {
    /// Source path of the preview, used as the texture key.
    pub path: PathBuf,
    /// Width and height in pixels.
    pub size: [usize; 2],
    /// RGBA bytes, row-major.
    pub rgba: Vec<u8>,
}

/// Display data for a single result row.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRowView {
    /// Disease label.
    pub label: String,
    /// Formatted percentage, e.g. `"70.0%"`.
    pub percent: String,
    /// Raw probability used for the bar width.
    pub probability: f32,
}

/// Display data for a category without a usable model.
#[derive(Clone, Debug, PartialEq)]
pub struct UnavailableRowView {
    /// The affected category.
    pub category: Category,
    /// Short cause text.
    pub reason: String,
}
