//! egui renderer for the application UI.

use eframe::egui::{
    self, Color32, ColorImage, Frame, RichText, TextureHandle, TextureOptions, Ui, Vec2,
};

use crate::catalog::Category;
use crate::config::ConfigError;
use crate::ui::controller::Controller;

/// Smallest viewport the layout stays usable at.
pub const MIN_VIEWPORT_SIZE: Vec2 = Vec2::new(720.0, 560.0);

/// Renders the egui UI using the shared controller state.
pub struct LeafApp {
    controller: Controller,
    visuals_set: bool,
    preview_tex: Option<TextureHandle>,
}

impl LeafApp {
    /// Create the app: load configuration and the model registry.
    ///
    /// Per-model load failures are absorbed into the controller's status;
    /// only config-path problems abort startup.
    pub fn new() -> Result<Self, ConfigError> {
        let controller = Controller::initialize()?;
        Ok(Self {
            controller,
            visuals_set: false,
            preview_tex: None,
        })
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = Color32::from_rgb(12, 12, 12);
        visuals.panel_fill = Color32::from_rgb(16, 16, 16);
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(16, 16, 16);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(Frame::NONE.fill(Color32::from_rgb(24, 24, 24)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Leaf Health Check").color(Color32::WHITE));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(RichText::new("Close").color(Color32::WHITE))
                            .clicked()
                        {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
            });
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .frame(Frame::NONE.fill(Color32::from_rgb(0, 0, 0)))
            .show(ctx, |ui| {
                let status = &self.controller.ui.status;
                ui.horizontal(|ui| {
                    ui.add_space(8.0);
                    ui.painter().circle_filled(
                        ui.cursor().min + egui::vec2(9.0, 11.0),
                        9.0,
                        status.badge_color,
                    );
                    ui.add_space(8.0);
                    ui.label(RichText::new(&status.badge_label).color(Color32::WHITE));
                    ui.separator();
                    ui.label(RichText::new(&status.text).color(Color32::WHITE));
                });
            });
    }

    fn render_controls_panel(&mut self, ui: &mut Ui) {
        ui.vertical(|ui| {
            ui.label(RichText::new("Plant type").color(Color32::WHITE));
            ui.add_space(4.0);
            let selected_text = self
                .controller
                .ui
                .selected_category
                .map(|category| category.name())
                .unwrap_or("Choose...");
            egui::ComboBox::from_label("")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    for category in Category::ALL {
                        let is_selected =
                            self.controller.ui.selected_category == Some(category);
                        if ui.selectable_label(is_selected, category.name()).clicked() {
                            self.controller.select_category(category);
                        }
                    }
                });
            ui.add_space(10.0);
            if ui
                .button(RichText::new("Choose leaf image").color(Color32::WHITE))
                .clicked()
            {
                self.controller.pick_image_via_dialog();
            }
            ui.add_space(10.0);
            let mut sorted = self.controller.sort_by_probability();
            if ui.checkbox(&mut sorted, "Sort by probability").changed() {
                self.controller.set_sort_by_probability(sorted);
            }
            ui.add_space(12.0);
            if !self.controller.ui.unavailable.is_empty() {
                ui.label(RichText::new("Unavailable models").color(Color32::LIGHT_RED));
                for row in self.controller.ui.unavailable.clone() {
                    ui.label(
                        RichText::new(row.category.name())
                            .color(Color32::GRAY)
                            .small(),
                    )
                    .on_hover_text(&row.reason);
                }
            }
            ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                ui.label(
                    RichText::new(format!("Models: {}", self.controller.ui.models_dir))
                        .color(Color32::DARK_GRAY)
                        .small(),
                );
            });
        });
    }

    fn render_results(&mut self, ui: &mut Ui) {
        if self.controller.ui.results.is_empty() {
            return;
        }
        ui.add_space(8.0);
        ui.label(RichText::new("Diagnosis").color(Color32::WHITE).heading());
        ui.add_space(4.0);
        for row in &self.controller.ui.results {
            ui.horizontal(|ui| {
                ui.add(
                    egui::ProgressBar::new(row.probability)
                        .desired_width(220.0)
                        .text(row.percent.clone()),
                );
                ui.label(RichText::new(&row.label).color(Color32::WHITE));
            });
        }
    }

    fn render_preview(&mut self, ui: &mut Ui, ctx: &egui::Context) {
        let Some(preview) = self.controller.ui.preview.clone() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("The chosen image appears here").color(Color32::GRAY));
            });
            return;
        };
        let needs_upload = self
            .preview_tex
            .as_ref()
            .map(|texture| texture.name() != preview.path.display().to_string())
            .unwrap_or(true);
        if needs_upload {
            let color_image = ColorImage::from_rgba_unmultiplied(preview.size, &preview.rgba);
            self.preview_tex = Some(ctx.load_texture(
                preview.path.display().to_string(),
                color_image,
                TextureOptions::LINEAR,
            ));
        }
        if let Some(texture) = &self.preview_tex {
            ui.add(egui::Image::new(texture).max_size(Vec2::new(480.0, 480.0)));
        }
    }

    fn render_central(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal_top(|ui| {
                ui.allocate_ui(Vec2::new(240.0, ui.available_height()), |ui| {
                    self.render_controls_panel(ui);
                });
                ui.separator();
                ui.vertical(|ui| {
                    self.render_preview(ui, ctx);
                    self.render_results(ui);
                });
            });
        });
    }
}

impl eframe::App for LeafApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.render_top_bar(ctx);
        self.render_status(ctx);
        self.render_central(ctx);
        self.handle_dropped_files(ctx);
    }
}

impl LeafApp {
    /// Dropped image files behave like picker selections.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| {
            input
                .raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .next()
        });
        if let Some(path) = dropped {
            self.controller.open_image(&path);
        }
    }
}
