//! egui user interface: state, controller, and renderer.
//!
//! The UI is a display sink and event source only; classification state
//! lives in the controller and the pipeline stays a pure function.

/// eframe application wrapper and rendering.
pub mod app;
/// Bridges user events to the registry and pipeline.
pub mod controller;
/// Render-friendly state consumed by the renderer.
pub mod state;
