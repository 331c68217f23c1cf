use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SigmarkApp {
    pub state: AppState,
}

impl eframe::App for SigmarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and mode toggles ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: labels / channels / annotations ----
        // Zen mode hides it; the plot gets the whole width.
        let zen = self
            .state
            .session
            .as_ref()
            .is_some_and(|s| s.modes.zen);
        if !zen {
            egui::SidePanel::left("session_panel")
                .default_width(260.0)
                .resizable(true)
                .show(ctx, |ui| {
                    panels::side_panel(ui, &mut self.state);
                });
        }

        // ---- Central panel: traces ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::trace_plot(ui, &mut self.state);
        });
    }
}
