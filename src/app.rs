use eframe::egui;

use crate::state::{Action, AppState};
use crate::ui::panels;
use crate::ui::preview::PreviewTexture;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustySpectroApp {
    pub state: AppState,
    preview: PreviewTexture,
}

impl RustySpectroApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            preview: PreviewTexture::default(),
        }
    }

    fn handle(&mut self, action: Action) {
        if matches!(action, Action::LocateSpectrum) {
            self.preview.invalidate();
        }
        self.state.dispatch(action);
    }
}

impl eframe::App for RustySpectroApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: workflow toolbar ----
        let top = egui::TopBottomPanel::top("top_bar")
            .show(ctx, |ui| panels::top_bar(ui, &self.state))
            .inner;

        // ---- Left side panel: instrument state and settings ----
        let side = egui::SidePanel::left("settings_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| panels::side_panel(ui, &mut self.state))
            .inner;

        // ---- Central panel: current step ----
        let central = egui::CentralPanel::default()
            .show(ctx, |ui| {
                panels::central_panel(ui, &mut self.state, &mut self.preview)
            })
            .inner;

        for action in [top, side, central].into_iter().flatten() {
            self.handle(action);
        }
    }
}
