use eframe::egui;
use env_logger::Env;

use rusty_spectro::app::RustySpectroApp;
use rusty_spectro::capture::source_from_env;
use rusty_spectro::data::config::ConfigStore;
use rusty_spectro::state::AppState;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let store = ConfigStore::from_env();
    log::info!("Using configuration directory {}", store.dir().display());
    let state = AppState::new(store, source_from_env());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Spectro – Spectrophotometer",
        options,
        Box::new(|_cc| Ok(Box::new(RustySpectroApp::new(state)))),
    )
}
