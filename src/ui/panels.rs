use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use super::plot;
use super::preview::PreviewTexture;
use crate::data::calibration::CalibrationState;
use crate::data::model::{
    ComparisonMode, CAPTURE_COUNT_RANGE, SETTLE_MS_RANGE, TICK_COUNT_RANGE,
};
use crate::state::{Action, AppState, Purpose, Screen};

const PLOT_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the workflow toolbar and status line.
pub fn top_bar(ui: &mut Ui, state: &AppState) -> Option<Action> {
    let mut action = None;
    let idle = matches!(state.screen, Screen::Idle);

    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.add_enabled_ui(idle, |ui: &mut Ui| {
            if ui.button("Locate the spectrum").clicked() {
                action = Some(Action::LocateSpectrum);
            }
            if ui.button("Calibrate the axis").clicked() {
                action = Some(Action::StartCalibration);
            }
            if ui.button("Measure blank and sample").clicked() {
                action = Some(Action::StartMeasurement);
            }
        });

        ui.separator();

        if !idle && ui.button("Cancel").clicked() {
            action = Some(Action::Cancel);
        }

        ui.label(format!("Step: {}", state.screen.name()));
    });

    if let Some(msg) = &state.status {
        let color = if msg.is_error {
            Color32::RED
        } else {
            ui.visuals().text_color()
        };
        ui.label(RichText::new(msg.to_string()).color(color));
    }

    action
}

// ---------------------------------------------------------------------------
// Left side panel – instrument state and settings
// ---------------------------------------------------------------------------

/// Render the side panel with the persisted state and measurement settings.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) -> Option<Action> {
    ui.heading("Instrument");
    ui.separator();
    ui.label(format!("Source: {}", state.source_name()));
    ui.label(format!("Config: {}", state.store().dir().display()));
    match &state.roi {
        Some(roi) => ui.label(format!("Region: {roi}")),
        None => ui.label(RichText::new("Region: not set").color(Color32::YELLOW)),
    };
    match &state.calibration {
        CalibrationState::Calibrated(cal) => ui.label(format!("Calibration: {cal}")),
        CalibrationState::Uncalibrated => {
            ui.label(RichText::new("Calibration: none").color(Color32::YELLOW))
        }
    };

    ui.add_space(8.0);
    ui.heading("Settings");
    ui.separator();

    // Edits are saved as they happen.
    let settings = &mut state.settings;
    let mut changed = false;
    ui.strong("Comparison");
    egui::ComboBox::from_id_salt("comparison_mode")
        .selected_text(settings.comparison.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for mode in ComparisonMode::ALL {
                changed |= ui
                    .selectable_value(&mut settings.comparison, mode, mode.to_string())
                    .changed();
            }
        });

    changed |= ui
        .add(
            egui::Slider::new(&mut settings.capture_count, CAPTURE_COUNT_RANGE)
                .text("captures averaged"),
        )
        .changed();
    changed |= ui
        .add(
            egui::DragValue::new(&mut settings.settle_ms)
                .range(SETTLE_MS_RANGE)
                .suffix(" ms settle"),
        )
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut settings.tick_count, TICK_COUNT_RANGE).text("axis labels"))
        .changed();

    changed.then_some(Action::SaveSettings)
}

// ---------------------------------------------------------------------------
// Central panel – one view per workflow step
// ---------------------------------------------------------------------------

/// Render the current workflow step.
pub fn central_panel(
    ui: &mut Ui,
    state: &mut AppState,
    preview: &mut PreviewTexture,
) -> Option<Action> {
    let mut action = None;
    let cal = state.calibration.calibration().copied();
    let tick_count = state.settings.tick_count;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match &mut state.screen {
            Screen::Idle => {
                ui.heading("Spectrophotometer");
                ui.label("1. Locate the spectrum in a camera image.");
                ui.label("2. Calibrate the wavelength axis with a reference specimen.");
                ui.label("3. Measure a blank and a sample, then save the result.");
            }

            Screen::LocatingSpectrum(locate) => {
                ui.heading("Diffraction spectrum location");
                ui.label("Find the diffraction spectrum in the image.");
                let (w, h) = (locate.preview.width(), locate.preview.height());
                egui::Grid::new("roi_inputs").show(ui, |ui: &mut Ui| {
                    ui.label(format!("x location (less than {w})"));
                    ui.text_edit_singleline(&mut locate.x_text);
                    ui.end_row();
                    ui.label("y location (greater than 0)");
                    ui.text_edit_singleline(&mut locate.y_text);
                    ui.end_row();
                    ui.label(format!("length (y + length < {h})"));
                    ui.text_edit_singleline(&mut locate.length_text);
                    ui.end_row();
                });
                ui.horizontal(|ui: &mut Ui| {
                    if ui.button("Update").clicked() {
                        action = Some(Action::ApplyRegion);
                    }
                    if ui.button("Proceed to calibration").clicked() {
                        action = Some(Action::StartCalibration);
                    }
                });
                preview.show(ui, locate, state.roi.as_ref());
            }

            Screen::MeasuringBlank { purpose } => {
                ui.heading("Measure the blank");
                if let Purpose::Sample { title } = purpose {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Title for the results:");
                        ui.text_edit_singleline(title);
                    });
                }
                ui.label("Place the blank cuvette in the holder.");
                if ui.button("Measure blank").clicked() {
                    action = Some(Action::MeasureBlank);
                }
            }

            Screen::MeasuringSample { .. } => {
                ui.heading("Measure the sample");
                ui.label("Place the sample cuvette in the holder.");
                if ui.button("Measure sample").clicked() {
                    action = Some(Action::MeasureSample);
                }
            }

            Screen::Calibrating(cal_state) => {
                ui.heading("Calibrate the x axis");
                ui.allocate_ui(egui::vec2(ui.available_width(), PLOT_HEIGHT), |ui: &mut Ui| {
                    plot::result_plot(
                        ui,
                        "calibration_plot",
                        "Calibration",
                        &cal_state.result,
                        cal.as_ref(),
                        tick_count,
                    );
                });
                ui.allocate_ui(egui::vec2(ui.available_width(), PLOT_HEIGHT), |ui: &mut Ui| {
                    plot::intensity_plot(ui, &cal_state.blank, &cal_state.sample);
                });
                egui::Grid::new("cal_inputs").show(ui, |ui: &mut Ui| {
                    ui.label("Wavelength at left edge");
                    ui.text_edit_singleline(&mut cal_state.min_text);
                    ui.end_row();
                    ui.label("Wavelength at right edge");
                    ui.text_edit_singleline(&mut cal_state.max_text);
                    ui.end_row();
                });
                ui.horizontal(|ui: &mut Ui| {
                    if ui.button("Update calibration").clicked() {
                        action = Some(Action::ApplyCalibration);
                    }
                    if ui
                        .button("The graph looks correct; end calibration")
                        .clicked()
                    {
                        action = Some(Action::FinishCalibration);
                    }
                });
            }

            Screen::ReviewingResult { title, result } => {
                ui.heading(title.as_str());
                ui.allocate_ui(egui::vec2(ui.available_width(), PLOT_HEIGHT), |ui: &mut Ui| {
                    plot::result_plot(ui, "result_plot", title, result, cal.as_ref(), tick_count);
                });
                ui.label("Here is the result. Do you want to save it?");
                ui.horizontal(|ui: &mut Ui| {
                    if ui.button("Yes; save the result…").clicked() {
                        action = save_file_dialog(title).map(Action::SaveResult);
                    }
                    if ui.button("No; discard the result").clicked() {
                        action = Some(Action::DiscardResult);
                    }
                });
                ui.separator();

                let wavelengths = cal.map(|c| result.wavelengths(&c));
                TableBuilder::new(ui)
                    .striped(true)
                    .vscroll(false)
                    .column(Column::auto().at_least(120.0))
                    .column(Column::remainder())
                    .header(20.0, |mut header| {
                        header.col(|ui: &mut Ui| {
                            ui.strong("Wavelength (nm)");
                        });
                        header.col(|ui: &mut Ui| {
                            ui.strong(result.mode().quantity());
                        });
                    })
                    .body(|body| {
                        body.rows(18.0, result.len(), |mut row| {
                            let i = row.index();
                            row.col(|ui: &mut Ui| {
                                match &wavelengths {
                                    Some(w) => ui.label(format!("{:.2}", w[i])),
                                    None => ui.label(format!("px {i}")),
                                };
                            });
                            row.col(|ui: &mut Ui| {
                                ui.label(format!("{:.4}", result.values()[i]));
                            });
                        });
                    });
            }
        });

    action
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

fn save_file_dialog(title: &str) -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select location to save the data")
        .add_filter("CSV", &["csv"])
        .set_file_name(format!("{title}.csv"))
        .save_file()
}
