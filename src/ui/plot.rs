use eframe::egui::Ui;
use egui_plot::{GridMark, Legend, Line, Plot, PlotPoints};

use crate::color::SeriesColors;
use crate::data::calibration::{tick_labels, Tick};
use crate::data::model::{Calibration, MeasurementResult, SampleRow};

// ---------------------------------------------------------------------------
// Result plot
// ---------------------------------------------------------------------------

/// `(x, y)` pairs for a result: wavelength on x when calibrated, pixel index
/// otherwise. Non-finite values are skipped so the line stays drawable.
pub fn result_points(result: &MeasurementResult, cal: Option<&Calibration>) -> Vec<[f64; 2]> {
    let xs: Vec<f64> = match cal {
        Some(cal) => result.wavelengths(cal),
        None => (0..result.len()).map(|i| i as f64).collect(),
    };
    xs.into_iter()
        .zip(result.values())
        .filter(|(_, y)| y.is_finite())
        .map(|(x, &y)| [x, y])
        .collect()
}

/// Label for the axis mark at `value`: the two-decimal text of the matching
/// tick, or nothing for a mark without one.
pub fn tick_text(ticks: &[Tick], value: f64) -> String {
    let tolerance = 1e-9 * value.abs().max(1.0);
    ticks
        .iter()
        .find(|t| (t.wavelength - value).abs() <= tolerance)
        .map(|t| t.label.clone())
        .unwrap_or_default()
}

/// Render a measurement result with calibrated wavelength ticks.
pub fn result_plot(
    ui: &mut Ui,
    id: &str,
    title: &str,
    result: &MeasurementResult,
    cal: Option<&Calibration>,
    tick_count: usize,
) {
    let colors = SeriesColors::default();
    let points: PlotPoints = result_points(result, cal).into_iter().collect();

    let mut plot = Plot::new(id)
        .legend(Legend::default())
        .y_axis_label(result.mode().quantity())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    plot = match cal {
        Some(cal) => {
            let ticks = tick_labels(result.len(), cal, tick_count);
            let step = match ticks.len() {
                0 | 1 => cal.max() - cal.min(),
                n => (cal.max() - cal.min()) / (n - 1) as f64,
            };
            let marks: Vec<GridMark> = ticks
                .iter()
                .map(|t| GridMark {
                    value: t.wavelength,
                    step_size: step,
                })
                .collect();
            plot.x_axis_label("Wavelength (nm)")
                .x_grid_spacer(move |_input| marks.clone())
                .x_axis_formatter(move |mark, _range| tick_text(&ticks, mark.value))
        }
        None => plot.x_axis_label("Pixel (uncalibrated)"),
    };

    plot.show(ui, |plot_ui| {
        plot_ui.line(
            Line::new(points)
                .name(title)
                .color(colors.result)
                .width(1.5),
        );
    });
}

// ---------------------------------------------------------------------------
// Raw intensity plot (calibration screen)
// ---------------------------------------------------------------------------

fn row_points(row: &SampleRow) -> PlotPoints {
    row.values()
        .iter()
        .enumerate()
        .map(|(i, &v)| [i as f64, f64::from(v)])
        .collect()
}

/// Blank and sample intensities against pixel index, for judging the region.
pub fn intensity_plot(ui: &mut Ui, blank: &SampleRow, sample: &SampleRow) {
    let colors = SeriesColors::default();
    Plot::new("intensity_plot")
        .legend(Legend::default())
        .x_axis_label("Pixel")
        .y_axis_label("Intensity")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(row_points(blank)).name("Blank").color(colors.blank));
            plot_ui.line(Line::new(row_points(sample)).name("Sample").color(colors.sample));
        });
}
