use super::config::ConfigStore;
use super::error::Result;
use super::model::Calibration;

// ---------------------------------------------------------------------------
// Pixel index → wavelength
// ---------------------------------------------------------------------------

/// `count` evenly spaced wavelengths covering `[cal.min, cal.max]` inclusive.
///
/// This is the single axis formula: plot ticks and the CSV wavelength column
/// are both derived from it.
pub fn wavelength_axis(count: usize, cal: &Calibration) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![cal.min()],
        n => {
            let step = (cal.max() - cal.min()) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    // Pin the last label to max to avoid accumulated rounding.
                    if i == n - 1 {
                        cal.max()
                    } else {
                        cal.min() + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// A labelled wavelength on the plot axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub wavelength: f64,
    /// Two-decimal text drawn under the mark.
    pub label: String,
}

/// `density` display labels for a series of `count` points.
///
/// Wavelengths come from [`wavelength_axis`], so a tick sitting on a data
/// point shows exactly the wavelength exported for that point. An empty
/// series gets no ticks.
pub fn tick_labels(count: usize, cal: &Calibration, density: usize) -> Vec<Tick> {
    if count == 0 {
        return Vec::new();
    }
    wavelength_axis(density, cal)
        .into_iter()
        .map(|wavelength| Tick {
            wavelength,
            label: format!("{wavelength:.2}"),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Calibration lifecycle
// ---------------------------------------------------------------------------

/// Calibration as held by the running application.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Uncalibrated,
    Calibrated(Calibration),
}

impl CalibrationState {
    /// Start-up state: whatever `cal.json` holds, or uncalibrated.
    pub fn load(store: &ConfigStore) -> Self {
        match store.load_calibration() {
            Ok(cal) => {
                log::info!("Loaded calibration {cal}");
                CalibrationState::Calibrated(cal)
            }
            Err(e) => {
                log::warn!("Starting uncalibrated: {e}");
                CalibrationState::Uncalibrated
            }
        }
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        match self {
            CalibrationState::Uncalibrated => None,
            CalibrationState::Calibrated(cal) => Some(cal),
        }
    }

    /// Validate operator input, persist it, then adopt it.
    ///
    /// On any failure neither `self` nor the stored record changes.
    pub fn apply_update(
        &mut self,
        store: &ConfigStore,
        min_text: &str,
        max_text: &str,
    ) -> Result<Calibration> {
        let cal = Calibration::parse(min_text, max_text)?;
        store.save_calibration(&cal)?;
        log::info!("Calibration updated to {cal}");
        *self = CalibrationState::Calibrated(cal);
        Ok(cal)
    }
}
