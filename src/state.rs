use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;

use crate::capture::{capture_averaged, CaptureRole, FrameSource};
use crate::data::calibration::CalibrationState;
use crate::data::config::ConfigStore;
use crate::data::export::save_csv;
use crate::data::model::{MeasurementResult, RegionOfInterest, SampleRow, Settings};
use crate::data::pipeline::{compute_measurement, extract_row};

// ---------------------------------------------------------------------------
// Screens – the operator workflow as a state machine
// ---------------------------------------------------------------------------

/// Why a blank/sample pair is being measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purpose {
    /// Measure a reference specimen, then fit the wavelength axis to it.
    Calibration,
    /// Measure a specimen and offer the result for export.
    Sample { title: String },
}

/// Payload of [`Screen::LocatingSpectrum`].
#[derive(Debug)]
pub struct LocateState {
    /// Colour capture the operator marks the spectrum on.
    pub preview: RgbImage,
    pub x_text: String,
    pub y_text: String,
    pub length_text: String,
    /// Bumped whenever the preview or the drawn region changes.
    pub revision: u64,
}

/// Payload of [`Screen::Calibrating`].
#[derive(Debug)]
pub struct CalibrateState {
    pub blank: SampleRow,
    pub sample: SampleRow,
    pub result: MeasurementResult,
    pub min_text: String,
    pub max_text: String,
}

#[derive(Debug)]
pub enum Screen {
    Idle,
    LocatingSpectrum(LocateState),
    MeasuringBlank { purpose: Purpose },
    MeasuringSample { purpose: Purpose, blank: SampleRow },
    Calibrating(CalibrateState),
    ReviewingResult { title: String, result: MeasurementResult },
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Idle => "idle",
            Screen::LocatingSpectrum(_) => "locating the spectrum",
            Screen::MeasuringBlank { .. } => "measuring the blank",
            Screen::MeasuringSample { .. } => "measuring the sample",
            Screen::Calibrating(_) => "calibrating",
            Screen::ReviewingResult { .. } => "reviewing a result",
        }
    }
}

fn unavailable(what: &str, screen: &Screen) -> anyhow::Error {
    anyhow!("{what} is not available while {}", screen.name())
}

/// Operator requests. Each one is a candidate transition of [`Screen`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    LocateSpectrum,
    ApplyRegion,
    StartCalibration,
    StartMeasurement,
    MeasureBlank,
    MeasureSample,
    ApplyCalibration,
    FinishCalibration,
    SaveResult(PathBuf),
    DiscardResult,
    SaveSettings,
    Cancel,
}

/// Status line shown under the toolbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub screen: Screen,

    /// Current calibration, mirrored in `cal.json`.
    pub calibration: CalibrationState,

    /// Current region of interest, mirrored in `loc.json`.
    pub roi: Option<RegionOfInterest>,

    /// Measurement preferences (edited in the side panel, saved on request).
    pub settings: Settings,

    /// Status / error message shown in the UI.
    pub status: Option<StatusMessage>,

    store: ConfigStore,
    source: Box<dyn FrameSource>,
}

impl AppState {
    /// Load persisted records, falling back to uncalibrated / no region /
    /// default settings when a record is missing.
    pub fn new(store: ConfigStore, source: Box<dyn FrameSource>) -> Self {
        let calibration = CalibrationState::load(&store);
        let roi = match store.load_roi() {
            Ok(roi) => {
                log::info!("Loaded region of interest {roi}");
                Some(roi)
            }
            Err(e) => {
                log::warn!("No region of interest yet: {e}");
                None
            }
        };
        let settings = store.load_settings().unwrap_or_else(|e| {
            log::info!("Using default settings: {e}");
            Settings::default()
        });

        Self {
            screen: Screen::Idle,
            calibration,
            roi,
            settings,
            status: None,
            store,
            source,
        }
    }

    pub fn source_name(&self) -> String {
        self.source.name()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Apply `action` and report the outcome in [`Self::status`].
    ///
    /// A failed transition leaves the screen where it was, so the operator
    /// can correct the input and retry.
    pub fn dispatch(&mut self, action: Action) {
        log::debug!("{action:?} while {}", self.screen.name());
        if let Err(e) = self.transition(action) {
            log::error!("{e:#}");
            self.status = Some(StatusMessage {
                text: format!("Error: {e:#}"),
                is_error: true,
            });
        }
    }

    fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{text}");
        self.status = Some(StatusMessage {
            text,
            is_error: false,
        });
    }

    /// Apply `action`, returning the error instead of reporting it.
    pub fn transition(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Cancel => {
                self.screen = Screen::Idle;
                self.status = None;
                Ok(())
            }
            Action::SaveSettings => {
                self.settings = self.settings.clone().clamped();
                self.store.save_settings(&self.settings)?;
                log::debug!("Settings saved: {:?}", self.settings);
                Ok(())
            }
            Action::LocateSpectrum => self.locate_spectrum(),
            Action::ApplyRegion => self.apply_region(),
            Action::StartCalibration => self.start(Purpose::Calibration),
            Action::StartMeasurement => self.start(Purpose::Sample {
                title: String::new(),
            }),
            Action::MeasureBlank => self.measure_blank(),
            Action::MeasureSample => self.measure_sample(),
            Action::ApplyCalibration => self.apply_calibration(),
            Action::FinishCalibration => self.finish_calibration(),
            Action::SaveResult(path) => self.save_result(path),
            Action::DiscardResult => match self.screen {
                Screen::ReviewingResult { .. } => {
                    self.screen = Screen::Idle;
                    self.notify("Result discarded");
                    Ok(())
                }
                _ => Err(unavailable("discarding a result", &self.screen)),
            },
        }
    }

    // -- Locating the spectrum --

    fn locate_spectrum(&mut self) -> Result<()> {
        if !matches!(self.screen, Screen::Idle) {
            return Err(unavailable("locating the spectrum", &self.screen));
        }
        self.source.prepare(CaptureRole::Preview);
        let frame = self
            .source
            .capture_color()
            .context("capturing the preview image")?;
        log::info!("Preview captured: {}", frame.shape());

        let (x_text, y_text, length_text) = match &self.roi {
            Some(roi) => (roi.x.to_string(), roi.y.to_string(), roi.length.to_string()),
            None => Default::default(),
        };
        self.screen = Screen::LocatingSpectrum(LocateState {
            preview: frame.into_rgb(),
            x_text,
            y_text,
            length_text,
            revision: 0,
        });
        self.status = None;
        Ok(())
    }

    fn apply_region(&mut self) -> Result<()> {
        let locate = match &mut self.screen {
            Screen::LocatingSpectrum(locate) => locate,
            other => return Err(unavailable("updating the region", other)),
        };
        let roi = RegionOfInterest::parse(&locate.x_text, &locate.y_text, &locate.length_text)?;
        roi.validate(locate.preview.width(), locate.preview.height())?;
        self.store.save_roi(&roi)?;
        locate.revision += 1;
        self.roi = Some(roi);
        self.notify(format!("Region of interest set to {roi}"));
        Ok(())
    }

    // -- Blank / sample measurement --

    fn start(&mut self, purpose: Purpose) -> Result<()> {
        let from_locate = matches!(self.screen, Screen::LocatingSpectrum(_));
        let allowed = match purpose {
            Purpose::Calibration => matches!(self.screen, Screen::Idle) || from_locate,
            Purpose::Sample { .. } => matches!(self.screen, Screen::Idle),
        };
        if !allowed {
            return Err(unavailable("starting a measurement", &self.screen));
        }
        if self.roi.is_none() {
            bail!("locate the spectrum before measuring");
        }
        if matches!(purpose, Purpose::Sample { .. }) && self.calibration.calibration().is_none() {
            bail!("calibrate the wavelength axis before measuring samples");
        }
        self.screen = Screen::MeasuringBlank { purpose };
        self.status = None;
        Ok(())
    }

    /// Averaged grayscale capture sliced at the current region.
    fn capture_row(&mut self, role: CaptureRole) -> Result<SampleRow> {
        let roi = self.roi.context("no region of interest set")?;
        self.source.prepare(role);
        let frame = capture_averaged(
            self.source.as_mut(),
            self.settings.capture_count,
            self.settings.settle(),
        )?;
        Ok(extract_row(&frame, &roi)?)
    }

    fn measure_blank(&mut self) -> Result<()> {
        let purpose = match &self.screen {
            Screen::MeasuringBlank { purpose } => purpose.clone(),
            other => return Err(unavailable("measuring the blank", other)),
        };
        let blank = self.capture_row(CaptureRole::Blank).context("measuring the blank")?;
        self.screen = Screen::MeasuringSample { purpose, blank };
        self.notify("Blank measured; insert the sample");
        Ok(())
    }

    fn measure_sample(&mut self) -> Result<()> {
        let (purpose, blank) = match &self.screen {
            Screen::MeasuringSample { purpose, blank } => (purpose.clone(), blank.clone()),
            other => return Err(unavailable("measuring the sample", other)),
        };
        let sample = self.capture_row(CaptureRole::Sample).context("measuring the sample")?;
        let result = compute_measurement(&blank, &sample, self.settings.comparison)?;

        let warning = result.warning();
        self.screen = match purpose {
            Purpose::Calibration => {
                let (min_text, max_text) = match self.calibration.calibration() {
                    Some(cal) => (cal.min().to_string(), cal.max().to_string()),
                    None => Default::default(),
                };
                Screen::Calibrating(CalibrateState {
                    blank,
                    sample,
                    result,
                    min_text,
                    max_text,
                })
            }
            Purpose::Sample { title } => {
                let title = match title.trim() {
                    "" => "Measurement".to_string(),
                    t => t.to_string(),
                };
                Screen::ReviewingResult { title, result }
            }
        };
        match warning {
            Some(w) => {
                self.status = Some(StatusMessage {
                    text: format!("Warning: {w}"),
                    is_error: true,
                })
            }
            None => self.notify("Sample measured"),
        }
        Ok(())
    }

    // -- Calibration --

    fn apply_calibration(&mut self) -> Result<()> {
        let cal_state = match &self.screen {
            Screen::Calibrating(cal_state) => cal_state,
            other => return Err(unavailable("updating the calibration", other)),
        };
        let cal = self
            .calibration
            .apply_update(&self.store, &cal_state.min_text, &cal_state.max_text)?;
        self.notify(format!("Calibration set to {cal}"));
        Ok(())
    }

    fn finish_calibration(&mut self) -> Result<()> {
        if !matches!(self.screen, Screen::Calibrating(_)) {
            return Err(unavailable("finishing calibration", &self.screen));
        }
        if self.calibration.calibration().is_none() {
            bail!("enter and apply a wavelength range first");
        }
        self.screen = Screen::Idle;
        self.notify("Calibration finished");
        Ok(())
    }

    // -- Result review --

    fn save_result(&mut self, path: PathBuf) -> Result<()> {
        let result = match &self.screen {
            Screen::ReviewingResult { result, .. } => result,
            other => return Err(unavailable("saving a result", other)),
        };
        let cal = self
            .calibration
            .calibration()
            .context("no calibration to label the wavelengths")?;
        save_csv(&path, result, cal)?;
        self.screen = Screen::Idle;
        self.notify(format!("Saved {}", path.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SyntheticSource;
    use crate::data::model::{Calibration, ComparisonMode};
    use tempfile::TempDir;

    fn fast_settings() -> Settings {
        Settings {
            capture_count: 1,
            settle_ms: 0,
            ..Settings::default()
        }
    }

    fn new_state(dir: &TempDir) -> AppState {
        let store = ConfigStore::new(dir.path());
        store.save_settings(&fast_settings()).unwrap();
        let source = SyntheticSource::default().with_noise(0.0);
        AppState::new(store, Box::new(source))
    }

    fn set_region(state: &mut AppState, roi: RegionOfInterest) {
        let Screen::LocatingSpectrum(locate) = &mut state.screen else {
            panic!("expected the locate screen");
        };
        locate.x_text = roi.x.to_string();
        locate.y_text = roi.y.to_string();
        locate.length_text = roi.length.to_string();
    }

    #[test]
    fn test_fresh_start_is_idle_and_uncalibrated() {
        let dir = TempDir::new().unwrap();
        let state = new_state(&dir);
        assert!(matches!(state.screen, Screen::Idle));
        assert_eq!(state.calibration, CalibrationState::Uncalibrated);
        assert_eq!(state.roi, None);
        assert_eq!(state.settings, fast_settings());
    }

    #[test]
    fn test_measurement_requires_region() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state.dispatch(Action::StartCalibration);
        assert!(matches!(state.screen, Screen::Idle));
        assert!(state.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_rejected_region_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state.transition(Action::LocateSpectrum).unwrap();

        set_region(&mut state, RegionOfInterest { x: 10, y: 470, length: 20 });
        let err = state.transition(Action::ApplyRegion).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
        assert_eq!(state.roi, None);
        assert!(state.store().load_roi().is_err());
        assert!(matches!(state.screen, Screen::LocatingSpectrum(_)));

        if let Screen::LocatingSpectrum(locate) = &mut state.screen {
            locate.x_text = "ten".to_string();
        }
        assert!(state.transition(Action::ApplyRegion).is_err());
    }

    #[test]
    fn test_calibration_then_sample_workflow() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        let roi = SyntheticSource::spectrum_region();

        state.transition(Action::LocateSpectrum).unwrap();
        set_region(&mut state, roi);
        state.transition(Action::ApplyRegion).unwrap();
        assert_eq!(state.store().load_roi().unwrap(), roi);

        // Calibration pass.
        state.transition(Action::StartCalibration).unwrap();
        state.transition(Action::MeasureBlank).unwrap();
        state.transition(Action::MeasureSample).unwrap();
        assert!(state.transition(Action::FinishCalibration).is_err());
        let Screen::Calibrating(cal_state) = &mut state.screen else {
            panic!("expected the calibration screen");
        };
        assert_eq!(cal_state.result.len(), roi.length);
        cal_state.min_text = "700".to_string();
        cal_state.max_text = "400".to_string();
        assert!(state.transition(Action::ApplyCalibration).is_err());
        assert_eq!(state.calibration, CalibrationState::Uncalibrated);

        if let Screen::Calibrating(cal_state) = &mut state.screen {
            cal_state.min_text = "400".to_string();
            cal_state.max_text = "700".to_string();
        }
        state.transition(Action::ApplyCalibration).unwrap();
        state.transition(Action::FinishCalibration).unwrap();
        assert!(matches!(state.screen, Screen::Idle));
        assert_eq!(
            state.store().load_calibration().unwrap(),
            Calibration::new(400.0, 700.0).unwrap()
        );

        // Sample pass.
        state.transition(Action::StartMeasurement).unwrap();
        if let Screen::MeasuringBlank { purpose: Purpose::Sample { title } } = &mut state.screen {
            *title = "Dye A".to_string();
        }
        state.transition(Action::MeasureBlank).unwrap();
        state.transition(Action::MeasureSample).unwrap();
        let Screen::ReviewingResult { title, result } = &state.screen else {
            panic!("expected the review screen");
        };
        assert_eq!(title, "Dye A");
        assert_eq!(result.mode(), ComparisonMode::LogRatio);

        let csv_path = dir.path().join("dye.csv");
        state.transition(Action::SaveResult(csv_path.clone())).unwrap();
        assert!(matches!(state.screen, Screen::Idle));
        let csv = std::fs::read_to_string(csv_path).unwrap();
        assert!(csv.starts_with("Wavelength (nm),Absorbance\n400,"));
        assert_eq!(csv.lines().count(), roi.length + 1);
    }

    #[test]
    fn test_raw_difference_setting_is_used() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());
        store.save_roi(&SyntheticSource::spectrum_region()).unwrap();
        store
            .save_calibration(&Calibration::new(400.0, 700.0).unwrap())
            .unwrap();
        store
            .save_settings(&Settings {
                comparison: ComparisonMode::RawDifference,
                ..fast_settings()
            })
            .unwrap();
        let mut state = AppState::new(store, Box::new(SyntheticSource::default()));

        state.transition(Action::StartMeasurement).unwrap();
        state.transition(Action::MeasureBlank).unwrap();
        state.transition(Action::MeasureSample).unwrap();
        let Screen::ReviewingResult { title, result } = &state.screen else {
            panic!("expected the review screen");
        };
        assert_eq!(title, "Measurement");
        assert_eq!(result.mode(), ComparisonMode::RawDifference);

        state.transition(Action::DiscardResult).unwrap();
        assert!(matches!(state.screen, Screen::Idle));
    }

    #[test]
    fn test_out_of_order_actions_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        for action in [
            Action::ApplyRegion,
            Action::MeasureBlank,
            Action::MeasureSample,
            Action::ApplyCalibration,
            Action::DiscardResult,
        ] {
            assert!(state.transition(action).is_err());
            assert!(matches!(state.screen, Screen::Idle));
        }
    }

    #[test]
    fn test_edited_settings_are_persisted() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state.settings.comparison = ComparisonMode::RawDifference;
        state.settings.tick_count = 40;
        state.dispatch(Action::SaveSettings);

        assert_eq!(state.settings.tick_count, 15);
        assert_eq!(state.store().load_settings().unwrap(), state.settings);
        let reopened = AppState::new(
            ConfigStore::new(dir.path()),
            Box::new(SyntheticSource::default()),
        );
        assert_eq!(reopened.settings.comparison, ComparisonMode::RawDifference);
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state.dispatch(Action::LocateSpectrum);
        assert!(matches!(state.screen, Screen::LocatingSpectrum(_)));
        state.dispatch(Action::Cancel);
        assert!(matches!(state.screen, Screen::Idle));
        assert_eq!(state.status, None);
    }
}
