use std::fmt;
use std::ops::{Range, RangeInclusive};

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use super::calibration::wavelength_axis;
use super::error::{MeasurementError, MeasurementWarning, Result};

// ---------------------------------------------------------------------------
// Calibration – two-point pixel → wavelength mapping
// ---------------------------------------------------------------------------

/// Wavelengths (nm) at the first and last pixel of the region of interest.
///
/// Invariant: both bounds are finite and `min < max`. The only constructors
/// are [`Calibration::new`] and [`Calibration::parse`], which enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    min: f64,
    max: f64,
}

impl Calibration {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(MeasurementError::InvalidCalibrationInput(format!(
                "bounds must be finite numbers (got {min}, {max})"
            )));
        }
        if min >= max {
            return Err(MeasurementError::InvalidCalibrationInput(format!(
                "minimum {min} must be less than maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Parse operator text entries, e.g. from the calibration screen.
    pub fn parse(min_text: &str, max_text: &str) -> Result<Self> {
        let parse = |label: &str, text: &str| {
            text.trim().parse::<f64>().map_err(|_| {
                MeasurementError::InvalidCalibrationInput(format!(
                    "{label} '{text}' is not a number"
                ))
            })
        };
        Self::new(parse("minimum", min_text)?, parse("maximum", max_text)?)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Re-check the invariant on a value that bypassed the constructors
    /// (deserialized from disk).
    pub(crate) fn revalidate(self) -> Result<Self> {
        Self::new(self.min, self.max)
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} – {:.2} nm", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// RegionOfInterest – the pixel strip holding the spectrum
// ---------------------------------------------------------------------------

/// Column `x`, rows `[y, y + length)` of the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub x: usize,
    pub y: usize,
    pub length: usize,
}

impl RegionOfInterest {
    /// Parse operator text entries. Range checks happen in [`Self::validate`].
    pub fn parse(x_text: &str, y_text: &str, length_text: &str) -> Result<Self> {
        let parse = |label: &str, text: &str| {
            text.trim().parse::<usize>().map_err(|_| {
                MeasurementError::InvalidRegionInput(format!(
                    "{label} '{text}' is not a non-negative integer"
                ))
            })
        };
        Ok(Self {
            x: parse("x", x_text)?,
            y: parse("y", y_text)?,
            length: parse("length", length_text)?,
        })
    }

    /// Check the region against a frame of `width` x `height` pixels.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        let fits_columns = self.x < width as usize;
        let fits_rows = self
            .y
            .checked_add(self.length)
            .is_some_and(|end| end < height as usize);
        if self.y > 0 && self.length > 0 && fits_columns && fits_rows {
            Ok(())
        } else {
            Err(MeasurementError::RegionOutOfBounds {
                x: self.x,
                y: self.y,
                length: self.length,
                width,
                height,
            })
        }
    }

    /// Whether the frame-independent part of the invariant holds.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.y > 0 && self.length > 0
    }

    pub fn rows(&self) -> Range<usize> {
        self.y..self.y + self.length
    }
}

impl fmt::Display for RegionOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}, y={}..{}", self.x, self.y, self.y + self.length)
    }
}

// ---------------------------------------------------------------------------
// RawFrame – one capture from the sensor
// ---------------------------------------------------------------------------

/// An 8-bit sensor capture, either single-channel or RGB.
#[derive(Debug)]
pub enum RawFrame {
    Gray(GrayImage),
    Color(RgbImage),
}

impl RawFrame {
    pub fn width(&self) -> u32 {
        match self {
            RawFrame::Gray(img) => img.width(),
            RawFrame::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            RawFrame::Gray(img) => img.height(),
            RawFrame::Color(img) => img.height(),
        }
    }

    /// Short shape description used in logs and error messages.
    pub fn shape(&self) -> String {
        let kind = match self {
            RawFrame::Gray(_) => "gray",
            RawFrame::Color(_) => "rgb",
        };
        format!("{}x{} {kind}", self.width(), self.height())
    }

    /// Intensity used for measurements at `(col, row)`.
    ///
    /// Colour frames report the green channel, which is also how grayscale
    /// captures are derived from the colour sensor.
    pub fn intensity(&self, col: u32, row: u32) -> u8 {
        match self {
            RawFrame::Gray(img) => img.get_pixel(col, row).0[0],
            RawFrame::Color(img) => img.get_pixel(col, row).0[1],
        }
    }

    /// Convert to RGB for display, replicating gray levels.
    pub fn into_rgb(self) -> RgbImage {
        match self {
            RawFrame::Color(img) => img,
            RawFrame::Gray(img) => image::DynamicImage::ImageLuma8(img).to_rgb8(),
        }
    }
}

// ---------------------------------------------------------------------------
// SampleRow – pixels extracted along the region of interest
// ---------------------------------------------------------------------------

/// Pixel values along the region, widened to `i32` so that blank/sample
/// arithmetic cannot wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    values: Vec<i32>,
}

impl SampleRow {
    pub fn new(values: Vec<i32>) -> Self {
        Self { values }
    }

    pub fn from_pixels(pixels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            values: pixels.into_iter().map(i32::from).collect(),
        }
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ComparisonMode – how blank and sample are combined
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// `log10(blank / sample)`, i.e. absorbance.
    #[default]
    LogRatio,
    /// `blank - sample`.
    RawDifference,
}

impl ComparisonMode {
    pub const ALL: [ComparisonMode; 2] = [ComparisonMode::LogRatio, ComparisonMode::RawDifference];

    /// Quantity name used for the plot axis and the CSV column.
    pub fn quantity(&self) -> &'static str {
        match self {
            ComparisonMode::LogRatio => "Absorbance",
            ComparisonMode::RawDifference => "Intensity difference",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonMode::LogRatio => write!(f, "Log ratio (absorbance)"),
            ComparisonMode::RawDifference => write!(f, "Raw difference"),
        }
    }
}

// ---------------------------------------------------------------------------
// MeasurementResult – one value per pixel of the region
// ---------------------------------------------------------------------------

/// Output of a blank/sample comparison. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementResult {
    mode: ComparisonMode,
    values: Vec<f64>,
    warning: Option<MeasurementWarning>,
}

impl MeasurementResult {
    pub(crate) fn new(mode: ComparisonMode, values: Vec<f64>) -> Self {
        let mut non_finite = values.iter().enumerate().filter(|(_, v)| !v.is_finite());
        let warning = non_finite.next().map(|(first_index, _)| {
            MeasurementWarning::NonFiniteResult {
                count: 1 + non_finite.count(),
                first_index,
            }
        });
        Self {
            mode,
            values,
            warning,
        }
    }

    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn warning(&self) -> Option<MeasurementWarning> {
        self.warning
    }

    /// Wavelength of every point, on the same axis used for CSV export.
    pub fn wavelengths(&self, cal: &Calibration) -> Vec<f64> {
        wavelength_axis(self.values.len(), cal)
    }
}

// ---------------------------------------------------------------------------
// Settings – operator preferences
// ---------------------------------------------------------------------------

/// Measurement preferences persisted in `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub comparison: ComparisonMode,

    /// Grayscale captures averaged per blank or sample (1 = single capture).
    #[serde(default = "default_capture_count")]
    pub capture_count: usize,

    /// Delay between averaged captures in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Number of wavelength labels on the plot axis.
    #[serde(default = "default_tick_count")]
    pub tick_count: usize,
}

pub const CAPTURE_COUNT_RANGE: RangeInclusive<usize> = 1..=10;
pub const SETTLE_MS_RANGE: RangeInclusive<u64> = 0..=2000;
pub const TICK_COUNT_RANGE: RangeInclusive<usize> = 2..=15;

fn default_capture_count() -> usize {
    3
}
fn default_settle_ms() -> u64 {
    100
}
fn default_tick_count() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            comparison: ComparisonMode::default(),
            capture_count: default_capture_count(),
            settle_ms: default_settle_ms(),
            tick_count: default_tick_count(),
        }
    }
}

impl Settings {
    /// Bring every field into the range the settings panel offers.
    pub fn clamped(self) -> Self {
        let clamp = |v: usize, r: &RangeInclusive<usize>| v.clamp(*r.start(), *r.end());
        Self {
            comparison: self.comparison,
            capture_count: clamp(self.capture_count, &CAPTURE_COUNT_RANGE),
            settle_ms: self
                .settle_ms
                .clamp(*SETTLE_MS_RANGE.start(), *SETTLE_MS_RANGE.end()),
            tick_count: clamp(self.tick_count, &TICK_COUNT_RANGE),
        }
    }

    pub fn settle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settle_ms)
    }
}
