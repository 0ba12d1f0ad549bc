use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Measurement error taxonomy
// ---------------------------------------------------------------------------

/// Errors raised by the measurement pipeline and its persisted state.
///
/// Every variant is recoverable by the operator: the workflow reports it and
/// waits for corrected input. `NonFiniteResult` is not an error; see
/// [`MeasurementWarning`].
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("config record {path} is missing or corrupt: {reason}")]
    ConfigMissingOrCorrupt { path: PathBuf, reason: String },

    #[error(
        "region x={x}, y={y}, length={length} does not fit a {width}x{height} frame \
         (need 0 < y, 0 < length, x < {width}, y + length < {height})"
    )]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        length: usize,
        width: u32,
        height: u32,
    },

    #[error("invalid region input: {0}")]
    InvalidRegionInput(String),

    #[error("blank has {blank} points but sample has {sample}")]
    LengthMismatch { blank: usize, sample: usize },

    #[error("invalid calibration input: {0}")]
    InvalidCalibrationInput(String),

    #[error("no frames to average")]
    NoFrames,

    #[error("frame {index} is {found}, expected {expected}")]
    FrameShapeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MeasurementError>;

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Conditions that still yield a best-effort result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeasurementWarning {
    /// Some values are `inf` or `NaN`, typically a zero-intensity sample pixel.
    #[error("{count} non-finite value(s) in result, first at pixel {first_index}")]
    NonFiniteResult { count: usize, first_index: usize },
}
