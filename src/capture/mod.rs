/// Capture layer: where raw frames come from.
///
/// ```text
///   SyntheticSource ─┐
///                    ├─▶ FrameSource ──▶ capture_averaged ──▶ RawFrame
///   DirectorySource ─┘
/// ```
///
/// Hardware drivers implement [`FrameSource`]; the pipeline only sees
/// [`RawFrame`]s.
pub mod directory;
pub mod synthetic;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::data::model::RawFrame;
use crate::data::pipeline::average_frames;

pub use directory::DirectorySource;
pub use synthetic::SyntheticSource;

/// Environment variable naming a directory of PNG frames to replay.
pub const FRAME_DIR_ENV: &str = "RUSTY_SPECTRO_FRAME_DIR";

/// What the operator is about to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRole {
    /// Colour frame used to locate the spectrum.
    Preview,
    /// Cuvette without the absorbing specimen.
    Blank,
    /// Cuvette with the specimen.
    Sample,
}

// ---------------------------------------------------------------------------
// FrameSource – the camera contract
// ---------------------------------------------------------------------------

pub trait FrameSource {
    /// Human-readable name for the status bar and logs.
    fn name(&self) -> String;

    /// Called before each capture. Real cameras ignore it; simulated and
    /// replayed sources use it to pick what the cuvette contains.
    fn prepare(&mut self, _role: CaptureRole) {}

    /// `H x W x 3` 8-bit capture.
    fn capture_color(&mut self) -> Result<RawFrame>;

    /// `H x W` 8-bit capture with flat colour balance.
    fn capture_grayscale(&mut self) -> Result<RawFrame>;
}

/// Take `count` grayscale captures, `settle` apart, and average them.
///
/// `count` of 0 or 1 is a single capture.
pub fn capture_averaged(
    source: &mut dyn FrameSource,
    count: usize,
    settle: Duration,
) -> Result<RawFrame> {
    let count = count.max(1);
    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        if i > 0 && !settle.is_zero() {
            std::thread::sleep(settle);
        }
        let frame = source
            .capture_grayscale()
            .with_context(|| format!("capture {} of {count} from {}", i + 1, source.name()))?;
        log::debug!("Captured {} ({}/{count})", frame.shape(), i + 1);
        frames.push(frame);
    }
    if frames.len() == 1 {
        return Ok(frames.remove(0));
    }
    Ok(average_frames(&frames)?)
}

/// The source selected by [`FRAME_DIR_ENV`], else the simulator.
pub fn source_from_env() -> Box<dyn FrameSource> {
    match std::env::var_os(FRAME_DIR_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            log::info!("Replaying frames from {}", dir.display());
            Box::new(DirectorySource::new(dir))
        }
        None => {
            log::info!("No {FRAME_DIR_ENV} set; using the simulated spectrometer");
            Box::new(SyntheticSource::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Returns a fixed sequence of 1x1 gray frames.
    struct Scripted {
        values: Vec<u8>,
        captures: usize,
    }

    impl FrameSource for Scripted {
        fn name(&self) -> String {
            "scripted".to_string()
        }

        fn capture_color(&mut self) -> Result<RawFrame> {
            anyhow::bail!("colour not scripted")
        }

        fn capture_grayscale(&mut self) -> Result<RawFrame> {
            let v = *self
                .values
                .get(self.captures)
                .context("script exhausted")?;
            self.captures += 1;
            Ok(RawFrame::Gray(GrayImage::from_pixel(1, 1, Luma([v]))))
        }
    }

    #[test]
    fn test_capture_averaged_uses_count_captures() {
        let mut src = Scripted { values: vec![10, 12, 14, 99], captures: 0 };
        let frame = capture_averaged(&mut src, 3, Duration::ZERO).unwrap();
        assert_eq!(frame.intensity(0, 0), 12);
        assert_eq!(src.captures, 3);
    }

    #[test]
    fn test_capture_averaged_single_capture() {
        let mut src = Scripted { values: vec![77], captures: 0 };
        let frame = capture_averaged(&mut src, 0, Duration::from_millis(50)).unwrap();
        assert_eq!(frame.intensity(0, 0), 77);
    }

    #[test]
    fn test_capture_averaged_propagates_failures() {
        let mut src = Scripted { values: vec![1], captures: 0 };
        let err = capture_averaged(&mut src, 2, Duration::ZERO).unwrap_err();
        assert!(format!("{err:#}").contains("capture 2 of 2"));
    }
}
