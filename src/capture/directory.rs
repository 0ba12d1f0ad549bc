use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{GrayImage, Luma};

use super::{CaptureRole, FrameSource};
use crate::data::model::RawFrame;

// ---------------------------------------------------------------------------
// DirectorySource – replay captures saved as PNG files
// ---------------------------------------------------------------------------

/// Serves `preview.png`, `blank.png` and `sample.png` from a directory,
/// picking the file by the role announced in [`FrameSource::prepare`].
///
/// Each call re-reads the file, so averaged captures see identical frames.
pub struct DirectorySource {
    dir: PathBuf,
    role: CaptureRole,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            role: CaptureRole::Preview,
        }
    }

    pub fn file_for(role: CaptureRole) -> &'static str {
        match role {
            CaptureRole::Preview => "preview.png",
            CaptureRole::Blank => "blank.png",
            CaptureRole::Sample => "sample.png",
        }
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(Self::file_for(self.role))
    }
}

fn open_rgb(path: &Path) -> Result<image::RgbImage> {
    let img = image::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(img.to_rgb8())
}

impl FrameSource for DirectorySource {
    fn name(&self) -> String {
        format!("frames in {}", self.dir.display())
    }

    fn prepare(&mut self, role: CaptureRole) {
        self.role = role;
    }

    fn capture_color(&mut self) -> Result<RawFrame> {
        Ok(RawFrame::Color(open_rgb(&self.current_path())?))
    }

    /// Keeps the green channel, as the camera does with flat colour balance.
    fn capture_grayscale(&mut self) -> Result<RawFrame> {
        let rgb = open_rgb(&self.current_path())?;
        let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            Luma([rgb.get_pixel(x, y).0[1]])
        });
        Ok(RawFrame::Gray(gray))
    }
}
