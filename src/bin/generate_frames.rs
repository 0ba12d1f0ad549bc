//! Writes a set of simulated camera frames that `RUSTY_SPECTRO_FRAME_DIR`
//! can replay:
//!
//! ```text
//! cargo run --bin generate_frames -- frames
//! RUSTY_SPECTRO_FRAME_DIR=frames cargo run
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use env_logger::Env;

use rusty_spectro::capture::{CaptureRole, DirectorySource, FrameSource, SyntheticSource};
use rusty_spectro::data::model::RawFrame;

fn save_frame(frame: &RawFrame, path: &std::path::Path) -> Result<()> {
    let saved = match frame {
        RawFrame::Gray(img) => img.save(path),
        RawFrame::Color(img) => img.save(path),
    };
    saved.with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("frames"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut source = SyntheticSource::default();
    for role in [CaptureRole::Preview, CaptureRole::Blank, CaptureRole::Sample] {
        source.prepare(role);
        let frame = match role {
            CaptureRole::Preview => source.capture_color()?,
            CaptureRole::Blank | CaptureRole::Sample => source.capture_grayscale()?,
        };
        let path = out_dir.join(DirectorySource::file_for(role));
        save_frame(&frame, &path)?;
        log::info!("Wrote {} ({})", path.display(), frame.shape());
    }

    let roi = SyntheticSource::spectrum_region();
    log::info!(
        "Spectrum lies at x = {}, y = {}, length = {}",
        roi.x,
        roi.y,
        roi.length
    );
    Ok(())
}
