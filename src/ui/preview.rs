use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions, Ui};
use image::{Rgb, RgbImage};

use crate::color::REGION_MARKER;
use crate::data::model::RegionOfInterest;
use crate::state::LocateState;

/// Half width of the marker drawn over the region's column.
const MARKER_HALF_WIDTH: usize = 5;

// ---------------------------------------------------------------------------
// Region overlay
// ---------------------------------------------------------------------------

/// Copy of `preview` with the region painted as a vertical bar.
///
/// The bar covers rows `[y, y + length)` and columns `x ± 5`, clipped to the
/// image.
pub fn region_overlay(preview: &RgbImage, roi: Option<&RegionOfInterest>) -> RgbImage {
    let mut out = preview.clone();
    let Some(roi) = roi else {
        return out;
    };
    let (width, height) = (out.width() as usize, out.height() as usize);
    let left = roi.x.saturating_sub(MARKER_HALF_WIDTH);
    let right = roi.x.saturating_add(MARKER_HALF_WIDTH).min(width);
    let bottom = roi.y.saturating_add(roi.length).min(height);
    for row in roi.y.min(height)..bottom {
        for col in left..right {
            out.put_pixel(col as u32, row as u32, Rgb(REGION_MARKER));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Texture cache
// ---------------------------------------------------------------------------

/// GPU copy of the preview, re-uploaded when the locate screen's revision
/// changes.
#[derive(Default)]
pub struct PreviewTexture {
    texture: Option<TextureHandle>,
    revision: Option<u64>,
}

impl PreviewTexture {
    pub fn show(&mut self, ui: &mut Ui, locate: &LocateState, roi: Option<&RegionOfInterest>) {
        if self.revision != Some(locate.revision) || self.texture.is_none() {
            let overlay = region_overlay(&locate.preview, roi);
            let size = [overlay.width() as usize, overlay.height() as usize];
            let image = ColorImage::from_rgb(size, overlay.as_raw());
            match &mut self.texture {
                Some(texture) => texture.set(image, TextureOptions::NEAREST),
                None => {
                    self.texture =
                        Some(ui.ctx().load_texture("spectrum_preview", image, TextureOptions::NEAREST))
                }
            }
            self.revision = Some(locate.revision);
        }

        if let Some(texture) = &self.texture {
            let [w, h] = texture.size();
            let scale = (ui.available_width() / w as f32).min(1.0);
            ui.image((texture.id(), egui::vec2(w as f32 * scale, h as f32 * scale)));
        }
    }

    /// Forget the uploaded image, e.g. when a new preview is captured.
    pub fn invalidate(&mut self) {
        self.revision = None;
    }
}
