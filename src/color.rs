use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Plot series colours
// ---------------------------------------------------------------------------

/// Colours for the traces drawn on the measurement plots.
#[derive(Debug, Clone, Copy)]
pub struct SeriesColors {
    pub result: Color32,
    pub blank: Color32,
    pub sample: Color32,
}

impl Default for SeriesColors {
    fn default() -> Self {
        let palette = generate_palette(3);
        Self {
            result: palette[2],
            blank: palette[1],
            sample: palette[0],
        }
    }
}

/// Colour of the region marker drawn over the preview image.
pub const REGION_MARKER: [u8; 3] = [255, 0, 0];
