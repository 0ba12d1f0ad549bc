use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::{Hsl, IntoColor, Srgb};

use super::{CaptureRole, FrameSource};
use crate::data::model::{RawFrame, RegionOfInterest};

// ---------------------------------------------------------------------------
// Simulated spectrometer geometry
// ---------------------------------------------------------------------------

/// Sensor size of the simulated camera (the Pi camera runs at 640x480).
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// The diffraction spectrum is a vertical streak centred on this column.
const SPECTRUM_COLUMN: u32 = 320;
const SPECTRUM_HALF_WIDTH: u32 = 4;
/// Rows covered by the visible spectrum, top = shortest wavelength.
const SPECTRUM_TOP: u32 = 40;
const SPECTRUM_BOTTOM: u32 = 440;
const SPECTRUM_MIN_NM: f64 = 400.0;
const SPECTRUM_MAX_NM: f64 = 700.0;

const DARK_LEVEL: f64 = 6.0;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// An absorption band of the simulated specimen.
#[derive(Debug, Clone, Copy)]
pub struct AbsorptionPeak {
    pub center_nm: f64,
    pub width_nm: f64,
    pub absorbance: f64,
}

// ---------------------------------------------------------------------------
// SyntheticSource
// ---------------------------------------------------------------------------

/// A camera looking at a lamp through a grating and a cuvette.
///
/// Blank captures show the bare lamp spectrum; sample captures attenuate it
/// by the configured absorption peaks.
pub struct SyntheticSource {
    noise: SensorNoise,
    role: CaptureRole,
    peaks: Vec<AbsorptionPeak>,
    noise_level: f64,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::with_seed(42)
    }
}

impl SyntheticSource {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            noise: SensorNoise::new(seed),
            role: CaptureRole::Preview,
            peaks: vec![
                AbsorptionPeak {
                    center_nm: 520.0,
                    width_nm: 25.0,
                    absorbance: 0.6,
                },
                AbsorptionPeak {
                    center_nm: 630.0,
                    width_nm: 15.0,
                    absorbance: 0.3,
                },
            ],
            noise_level: 1.5,
        }
    }

    pub fn with_noise(mut self, noise_level: f64) -> Self {
        self.noise_level = noise_level;
        self
    }

    pub fn with_peaks(mut self, peaks: Vec<AbsorptionPeak>) -> Self {
        self.peaks = peaks;
        self
    }

    /// Region that exactly covers the simulated spectrum.
    pub fn spectrum_region() -> RegionOfInterest {
        RegionOfInterest {
            x: SPECTRUM_COLUMN as usize,
            y: SPECTRUM_TOP as usize,
            length: (SPECTRUM_BOTTOM - SPECTRUM_TOP) as usize,
        }
    }

    /// Wavelength shown at `row`, if the row lies inside the spectrum.
    fn wavelength_at(row: u32) -> Option<f64> {
        (SPECTRUM_TOP..SPECTRUM_BOTTOM).contains(&row).then(|| {
            let t = f64::from(row - SPECTRUM_TOP) / f64::from(SPECTRUM_BOTTOM - SPECTRUM_TOP - 1);
            SPECTRUM_MIN_NM + t * (SPECTRUM_MAX_NM - SPECTRUM_MIN_NM)
        })
    }

    /// Noise-free light level at a pixel, before the dark offset.
    fn signal(&self, col: u32, row: u32) -> f64 {
        let Some(nm) = Self::wavelength_at(row) else {
            return 0.0;
        };
        let offset = col.abs_diff(SPECTRUM_COLUMN);
        if offset > SPECTRUM_HALF_WIDTH {
            return 0.0;
        }
        let falloff = 1.0 - f64::from(offset) / f64::from(SPECTRUM_HALF_WIDTH + 1);
        let lamp = gaussian(nm, 560.0, 120.0, 210.0);
        let absorbance: f64 = match self.role {
            CaptureRole::Sample => self
                .peaks
                .iter()
                .map(|p| gaussian(nm, p.center_nm, p.width_nm, p.absorbance))
                .sum(),
            CaptureRole::Blank | CaptureRole::Preview => 0.0,
        };
        lamp * falloff * 10f64.powf(-absorbance)
    }

    fn level(&mut self, col: u32, row: u32) -> f64 {
        let noise = if self.noise_level > 0.0 {
            self.noise.sample(self.noise_level)
        } else {
            0.0
        };
        (DARK_LEVEL + self.signal(col, row) + noise).clamp(0.0, 255.0)
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> String {
        "simulated spectrometer".to_string()
    }

    fn prepare(&mut self, role: CaptureRole) {
        self.role = role;
    }

    fn capture_color(&mut self) -> Result<RawFrame> {
        let mut img = RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT);
        for (col, row, px) in img.enumerate_pixels_mut() {
            let hue = Self::wavelength_at(row)
                .map(|nm| 270.0 * (SPECTRUM_MAX_NM - nm) / (SPECTRUM_MAX_NM - SPECTRUM_MIN_NM))
                .unwrap_or(0.0);
            let rgb: Srgb = Hsl::new(hue as f32, 1.0, 0.5).into_color();
            let brightness = (self.signal(col, row) / 255.0) as f32;
            let dark = DARK_LEVEL as f32;
            *px = Rgb([
                (dark + rgb.red * brightness * 255.0).min(255.0) as u8,
                (dark + rgb.green * brightness * 255.0).min(255.0) as u8,
                (dark + rgb.blue * brightness * 255.0).min(255.0) as u8,
            ]);
        }
        Ok(RawFrame::Color(img))
    }

    fn capture_grayscale(&mut self) -> Result<RawFrame> {
        let mut img = GrayImage::new(FRAME_WIDTH, FRAME_HEIGHT);
        for row in 0..FRAME_HEIGHT {
            for col in 0..FRAME_WIDTH {
                img.put_pixel(col, row, Luma([self.level(col, row) as u8]));
            }
        }
        Ok(RawFrame::Gray(img))
    }
}

// ---------------------------------------------------------------------------
// Noise generator
// ---------------------------------------------------------------------------

/// Seeded Gaussian sensor noise: splitmix64 uniforms fed through the
/// Marsaglia polar method, which yields normals in pairs.
struct SensorNoise {
    state: u64,
    spare: Option<f64>,
}

impl SensorNoise {
    fn new(seed: u64) -> Self {
        Self {
            state: seed,
            spare: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[-1, 1)`.
    fn next_signed(&mut self) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        2.0 * unit - 1.0
    }

    /// Standard normal sample scaled by `sigma`.
    fn sample(&mut self, sigma: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return z * sigma;
        }
        loop {
            let (u, v) = (self.next_signed(), self.next_signed());
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let scale = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * scale);
                return u * scale * sigma;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ComparisonMode;
    use crate::data::pipeline::{compute_measurement, extract_row};

    fn capture(src: &mut SyntheticSource, role: CaptureRole) -> RawFrame {
        src.prepare(role);
        src.capture_grayscale().unwrap()
    }

    #[test]
    fn test_frames_have_camera_geometry() {
        let mut src = SyntheticSource::default();
        let gray = src.capture_grayscale().unwrap();
        assert_eq!((gray.width(), gray.height()), (640, 480));
        let color = src.capture_color().unwrap();
        assert_eq!(color.shape(), "640x480 rgb");
    }

    #[test]
    fn test_spectrum_region_is_valid() {
        SyntheticSource::spectrum_region()
            .validate(FRAME_WIDTH, FRAME_HEIGHT)
            .unwrap();
    }

    #[test]
    fn test_sample_shows_absorption_peak() {
        let mut src = SyntheticSource::default().with_noise(0.0);
        let roi = SyntheticSource::spectrum_region();
        let blank = extract_row(&capture(&mut src, CaptureRole::Blank), &roi).unwrap();
        let sample = extract_row(&capture(&mut src, CaptureRole::Sample), &roi).unwrap();
        let result = compute_measurement(&blank, &sample, ComparisonMode::LogRatio).unwrap();

        // Row 160 of the region sits on the 520 nm band, row 66 near 450 nm.
        assert!(result.values()[160] > 0.4, "{}", result.values()[160]);
        assert!(result.values()[66].abs() < 0.05, "{}", result.values()[66]);
        assert_eq!(result.warning(), None);
    }

    #[test]
    fn test_sensor_noise_is_centred_with_requested_spread() {
        let mut noise = SensorNoise::new(3);
        let samples: Vec<f64> = (0..20_000).map(|_| noise.sample(2.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.1, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std {}", var.sqrt());
    }

    #[test]
    fn test_noise_is_deterministic_per_seed() {
        let a = SyntheticSource::with_seed(7).capture_grayscale().unwrap();
        let b = SyntheticSource::with_seed(7).capture_grayscale().unwrap();
        let roi = SyntheticSource::spectrum_region();
        assert_eq!(extract_row(&a, &roi).unwrap(), extract_row(&b, &roi).unwrap());
    }
}
