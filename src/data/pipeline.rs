use image::{GrayImage, ImageBuffer, Pixel, RgbImage};

use super::error::{MeasurementError, Result};
use super::model::{ComparisonMode, MeasurementResult, RawFrame, RegionOfInterest, SampleRow};

// ---------------------------------------------------------------------------
// Region extraction
// ---------------------------------------------------------------------------

/// Pixels of column `roi.x`, rows `[roi.y, roi.y + roi.length)`.
///
/// The region is re-checked against this frame; the stored region may have
/// been validated against a frame of another size.
pub fn extract_row(frame: &RawFrame, roi: &RegionOfInterest) -> Result<SampleRow> {
    roi.validate(frame.width(), frame.height())?;
    let col = roi.x as u32;
    Ok(SampleRow::from_pixels(
        roi.rows().map(|row| frame.intensity(col, row as u32)),
    ))
}

// ---------------------------------------------------------------------------
// Blank / sample comparison
// ---------------------------------------------------------------------------

/// Compare a blank row against a sample row point by point.
///
/// Non-finite log-ratio values (zero sample pixels) are kept in the result
/// and reported through [`MeasurementResult::warning`].
pub fn compute_measurement(
    blank: &SampleRow,
    sample: &SampleRow,
    mode: ComparisonMode,
) -> Result<MeasurementResult> {
    if blank.len() != sample.len() {
        return Err(MeasurementError::LengthMismatch {
            blank: blank.len(),
            sample: sample.len(),
        });
    }

    let pairs = blank.values().iter().zip(sample.values());
    let values: Vec<f64> = match mode {
        ComparisonMode::LogRatio => pairs
            .map(|(&b, &s)| (f64::from(b) / f64::from(s)).log10())
            .collect(),
        ComparisonMode::RawDifference => pairs.map(|(&b, &s)| f64::from(b - s)).collect(),
    };

    let result = MeasurementResult::new(mode, values);
    if let Some(warning) = result.warning() {
        log::warn!("{warning}");
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Noise reduction
// ---------------------------------------------------------------------------

/// Element-wise mean of several captures of the same scene.
///
/// Sums are accumulated in `u32` and the mean is truncated back to `u8`.
/// All frames must share dimensions and channel layout.
pub fn average_frames(frames: &[RawFrame]) -> Result<RawFrame> {
    let first = frames.first().ok_or(MeasurementError::NoFrames)?;
    for (index, frame) in frames.iter().enumerate().skip(1) {
        let same_kind = matches!(
            (first, frame),
            (RawFrame::Gray(_), RawFrame::Gray(_)) | (RawFrame::Color(_), RawFrame::Color(_))
        );
        if !same_kind || frame.width() != first.width() || frame.height() != first.height() {
            return Err(MeasurementError::FrameShapeMismatch {
                index,
                expected: first.shape(),
                found: frame.shape(),
            });
        }
    }

    Ok(match first {
        RawFrame::Gray(_) => {
            let images: Vec<&GrayImage> = frames
                .iter()
                .filter_map(|f| match f {
                    RawFrame::Gray(img) => Some(img),
                    RawFrame::Color(_) => None,
                })
                .collect();
            RawFrame::Gray(mean_of(&images))
        }
        RawFrame::Color(_) => {
            let images: Vec<&RgbImage> = frames
                .iter()
                .filter_map(|f| match f {
                    RawFrame::Color(img) => Some(img),
                    RawFrame::Gray(_) => None,
                })
                .collect();
            RawFrame::Color(mean_of(&images))
        }
    })
}

/// Mean of equally sized 8-bit images. `images` must not be empty.
fn mean_of<P>(images: &[&ImageBuffer<P, Vec<u8>>]) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = images[0].dimensions();
    let mut sums = vec![0u32; images[0].as_raw().len()];
    for img in images {
        for (acc, &v) in sums.iter_mut().zip(img.as_raw().iter()) {
            *acc += u32::from(v);
        }
    }
    let n = images.len() as u32;
    // The mean of u8 values always fits in u8.
    let data: Vec<u8> = sums.into_iter().map(|s| (s / n) as u8).collect();
    let mut out = ImageBuffer::new(width, height);
    for (dst, src) in out.iter_mut().zip(data) {
        *dst = src;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn row(values: &[i32]) -> SampleRow {
        SampleRow::new(values.to_vec())
    }

    fn gray_1x1(v: u8) -> RawFrame {
        RawFrame::Gray(GrayImage::from_pixel(1, 1, Luma([v])))
    }

    /// Frame whose pixel value encodes its row, so slices are easy to check.
    fn row_ramp(width: u32, height: u32) -> RawFrame {
        RawFrame::Gray(GrayImage::from_fn(width, height, |_, y| Luma([(y % 256) as u8])))
    }

    #[test]
    fn test_extract_row_length_and_content() {
        let frame = row_ramp(640, 480);
        let roi = RegionOfInterest { x: 10, y: 5, length: 20 };
        let sample = extract_row(&frame, &roi).unwrap();
        assert_eq!(sample.len(), 20);
        assert_eq!(sample.values()[0], 5);
        assert_eq!(sample.values()[19], 24);
    }

    #[test]
    fn test_extract_row_length_for_many_regions() {
        let frame = row_ramp(64, 48);
        for x in [0usize, 1, 31, 63] {
            for y in [1usize, 10, 40] {
                for length in 1..(48 - y) {
                    let roi = RegionOfInterest { x, y, length };
                    assert_eq!(extract_row(&frame, &roi).unwrap().len(), length);
                }
            }
        }
    }

    #[test]
    fn test_extract_row_rechecks_bounds() {
        let frame = row_ramp(640, 480);
        let roi = RegionOfInterest { x: 10, y: 470, length: 20 };
        assert!(matches!(
            extract_row(&frame, &roi),
            Err(MeasurementError::RegionOutOfBounds { height: 480, .. })
        ));

        // Valid for VGA, not for a smaller frame.
        let small = row_ramp(320, 240);
        let roi = RegionOfInterest { x: 400, y: 5, length: 20 };
        assert!(extract_row(&small, &roi).is_err());
    }

    #[test]
    fn test_extract_row_from_color_frame() {
        let img = RgbImage::from_fn(4, 8, |_, y| Rgb([255, y as u8 * 10, 0]));
        let roi = RegionOfInterest { x: 2, y: 1, length: 3 };
        let sample = extract_row(&RawFrame::Color(img), &roi).unwrap();
        assert_eq!(sample.values(), &[10, 20, 30]);
    }

    #[test]
    fn test_scenario_log_ratio() {
        let result = compute_measurement(
            &row(&[100, 100, 100]),
            &row(&[50, 100, 200]),
            ComparisonMode::LogRatio,
        )
        .unwrap();
        let expected = [2f64.log10(), 0.0, 0.5f64.log10()];
        for (got, want) in result.values().iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
        assert_eq!(result.mode(), ComparisonMode::LogRatio);
        assert_eq!(result.warning(), None);
    }

    #[test]
    fn test_scenario_raw_difference() {
        let result = compute_measurement(
            &row(&[100, 100, 100]),
            &row(&[50, 100, 200]),
            ComparisonMode::RawDifference,
        )
        .unwrap();
        assert_eq!(result.values(), &[50.0, 0.0, -100.0]);
    }

    #[test]
    fn test_raw_difference_is_antisymmetric() {
        let a = row(&[0, 17, 255, 128, 3]);
        let b = row(&[255, 16, 0, 128, 200]);
        let ab = compute_measurement(&a, &b, ComparisonMode::RawDifference).unwrap();
        let ba = compute_measurement(&b, &a, ComparisonMode::RawDifference).unwrap();
        for (x, y) in ab.values().iter().zip(ba.values()) {
            assert_eq!(*x, -*y);
        }
    }

    #[test]
    fn test_log_ratio_zero_where_equal() {
        let a = row(&[1, 42, 255]);
        let result = compute_measurement(&a, &a.clone(), ComparisonMode::LogRatio).unwrap();
        assert!(result.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_log_ratio_keeps_non_finite_values() {
        let result = compute_measurement(
            &row(&[100, 0, 100]),
            &row(&[50, 0, 0]),
            ComparisonMode::LogRatio,
        )
        .unwrap();
        assert!(result.values()[0].is_finite());
        assert!(result.values()[1].is_nan());
        assert_eq!(result.values()[2], f64::INFINITY);
        assert!(matches!(
            result.warning(),
            Some(crate::data::error::MeasurementWarning::NonFiniteResult {
                count: 2,
                first_index: 1
            })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let err = compute_measurement(&row(&[1, 2, 3]), &row(&[1, 2]), ComparisonMode::LogRatio)
            .unwrap_err();
        assert!(matches!(
            err,
            MeasurementError::LengthMismatch { blank: 3, sample: 2 }
        ));
    }

    #[test]
    fn test_average_three_frames() {
        let avg = average_frames(&[gray_1x1(10), gray_1x1(12), gray_1x1(14)]).unwrap();
        assert_eq!(avg.intensity(0, 0), 12);
    }

    #[test]
    fn test_average_does_not_overflow_and_truncates() {
        let avg = average_frames(&[gray_1x1(255), gray_1x1(255), gray_1x1(254)]).unwrap();
        assert_eq!(avg.intensity(0, 0), 254);
    }

    #[test]
    fn test_average_color_frames() {
        let a = RawFrame::Color(RgbImage::from_pixel(2, 1, Rgb([0, 100, 200])));
        let b = RawFrame::Color(RgbImage::from_pixel(2, 1, Rgb([10, 110, 250])));
        match average_frames(&[a, b]).unwrap() {
            RawFrame::Color(img) => assert_eq!(img.get_pixel(1, 0), &Rgb([5, 105, 225])),
            RawFrame::Gray(_) => panic!("expected colour frame"),
        }
    }

    #[test]
    fn test_average_rejects_bad_input() {
        assert!(matches!(average_frames(&[]), Err(MeasurementError::NoFrames)));

        let other_size = RawFrame::Gray(GrayImage::new(2, 1));
        assert!(matches!(
            average_frames(&[gray_1x1(1), other_size]),
            Err(MeasurementError::FrameShapeMismatch { index: 1, .. })
        ));

        let color = RawFrame::Color(RgbImage::new(1, 1));
        assert!(average_frames(&[gray_1x1(1), color]).is_err());
    }
}
