use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::{Calibration, MeasurementResult};

pub const WAVELENGTH_HEADER: &str = "Wavelength (nm)";

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Write `result` as `Wavelength (nm), <quantity>` rows in index order.
///
/// The quantity column is named after the comparison mode that produced the
/// result (`Absorbance` or `Intensity difference`).
pub fn write_csv<W: Write>(writer: W, result: &MeasurementResult, cal: &Calibration) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record([WAVELENGTH_HEADER, result.mode().quantity()])
        .context("writing CSV header")?;

    for (i, (wavelength, value)) in result
        .wavelengths(cal)
        .into_iter()
        .zip(result.values())
        .enumerate()
    {
        csv_writer
            .write_record([wavelength.to_string(), value.to_string()])
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    csv_writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Save `result` as a CSV file at `path`.
pub fn save_csv(path: &Path, result: &MeasurementResult, cal: &Calibration) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(file, result, cal)?;
    log::info!("Saved {} points to {}", result.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ComparisonMode, SampleRow};
    use crate::data::pipeline::compute_measurement;
    use tempfile::NamedTempFile;

    fn result(mode: ComparisonMode) -> MeasurementResult {
        compute_measurement(
            &SampleRow::new(vec![100, 100, 100]),
            &SampleRow::new(vec![50, 100, 200]),
            mode,
        )
        .unwrap()
    }

    #[test]
    fn test_absorbance_csv_layout() {
        let cal = Calibration::new(400.0, 700.0).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &result(ComparisonMode::LogRatio), &cal).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Wavelength (nm),Absorbance");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("400,0.30102"));
        assert_eq!(lines[2], "550,0");
        assert!(lines[3].starts_with("700,-0.30102"));
    }

    #[test]
    fn test_raw_difference_csv_header() {
        let cal = Calibration::new(400.0, 700.0).unwrap();
        let temp = NamedTempFile::new().unwrap();
        save_csv(temp.path(), &result(ComparisonMode::RawDifference), &cal).unwrap();

        let content = std::fs::read_to_string(temp.path()).unwrap();
        assert_eq!(
            content,
            "Wavelength (nm),Intensity difference\n400,50\n550,0\n700,-100\n"
        );
    }

    #[test]
    fn test_non_finite_values_are_written() {
        let cal = Calibration::new(400.0, 700.0).unwrap();
        let res = compute_measurement(
            &SampleRow::new(vec![10, 10]),
            &SampleRow::new(vec![0, 10]),
            ComparisonMode::LogRatio,
        )
        .unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &res, &cal).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("400,inf"));
    }
}
