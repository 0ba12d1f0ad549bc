use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{MeasurementError, Result};
use super::model::{Calibration, RegionOfInterest, Settings};

/// Environment variable naming the directory that holds the config records.
pub const CONFIG_DIR_ENV: &str = "RUSTY_SPECTRO_CONFIG_DIR";

const CALIBRATION_FILE: &str = "cal.json";
const ROI_FILE: &str = "loc.json";
const SETTINGS_FILE: &str = "settings.json";

// ---------------------------------------------------------------------------
// ConfigStore – one JSON file per record
// ---------------------------------------------------------------------------

/// Persists calibration, region of interest and settings as independent
/// JSON records in one directory.
///
/// Saves replace the whole file (write to a sibling temp file, then rename).
/// Loads never substitute defaults: an absent or malformed record is
/// [`MeasurementError::ConfigMissingOrCorrupt`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory from [`CONFIG_DIR_ENV`], else the working directory.
    pub fn from_env() -> Self {
        let dir = std::env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_calibration(&self) -> Result<Calibration> {
        let path = self.dir.join(CALIBRATION_FILE);
        let cal: Calibration = read_record(&path)?;
        cal.revalidate().map_err(|e| corrupt(&path, e.to_string()))
    }

    pub fn save_calibration(&self, cal: &Calibration) -> Result<()> {
        write_record(&self.dir.join(CALIBRATION_FILE), cal)
    }

    pub fn load_roi(&self) -> Result<RegionOfInterest> {
        let path = self.dir.join(ROI_FILE);
        let roi: RegionOfInterest = read_record(&path)?;
        if !roi.is_well_formed() {
            return Err(corrupt(&path, format!("y and length must be positive ({roi})")));
        }
        Ok(roi)
    }

    pub fn save_roi(&self, roi: &RegionOfInterest) -> Result<()> {
        write_record(&self.dir.join(ROI_FILE), roi)
    }

    /// Out-of-range values are pulled back into the ranges the settings
    /// panel offers.
    pub fn load_settings(&self) -> Result<Settings> {
        let stored: Settings = read_record(&self.dir.join(SETTINGS_FILE))?;
        let settings = stored.clone().clamped();
        if settings != stored {
            log::warn!("Clamped stored settings {stored:?} to {settings:?}");
        }
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        write_record(&self.dir.join(SETTINGS_FILE), settings)
    }
}

fn corrupt(path: &Path, reason: impl Into<String>) -> MeasurementError {
    MeasurementError::ConfigMissingOrCorrupt {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| corrupt(path, e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| corrupt(path, e.to_string()))
}

fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let io_err = |source| MeasurementError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    let replaced = std::fs::write(&tmp, json).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(e) = replaced {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    log::debug!("Wrote {}", path.display());
    Ok(())
}
