/// Data layer: measurement types, persisted state, and the pipeline.
///
/// Architecture:
/// ```text
///   RawFrame (blank)      RawFrame (sample)
///        │                      │
///        ▼                      ▼
///   ┌──────────────────────────────┐
///   │ pipeline::extract_row        │  RegionOfInterest ◀── config (loc.json)
///   └──────────────────────────────┘
///        │ SampleRow            │ SampleRow
///        ▼                      ▼
///   ┌──────────────────────────────┐
///   │ pipeline::compute_measurement│  ComparisonMode  ◀── config (settings.json)
///   └──────────────────────────────┘
///        │ MeasurementResult
///        ▼
///   ┌──────────────────────────────┐
///   │ calibration::wavelength_axis │  Calibration     ◀── config (cal.json)
///   └──────────────────────────────┘
///        │
///        ▼
///     plot / export (CSV)
/// ```

pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
