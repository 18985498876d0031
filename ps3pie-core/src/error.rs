//! Engine error types

use crate::output::OutputEvent;
use thiserror::Error;

/// Errors from decoding an input report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Report truncated: got {len} bytes, need at least {required}")]
    Truncated { len: usize, required: usize },
}

/// A calibration that would have produced a non-finite scale factor
///
/// Happens when a stick rests at (or within rounding of) its end stop.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Calibration rejected for axis {axis}: center {center} gives factor {factor}")]
pub struct CalibrationFault {
    pub axis: String,
    pub center: f64,
    pub factor: f64,
}

/// The virtual device refused or failed an event write
#[derive(Error, Debug)]
#[error("Failed to emit {event:?}: {source}")]
pub struct EmissionError {
    pub event: OutputEvent,
    #[source]
    pub source: std::io::Error,
}

/// Errors that abort one processing cycle
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Emission error after {emitted} events: {source}")]
    Emission {
        emitted: usize,
        #[source]
        source: EmissionError,
    },
}

/// Errors from loading or validating a remap profile
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read profile: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid profile: {0}")]
    Invalid(String),
}
