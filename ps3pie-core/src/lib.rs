//! PLAYSTATION(R)3 controller remapping engine
//!
//! Decodes raw controller reports, applies live stick calibration and a
//! shift-layer remapping profile, and emits the minimal set of keyboard and
//! virtual joystick events for each report.

pub mod action;
pub mod calibration;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod gate;
pub mod mapper;
pub mod output;
pub mod profile;
pub mod report;
pub mod snapshot;

pub use action::{Action, Key, PadAxis, PadButton};
pub use calibration::{AxisCalibration, Calibration};
pub use emitter::{DiffEmitter, EventSink, RecordingSink};
pub use engine::{CycleReport, Engine};
pub use error::{CalibrationFault, CycleError, DecodeError, EmissionError, ProfileError};
pub use gate::{report_channel, BusyToken, Input, Offer, ReportGate, ReportInbox};
pub use mapper::{Mapper, ShiftState, Taken};
pub use output::{OutputEvent, OutputState};
pub use profile::{AxisRange, Profile};
pub use report::{decode, REPORT_LEN};
pub use snapshot::{Analog, Button, ControllerSnapshot};
