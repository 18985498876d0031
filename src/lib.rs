//! ps3pie: PLAYSTATION(R)3 controller to virtual keyboard + joystick
//!
//! Device plumbing around the `ps3pie-core` remapping engine: controller
//! acquisition over hidapi, the uinput output device and the engine worker.

pub mod cli;
pub mod hid;
pub mod uinput;
pub mod worker;

pub use hid::{AcquireError, ControllerReader, ReaderConfig};
pub use uinput::{DeviceError, VirtualPad};
pub use worker::{run_worker, WorkerStats};
