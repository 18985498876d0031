//! Input report decoding for the PLAYSTATION(R)3 controller
//!
//! The controller pushes a fixed-layout HID input report. Offsets below are
//! the wire contract for layout version 1; a different layout must get its
//! own decoder rather than be guessed at.
//!
//! Report layout (only consumed bytes listed):
//! - Byte 2: D-pad in the high nibble, select/L3/R3/start in bits 0-3
//! - Byte 3: L2, R2, L1, R1, triangle, circle, cross, square (bits 0-7)
//! - Byte 4: PS button (any non-zero value)
//! - Bytes 6-9: left X, left Y, right X, right Y stick positions
//! - Bytes 14-25: pressure of D-pad, shoulder and face buttons

use crate::error::DecodeError;
use crate::snapshot::{Analog, Button, ControllerSnapshot};

/// Shortest report the decoder accepts (highest consumed offset + 1)
pub const REPORT_LEN: usize = 26;

/// Byte offsets inside the input report
pub mod offset {
    /// D-pad (high nibble) and select/stick-click/start bits
    pub const DPAD_SYSTEM: usize = 2;
    /// Shoulder, trigger and face button bits
    pub const SHOULDER_FACE: usize = 3;
    /// PS button, whole-byte test
    pub const PS: usize = 4;
    pub const LEFT_STICK_X: usize = 6;
    pub const LEFT_STICK_Y: usize = 7;
    pub const RIGHT_STICK_X: usize = 8;
    pub const RIGHT_STICK_Y: usize = 9;
    /// First pressure byte (D-pad up); the following eleven are contiguous
    pub const PRESSURE_BASE: usize = 14;
}

/// Masked D-pad values (byte 2 & 0xF0)
pub mod dpad {
    pub const MASK: u8 = 0xF0;
    pub const UP: u8 = 16;
    pub const RIGHT: u8 = 32;
    pub const DOWN: u8 = 64;
    pub const LEFT: u8 = 128;
}

/// Bit-mapped buttons as (button, byte offset, bit)
const DIGITAL_BITS: [(Button, usize, u8); 12] = [
    (Button::Select, offset::DPAD_SYSTEM, 0),
    (Button::LeftStickButton, offset::DPAD_SYSTEM, 1),
    (Button::RightStickButton, offset::DPAD_SYSTEM, 2),
    (Button::Start, offset::DPAD_SYSTEM, 3),
    (Button::L2, offset::SHOULDER_FACE, 0),
    (Button::R2, offset::SHOULDER_FACE, 1),
    (Button::L1, offset::SHOULDER_FACE, 2),
    (Button::R1, offset::SHOULDER_FACE, 3),
    (Button::Triangle, offset::SHOULDER_FACE, 4),
    (Button::Circle, offset::SHOULDER_FACE, 5),
    (Button::Cross, offset::SHOULDER_FACE, 6),
    (Button::Square, offset::SHOULDER_FACE, 7),
];

const STICKS: [(Analog, usize); 4] = [
    (Analog::LeftStickX, offset::LEFT_STICK_X),
    (Analog::LeftStickY, offset::LEFT_STICK_Y),
    (Analog::RightStickX, offset::RIGHT_STICK_X),
    (Analog::RightStickY, offset::RIGHT_STICK_Y),
];

/// Pressure inputs in report order, starting at `offset::PRESSURE_BASE`
const PRESSURES: [Analog; 12] = [
    Analog::UpAnalog,
    Analog::RightAnalog,
    Analog::DownAnalog,
    Analog::LeftAnalog,
    Analog::L2Analog,
    Analog::R2Analog,
    Analog::L1Analog,
    Analog::R1Analog,
    Analog::TriangleAnalog,
    Analog::CircleAnalog,
    Analog::CrossAnalog,
    Analog::SquareAnalog,
];

/// Decode one input report into a snapshot
///
/// Reports longer than [`REPORT_LEN`] are accepted; the trailing bytes
/// (motion sensors, battery, ...) are ignored.
pub fn decode(data: &[u8]) -> Result<ControllerSnapshot, DecodeError> {
    if data.len() < REPORT_LEN {
        return Err(DecodeError::Truncated {
            len: data.len(),
            required: REPORT_LEN,
        });
    }

    let mut snap = ControllerSnapshot::default();

    for (analog, index) in STICKS {
        snap = snap.with_analog(analog, read_stick(data[index]));
    }

    let (up, right, down, left) = read_dpad(data[offset::DPAD_SYSTEM]);
    snap = snap
        .with_button(Button::Up, up)
        .with_button(Button::Right, right)
        .with_button(Button::Down, down)
        .with_button(Button::Left, left);

    for (button, index, bit) in DIGITAL_BITS {
        snap = snap.with_button(button, read_bit(data[index], bit));
    }

    snap = snap.with_button(Button::Ps, data[offset::PS] != 0);

    for (i, analog) in PRESSURES.into_iter().enumerate() {
        snap = snap.with_analog(analog, read_pressure(data[offset::PRESSURE_BASE + i]));
    }

    Ok(snap)
}

/// Stick byte to -1.0..1.0; the rest position 127/128 lands within 0.004 of 0
#[inline]
pub fn read_stick(byte: u8) -> f64 {
    (byte as f64 - 127.5) / 127.5
}

/// Pressure byte to 0.0..1.0
#[inline]
pub fn read_pressure(byte: u8) -> f64 {
    byte as f64 / 255.0
}

#[inline]
fn read_bit(byte: u8, bit: u8) -> bool {
    (byte >> bit) & 1 == 1
}

/// Returns (up, right, down, left). Only the four exact masked values select a
/// direction; zero and diagonal combinations read as centered.
fn read_dpad(byte: u8) -> (bool, bool, bool, bool) {
    match byte & dpad::MASK {
        dpad::UP => (true, false, false, false),
        dpad::RIGHT => (false, true, false, false),
        dpad::DOWN => (false, false, true, false),
        dpad::LEFT => (false, false, false, true),
        _ => (false, false, false, false),
    }
}

/// A report with sticks at rest and nothing pressed
pub fn neutral_report() -> [u8; REPORT_LEN] {
    let mut data = [0u8; REPORT_LEN];
    for (_, index) in STICKS {
        data[index] = 0x80;
    }
    data
}
