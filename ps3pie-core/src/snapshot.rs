//! Canonical controller state decoded from one input report
//!
//! Input names serialize in the same camelCase spelling used by remap
//! profiles (`"leftStickButton"`, `"l2Analog"`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digital inputs of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Button {
    Up,
    Right,
    Down,
    Left,
    Triangle,
    Circle,
    Cross,
    Square,
    Select,
    LeftStickButton,
    RightStickButton,
    Start,
    L2,
    R2,
    L1,
    R1,
    /// System ("PS") button
    Ps,
}

impl Button {
    pub const COUNT: usize = 17;

    /// All buttons in snapshot order
    pub const ALL: [Button; Button::COUNT] = [
        Button::Up,
        Button::Right,
        Button::Down,
        Button::Left,
        Button::Triangle,
        Button::Circle,
        Button::Cross,
        Button::Square,
        Button::Select,
        Button::LeftStickButton,
        Button::RightStickButton,
        Button::Start,
        Button::L2,
        Button::R2,
        Button::L1,
        Button::R1,
        Button::Ps,
    ];

    /// Profile spelling of this button
    pub fn name(&self) -> &'static str {
        match self {
            Button::Up => "up",
            Button::Right => "right",
            Button::Down => "down",
            Button::Left => "left",
            Button::Triangle => "triangle",
            Button::Circle => "circle",
            Button::Cross => "cross",
            Button::Square => "square",
            Button::Select => "select",
            Button::LeftStickButton => "leftStickButton",
            Button::RightStickButton => "rightStickButton",
            Button::Start => "start",
            Button::L2 => "l2",
            Button::R2 => "r2",
            Button::L1 => "l1",
            Button::R1 => "r1",
            Button::Ps => "ps",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Analog inputs: the four stick axes (-1.0..1.0) and the pressure-sensitive
/// buttons (0.0..1.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Analog {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    UpAnalog,
    RightAnalog,
    DownAnalog,
    LeftAnalog,
    L2Analog,
    R2Analog,
    L1Analog,
    R1Analog,
    TriangleAnalog,
    CircleAnalog,
    CrossAnalog,
    SquareAnalog,
}

impl Analog {
    pub const COUNT: usize = 16;

    pub const ALL: [Analog; Analog::COUNT] = [
        Analog::LeftStickX,
        Analog::LeftStickY,
        Analog::RightStickX,
        Analog::RightStickY,
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

    /// Whether this input is a centered stick axis rather than a pressure
    pub fn is_stick(&self) -> bool {
        matches!(
            self,
            Analog::LeftStickX | Analog::LeftStickY | Analog::RightStickX | Analog::RightStickY
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Analog::LeftStickX => "leftStickX",
            Analog::LeftStickY => "leftStickY",
            Analog::RightStickX => "rightStickX",
            Analog::RightStickY => "rightStickY",
            Analog::UpAnalog => "upAnalog",
            Analog::RightAnalog => "rightAnalog",
            Analog::DownAnalog => "downAnalog",
            Analog::LeftAnalog => "leftAnalog",
            Analog::L2Analog => "l2Analog",
            Analog::R2Analog => "r2Analog",
            Analog::L1Analog => "l1Analog",
            Analog::R1Analog => "r1Analog",
            Analog::TriangleAnalog => "triangleAnalog",
            Analog::CircleAnalog => "circleAnalog",
            Analog::CrossAnalog => "crossAnalog",
            Analog::SquareAnalog => "squareAnalog",
        }
    }
}

impl fmt::Display for Analog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded reading of every controller input
///
/// The default value is the neutral controller: nothing pressed and all
/// sticks exactly centered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerSnapshot {
    buttons: [bool; Button::COUNT],
    analogs: [f64; Analog::COUNT],
}

impl ControllerSnapshot {
    /// Whether a digital input is pressed
    pub fn button(&self, button: Button) -> bool {
        self.buttons[button as usize]
    }

    /// Current value of an analog input
    pub fn analog(&self, analog: Analog) -> f64 {
        self.analogs[analog as usize]
    }

    /// Copy of this snapshot with one button changed
    pub fn with_button(mut self, button: Button, pressed: bool) -> Self {
        self.buttons[button as usize] = pressed;
        self
    }

    /// Copy of this snapshot with one analog value changed
    pub fn with_analog(mut self, analog: Analog, value: f64) -> Self {
        self.analogs[analog as usize] = value;
        self
    }

    /// Pressed buttons, in snapshot order
    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.button(*b))
    }
}

impl fmt::Display for ControllerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for analog in Analog::ALL {
            writeln!(f, "{:<16} {:>7.4}", analog.name(), self.analog(analog))?;
        }
        write!(f, "{:<16}", "pressed")?;
        let mut any = false;
        for button in self.pressed() {
            write!(f, " {button}")?;
            any = true;
        }
        if !any {
            write!(f, " -")?;
        }
        Ok(())
    }
}
